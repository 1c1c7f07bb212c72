mod dataset;
mod error;
mod locate;
mod model;
mod naming;
mod options;
mod panel;
mod pdf_reader;
mod period;
mod reshape;
mod sink;
mod table_detect;
mod table_parse;
mod warning;

use std::path::Path;

use tracing::{debug, warn};

use crate::panel::finalize_panels;
use crate::pdf_reader::{PageLines, read_pdf_pages, read_pdf_pages_from_bytes};
use crate::table_detect::layout_page;
use crate::warning::WarningCode;

pub use dataset::{Dataset, consolidate};
pub use error::{DocumentFailure, ExtractError};
pub use locate::locate_tables;
pub use model::{
    BBox, Cell, Horizon, NamedTable, NormalizedTable, Observation, PageLayout, Panel, TableRegion,
    TextLine, TitledPanels,
};
pub use naming::TableNamer;
pub use options::{PageSelection, PipelineOptions};
pub use period::{parse_period, parse_period_cell};
pub use reshape::{perception_category, reshape_table, split_metric};
pub use sink::{CsvTableDir, MemorySink, TableSink, TableSource};
pub use warning::{ExtractWarning, WarningCode as ExtractWarningCode};

/// Anything that can present a document as positioned lines and table regions.
pub trait LayoutSource {
    fn page_layouts(
        &self,
        options: &PipelineOptions,
        warnings: &mut Vec<ExtractWarning>,
    ) -> Result<Vec<PageLayout>, ExtractError>;
}

impl LayoutSource for [PageLayout] {
    fn page_layouts(
        &self,
        options: &PipelineOptions,
        _warnings: &mut Vec<ExtractWarning>,
    ) -> Result<Vec<PageLayout>, ExtractError> {
        let pages = self
            .iter()
            .filter(|page| {
                options
                    .pages
                    .as_ref()
                    .is_none_or(|selection| selection.contains(page.page_number))
            })
            .cloned()
            .collect::<Vec<_>>();
        if pages.is_empty() && !self.is_empty() {
            return Err(ExtractError::NoPagesSelected);
        }
        Ok(pages)
    }
}

impl LayoutSource for Vec<PageLayout> {
    fn page_layouts(
        &self,
        options: &PipelineOptions,
        warnings: &mut Vec<ExtractWarning>,
    ) -> Result<Vec<PageLayout>, ExtractError> {
        self.as_slice().page_layouts(options, warnings)
    }
}

/// A PDF document, read with `lopdf`.
#[derive(Debug, Clone, Copy)]
pub enum PdfSource<'a> {
    Path(&'a Path),
    Bytes(&'a [u8]),
}

impl LayoutSource for PdfSource<'_> {
    fn page_layouts(
        &self,
        options: &PipelineOptions,
        warnings: &mut Vec<ExtractWarning>,
    ) -> Result<Vec<PageLayout>, ExtractError> {
        let pages: Vec<PageLines> = match self {
            Self::Path(path) => read_pdf_pages(path, options.pages.as_ref(), warnings)?,
            Self::Bytes(bytes) => read_pdf_pages_from_bytes(bytes, options.pages.as_ref(), warnings)?,
        };
        Ok(pages.iter().map(|page| layout_page(page, options)).collect())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionReport {
    pub table_count: usize,
    pub row_count: usize,
    /// Titles in document order, one per stored table.
    pub titles: Vec<String>,
    pub warnings: Vec<ExtractWarning>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NormalizeReport {
    pub tables_used: usize,
    pub tables_skipped: usize,
    pub observation_count: usize,
    pub warnings: Vec<ExtractWarning>,
}

/// Locates every titled table in a document and consolidates its panels.
pub fn extract_tables<S>(
    source: &S,
    options: &PipelineOptions,
    warnings: &mut Vec<ExtractWarning>,
) -> Result<Vec<NormalizedTable>, ExtractError>
where
    S: LayoutSource + ?Sized,
{
    options.validate()?;
    let pages = source.page_layouts(options, warnings)?;

    let mut tables = Vec::new();
    for located in locate_tables(&pages, options) {
        match finalize_panels(&located.title, &located.panels, options, warnings) {
            Some(table) if !table.header.is_empty() => tables.push(table),
            _ => {
                debug!(title = %located.title, "panels produced no usable rows");
                warnings.push(
                    ExtractWarning::new(WarningCode::EmptyPanels, "panels produced no usable rows")
                        .with_table(&located.title),
                );
            }
        }
    }

    if tables.is_empty() {
        warnings.push(ExtractWarning::new(
            WarningCode::NoTablesDetected,
            "no table rows were detected in the selected pages",
        ));
    }
    Ok(tables)
}

/// Names each table uniquely within the document and records it in `sink`.
pub fn store_tables<K>(
    tables: &[NormalizedTable],
    sink: &mut K,
) -> Result<(usize, usize), ExtractError>
where
    K: TableSink + ?Sized,
{
    let mut namer = TableNamer::new();
    let mut row_count = 0;
    for table in tables {
        let name = namer.assign(&table.title);
        sink.put(&name, table)?;
        row_count += table.body.len();
    }
    Ok((tables.len(), row_count))
}

/// Extraction pass for one document: locate, consolidate, name, store.
pub fn extract_to_sink<S, K>(
    source: &S,
    sink: &mut K,
    options: &PipelineOptions,
) -> Result<ExtractionReport, ExtractError>
where
    S: LayoutSource + ?Sized,
    K: TableSink + ?Sized,
{
    let mut warnings = Vec::new();
    let tables = extract_tables(source, options, &mut warnings)?;
    let (table_count, row_count) = store_tables(&tables, sink)?;

    Ok(ExtractionReport {
        table_count,
        row_count,
        titles: tables.into_iter().map(|table| table.title).collect(),
        warnings,
    })
}

fn is_skipped(name: &str, options: &PipelineOptions) -> bool {
    let lower = name.to_lowercase();
    options
        .skip_title_prefixes
        .iter()
        .any(|prefix| lower.starts_with(&prefix.to_lowercase()))
}

/// Normalization pass: reshapes every stored table into observations, one
/// group per table in storage order.
pub fn normalize_tables<T>(
    source: &T,
    options: &PipelineOptions,
) -> Result<(Vec<Vec<Observation>>, NormalizeReport), ExtractError>
where
    T: TableSource + ?Sized,
{
    let mut report = NormalizeReport {
        tables_used: 0,
        tables_skipped: 0,
        observation_count: 0,
        warnings: Vec::new(),
    };
    let mut parts = Vec::new();

    for named in source.read_tables()? {
        if is_skipped(&named.name, options) {
            debug!(name = %named.name, "skipping summary table");
            report.tables_skipped += 1;
            continue;
        }
        if named.table.header.first() != Some(&options.period_label) {
            warn!(name = %named.name, "no '{}' column; table skipped", options.period_label);
            report.warnings.push(
                ExtractWarning::new(
                    WarningCode::MissingPeriodColumn,
                    format!("no '{}' column; table skipped", options.period_label),
                )
                .with_table(&named.name),
            );
            report.tables_skipped += 1;
            continue;
        }

        let observations = reshape_table(&named.table, options);
        report.tables_used += 1;
        report.observation_count += observations.len();
        parts.push(observations);
    }

    Ok((parts, report))
}

/// Result of running many documents through both passes.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub dataset: Dataset,
    pub reports: Vec<(String, ExtractionReport)>,
    pub failures: Vec<DocumentFailure>,
}

fn process_document<S>(
    source: &S,
    options: &PipelineOptions,
) -> Result<(Vec<Vec<Observation>>, ExtractionReport), ExtractError>
where
    S: LayoutSource + ?Sized,
{
    let mut sink = MemorySink::new();
    let mut report = extract_to_sink(source, &mut sink, options)?;
    let (parts, normalize_report) = normalize_tables(&sink, options)?;
    report.warnings.extend(normalize_report.warnings);
    Ok((parts, report))
}

/// Runs each document to completion in order, then deduplicates once over
/// everything. A failing document is recorded and the batch carries on.
pub fn process_documents<I, S>(documents: I, options: &PipelineOptions) -> BatchOutcome
where
    I: IntoIterator<Item = (String, S)>,
    S: LayoutSource,
{
    let mut outcome = BatchOutcome::default();
    let mut parts = Vec::new();

    for (label, source) in documents {
        match process_document(&source, options) {
            Ok((document_parts, report)) => {
                debug!(
                    document = %label,
                    tables = report.table_count,
                    rows = report.row_count,
                    "document processed"
                );
                parts.extend(document_parts);
                outcome.reports.push((label, report));
            }
            Err(error) => {
                warn!(document = %label, %error, "extraction failed for document");
                outcome.failures.push(DocumentFailure {
                    source: label,
                    error,
                });
            }
        }
    }

    outcome.dataset = consolidate(parts);
    outcome
}
