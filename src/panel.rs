use tracing::debug;

use crate::model::{Cell, NormalizedTable, Panel};
use crate::options::PipelineOptions;
use crate::period::contains_period;
use crate::warning::{ExtractWarning, WarningCode};

const CANONICAL_TITLE_MARKER: &str = "perceptions and expectations";
const CANONICAL_HEADER: [&str; 9] = [
    "Survey Round",
    "Current Perception -Increased",
    "Current Perception-Remained Same",
    "Current Perception-Decreased",
    "Current Perception-Net Response",
    "One year ahead Expectation- Will Increase",
    "One year ahead Expectation-Will Remain Same",
    "One year ahead Expectation-Will Decrease",
    "One year ahead Expectation-Net Response",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    InHeader,
    InBody,
}

fn clean_rows(panels: &[Panel], options: &PipelineOptions) -> Vec<Vec<String>> {
    panels
        .iter()
        .flatten()
        .map(|row| row.iter().map(Cell::to_text).collect::<Vec<_>>())
        .filter(|row| row.iter().any(|cell| !cell.is_empty()))
        .filter(|row| !options.is_junk(&row.join(" ")))
        .collect()
}

fn split_header_body(rows: Vec<Vec<String>>) -> (Vec<Vec<String>>, Vec<Vec<String>>) {
    let mut section = Section::InHeader;
    let mut header = Vec::new();
    let mut body = Vec::new();

    for row in rows {
        if section == Section::InHeader && contains_period(&row.join(" ")) {
            section = Section::InBody;
        }
        match section {
            Section::InHeader => header.push(row),
            Section::InBody => body.push(row),
        }
    }

    (header, body)
}

fn header_cell(header_rows: &[Vec<String>], row: usize, index: usize) -> Option<&str> {
    header_rows[row]
        .get(index)
        .map(String::as_str)
        .filter(|cell| !cell.is_empty())
}

fn next_label_row(header_rows: &[Vec<String>], row: usize, index: usize) -> Option<usize> {
    (row + 1..header_rows.len()).find(|&below| header_cell(header_rows, below, index).is_some())
}

/// The column whose stacked fragments spell the period label, e.g. `Survey` over `Round`.
fn period_column(header_rows: &[Vec<String>], width: usize, period_label: &str) -> Option<usize> {
    (0..width).find(|&index| {
        let stacked = (0..header_rows.len())
            .filter_map(|row| header_cell(header_rows, row, index))
            .collect::<Vec<_>>()
            .join(" ");
        stacked.eq_ignore_ascii_case(period_label)
    })
}

/// A label printed once over several sub-labelled columns is repeated into
/// the empty cells to its right.
///
/// A target column takes the label only while its first label below is a
/// leaf on the same row as the group's own sub-label. The period column is
/// never a group.
fn spread_group_labels(
    header_rows: &[Vec<String>],
    width: usize,
    period_label: &str,
) -> Vec<Vec<String>> {
    let period = period_column(header_rows, width, period_label);
    let mut spread = header_rows
        .iter()
        .map(|row| {
            let mut row = row.clone();
            row.resize(width, String::new());
            row
        })
        .collect::<Vec<_>>();

    for (row_index, row) in header_rows.iter().enumerate() {
        for (index, label) in row.iter().enumerate() {
            if label.is_empty() || period == Some(index) {
                continue;
            }
            let Some(sub_row) = next_label_row(header_rows, row_index, index) else {
                continue;
            };
            for target in index + 1..width {
                let takes_group = header_cell(header_rows, row_index, target).is_none()
                    && next_label_row(header_rows, row_index, target) == Some(sub_row)
                    && next_label_row(header_rows, sub_row, target).is_none();
                if !takes_group {
                    break;
                }
                spread[row_index][target].clone_from(label);
            }
        }
    }
    spread
}

fn merge_header(header_rows: &[Vec<String>], width: usize, period_label: &str) -> Vec<String> {
    let mut merged = vec![String::new(); width];
    for row in spread_group_labels(header_rows, width, period_label) {
        for (index, cell) in row.iter().enumerate() {
            if !cell.is_empty() {
                merged[index] = format!("{} {cell}", merged[index]).trim().to_string();
            }
        }
    }
    merged
}

/// Merges all panels under one title into a single header and body.
///
/// Returns `None` when nothing survives cleaning. The result is not yet
/// pruned; see [`prune_empty_columns`].
pub(crate) fn consolidate_panels(
    title: &str,
    panels: &[Panel],
    options: &PipelineOptions,
    warnings: &mut Vec<ExtractWarning>,
) -> Option<NormalizedTable> {
    let rows = clean_rows(panels, options);
    if rows.is_empty() {
        return None;
    }

    let width = rows.iter().map(Vec::len).max().unwrap_or(0);
    let (mut header_rows, mut body) = split_header_body(rows);

    if body.is_empty() {
        // Keep the first row as the header and salvage the rest as data.
        warnings.push(
            ExtractWarning::new(
                WarningCode::PeriodPatternMissing,
                "no row matched the survey period pattern; rows after the first kept as data",
            )
            .with_table(title),
        );
        body = header_rows.split_off(1);
    }

    body.retain(|row| row.iter().skip(1).any(|cell| !cell.is_empty()));

    let mut header = merge_header(&header_rows, width, &options.period_label);
    if header.first().is_some_and(String::is_empty)
        && body
            .first()
            .and_then(|row| row.first())
            .is_some_and(|cell| contains_period(cell))
    {
        header[0].clone_from(&options.period_label);
    }

    debug!(
        title,
        header_rows = header_rows.len(),
        body_rows = body.len(),
        "consolidated table panels"
    );

    Some(NormalizedTable {
        title: title.to_string(),
        header,
        body,
    })
}

/// Drops columns that are empty in every body row, keeping a labelled first column.
///
/// Afterwards every body row has exactly as many cells as the header.
pub(crate) fn prune_empty_columns(table: NormalizedTable) -> NormalizedTable {
    let mut keep = (0..table.header.len())
        .filter(|&index| {
            table
                .body
                .iter()
                .any(|row| row.get(index).is_some_and(|cell| !cell.trim().is_empty()))
        })
        .collect::<Vec<_>>();
    if keep.first() != Some(&0) && table.header.first().is_some_and(|label| !label.is_empty()) {
        keep.insert(0, 0);
    }

    let header = keep
        .iter()
        .map(|&index| table.header[index].clone())
        .collect::<Vec<_>>();
    let body = table
        .body
        .iter()
        .map(|row| {
            keep.iter()
                .map(|&index| row.get(index).cloned().unwrap_or_default())
                .collect::<Vec<_>>()
        })
        .collect::<Vec<_>>();

    NormalizedTable {
        title: table.title,
        header,
        body,
    }
}

/// The combined perceptions-and-expectations table prints its labels across
/// too many fragments to merge reliably; when its shape is recognised the
/// known labels are used instead.
pub(crate) fn apply_canonical_header(mut table: NormalizedTable) -> NormalizedTable {
    if table.header.len() == CANONICAL_HEADER.len()
        && table.title.to_lowercase().contains(CANONICAL_TITLE_MARKER)
    {
        table.header = CANONICAL_HEADER.iter().map(ToString::to_string).collect();
    }
    table
}

/// Full consolidation: merge, prune, then canonicalise the header.
pub(crate) fn finalize_panels(
    title: &str,
    panels: &[Panel],
    options: &PipelineOptions,
    warnings: &mut Vec<ExtractWarning>,
) -> Option<NormalizedTable> {
    consolidate_panels(title, panels, options, warnings)
        .map(prune_empty_columns)
        .map(apply_canonical_header)
}
