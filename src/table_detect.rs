use crate::model::{BBox, Cell, PageLayout, TableRegion, TextLine};
use crate::options::PipelineOptions;
use crate::pdf_reader::{PageLines, PositionedLine};
use crate::table_parse::{looks_like_sentence, soft_split_line_into_cells, split_line_into_cells};

const MIN_TABLE_ROWS: usize = 2;
const MAX_PARTIAL_ROW_CHARS: usize = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RowKind {
    Full,
    /// A single-cell line, such as a label spanning several columns.
    Partial,
    Break,
}

#[derive(Debug, Clone)]
struct CandidateRow {
    top: f32,
    cells: Vec<String>,
    /// One x per cell when each cell was positioned on its own.
    xs: Option<Vec<f32>>,
    x_range: (f32, f32),
}

fn line_cells(line: &PositionedLine) -> (Vec<String>, Option<Vec<f32>>) {
    let mut cells = Vec::new();
    let mut xs = Vec::new();
    let mut one_cell_per_segment = true;

    for segment in &line.segments {
        let segment_cells = split_line_into_cells(&segment.text);
        if segment_cells.len() > 1 {
            one_cell_per_segment = false;
        }
        xs.extend(std::iter::repeat_n(segment.x, segment_cells.len()));
        cells.extend(segment_cells);
    }

    (cells, one_cell_per_segment.then_some(xs))
}

fn classify(line: &PositionedLine, options: &PipelineOptions) -> (RowKind, CandidateRow) {
    let text = line.text();
    let (mut cells, mut xs) = line_cells(line);

    if cells.len() < options.min_cols {
        let soft_cells = soft_split_line_into_cells(&text);
        let has_numeric = soft_cells
            .iter()
            .any(|cell| cell.chars().any(|ch| ch.is_ascii_digit()));
        if soft_cells.len() >= options.min_cols && !looks_like_sentence(&text) && has_numeric {
            cells = soft_cells;
            xs = None;
        }
    }

    let kind = if options.is_title_line(&text) {
        RowKind::Break
    } else if cells.len() >= options.min_cols {
        RowKind::Full
    } else if cells.len() == 1
        && !looks_like_sentence(&text)
        && text.chars().count() <= MAX_PARTIAL_ROW_CHARS
    {
        RowKind::Partial
    } else {
        RowKind::Break
    };

    let x_range = line.segments.iter().fold((f32::MAX, f32::MIN), |(lo, hi), segment| {
        (lo.min(segment.x), hi.max(segment.x))
    });

    (
        kind,
        CandidateRow {
            top: line.top,
            cells,
            xs,
            x_range,
        },
    )
}

fn nearest_anchor(anchors: &[f32], x: f32) -> usize {
    anchors
        .iter()
        .enumerate()
        .min_by(|(_, left), (_, right)| (*left - x).abs().total_cmp(&(*right - x).abs()))
        .map_or(0, |(index, _)| index)
}

/// Places cells of narrower rows under the columns of the widest positioned row.
fn align_row(row: &CandidateRow, anchors: &[f32]) -> Vec<Cell> {
    let to_cell = |text: &String| {
        if text.is_empty() {
            Cell::Empty
        } else {
            Cell::Text(text.clone())
        }
    };
    let sequential = || row.cells.iter().map(to_cell).collect::<Vec<_>>();

    let Some(xs) = row.xs.as_ref().filter(|_| row.cells.len() < anchors.len()) else {
        return sequential();
    };

    let mut aligned = vec![Cell::Empty; anchors.len()];
    for (text, x) in row.cells.iter().zip(xs) {
        let slot = &mut aligned[nearest_anchor(anchors, *x)];
        if *slot != Cell::Empty {
            return sequential();
        }
        *slot = to_cell(text);
    }
    aligned
}

fn build_region(rows: &[CandidateRow]) -> TableRegion {
    let anchors = rows
        .iter()
        .filter_map(|row| row.xs.as_ref())
        .max_by_key(|xs| xs.len())
        .cloned()
        .unwrap_or_default();

    let x0 = rows.iter().map(|row| row.x_range.0).fold(f32::MAX, f32::min);
    let x1 = rows.iter().map(|row| row.x_range.1).fold(f32::MIN, f32::max);
    let top = rows.first().map_or(0.0, |row| row.top);
    let bottom = rows.last().map_or(top, |row| row.top);

    TableRegion {
        bbox: BBox { x0, top, x1, bottom },
        cells: rows.iter().map(|row| align_row(row, &anchors)).collect(),
    }
}

fn flush_run(run: &mut Vec<(RowKind, CandidateRow)>, tables: &mut Vec<TableRegion>) {
    let full_rows = run.iter().filter(|(kind, _)| *kind == RowKind::Full).count();
    if full_rows >= MIN_TABLE_ROWS {
        let rows = run.drain(..).map(|(_, row)| row).collect::<Vec<_>>();
        tables.push(build_region(&rows));
    }
    run.clear();
}

fn detect_tables_in_page(page: &PageLines, options: &PipelineOptions) -> Vec<TableRegion> {
    let mut tables = Vec::new();
    let mut run = Vec::new();

    for line in &page.lines {
        let (kind, row) = classify(line, options);
        if kind == RowKind::Break {
            flush_run(&mut run, &mut tables);
        } else {
            run.push((kind, row));
        }
    }
    flush_run(&mut run, &mut tables);

    tables
}

/// Builds the locator's view of a page: every text line, plus table regions.
pub(crate) fn layout_page(page: &PageLines, options: &PipelineOptions) -> PageLayout {
    PageLayout {
        page_number: page.page_number,
        text_lines: page
            .lines
            .iter()
            .map(|line| TextLine {
                top: line.top,
                text: line.text(),
            })
            .collect(),
        tables: detect_tables_in_page(page, options),
    }
}
