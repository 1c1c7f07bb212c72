use tracing::debug;

use crate::model::{PageLayout, Panel, TitledPanels};
use crate::options::PipelineOptions;

enum LayoutItem<'a> {
    Title(&'a str),
    Table(&'a Panel),
}

/// Title lines and table regions of one page in reading order.
///
/// Titles are listed before tables so that, at equal `top`, a title still
/// precedes the table it introduces.
fn page_items<'a>(page: &'a PageLayout, options: &PipelineOptions) -> Vec<LayoutItem<'a>> {
    let mut items = page
        .text_lines
        .iter()
        .filter(|line| options.is_title_line(&line.text))
        .map(|line| (line.top, LayoutItem::Title(line.text.as_str())))
        .chain(
            page.tables
                .iter()
                .map(|table| (table.top(), LayoutItem::Table(&table.cells))),
        )
        .collect::<Vec<_>>();
    items.sort_by(|(left, _), (right, _)| left.total_cmp(right));
    items.into_iter().map(|(_, item)| item).collect()
}

/// Groups every table region under the nearest title line above it.
///
/// Tables that precede the first title fall under `options.default_title`.
pub fn locate_tables(pages: &[PageLayout], options: &PipelineOptions) -> Vec<TitledPanels> {
    let mut located = Vec::new();
    let mut title = options.default_title.clone();
    let mut panels: Vec<Panel> = Vec::new();

    for page in pages {
        for item in page_items(page, options) {
            match item {
                LayoutItem::Title(text) => {
                    if !panels.is_empty() {
                        located.push(TitledPanels {
                            title: std::mem::take(&mut title),
                            panels: std::mem::take(&mut panels),
                        });
                    }
                    title = text.trim().to_string();
                }
                LayoutItem::Table(cells) => panels.push(cells.clone()),
            }
        }
    }

    if !panels.is_empty() {
        located.push(TitledPanels { title, panels });
    }

    debug!(tables = located.len(), "located titled tables");
    located
}
