use std::collections::BTreeMap;
use std::path::Path;

use encoding_rs::UTF_16BE;
use lopdf::content::Content;
use lopdf::{Document, Object, ObjectId};
use tracing::{debug, warn};

use crate::error::ExtractError;
use crate::options::PageSelection;
use crate::warning::{ExtractWarning, WarningCode};

const DEFAULT_PAGE_HEIGHT: f32 = 842.0;
const SAME_LINE_TOLERANCE: f32 = 2.0;
const FALLBACK_LINE_HEIGHT: f32 = 12.0;

/// A separately positioned run of text on a line.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct TextSegment {
    pub x: f32,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct PositionedLine {
    pub top: f32,
    pub segments: Vec<TextSegment>,
}

impl PositionedLine {
    pub(crate) fn text(&self) -> String {
        self.segments
            .iter()
            .map(|segment| segment.text.trim())
            .filter(|text| !text.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct PageLines {
    pub page_number: u32,
    pub lines: Vec<PositionedLine>,
}

fn split_text_into_pages(raw_text: &str) -> Vec<String> {
    let mut pages = raw_text
        .split('\u{000C}')
        .map(str::to_string)
        .collect::<Vec<_>>();
    if pages.last().is_some_and(String::is_empty) {
        pages.pop();
    }
    pages
}

fn looks_decoding_broken(text: &str) -> bool {
    let total = text.chars().count();
    if total == 0 {
        return false;
    }
    if text.contains("?Identity-H Unimplemented?") {
        return true;
    }

    let suspicious = text
        .chars()
        .filter(|ch| *ch == '\u{FFFD}' || (ch.is_control() && !matches!(ch, '\n' | '\r' | '\t')))
        .count();
    suspicious * 5 > total
}

fn decode_pdf_bytes(encoding: Option<&str>, bytes: &[u8]) -> String {
    let decoded = Document::decode_text(encoding, bytes);
    if !looks_decoding_broken(&decoded) {
        return decoded;
    }

    let utf16_hint = bytes.starts_with(&[0xFE, 0xFF])
        || encoding.is_some_and(|name| {
            let lower = name.to_ascii_lowercase();
            ["utf16", "ucs2", "identity-h", "unicode"]
                .iter()
                .any(|marker| lower.contains(marker))
        });
    if utf16_hint {
        let payload = bytes.strip_prefix(&[0xFE, 0xFF]).unwrap_or(bytes);
        let (utf16, had_errors) = UTF_16BE.decode_without_bom_handling(payload);
        if !had_errors && !utf16.is_empty() {
            return utf16.into_owned();
        }
    }

    String::from_utf8_lossy(bytes).to_string()
}

fn number(object: &Object) -> Option<f32> {
    match object {
        #[allow(clippy::cast_precision_loss)]
        Object::Integer(value) => Some(*value as f32),
        #[allow(clippy::unnecessary_cast)]
        Object::Real(value) => Some(*value as f32),
        _ => None,
    }
}

fn numbers(operands: &[Object]) -> Vec<f32> {
    operands.iter().filter_map(number).collect()
}

fn resolve<'a>(document: &'a Document, object: &'a Object) -> Option<&'a Object> {
    match object {
        Object::Reference(id) => document.get_object(*id).ok(),
        other => Some(other),
    }
}

/// Height of the page's `MediaBox`, which may be inherited from a parent node.
fn page_height(document: &Document, page_id: ObjectId) -> f32 {
    let mut node = document.get_object(page_id).ok();
    while let Some(dict) = node.and_then(|object| object.as_dict().ok()) {
        if let Some(bounds) = dict
            .get(b"MediaBox")
            .ok()
            .and_then(|object| resolve(document, object))
            .and_then(|object| object.as_array().ok())
            .map(|items| numbers(items))
            .filter(|values| values.len() == 4)
        {
            return (bounds[3] - bounds[1]).abs();
        }
        node = dict
            .get(b"Parent")
            .ok()
            .and_then(|parent| parent.as_reference().ok())
            .and_then(|id| document.get_object(id).ok());
    }
    DEFAULT_PAGE_HEIGHT
}

fn collect_text(text: &mut String, encoding: Option<&str>, operands: &[Object]) {
    for operand in operands {
        match operand {
            Object::String(bytes, _) => text.push_str(&decode_pdf_bytes(encoding, bytes)),
            Object::Array(items) => collect_text(text, encoding, items),
            // Large negative kerning inside TJ is a visual word gap.
            other => {
                if number(other).is_some_and(|offset| offset < -100.0) {
                    text.push(' ');
                }
            }
        }
    }
}

/// Text position tracking, translations only; scaling and rotation are ignored.
#[derive(Debug, Default)]
struct TextCursor {
    ctm: (f32, f32),
    saved: Vec<(f32, f32)>,
    line: (f32, f32),
    leading: f32,
    moved: bool,
}

impl TextCursor {
    fn translate_line(&mut self, tx: f32, ty: f32) {
        self.line.0 += tx;
        self.line.1 += ty;
        self.moved = true;
    }

    fn next_line(&mut self) {
        self.translate_line(0.0, -self.leading);
    }

    fn position(&self) -> (f32, f32) {
        (self.ctm.0 + self.line.0, self.ctm.1 + self.line.1)
    }
}

#[derive(Debug, Default)]
struct LineBuilder {
    height: f32,
    lines: Vec<PositionedLine>,
}

impl LineBuilder {
    fn push(&mut self, cursor: &mut TextCursor, text: String) {
        if text.is_empty() {
            return;
        }
        let (x, y) = cursor.position();
        let top = self.height - y;
        let moved = std::mem::replace(&mut cursor.moved, false);

        if let Some(line) = self.lines.last_mut() {
            if !moved {
                if let Some(segment) = line.segments.last_mut() {
                    segment.text.push_str(&text);
                }
                return;
            }
            if (line.top - top).abs() <= SAME_LINE_TOLERANCE {
                line.segments.push(TextSegment { x, text });
                return;
            }
        }
        self.lines.push(PositionedLine {
            top,
            segments: vec![TextSegment { x, text }],
        });
    }

    /// Lines sorted top to bottom, with runs on the same baseline joined left to right.
    fn finish(mut self) -> Vec<PositionedLine> {
        self.lines
            .retain(|line| line.segments.iter().any(|segment| !segment.text.trim().is_empty()));
        self.lines.sort_by(|left, right| left.top.total_cmp(&right.top));

        let mut merged: Vec<PositionedLine> = Vec::new();
        for line in self.lines {
            if let Some(last) = merged.last_mut()
                && (last.top - line.top).abs() <= SAME_LINE_TOLERANCE
            {
                last.segments.extend(line.segments);
                continue;
            }
            merged.push(line);
        }
        for line in &mut merged {
            line.segments.sort_by(|left, right| left.x.total_cmp(&right.x));
        }
        merged
    }
}

fn extract_positioned_lines(document: &Document, page_id: ObjectId) -> Vec<PositionedLine> {
    let Some(content) = document
        .get_page_content(page_id)
        .ok()
        .and_then(|raw| Content::decode(&raw).ok())
    else {
        return Vec::new();
    };
    let encodings = document
        .get_page_fonts(page_id)
        .into_iter()
        .map(|(name, font)| (name, font.get_font_encoding()))
        .collect::<BTreeMap<Vec<u8>, &str>>();

    let mut cursor = TextCursor::default();
    let mut builder = LineBuilder {
        height: page_height(document, page_id),
        lines: Vec::new(),
    };
    let mut current_encoding = None;

    for operation in content.operations {
        let operands = &operation.operands;
        match operation.operator.as_str() {
            "q" => cursor.saved.push(cursor.ctm),
            "Q" => cursor.ctm = cursor.saved.pop().unwrap_or_default(),
            "cm" => {
                if let &[_, _, _, _, e, f] = numbers(operands).as_slice() {
                    cursor.ctm.0 += e;
                    cursor.ctm.1 += f;
                    cursor.moved = true;
                }
            }
            "BT" => {
                cursor.line = (0.0, 0.0);
                cursor.moved = true;
            }
            "Tf" => {
                if let Some(font_name) = operands.first().and_then(|operand| operand.as_name().ok())
                {
                    current_encoding = encodings.get(font_name).copied();
                }
            }
            "TL" => {
                if let Some(leading) = operands.first().and_then(number) {
                    cursor.leading = leading;
                }
            }
            "Td" | "TD" => {
                if let &[tx, ty] = numbers(operands).as_slice() {
                    if operation.operator == "TD" {
                        cursor.leading = -ty;
                    }
                    cursor.translate_line(tx, ty);
                }
            }
            "Tm" => {
                if let &[_, _, _, _, e, f] = numbers(operands).as_slice() {
                    cursor.line = (e, f);
                    cursor.moved = true;
                }
            }
            "T*" => cursor.next_line(),
            "Tj" | "TJ" => {
                let mut text = String::new();
                collect_text(&mut text, current_encoding, operands);
                builder.push(&mut cursor, text);
            }
            "'" | "\"" => {
                cursor.next_line();
                if let Some(operand) = operands.last() {
                    let mut text = String::new();
                    collect_text(&mut text, current_encoding, std::slice::from_ref(operand));
                    builder.push(&mut cursor, text);
                }
            }
            _ => {}
        }
    }

    builder.finish()
}

fn fallback_lines(text: &str) -> Vec<PositionedLine> {
    text.lines()
        .filter(|line| !line.trim().is_empty())
        .enumerate()
        .map(|(index, line)| {
            #[allow(clippy::cast_precision_loss)]
            let top = index as f32 * FALLBACK_LINE_HEIGHT;
            PositionedLine {
                top,
                segments: vec![TextSegment {
                    x: 0.0,
                    text: line.to_string(),
                }],
            }
        })
        .collect()
}

fn collect_pages(
    document: &Document,
    page_selection: Option<&PageSelection>,
    fallback_text: impl FnOnce() -> Option<String>,
    warnings: &mut Vec<ExtractWarning>,
) -> Result<Vec<PageLines>, ExtractError> {
    let pages_map = document.get_pages();
    let mut pages = pages_map
        .iter()
        .filter(|(page_no, _)| page_selection.is_none_or(|selection| selection.contains(**page_no)))
        .map(|(page_no, page_id)| PageLines {
            page_number: *page_no,
            lines: extract_positioned_lines(document, *page_id),
        })
        .collect::<Vec<_>>();

    if pages.is_empty() {
        return Err(ExtractError::NoPagesSelected);
    }

    if pages.iter().all(|page| page.lines.is_empty()) {
        let Some(text) = fallback_text().filter(|text| !text.trim().is_empty()) else {
            debug!("document has no extractable text");
            return Ok(pages);
        };
        warn!("no positioned text found; falling back to plain document text");
        apply_fallback_text(&mut pages, pages_map.len(), &text, warnings);
    }

    Ok(pages)
}

/// Fills pages from plain document text, page by page when the form feeds
/// line up with the page count, otherwise all on the first selected page.
fn apply_fallback_text(
    pages: &mut [PageLines],
    total_pages: usize,
    text: &str,
    warnings: &mut Vec<ExtractWarning>,
) {
    let text_pages = split_text_into_pages(text);
    let per_page = text_pages.len() == total_pages;

    for (position, page) in pages.iter_mut().enumerate() {
        let page_text = if per_page {
            let index = usize::try_from(page.page_number.saturating_sub(1)).unwrap_or(0);
            text_pages.get(index).map(String::as_str)
        } else if position == 0 {
            Some(text)
        } else {
            None
        };
        let Some(page_text) = page_text else {
            continue;
        };

        page.lines = fallback_lines(page_text);
        warnings.push(
            ExtractWarning::new(
                WarningCode::TextFallback,
                "no positioned text found; table positions are approximate",
            )
            .with_page(page.page_number),
        );
    }
}

pub(crate) fn read_pdf_pages(
    input_pdf: &Path,
    page_selection: Option<&PageSelection>,
    warnings: &mut Vec<ExtractWarning>,
) -> Result<Vec<PageLines>, ExtractError> {
    let document = Document::load(input_pdf)?;
    collect_pages(
        &document,
        page_selection,
        || pdf_extract::extract_text(input_pdf).ok(),
        warnings,
    )
}

pub(crate) fn read_pdf_pages_from_bytes(
    input_pdf: &[u8],
    page_selection: Option<&PageSelection>,
    warnings: &mut Vec<ExtractWarning>,
) -> Result<Vec<PageLines>, ExtractError> {
    let document = Document::load_mem(input_pdf)?;
    collect_pages(
        &document,
        page_selection,
        || pdf_extract::extract_text_from_mem(input_pdf).ok(),
        warnings,
    )
}

#[cfg(test)]
mod tests {
    use super::{
        LineBuilder, PageLines, TextCursor, apply_fallback_text, decode_pdf_bytes, fallback_lines,
        split_text_into_pages,
    };
    use crate::warning::WarningCode;

    #[test]
    fn splits_form_feed_delimited_pages() {
        let pages = split_text_into_pages("p1\u{000C}p2\u{000C}");
        assert_eq!(pages, vec!["p1", "p2"]);
    }

    #[test]
    fn decodes_utf16_strings_with_bom() {
        let bytes = [0xFE, 0xFF, 0x00, 0x4D, 0x00, 0x61, 0x00, 0x79];
        assert_eq!(decode_pdf_bytes(None, &bytes), "May");
    }

    #[test]
    fn joins_runs_on_one_baseline_and_orders_lines_top_down() {
        let mut cursor = TextCursor::default();
        let mut builder = LineBuilder {
            height: 800.0,
            lines: Vec::new(),
        };

        cursor.line = (300.0, 700.0);
        cursor.moved = true;
        builder.push(&mut cursor, "40".to_string());
        cursor.line = (50.0, 720.0);
        cursor.moved = true;
        builder.push(&mut cursor, "Survey".to_string());
        builder.push(&mut cursor, " Round".to_string());
        cursor.line = (50.0, 700.0);
        cursor.moved = true;
        builder.push(&mut cursor, "May-25".to_string());

        let lines = builder.finish();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].top, 80.0);
        assert_eq!(lines[0].text(), "Survey Round");
        assert_eq!(lines[1].text(), "May-25 40");
        assert_eq!(lines[1].segments[0].x, 50.0);
    }

    #[test]
    fn fallback_lines_are_spaced_in_reading_order() {
        let lines = fallback_lines("Table 1: Perceptions on Income\n\nMay-25  40  35\n");
        assert_eq!(lines.len(), 2);
        assert!(lines[0].top < lines[1].top);
        assert_eq!(lines[1].segments[0].text, "May-25  40  35");
    }

    #[test]
    fn fallback_text_warnings_name_their_page() {
        let mut pages = vec![
            PageLines {
                page_number: 2,
                lines: Vec::new(),
            },
            PageLines {
                page_number: 3,
                lines: Vec::new(),
            },
        ];
        let mut warnings = Vec::new();
        apply_fallback_text(&mut pages, 3, "one\u{000C}two  2\u{000C}three  3\u{000C}", &mut warnings);

        assert_eq!(pages[0].lines[0].text(), "two  2");
        assert_eq!(pages[1].lines[0].text(), "three  3");
        let tagged = warnings
            .iter()
            .map(|warning| (warning.code.clone(), warning.page))
            .collect::<Vec<_>>();
        assert_eq!(
            tagged,
            vec![
                (WarningCode::TextFallback, Some(2)),
                (WarningCode::TextFallback, Some(3))
            ]
        );
    }

    #[test]
    fn unaligned_fallback_text_goes_to_first_selected_page() {
        let mut pages = vec![
            PageLines {
                page_number: 1,
                lines: Vec::new(),
            },
            PageLines {
                page_number: 2,
                lines: Vec::new(),
            },
        ];
        let mut warnings = Vec::new();
        apply_fallback_text(&mut pages, 2, "only one page of text", &mut warnings);

        assert_eq!(pages[0].lines.len(), 1);
        assert!(pages[1].lines.is_empty());
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].page, Some(1));
    }
}
