use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

use crate::model::Cell;

static MONTH_YEAR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:Jan|Feb|Mar|Apr|May|Jun|Jul|Aug|Sep|Oct|Nov|Dec)-\d{2}\b")
        .expect("hardcoded month-year regex is valid")
});

/// True when `text` contains a survey period label such as `May-25`.
pub(crate) fn contains_period(text: &str) -> bool {
    MONTH_YEAR_RE.is_match(text)
}

/// Parses a `Mon-YY` label into the first day of that month.
///
/// The surveys have no day granularity, so the day is always 1.
#[must_use]
pub fn parse_period(label: &str) -> Option<NaiveDate> {
    let label = label.trim();
    let (month, year) = label.split_once('-')?;
    if month.len() != 3 || year.len() != 2 || !year.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    NaiveDate::parse_from_str(&format!("01-{month}-{year}"), "%d-%b-%y").ok()
}

/// Like [`parse_period`], but for raw cells; only text cells can hold a period.
#[must_use]
pub fn parse_period_cell(cell: &Cell) -> Option<NaiveDate> {
    match cell {
        Cell::Text(text) => parse_period(text),
        Cell::Number(_) | Cell::Empty => None,
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::{contains_period, parse_period, parse_period_cell};
    use crate::model::Cell;

    #[test]
    fn normalizes_to_first_of_month() {
        assert_eq!(parse_period("May-25"), NaiveDate::from_ymd_opt(2025, 5, 1));
        assert_eq!(parse_period("Dec-99"), NaiveDate::from_ymd_opt(1999, 12, 1));
        assert_eq!(parse_period("jan-24"), NaiveDate::from_ymd_opt(2024, 1, 1));
    }

    #[test]
    fn rejects_non_period_labels() {
        assert_eq!(parse_period("garbage"), None);
        assert_eq!(parse_period("May 25"), None);
        assert_eq!(parse_period("May-2025"), None);
        assert_eq!(parse_period("Foo-25"), None);
        assert_eq!(parse_period(""), None);
    }

    #[test]
    fn rejects_non_text_cells() {
        assert_eq!(parse_period_cell(&Cell::Number(123.0)), None);
        assert_eq!(parse_period_cell(&Cell::Empty), None);
        assert_eq!(
            parse_period_cell(&Cell::from("Jun-25")),
            NaiveDate::from_ymd_opt(2025, 6, 1)
        );
    }

    #[test]
    fn detects_period_inside_joined_row() {
        assert!(contains_period("Mar-24 40.1 35.2"));
        assert!(!contains_period("March 2024"));
        assert!(!contains_period("Current Perception -Increased"));
    }
}
