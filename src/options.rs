use std::collections::BTreeSet;
use std::str::FromStr;

use crate::error::ExtractError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSelection {
    pages: BTreeSet<u32>,
}

impl PageSelection {
    #[must_use]
    pub fn contains(&self, page: u32) -> bool {
        self.pages.contains(&page)
    }
}

impl FromStr for PageSelection {
    type Err = String;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let mut pages = BTreeSet::new();
        for token in input.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            if let Some((start, end)) = token.split_once('-') {
                let start: u32 = start
                    .trim()
                    .parse()
                    .map_err(|_| format!("invalid page range start: '{start}'"))?;
                let end: u32 = end
                    .trim()
                    .parse()
                    .map_err(|_| format!("invalid page range end: '{end}'"))?;
                if start == 0 || end == 0 {
                    return Err("pages are 1-based".to_string());
                }
                if end < start {
                    return Err(format!(
                        "invalid range '{token}': end is smaller than start"
                    ));
                }
                pages.extend(start..=end);
            } else {
                let page: u32 = token
                    .parse()
                    .map_err(|_| format!("invalid page number: '{token}'"))?;
                if page == 0 {
                    return Err("pages are 1-based".to_string());
                }
                pages.insert(page);
            }
        }

        if pages.is_empty() {
            return Err("page selection cannot be empty".to_string());
        }

        Ok(Self { pages })
    }
}

/// Every constant the extraction and normalization heuristics depend on.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOptions {
    pub pages: Option<PageSelection>,
    /// Minimum cells a layout line needs to count as a table row.
    pub min_cols: usize,
    /// Lines starting with this (case-insensitive) are table titles.
    pub title_marker: String,
    /// Title for tables that appear before any title line.
    pub default_title: String,
    /// Rows containing any of these (case-insensitive) are footnotes.
    pub junk_phrases: Vec<String>,
    pub period_label: String,
    pub current_phrase: String,
    pub ahead_phrase: String,
    pub net_response_label: String,
    pub default_category: String,
    /// Stored tables whose name starts with one of these are not normalized.
    pub skip_title_prefixes: Vec<String>,
    pub delimiter: u8,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            pages: None,
            min_cols: 2,
            title_marker: "table ".to_string(),
            default_title: "Summary based on Net Responses".to_string(),
            junk_phrases: vec![
                "percentage responses".to_string(),
                "applicable only for those respondents".to_string(),
            ],
            period_label: "Survey Round".to_string(),
            current_phrase: "Current Perception".to_string(),
            ahead_phrase: "One year ahead Expectation".to_string(),
            net_response_label: "Net Response".to_string(),
            default_category: "General".to_string(),
            skip_title_prefixes: vec!["summary".to_string()],
            delimiter: b',',
        }
    }
}

impl PipelineOptions {
    pub fn validate(&self) -> Result<(), ExtractError> {
        if self.min_cols < 2 {
            return Err(ExtractError::InvalidOption(
                "min_cols must be at least 2".to_string(),
            ));
        }
        if self.title_marker.trim().is_empty() {
            return Err(ExtractError::InvalidOption(
                "title marker cannot be empty".to_string(),
            ));
        }
        if self.period_label.is_empty() {
            return Err(ExtractError::InvalidOption(
                "period label cannot be empty".to_string(),
            ));
        }
        Ok(())
    }

    #[must_use]
    pub fn is_title_line(&self, text: &str) -> bool {
        text.to_lowercase()
            .starts_with(&self.title_marker.to_lowercase())
    }

    #[must_use]
    pub fn is_junk(&self, text: &str) -> bool {
        let lower = text.to_lowercase();
        self.junk_phrases
            .iter()
            .any(|phrase| lower.contains(&phrase.to_lowercase()))
    }
}
