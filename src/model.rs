use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A scalar extracted from a table region.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Number(f64),
    Empty,
}

impl Cell {
    /// Stringified and trimmed; empty cells become `""`.
    #[must_use]
    pub fn to_text(&self) -> String {
        match self {
            Self::Text(text) => text.trim().to_string(),
            Self::Number(value) => value.to_string(),
            Self::Empty => String::new(),
        }
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Cell {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextLine {
    pub top: f32,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BBox {
    pub x0: f32,
    pub top: f32,
    pub x1: f32,
    pub bottom: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableRegion {
    pub bbox: BBox,
    pub cells: Vec<Vec<Cell>>,
}

impl TableRegion {
    #[must_use]
    pub fn top(&self) -> f32 {
        self.bbox.top
    }
}

/// One page as seen by the table locator: positioned lines and table regions,
/// each in discovery order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PageLayout {
    pub page_number: u32,
    pub text_lines: Vec<TextLine>,
    pub tables: Vec<TableRegion>,
}

pub type Panel = Vec<Vec<Cell>>;

#[derive(Debug, Clone, PartialEq)]
pub struct TitledPanels {
    pub title: String,
    pub panels: Vec<Panel>,
}

/// One merged table: a single header row and rows aligned to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedTable {
    pub title: String,
    pub header: Vec<String>,
    pub body: Vec<Vec<String>>,
}

/// A table as read back from a sink, with the name it was stored under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedTable {
    pub name: String,
    pub table: NormalizedTable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Horizon {
    #[serde(rename = "Current Perception")]
    Current,
    #[serde(rename = "One year ahead Expectation")]
    OneYearAhead,
    #[serde(rename = "Net Response")]
    NetResponse,
}

impl Horizon {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Current => "Current Perception",
            Self::OneYearAhead => "One year ahead Expectation",
            Self::NetResponse => "Net Response",
        }
    }
}

impl fmt::Display for Horizon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One survey response percentage in long format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub survey_round: NaiveDate,
    pub perception_category: String,
    pub perception_type: Horizon,
    pub response_category: String,
    pub response_percentage: f64,
}
