use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("table manifest error: {0}")]
    Manifest(#[from] serde_json::Error),

    #[error("failed to load PDF: {0}")]
    PdfLoad(#[from] lopdf::Error),

    #[error("invalid option: {0}")]
    InvalidOption(String),

    #[error("no pages available after applying selection")]
    NoPagesSelected,

    #[error("stored table '{name}' is malformed: {reason}")]
    MalformedTable { name: String, reason: String },
}

/// A document that could not be extracted; the rest of the batch carries on.
#[derive(Debug)]
pub struct DocumentFailure {
    pub source: String,
    pub error: ExtractError,
}
