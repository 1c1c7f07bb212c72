#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WarningCode {
    /// No data row matched the period pattern; rows after the first were kept as body.
    PeriodPatternMissing,
    /// The merged header has no period column, so the table cannot be reshaped.
    MissingPeriodColumn,
    /// Panels under a title produced no usable rows.
    EmptyPanels,
    /// Positioned text was unavailable; fell back to plain document text.
    TextFallback,
    NoTablesDetected,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExtractWarning {
    pub code: WarningCode,
    pub message: String,
    pub page: Option<u32>,
    pub table: Option<String>,
}

impl ExtractWarning {
    #[must_use]
    pub fn new(code: WarningCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            page: None,
            table: None,
        }
    }

    #[must_use]
    pub fn with_page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    #[must_use]
    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }
}
