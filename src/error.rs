// ⚠️ Error types
// Ingestion failures collapse to one user-facing message; analysis errors are shown as-is

use thiserror::Error;

/// The only text an end user ever sees for a bad upload.
pub const UPLOAD_ERROR_MESSAGE: &str = "There was an error processing this file.";

/// Everything that can go wrong turning an upload into a [`TransactionTable`].
///
/// The variants exist for logs and tests. Callers facing a user should show
/// [`IngestError::user_message`] instead of the `Display` text.
///
/// [`TransactionTable`]: crate::ledger::TransactionTable
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("upload is not valid UTF-8: {0}")]
    Encoding(#[from] std::str::Utf8Error),

    #[error("malformed CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error("line {line}: amount {value:?} is not numeric")]
    InvalidAmount { line: usize, value: String },

    #[error("line {line}: date {value:?} is not a recognized date")]
    InvalidDate { line: usize, value: String },

    #[error("unreadable workbook: {0}")]
    Workbook(#[from] calamine::Error),

    #[error("upload contains no transactions")]
    Empty,
}

impl IngestError {
    pub fn user_message(&self) -> &'static str {
        UPLOAD_ERROR_MESSAGE
    }
}

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("ranked must be between 1 and 10, got {0}")]
    InvalidRanking(usize),

    #[error("unknown analysis type: {0}")]
    UnknownAnalysis(String),

    #[error("classifier: {0}")]
    Classifier(String),
}
