use thiserror::Error;

/// Failure of a single scoring round-trip.
#[derive(Debug, Error)]
pub enum ScoringError {
    #[error("scoring transport error: {0}")]
    Transport(String),
    #[error("scoring endpoint returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("malformed scoring response: {0}")]
    Malformed(String),
    #[error("scoring returned {actual} transactions for a batch of {expected}")]
    CountMismatch { expected: usize, actual: usize },
}

/// Everything that can end a bulk upload. Every variant is terminal for the
/// current attempt.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("Please select a valid CSV file.")]
    NotCsv,
    #[error("File size too large ({size} bytes). Please select a file smaller than {limit} bytes.")]
    TooLarge { size: u64, limit: u64 },
    #[error("CSV file is empty or no valid data rows found")]
    NoRows,
    #[error("CSV parsing failed: {0}")]
    Parse(String),
    #[error("Batch {batch}/{batches} failed: {source}")]
    BatchFailed {
        /// 1-based index of the failing batch.
        batch: usize,
        batches: usize,
        #[source]
        source: ScoringError,
    },
}

impl UploadError {
    /// Input errors are detected before any scoring starts.
    pub fn is_input_error(&self) -> bool {
        matches!(self, Self::NotCsv | Self::TooLarge { .. } | Self::NoRows)
    }
}

impl From<csv::Error> for UploadError {
    fn from(e: csv::Error) -> Self {
        Self::Parse(e.to_string())
    }
}

/// Rejected single-transaction submission.
#[derive(Debug, Error)]
#[error("missing required fields: {}", missing.join(", "))]
pub struct ValidationError {
    pub missing: Vec<&'static str>,
}

#[derive(Debug, Error)]
pub enum ReviewError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("failed to record review: {0}")]
    Storage(String),
}
