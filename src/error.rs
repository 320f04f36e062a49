//! Error types for ingestion and aggregation.

use thiserror::Error;

/// Errors raised while reading evaluation records or computing statistics.
#[derive(Debug, Error)]
pub enum PoseStatError {
    /// A tag does not have the expected number of distinct systems.
    #[error("tag '{tag}' has {actual} unique systems, expected {expected}")]
    DataIntegrity {
        tag: String,
        expected: usize,
        actual: usize,
    },

    /// A row could not be turned into a record.
    #[error("line {line}: {reason} (row: {content})")]
    Parse {
        line: u64,
        content: String,
        reason: String,
    },

    /// Configuration or argument values that cannot be used.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, PoseStatError>;
