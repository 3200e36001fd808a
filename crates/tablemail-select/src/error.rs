//! Error types for the select crate.

use thiserror::Error;

/// Errors that can occur when executing a selection against rows.
#[derive(Debug, Error)]
pub enum SelectError {
    /// A criterion, sort key or column list names a column the table lacks.
    #[error("unknown column '{column}'")]
    UnknownColumn { column: String },

    /// A LIKE pattern could not be compiled.
    #[error("invalid LIKE pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// Result type for select operations.
pub type Result<T> = std::result::Result<T, SelectError>;
