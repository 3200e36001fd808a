//! Error types for tablemail runs.

use std::path::PathBuf;

use tablemail_pipe::PipeError;
use tablemail_select::SelectError;
use tablemail_template::TemplateSyntaxError;
use thiserror::Error;

/// The row source could not be reached. Nothing has been read.
#[derive(Debug, Error)]
pub enum ConnectError {
    #[error("database '{}' does not exist or is not a directory", .path.display())]
    NotFound { path: PathBuf },
    #[error("cannot open database '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A fetch was rejected or could not be completed.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("unknown table '{table}'")]
    UnknownTable { table: String },
    #[error("unknown column '{column}' in table '{table}'")]
    UnknownColumn { table: String, column: String },
    #[error("invalid pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
    #[error("cannot read table '{table}': {source}")]
    Csv {
        table: String,
        #[source]
        source: csv::Error,
    },
    #[error("cannot list tables: {0}")]
    Io(#[from] std::io::Error),
}

impl QueryError {
    /// Attaches the table name to a selection failure.
    pub fn from_select(table: &str, err: SelectError) -> Self {
        match err {
            SelectError::UnknownColumn { column } => QueryError::UnknownColumn {
                table: table.to_string(),
                column,
            },
            SelectError::InvalidPattern { pattern, source } => {
                QueryError::InvalidPattern { pattern, source }
            }
        }
    }
}

/// Delivery of one message failed. Recorded per recipient; the batch goes on.
#[derive(Debug, Error)]
pub enum SendError {
    #[error("invalid address '{address}'")]
    InvalidAddress { address: String },
    #[error("mailer command failed: {0}")]
    Command(#[from] PipeError),
    #[error("cannot write message: {0}")]
    Io(#[from] std::io::Error),
}

/// A failure that ends a run.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("template error: {0}")]
    Template(#[from] TemplateSyntaxError),
    #[error("no recipients: the address list is empty")]
    NoRecipients,
    #[error(transparent)]
    Connect(#[from] ConnectError),
    #[error(transparent)]
    Query(#[from] QueryError),
}
