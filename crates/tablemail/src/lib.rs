//! Mail merge over table rows.
//!
//! `tablemail` selects rows from a table, renders each one through a small
//! conditional template, and either prints the rendered rows as a report or
//! mails one message per row and address.
//!
//! The pieces:
//!
//! - [`tablemail_template`]: the template language (`{$col}`, `{?col a!!b}`)
//! - [`tablemail_select`]: selection criteria, LIKE matching, paging
//! - [`source`]: the [`RowSource`] / [`Connection`] seam, and
//!   [`CsvRowSource`] for a directory of CSV files
//! - [`mailer`]: the [`Mailer`] seam with stdout and shell-command mailers
//! - [`orchestrator`]: report and mail runs
//! - [`config`], [`cli`], [`viewer`]: the front ends
//!
//! # Quick Start
//!
//! ```rust
//! use tablemail::{MailJob, MemoryRowSource, Orchestrator, Recipients, Selection, StdoutMailer};
//! use tablemail_select::{Row, RowSet};
//!
//! let source = MemoryRowSource::new().with_table(
//!     "members",
//!     RowSet::new(
//!         vec!["name".into(), "email".into()],
//!         vec![Row::from_pairs([("name", "Ada"), ("email", "ada@example.com")])],
//!     ),
//! );
//!
//! let mut selection = Selection::new("members");
//! selection.row_template = Some("Dear {$name},\nyour dues are due.".into());
//! let job = MailJob {
//!     selection,
//!     recipients: Recipients::Column("email".into()),
//!     subject: Some("Dues for {$name}".into()),
//! };
//!
//! let mut mailer = StdoutMailer::new(Vec::new(), None);
//! let summary = Orchestrator::new(&source).mail(&job, &mut mailer).unwrap();
//! assert_eq!(summary.sent, 1);
//!
//! let printed = String::from_utf8(mailer.into_inner()).unwrap();
//! assert!(printed.starts_with("To: ada@example.com\nSubject: Dues for Ada\n"));
//! ```

pub mod cli;
pub mod config;
pub mod csv_source;
pub mod error;
pub mod mailer;
pub mod orchestrator;
pub mod source;
pub mod viewer;

pub use config::{ConfigError, Options, UsageError};
pub use csv_source::{CsvConnection, CsvRowSource};
pub use error::{ConnectError, QueryError, RunError, SendError};
pub use mailer::{CommandMailer, Mailer, Message, StdoutMailer};
pub use orchestrator::{
    FailedSend, MailJob, MailSummary, Orchestrator, Recipients, ReportPage, RunState, Selection,
};
pub use source::{open, Connection, ConnectionGuard, MemoryConnection, MemoryRowSource, RowSource};
pub use viewer::{Route, ViewError};
