//! Report and mail runs.
//!
//! An [`Orchestrator`] performs one run against a [`RowSource`]: connect,
//! fetch one page of rows, render each row, then either join the rendered
//! rows into a report or dispatch one message per (row, address) pair.
//!
//! ```text
//! Idle -> Connected -> (Fetching -> Rendering -> Dispatching)* -> Disconnected
//!      \-> Aborted (connect failed)
//! ```
//!
//! Template, connect and query errors end the run. Send failures are
//! recorded in the [`MailSummary`] and the batch continues.

use std::fmt;

use tablemail_select::{Columns, PageWindow, RowSet, SelectionCriteria};
use tablemail_template::{Template, DEFAULT_DELIMITER};
use tracing::{debug, info, warn};

use crate::error::{ConnectError, QueryError, RunError, SendError};
use crate::mailer::Mailer;
use crate::source::{open, Connection, ConnectionGuard, RowSource};

/// Rows of a report are joined with this unless told otherwise.
pub const DEFAULT_ROW_SEPARATOR: &str = "\n";

/// Where a run is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Connected,
    Fetching,
    Rendering,
    Dispatching,
    Disconnected,
    Aborted,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunState::Idle => "idle",
            RunState::Connected => "connected",
            RunState::Fetching => "fetching",
            RunState::Rendering => "rendering",
            RunState::Dispatching => "dispatching",
            RunState::Disconnected => "disconnected",
            RunState::Aborted => "aborted",
        };
        f.write_str(name)
    }
}

/// What to select and how to render it. Shared by both run modes.
#[derive(Debug, Clone)]
pub struct Selection {
    pub table: String,
    /// Columns for the default row template; empty means all.
    pub show: Vec<String>,
    pub criteria: SelectionCriteria,
    pub window: PageWindow,
    /// Replaces the default row template when set.
    pub row_template: Option<String>,
    /// Joins columns in the default row template.
    pub field_separator: String,
}

impl Selection {
    pub fn new(table: impl Into<String>) -> Self {
        Selection {
            table: table.into(),
            show: Vec::new(),
            criteria: SelectionCriteria::new(),
            window: PageWindow::unbounded(),
            row_template: None,
            field_separator: DEFAULT_DELIMITER.to_string(),
        }
    }

    fn compile_row_template(&self) -> Result<Option<Template>, RunError> {
        Ok(self
            .row_template
            .as_deref()
            .map(Template::compile)
            .transpose()?)
    }

    fn default_template(&self, fetched: &RowSet) -> Template {
        if self.show.is_empty() {
            Template::synthesize(&fetched.columns, &self.field_separator)
        } else {
            Template::synthesize(&self.show, &self.field_separator)
        }
    }

    fn require_shown(&self, fetched: &RowSet) -> Result<(), QueryError> {
        require_columns(&self.table, fetched, self.show.iter().map(String::as_str))
    }
}

fn require_columns<'a>(
    table: &str,
    fetched: &RowSet,
    names: impl IntoIterator<Item = &'a str>,
) -> Result<(), QueryError> {
    for name in names {
        if !fetched.columns.iter().any(|c| c == name) {
            return Err(QueryError::UnknownColumn {
                table: table.to_string(),
                column: name.to_string(),
            });
        }
    }
    Ok(())
}

/// A rendered report page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportPage {
    /// Rendered rows, one entry per fetched row.
    pub lines: Vec<String>,
    /// `lines` joined with the row separator.
    pub text: String,
    /// The 1-based page number.
    pub page: usize,
    /// The source returned a full page, so another may follow.
    pub has_next: bool,
}

/// Who receives mail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recipients {
    /// Every row goes to every one of these addresses. Must not be empty.
    Broadcast(Vec<String>),
    /// Each row goes to the address in this column.
    Column(String),
}

/// A mail run: a selection plus recipients and a subject.
#[derive(Debug, Clone)]
pub struct MailJob {
    pub selection: Selection,
    pub recipients: Recipients,
    /// Subject template; the table name when unset.
    pub subject: Option<String>,
}

/// One delivery that failed.
#[derive(Debug)]
pub struct FailedSend {
    pub address: String,
    pub error: SendError,
}

/// Counters for a finished mail run.
#[derive(Debug, Default)]
pub struct MailSummary {
    pub sent: usize,
    /// Rows with no destination address.
    pub skipped: usize,
    pub failed: Vec<FailedSend>,
}

impl MailSummary {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

impl fmt::Display for MailSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "sent {}, skipped {}, failed {}",
            self.sent,
            self.skipped,
            self.failed.len()
        )?;
        for failure in &self.failed {
            write!(f, "\n  {}: {}", failure.address, failure.error)?;
        }
        Ok(())
    }
}

/// Runs reports and mail batches against one row source.
pub struct Orchestrator<'s, S: RowSource> {
    source: &'s S,
    state: RunState,
}

impl<'s, S: RowSource> Orchestrator<'s, S> {
    pub fn new(source: &'s S) -> Self {
        Orchestrator {
            source,
            state: RunState::Idle,
        }
    }

    /// The state the last run reached.
    pub fn state(&self) -> RunState {
        self.state
    }

    fn transition(&mut self, next: RunState) {
        match next {
            RunState::Rendering | RunState::Dispatching => {
                debug!(from = %self.state, to = %next, "run state")
            }
            _ => info!(from = %self.state, to = %next, "run state"),
        }
        self.state = next;
    }

    fn connect(&mut self) -> Result<ConnectionGuard<S::Connection>, ConnectError> {
        self.state = RunState::Idle;
        match open(self.source) {
            Ok(conn) => {
                self.transition(RunState::Connected);
                Ok(conn)
            }
            Err(err) => {
                self.transition(RunState::Aborted);
                Err(err)
            }
        }
    }

    fn finish<T>(&mut self, conn: ConnectionGuard<S::Connection>, result: T) -> T {
        conn.close();
        self.transition(RunState::Disconnected);
        result
    }

    fn fetch(
        &mut self,
        conn: &mut S::Connection,
        selection: &Selection,
        columns: &Columns,
    ) -> Result<RowSet, QueryError> {
        self.transition(RunState::Fetching);
        let rows = conn.fetch_rows(
            &selection.table,
            columns,
            &selection.criteria,
            selection.window,
        )?;
        debug!(table = %selection.table, rows = rows.len(), "fetched");
        Ok(rows)
    }

    /// Renders one page of `selection`, rows joined with `row_separator`.
    ///
    /// Nothing is returned unless the whole page rendered.
    pub fn report(
        &mut self,
        selection: &Selection,
        row_separator: &str,
    ) -> Result<ReportPage, RunError> {
        let row_template = selection.compile_row_template()?;
        let mut conn = self.connect()?;
        let result = self.report_rows(&mut conn, selection, row_template, row_separator);
        self.finish(conn, result)
    }

    fn report_rows(
        &mut self,
        conn: &mut S::Connection,
        selection: &Selection,
        row_template: Option<Template>,
        row_separator: &str,
    ) -> Result<ReportPage, RunError> {
        let columns = match row_template {
            Some(_) => Columns::All,
            None => Columns::from_list(selection.show.clone()),
        };
        let fetched = self.fetch(conn, selection, &columns)?;
        selection.require_shown(&fetched)?;
        let template = row_template.unwrap_or_else(|| selection.default_template(&fetched));

        let mut lines = Vec::with_capacity(fetched.len());
        for row in &fetched.rows {
            self.transition(RunState::Rendering);
            lines.push(template.render(row));
        }

        Ok(ReportPage {
            text: lines.join(row_separator),
            page: selection.window.page(),
            has_next: selection.window.has_next(fetched.len()),
            lines,
        })
    }

    /// Sends one message per (row, address) pair of `job`.
    pub fn mail<M: Mailer + ?Sized>(
        &mut self,
        job: &MailJob,
        mailer: &mut M,
    ) -> Result<MailSummary, RunError> {
        let selection = &job.selection;
        if matches!(&job.recipients, Recipients::Broadcast(list) if list.is_empty()) {
            return Err(RunError::NoRecipients);
        }
        let row_template = selection.compile_row_template()?;
        let subject = match &job.subject {
            Some(raw) => Template::compile(raw)?,
            None => Template::literal(selection.table.clone()),
        };
        let mut conn = self.connect()?;
        let result = self.mail_rows(&mut conn, job, row_template, &subject, mailer);
        self.finish(conn, result)
    }

    fn mail_rows<M: Mailer + ?Sized>(
        &mut self,
        conn: &mut S::Connection,
        job: &MailJob,
        row_template: Option<Template>,
        subject: &Template,
        mailer: &mut M,
    ) -> Result<MailSummary, RunError> {
        let selection = &job.selection;
        let fetched = self.fetch(conn, selection, &Columns::All)?;
        selection.require_shown(&fetched)?;
        if let Recipients::Column(column) = &job.recipients {
            require_columns(&selection.table, &fetched, [column.as_str()])?;
        }
        let body = row_template.unwrap_or_else(|| selection.default_template(&fetched));

        let mut summary = MailSummary::default();
        for (index, row) in fetched.rows.iter().enumerate() {
            let addresses: Vec<&str> = match &job.recipients {
                Recipients::Broadcast(list) => list.iter().map(String::as_str).collect(),
                Recipients::Column(column) => match row.get(column).filter(|a| !a.is_empty()) {
                    Some(address) => vec![address],
                    None => {
                        warn!(row = index, column = %column, "no address, row skipped");
                        summary.skipped += 1;
                        continue;
                    }
                },
            };

            self.transition(RunState::Rendering);
            let subject_text = subject.render(row);
            let body_text = body.render(row);

            self.transition(RunState::Dispatching);
            for address in addresses {
                match mailer.send(address, &subject_text, &body_text) {
                    Ok(()) => {
                        debug!(row = index, to = address, "sent");
                        summary.sent += 1;
                    }
                    Err(error) => {
                        warn!(row = index, to = address, %error, "send failed");
                        summary.failed.push(FailedSend {
                            address: address.to_string(),
                            error,
                        });
                    }
                }
            }
        }

        info!(
            sent = summary.sent,
            skipped = summary.skipped,
            failed = summary.failed.len(),
            "mail run finished"
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MemoryRowSource;
    use tablemail_select::{Row, SortKey};

    fn letters() -> RowSet {
        RowSet::new(
            vec!["name".into(), "email".into(), "note".into()],
            vec![
                Row::from_pairs([("name", "r1"), ("email", "a@x"), ("note", "")]),
                Row::from_pairs([("name", "r2"), ("email", ""), ("note", "hi")]),
                Row::from_pairs([("name", "r3"), ("email", "c@x"), ("note", "")]),
            ],
        )
    }

    fn source() -> MemoryRowSource {
        MemoryRowSource::new().with_table("letters", letters())
    }

    /// Records what it was asked to send; fails for listed addresses.
    #[derive(Default)]
    struct Recorder {
        sent: Vec<(String, String, String)>,
        reject: Vec<String>,
    }

    impl Mailer for Recorder {
        fn send(&mut self, to: &str, subject: &str, body: &str) -> Result<(), SendError> {
            if self.reject.iter().any(|r| r == to) {
                return Err(SendError::InvalidAddress {
                    address: to.to_string(),
                });
            }
            self.sent
                .push((to.to_string(), subject.to_string(), body.to_string()));
            Ok(())
        }
    }

    #[test]
    fn report_pages() {
        let src = source();
        let mut orch = Orchestrator::new(&src);
        let mut selection = Selection::new("letters");
        selection.show = vec!["name".into()];

        selection.window = PageWindow::new(2, 1);
        let page = orch.report(&selection, "\n").unwrap();
        assert_eq!(page.text, "r1\nr2");
        assert!(page.has_next);

        selection.window = PageWindow::new(2, 2);
        let page = orch.report(&selection, "\n").unwrap();
        assert_eq!(page.text, "r3");
        assert_eq!(page.page, 2);
        assert!(!page.has_next);

        selection.window = PageWindow::new(2, 3);
        let page = orch.report(&selection, "\n").unwrap();
        assert!(page.lines.is_empty());
        assert_eq!(page.text, "");
        assert_eq!(orch.state(), RunState::Disconnected);
    }

    #[test]
    fn report_with_row_template_and_separator() {
        let src = source();
        let mut orch = Orchestrator::new(&src);
        let mut selection = Selection::new("letters");
        selection.row_template = Some("{$name}{?note : [$note]}".into());
        selection.criteria = SelectionCriteria::new().order_by(SortKey::desc("name"));
        let page = orch.report(&selection, " | ").unwrap();
        assert_eq!(page.text, "r3 | r2: hi | r1");
    }

    #[test]
    fn report_default_template_uses_all_columns() {
        let src = source();
        let mut orch = Orchestrator::new(&src);
        let mut selection = Selection::new("letters");
        selection.field_separator = ",".into();
        selection.window = PageWindow::new(1, 1);
        let page = orch.report(&selection, "\n").unwrap();
        assert_eq!(page.text, "r1,a@x,");
    }

    #[test]
    fn report_unknown_column_is_fatal() {
        let src = source();
        let mut orch = Orchestrator::new(&src);
        let mut selection = Selection::new("letters");
        selection.show = vec!["name".into(), "phone".into()];
        let err = orch.report(&selection, "\n").unwrap_err();
        assert!(matches!(
            err,
            RunError::Query(QueryError::UnknownColumn { ref column, .. }) if column == "phone"
        ));
        assert_eq!(src.disconnects(), 1);
        assert_eq!(orch.state(), RunState::Disconnected);
    }

    #[test]
    fn template_errors_stop_before_connecting() {
        let src = source();
        let mut orch = Orchestrator::new(&src);
        let mut selection = Selection::new("letters");
        selection.row_template = Some("{?name never closed".into());
        assert!(matches!(
            orch.report(&selection, "\n"),
            Err(RunError::Template(_))
        ));
        assert_eq!(src.connects(), 0);
    }

    #[test]
    fn connect_failure_aborts() {
        let src = MemoryRowSource::unreachable();
        let mut orch = Orchestrator::new(&src);
        let err = orch.report(&Selection::new("letters"), "\n").unwrap_err();
        assert!(matches!(err, RunError::Connect(_)));
        assert_eq!(orch.state(), RunState::Aborted);
    }

    #[test]
    fn broadcast_sends_every_row_to_every_address() {
        let src = source();
        let mut orch = Orchestrator::new(&src);
        let job = MailJob {
            selection: Selection::new("letters"),
            recipients: Recipients::Broadcast(vec!["p@x".into(), "q@x".into()]),
            subject: None,
        };
        let mut mailer = Recorder::default();
        let summary = orch.mail(&job, &mut mailer).unwrap();
        assert_eq!(summary.sent, 6);
        assert_eq!(mailer.sent[0].0, "p@x");
        assert_eq!(mailer.sent[1].0, "q@x");
        assert_eq!(mailer.sent[0].1, "letters");
    }

    #[test]
    fn empty_broadcast_list_is_rejected() {
        let src = source();
        let mut orch = Orchestrator::new(&src);
        let job = MailJob {
            selection: Selection::new("letters"),
            recipients: Recipients::Broadcast(vec![]),
            subject: None,
        };
        let mut mailer = Recorder::default();
        let err = orch.mail(&job, &mut mailer).unwrap_err();
        assert!(matches!(err, RunError::NoRecipients));
        assert_eq!(src.connects(), 0);
        assert!(mailer.sent.is_empty());
        assert_eq!(orch.state(), RunState::Idle);
    }

    #[test]
    fn one_bad_address_among_three() {
        let src = source();
        let mut orch = Orchestrator::new(&src);
        let mut selection = Selection::new("letters");
        selection.window = PageWindow::new(1, 1);
        let job = MailJob {
            selection,
            recipients: Recipients::Broadcast(vec!["a@x".into(), "bad".into(), "c@x".into()]),
            subject: Some("Hello {$name}".into()),
        };
        let mut mailer = Recorder {
            reject: vec!["bad".into()],
            ..Default::default()
        };
        let summary = orch.mail(&job, &mut mailer).unwrap();
        assert_eq!(summary.sent, 2);
        assert_eq!(summary.failed.len(), 1);
        assert_eq!(summary.failed[0].address, "bad");
        assert_eq!(mailer.sent[1], ("c@x".into(), "Hello r1".into(), "r1 a@x ".into()));
        assert_eq!(orch.state(), RunState::Disconnected);
    }

    #[test]
    fn email_column_skips_empty_destinations() {
        let src = source();
        let mut orch = Orchestrator::new(&src);
        let mut selection = Selection::new("letters");
        selection.show = vec!["name".into()];
        let job = MailJob {
            selection,
            recipients: Recipients::Column("email".into()),
            subject: None,
        };
        let mut mailer = Recorder::default();
        let summary = orch.mail(&job, &mut mailer).unwrap();
        assert_eq!(summary.sent, 2);
        assert_eq!(summary.skipped, 1);
        assert!(summary.is_clean());
        let bodies: Vec<&str> = mailer.sent.iter().map(|m| m.2.as_str()).collect();
        assert_eq!(bodies, vec!["r1", "r3"]);
    }

    #[test]
    fn email_column_must_exist() {
        let src = source();
        let mut orch = Orchestrator::new(&src);
        let job = MailJob {
            selection: Selection::new("letters"),
            recipients: Recipients::Column("mail".into()),
            subject: None,
        };
        let err = orch.mail(&job, &mut Recorder::default()).unwrap_err();
        assert_eq!(err.to_string(), "unknown column 'mail' in table 'letters'");
    }

    #[test]
    fn summary_display() {
        let summary = MailSummary {
            sent: 2,
            skipped: 1,
            failed: vec![FailedSend {
                address: "bad".into(),
                error: SendError::InvalidAddress {
                    address: "bad".into(),
                },
            }],
        };
        assert_eq!(
            summary.to_string(),
            "sent 2, skipped 1, failed 1\n  bad: invalid address 'bad'"
        );
    }
}
