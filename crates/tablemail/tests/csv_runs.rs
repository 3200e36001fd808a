//! End-to-end runs against CSV databases on disk.

use std::fs;
use std::path::Path;

use tablemail::cli::{self, EXIT_FATAL, EXIT_OK, EXIT_SEND_FAILURES};
use tablemail::{
    CsvRowSource, MailJob, Mailer, Options, Orchestrator, QueryError, Recipients, RunError,
    Selection, SendError,
};
use tablemail_select::{PageWindow, SelectionCriteria, SortKey, WhereClause};
use tempfile::TempDir;

// ============================================================================
// Test helpers
// ============================================================================

fn database() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("members.csv"),
        "name,email,status,dues\n\
         Ada,ada@example.com,lapsed,12\n\
         Bob,,lapsed,7\n\
         Cy,cy@example.org,active,30\n\
         Di,di@example.com,lapsed,\n",
    )
    .unwrap();
    dir
}

fn path_arg(path: &Path) -> String {
    path.display().to_string()
}

#[derive(Default)]
struct Outbox {
    messages: Vec<(String, String, String)>,
    reject: Vec<String>,
}

impl Mailer for Outbox {
    fn send(&mut self, to: &str, subject: &str, body: &str) -> Result<(), SendError> {
        tablemail::mailer::validate_address(to)?;
        if self.reject.iter().any(|r| r == to) {
            return Err(SendError::InvalidAddress {
                address: to.to_string(),
            });
        }
        self.messages
            .push((to.to_string(), subject.to_string(), body.to_string()));
        Ok(())
    }
}

// ============================================================================
// Orchestrated runs
// ============================================================================

#[test]
fn report_pages_through_a_table() {
    let db = database();
    let source = CsvRowSource::new(db.path());
    let mut orch = Orchestrator::new(&source);

    let mut selection = Selection::new("members");
    selection.show = vec!["name".into()];
    selection.criteria = SelectionCriteria::new().order_by(SortKey::asc("name"));
    selection.window = PageWindow::new(3, 1);

    let first = orch.report(&selection, ", ").unwrap();
    assert_eq!(first.text, "Ada, Bob, Cy");
    assert!(first.has_next);

    selection.window = selection.window.next();
    let second = orch.report(&selection, ", ").unwrap();
    assert_eq!(second.text, "Di");
    assert!(!second.has_next);
}

#[test]
fn report_with_unknown_column_returns_nothing() {
    let db = database();
    let source = CsvRowSource::new(db.path());
    let mut selection = Selection::new("members");
    selection.criteria = SelectionCriteria::new().and(WhereClause::like("phone", "%"));

    let err = Orchestrator::new(&source)
        .report(&selection, "\n")
        .unwrap_err();
    assert!(matches!(
        err,
        RunError::Query(QueryError::UnknownColumn { ref column, .. }) if column == "phone"
    ));
}

#[test]
fn mail_skips_rows_without_address() {
    let db = database();
    let job = MailJob {
        selection: Selection {
            criteria: SelectionCriteria::new().and(WhereClause::like("status", "lapsed")),
            row_template: Some("Dear {$name}, you owe {?dues [$dues]!!nothing}.".into()),
            ..Selection::new("members")
        },
        recipients: Recipients::Column("email".into()),
        subject: Some("Dues".into()),
    };

    let mut outbox = Outbox::default();
    let summary = cli::run_mail(db.path(), &job, &mut outbox).unwrap();

    assert_eq!(summary.sent, 2);
    assert_eq!(summary.skipped, 1);
    assert!(summary.failed.is_empty());
    assert_eq!(
        outbox.messages,
        vec![
            (
                "ada@example.com".to_string(),
                "Dues".to_string(),
                "Dear Ada, you owe 12.".to_string()
            ),
            (
                "di@example.com".to_string(),
                "Dues".to_string(),
                "Dear Di, you owe nothing.".to_string()
            ),
        ]
    );
}

#[test]
fn one_failed_address_does_not_stop_the_batch() {
    let db = database();
    let job = MailJob {
        selection: Selection {
            window: PageWindow::new(1, 1),
            ..Selection::new("members")
        },
        recipients: Recipients::Broadcast(vec![
            "board@example.com".into(),
            "not an address".into(),
            "archive@example.com".into(),
        ]),
        subject: None,
    };

    let mut outbox = Outbox::default();
    let summary = cli::run_mail(db.path(), &job, &mut outbox).unwrap();

    assert_eq!(summary.sent, 2);
    assert_eq!(summary.failed.len(), 1);
    assert_eq!(summary.failed[0].address, "not an address");
    assert_eq!(cli::exit_code(&summary), EXIT_SEND_FAILURES);
    assert_eq!(outbox.messages[0].1, "members");
}

#[test]
fn missing_database_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let job = MailJob {
        selection: Selection::new("members"),
        recipients: Recipients::Column("email".into()),
        subject: None,
    };
    let err = cli::run_mail(&dir.path().join("gone"), &job, &mut Outbox::default()).unwrap_err();
    let message = format!("{:#}", err);
    assert!(message.starts_with("mail run on table 'members' failed: database '"));
    assert!(message.ends_with("does not exist or is not a directory"));
}

// ============================================================================
// Config files
// ============================================================================

#[test]
fn config_file_supplies_options() {
    let db = database();
    let config = db.path().join("run.yaml");
    fs::write(
        &config,
        format!(
            "database: {}\ntable: members\nemail_col: email\nwhere:\n  status: lapsed\nshow: [name, dues]\n",
            path_arg(db.path())
        ),
    )
    .unwrap();

    let cli_options = Options {
        show: vec!["name".into()],
        ..Default::default()
    };
    let options = cli::load_options(Some(config.as_path()), cli_options).unwrap();
    let (database, job) = cli::mail_job(&options).unwrap();
    assert_eq!(database, db.path());
    assert_eq!(job.selection.show, vec!["name"]);

    let mut outbox = Outbox::default();
    let summary = cli::run_mail(&database, &job, &mut outbox).unwrap();
    assert_eq!(summary.sent, 2);
    assert_eq!(outbox.messages[0].2, "Ada");
}

#[test]
fn unreadable_config_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = cli::load_options(Some(dir.path().join("missing.yaml").as_path()), Options::default())
        .unwrap_err();
    assert!(err.to_string().starts_with("cannot read config file"));
}

// ============================================================================
// Entry points
// ============================================================================

#[test]
fn usage_errors_exit_one() {
    assert_eq!(cli::mail_main(["tablemail", "--table", "members"]), EXIT_FATAL);
    assert_eq!(
        cli::mail_main(["tablemail", "--database", "db", "--email_col", "email"]),
        EXIT_FATAL
    );
}

#[test]
fn help_and_manpage_exit_zero() {
    assert_eq!(cli::mail_main(["tablemail", "--help"]), EXIT_OK);
    assert_eq!(cli::mail_main(["tablemail", "--manpage"]), EXIT_OK);
}

#[test]
fn dry_run_exits_zero() {
    let db = database();
    let database = path_arg(db.path());
    let code = cli::mail_main([
        "tablemail",
        "--database",
        database.as_str(),
        "--table",
        "members",
        "--email_col",
        "email",
        "--dry_run",
    ]);
    assert_eq!(code, EXIT_OK);
}

#[cfg(unix)]
#[test]
fn command_mailer_delivers_each_message() {
    let db = database();
    let database = path_arg(db.path());
    let spool = db.path().join("spool.txt");
    let mailer = format!("cat >> '{}'", spool.display());
    let code = cli::mail_main([
        "tablemail",
        "--database",
        database.as_str(),
        "--table",
        "members",
        "--where",
        "status=active",
        "--email_col",
        "email",
        "--show",
        "name",
        "--from",
        "club@example.com",
        "--mailer",
        mailer.as_str(),
    ]);
    assert_eq!(code, EXIT_OK);
    assert_eq!(
        fs::read_to_string(&spool).unwrap(),
        "From: club@example.com\nTo: cy@example.org\nSubject: members\n\nCy\n"
    );
}

#[cfg(unix)]
#[test]
fn failing_mailer_exits_two() {
    let db = database();
    let database = path_arg(db.path());
    let code = cli::mail_main([
        "tablemail",
        "--database",
        database.as_str(),
        "--table",
        "members",
        "--email_address",
        "board@example.com",
        "--mailer",
        "exit 1",
        "--mail_timeout",
        "5",
    ]);
    assert_eq!(code, EXIT_SEND_FAILURES);
}

#[test]
fn unknown_table_exits_one() {
    let db = database();
    let database = path_arg(db.path());
    let code = cli::mail_main([
        "tablemail",
        "--database",
        database.as_str(),
        "--table",
        "staff",
        "--email_col",
        "email",
        "--dry_run",
    ]);
    assert_eq!(code, EXIT_FATAL);
}

#[test]
fn viewer_entry_point() {
    let db = database();
    let database = path_arg(db.path());
    assert_eq!(
        cli::view_main(["tableview", "--database", database.as_str()]),
        EXIT_OK
    );
    assert_eq!(
        cli::view_main(["tableview", "--database", database.as_str(), "--table", "members"]),
        EXIT_OK
    );
    assert_eq!(
        cli::view_main([
            "tableview",
            "--database",
            database.as_str(),
            "--table",
            "members",
            "--search",
            "--limit",
            "2"
        ]),
        EXIT_OK
    );
    assert_eq!(
        cli::view_main(["tableview", "--database", database.as_str(), "--table", "nope"]),
        EXIT_FATAL
    );
    assert_eq!(cli::view_main(["tableview"]), EXIT_FATAL);
}
