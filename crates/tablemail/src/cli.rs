//! Command-line front ends for `tablemail` and `tableview`.
//!
//! Option names keep their historical underscore spelling
//! (`--email_address`, `--sort_by`); the dashed spellings are accepted as
//! aliases.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::error::ErrorKind;
use clap::{Args, CommandFactory, Parser};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::{parse_key_value, Options, UsageError};
use crate::csv_source::CsvRowSource;
use crate::mailer::{self, Mailer};
use crate::orchestrator::{MailJob, MailSummary, Orchestrator};
use crate::viewer::{self, Route};

/// Every send went through (or there was nothing to send).
pub const EXIT_OK: u8 = 0;
/// Usage error, bad config, or a failure that ended the run.
pub const EXIT_FATAL: u8 = 1;
/// The run completed but some messages could not be sent.
pub const EXIT_SEND_FAILURES: u8 = 2;

/// Selection and rendering options shared by both programs.
#[derive(Debug, Clone, Default, Args)]
pub struct SelectArgs {
    /// Keep rows whose COLUMN matches the LIKE pattern (`%` any run, `_` one character)
    #[arg(long = "where", value_name = "COLUMN=PATTERN", value_parser = parse_key_value)]
    pub where_: Vec<(String, String)>,

    /// Invert the --where test for COLUMN
    #[arg(long = "not_where", alias = "not-where", value_name = "COLUMN=1", value_parser = parse_key_value)]
    pub not_where: Vec<(String, String)>,

    /// Sort by COLUMN; repeat for tie-breakers, in order
    #[arg(long = "sort_by", alias = "sort-by", value_name = "COLUMN")]
    pub sort_by: Vec<String>,

    /// Sort COLUMN in descending order
    #[arg(long = "sort_reversed", alias = "sort-reversed", value_name = "COLUMN=1", value_parser = parse_key_value)]
    pub sort_reversed: Vec<(String, String)>,

    /// Columns for the default row template, in order
    #[arg(long, value_name = "COLUMN")]
    pub show: Vec<String>,

    /// Rows per page (0 = all rows on one page)
    #[arg(long, value_name = "N")]
    pub limit: Option<usize>,

    /// Page to fetch, starting at 1
    #[arg(long, value_name = "N")]
    pub page: Option<usize>,

    /// Template for each row, e.g. "{$name}{?note : [$note]}"
    #[arg(long = "row_template", alias = "row-template", value_name = "TEMPLATE")]
    pub row_template: Option<String>,

    /// Separator between columns in the default row template [default: " "]
    #[arg(long = "field_separator", alias = "field-separator", value_name = "TEXT")]
    pub field_separator: Option<String>,

    /// Separator between rendered rows of a report [default: "\n"]
    #[arg(long = "row_separator", alias = "row-separator", value_name = "TEXT")]
    pub row_separator: Option<String>,
}

/// Logging switches shared by both programs.
#[derive(Debug, Clone, Copy, Default, Args)]
pub struct LogArgs {
    /// Log run progress to stderr
    #[arg(short, long)]
    pub verbose: bool,

    /// Log every row and message to stderr
    #[arg(long)]
    pub debug: bool,
}

/// Mail rows of a table through a template.
#[derive(Debug, Parser)]
#[command(name = "tablemail", version)]
#[command(about = "Render rows of a table through a template and mail them")]
#[command(long_about = "Render rows of a table through a template and mail them.\n\n\
    Every selected row is rendered with --row_template (or the --show columns) \
    and sent to each --email_address, or to the address held in the row's \
    --email_col column.")]
pub struct MailCli {
    /// Directory holding one <table>.csv file per table
    #[arg(long, value_name = "DIR")]
    pub database: Option<PathBuf>,

    /// Table to read rows from
    #[arg(long, value_name = "TABLE")]
    pub table: Option<String>,

    /// Send every row to this address (repeatable)
    #[arg(long = "email_address", alias = "email-address", value_name = "ADDRESS")]
    pub email_address: Vec<String>,

    /// Send each row to the address in this column
    #[arg(long = "email_col", alias = "email-col", value_name = "COLUMN")]
    pub email_col: Option<String>,

    /// Subject template [default: the table name]
    #[arg(long, value_name = "TEMPLATE")]
    pub subject: Option<String>,

    /// "stdout" to print messages, or a command that reads a message on stdin
    #[arg(long, value_name = "MAILER")]
    pub mailer: Option<String>,

    /// Print messages instead of sending them (same as --mailer stdout)
    #[arg(long = "dry_run", alias = "dry-run")]
    pub dry_run: bool,

    /// Seconds a mailer command may run per message [default: 30]
    #[arg(long = "mail_timeout", alias = "mail-timeout", value_name = "SECS")]
    pub mail_timeout: Option<u64>,

    /// Add a From: header to every message
    #[arg(long, value_name = "ADDRESS")]
    pub from: Option<String>,

    /// Read options from a YAML file; command-line values win
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Print the full documentation
    #[arg(long)]
    pub manpage: bool,

    #[command(flatten)]
    pub select: SelectArgs,

    #[command(flatten)]
    pub log: LogArgs,
}

/// Browse the tables of a database.
#[derive(Debug, Parser)]
#[command(name = "tableview", version)]
#[command(about = "List tables, show a table's search form, or render a search")]
pub struct ViewCli {
    /// Directory holding one <table>.csv file per table
    #[arg(long, value_name = "DIR")]
    pub database: Option<PathBuf>,

    /// Table to view; without it the tables are listed
    #[arg(long, value_name = "TABLE")]
    pub table: Option<String>,

    /// Run the search instead of showing the search form
    #[arg(long)]
    pub search: bool,

    /// Read options from a YAML file; command-line values win
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(flatten)]
    pub select: SelectArgs,

    #[command(flatten)]
    pub log: LogArgs,
}

impl SelectArgs {
    fn apply(self, options: &mut Options) {
        options.where_ = self.where_;
        options.not_where = self.not_where;
        options.sort_by = self.sort_by;
        options.sort_reversed = self.sort_reversed;
        options.show = self.show;
        options.limit = self.limit;
        options.page = self.page;
        options.row_template = self.row_template;
        options.field_separator = self.field_separator;
        options.row_separator = self.row_separator;
    }
}

impl MailCli {
    /// The options given on the command line, without any config file.
    pub fn options(self) -> Options {
        let mut options = Options {
            database: self.database,
            table: self.table,
            email_address: self.email_address,
            email_col: self.email_col,
            subject: self.subject,
            mailer: self.mailer,
            from: self.from,
            mail_timeout: self.mail_timeout,
            dry_run: self.dry_run,
            verbose: self.log.verbose,
            debug: self.log.debug,
            ..Options::default()
        };
        self.select.apply(&mut options);
        options
    }
}

impl ViewCli {
    pub fn options(self) -> Options {
        let mut options = Options {
            database: self.database,
            table: self.table,
            verbose: self.log.verbose,
            debug: self.log.debug,
            ..Options::default()
        };
        self.select.apply(&mut options);
        options
    }
}

/// Parses arguments, printing help, version or errors.
///
/// Returns the exit code when there is nothing left to run: 0 after help
/// or version, 1 after a usage error.
pub fn parse_args<P, I, T>(args: I) -> Result<P, u8>
where
    P: Parser,
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    P::try_parse_from(args).map_err(|err| {
        let code = match err.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => EXIT_OK,
            _ => EXIT_FATAL,
        };
        // Nowhere left to report a failed write to stdout or stderr.
        let _ = err.print();
        code
    })
}

/// Prints a usage error with the usage line.
pub fn report_usage_error<P: CommandFactory>(err: &UsageError) -> u8 {
    let mut cmd = P::command();
    eprintln!(
        "error: {}\n\n{}\n\nFor more information, try '--help'.",
        err,
        cmd.render_usage()
    );
    EXIT_FATAL
}

const MANUAL: &str = "\
TEMPLATES
    {$name}                 the row's value for column `name`
    {?name text}            `text` when `name` is non-empty
    {?name text!!other}     `text` when `name` is non-empty, otherwise `other`
    [$name]                 inside a conditional: the value of `name`

    A conditional's name may be followed by one space, which is not output.
    Any other `{` is printed as is. \"0\" counts as non-empty.

SELECTION
    --where col=pattern keeps rows whose value matches the LIKE pattern:
    `%` matches any run of characters, `_` exactly one, `\\` escapes.
    Matching is case-sensitive. --not_where col=1 inverts that column's
    test; it has no effect without a --where for the same column.
    --sort_by compares numbers numerically and sorts empty values last.

EXIT STATUS
    0   every message was sent
    1   usage error, bad config, or the run could not complete
    2   the run completed but some messages failed
";

/// The full documentation printed by `--manpage`.
pub fn manual<P: CommandFactory>() -> String {
    let mut cmd = P::command();
    format!("{}\n{}", cmd.render_long_help(), MANUAL)
}

/// Installs the stderr log subscriber.
///
/// `RUST_LOG` wins when set; otherwise `--debug` logs at debug level,
/// `--verbose` at info, and the default is warnings only.
pub fn init_logging(verbose: bool, debug: bool) {
    let level = if debug {
        "debug"
    } else if verbose {
        "info"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    // A subscriber may already be installed, e.g. by a test harness.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .try_init();
}

/// Merges the command line over the `--config` file, if any.
pub fn load_options(config: Option<&Path>, cli: Options) -> anyhow::Result<Options> {
    match config {
        Some(path) => Ok(cli.overlay(Options::from_file(path)?)),
        None => Ok(cli),
    }
}

/// The database directory and mail job described by `options`.
pub fn mail_job(options: &Options) -> Result<(PathBuf, MailJob), UsageError> {
    let database = options.database()?.to_path_buf();
    let selection = options.selection()?;
    let recipients = options.recipients()?;
    Ok((
        database,
        MailJob {
            selection,
            recipients,
            subject: options.subject.clone(),
        },
    ))
}

/// Runs a mail job against a CSV database.
pub fn run_mail<M: Mailer + ?Sized>(
    database: &Path,
    job: &MailJob,
    mailer: &mut M,
) -> anyhow::Result<MailSummary> {
    let source = CsvRowSource::new(database);
    Orchestrator::new(&source)
        .mail(job, mailer)
        .with_context(|| format!("mail run on table '{}' failed", job.selection.table))
}

/// The exit code for a finished mail run.
pub fn exit_code(summary: &MailSummary) -> u8 {
    if summary.is_clean() {
        EXIT_OK
    } else {
        EXIT_SEND_FAILURES
    }
}

/// Entry point of `tablemail`.
pub fn mail_main<I, T>(args: I) -> u8
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli: MailCli = match parse_args(args) {
        Ok(cli) => cli,
        Err(code) => return code,
    };
    if cli.manpage {
        print!("{}", manual::<MailCli>());
        return EXIT_OK;
    }

    let config = cli.config.clone();
    let options = match load_options(config.as_deref(), cli.options()) {
        Ok(options) => options,
        Err(err) => {
            eprintln!("error: {:#}", err);
            return EXIT_FATAL;
        }
    };
    init_logging(options.verbose, options.debug);

    let (database, job) = match mail_job(&options) {
        Ok(planned) => planned,
        Err(err) => return report_usage_error::<MailCli>(&err),
    };

    let mut mailer = mailer::from_setting(
        options.mailer_setting(),
        options.mail_timeout(),
        options.from.clone(),
    );
    match run_mail(&database, &job, &mut mailer) {
        Ok(summary) => {
            eprintln!("{}", summary);
            exit_code(&summary)
        }
        Err(err) => {
            eprintln!("error: {:#}", err);
            EXIT_FATAL
        }
    }
}

/// Entry point of `tableview`.
pub fn view_main<I, T>(args: I) -> u8
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli: ViewCli = match parse_args(args) {
        Ok(cli) => cli,
        Err(code) => return code,
    };
    let search = cli.search;
    let config = cli.config.clone();
    let options = match load_options(config.as_deref(), cli.options()) {
        Ok(options) => options,
        Err(err) => {
            eprintln!("error: {:#}", err);
            return EXIT_FATAL;
        }
    };
    init_logging(options.verbose, options.debug);

    let database = match options.database() {
        Ok(database) => database,
        Err(err) => return report_usage_error::<ViewCli>(&err),
    };
    let route = Route::new(options.table.as_deref(), search);
    let source = CsvRowSource::new(database);
    match viewer::render(&source, &options, &route) {
        Ok(page) => {
            print!("{}", page);
            EXIT_OK
        }
        Err(err) => {
            eprintln!("error: {:#}", anyhow::Error::new(err));
            EXIT_FATAL
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::Recipients;

    fn mail_cli(args: &[&str]) -> MailCli {
        let mut full = vec!["tablemail"];
        full.extend_from_slice(args);
        parse_args(full).unwrap()
    }

    #[test]
    fn cli_definition_is_valid() {
        MailCli::command().debug_assert();
        ViewCli::command().debug_assert();
    }

    #[test]
    fn repeatable_options_keep_order() {
        let opts = mail_cli(&[
            "--database",
            "db",
            "--table",
            "people",
            "--email_address",
            "a@x",
            "--email_address",
            "b@x",
            "--where",
            "email=%.com",
            "--not_where",
            "email=1",
            "--sort_by",
            "age",
            "--sort_by",
            "name",
            "--sort_reversed",
            "age=1",
            "--show",
            "name",
            "--show",
            "email",
        ])
        .options();

        assert_eq!(opts.email_address, vec!["a@x", "b@x"]);
        assert_eq!(opts.sort_by, vec!["age", "name"]);
        assert_eq!(opts.show, vec!["name", "email"]);
        let criteria = opts.criteria();
        assert!(criteria.where_list[0].negated);
        assert!(criteria.sort_list[0].reversed());
        assert!(!criteria.sort_list[1].reversed());
    }

    #[test]
    fn dashed_aliases_are_accepted() {
        let opts = mail_cli(&["--email-col", "email", "--sort-by", "x"]).options();
        assert_eq!(opts.email_col.as_deref(), Some("email"));
        assert_eq!(opts.sort_by, vec!["x"]);
    }

    #[test]
    fn help_and_bad_flags_exit_codes() {
        assert_eq!(
            parse_args::<MailCli, _, _>(["tablemail", "--help"]).unwrap_err(),
            EXIT_OK
        );
        assert_eq!(
            parse_args::<MailCli, _, _>(["tablemail", "--bogus"]).unwrap_err(),
            EXIT_FATAL
        );
        assert_eq!(
            parse_args::<MailCli, _, _>(["tablemail", "--where", "=x"]).unwrap_err(),
            EXIT_FATAL
        );
    }

    #[test]
    fn missing_required_options_are_usage_errors() {
        let opts = mail_cli(&["--table", "people", "--email_col", "email"]).options();
        assert_eq!(mail_job(&opts).unwrap_err(), UsageError::MissingDatabase);

        let opts = mail_cli(&["--database", "db", "--email_col", "email"]).options();
        assert_eq!(mail_job(&opts).unwrap_err(), UsageError::MissingTable);

        let opts = mail_cli(&["--database", "db", "--table", "t"]).options();
        assert_eq!(mail_job(&opts).unwrap_err(), UsageError::MissingRecipients);
    }

    #[test]
    fn mail_job_from_options() {
        let opts = mail_cli(&[
            "--database",
            "db",
            "--table",
            "people",
            "--email_col",
            "email",
            "--subject",
            "Hi {$name}",
            "--limit",
            "10",
            "--page",
            "2",
        ])
        .options();
        let (database, job) = mail_job(&opts).unwrap();
        assert_eq!(database, PathBuf::from("db"));
        assert_eq!(job.recipients, Recipients::Column("email".into()));
        assert_eq!(job.subject.as_deref(), Some("Hi {$name}"));
        assert_eq!(job.selection.window.offset(), 10);
    }

    #[test]
    fn manual_documents_templates() {
        let text = manual::<MailCli>();
        assert!(text.contains("--email_address"));
        assert!(text.contains("{?name text!!other}"));
        assert!(text.contains("EXIT STATUS"));
    }
}
