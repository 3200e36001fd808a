//! Run options: command-line values layered over an optional YAML file.
//!
//! Every option the command line accepts may also come from a file given
//! with `--config`. Keys use the command-line names:
//!
//! ```yaml
//! database: ./db
//! table: members
//! email_col: email
//! where:
//!   email: "%@%"
//!   status: lapsed
//! not_where:
//!   status: 1
//! sort_by: [surname, name]
//! subject: "Your membership, {$name}"
//! ```
//!
//! Command-line values win. A list given on the command line replaces the
//! file's list instead of extending it.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use serde_yaml::{Mapping, Value};
use tablemail_pipe::DEFAULT_TIMEOUT;
use tablemail_select::{PageWindow, SelectionCriteria};
use tablemail_template::DEFAULT_DELIMITER;
use thiserror::Error;

use crate::mailer::{DEFAULT_MAILER, STDOUT_MAILER};
use crate::orchestrator::{Recipients, Selection, DEFAULT_ROW_SEPARATOR};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file '{}': {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config file '{}': {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("invalid config file '{}': '{key}' must map column names to values", .path.display())]
    NotAMap { path: PathBuf, key: &'static str },
}

/// A problem with the options themselves. Reported with the usage text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UsageError {
    #[error("--database is required")]
    MissingDatabase,
    #[error("--table is required")]
    MissingTable,
    #[error("one of --email_address or --email_col is required")]
    MissingRecipients,
    #[error("--email_address and --email_col cannot be used together")]
    ConflictingRecipients,
}

/// Parses `column=value`. A bare `column` means `column=1`, so flag
/// options can be written `--not_where email`.
pub fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    let (key, value) = match raw.split_once('=') {
        Some((key, value)) => (key.trim(), value),
        None => (raw.trim(), "1"),
    };
    if key.is_empty() {
        return Err(format!("expected COLUMN=VALUE, got '{}'", raw));
    }
    Ok((key.to_string(), value.to_string()))
}

/// All options, after parsing, before validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Options {
    pub database: Option<PathBuf>,
    pub table: Option<String>,
    pub email_address: Vec<String>,
    pub email_col: Option<String>,
    pub where_: Vec<(String, String)>,
    pub not_where: Vec<(String, String)>,
    pub sort_by: Vec<String>,
    pub sort_reversed: Vec<(String, String)>,
    pub show: Vec<String>,
    pub limit: Option<usize>,
    pub page: Option<usize>,
    pub row_template: Option<String>,
    pub subject: Option<String>,
    pub mailer: Option<String>,
    pub from: Option<String>,
    pub field_separator: Option<String>,
    pub row_separator: Option<String>,
    pub mail_timeout: Option<u64>,
    pub dry_run: bool,
    pub verbose: bool,
    pub debug: bool,
}

fn pick<T>(over: Option<T>, under: Option<T>) -> Option<T> {
    over.or(under)
}

fn pick_list<T>(over: Vec<T>, under: Vec<T>) -> Vec<T> {
    if over.is_empty() {
        under
    } else {
        over
    }
}

impl Options {
    /// Reads options from a YAML file.
    pub fn from_file(path: &Path) -> Result<Options, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&text, path)
    }

    /// Parses YAML options; `path` is only used in error messages.
    pub fn from_yaml(text: &str, path: &Path) -> Result<Options, ConfigError> {
        let parse_error = |source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        };
        if text.trim().is_empty() {
            return FileOptions::default().into_options(path);
        }
        let file: FileOptions = match serde_yaml::from_str(text).map_err(parse_error)? {
            Value::Null => FileOptions::default(),
            value => serde_yaml::from_value(value).map_err(parse_error)?,
        };
        file.into_options(path)
    }

    /// `self` over `base`: values set here win.
    ///
    /// The two recipient options travel together: naming either one here
    /// drops both from `base`.
    pub fn overlay(self, base: Options) -> Options {
        let (email_address, email_col) =
            if self.email_address.is_empty() && self.email_col.is_none() {
                (base.email_address, base.email_col)
            } else {
                (self.email_address, self.email_col)
            };
        Options {
            database: pick(self.database, base.database),
            table: pick(self.table, base.table),
            email_address,
            email_col,
            where_: pick_list(self.where_, base.where_),
            not_where: pick_list(self.not_where, base.not_where),
            sort_by: pick_list(self.sort_by, base.sort_by),
            sort_reversed: pick_list(self.sort_reversed, base.sort_reversed),
            show: pick_list(self.show, base.show),
            limit: pick(self.limit, base.limit),
            page: pick(self.page, base.page),
            row_template: pick(self.row_template, base.row_template),
            subject: pick(self.subject, base.subject),
            mailer: pick(self.mailer, base.mailer),
            from: pick(self.from, base.from),
            field_separator: pick(self.field_separator, base.field_separator),
            row_separator: pick(self.row_separator, base.row_separator),
            mail_timeout: pick(self.mail_timeout, base.mail_timeout),
            dry_run: self.dry_run || base.dry_run,
            verbose: self.verbose || base.verbose,
            debug: self.debug || base.debug,
        }
    }

    pub fn criteria(&self) -> SelectionCriteria {
        SelectionCriteria::build(
            self.where_.iter().cloned(),
            self.not_where.iter().map(|(k, v)| (k.as_str(), v.as_str())),
            self.sort_by.iter().cloned(),
            self.sort_reversed
                .iter()
                .map(|(k, v)| (k.as_str(), v.as_str())),
        )
    }

    pub fn window(&self) -> PageWindow {
        PageWindow::new(self.limit.unwrap_or(0), self.page.unwrap_or(1))
    }

    pub fn row_separator(&self) -> &str {
        self.row_separator.as_deref().unwrap_or(DEFAULT_ROW_SEPARATOR)
    }

    /// The mailer setting in effect; `--dry_run` forces `stdout`.
    pub fn mailer_setting(&self) -> &str {
        if self.dry_run {
            STDOUT_MAILER
        } else {
            self.mailer.as_deref().unwrap_or(DEFAULT_MAILER)
        }
    }

    pub fn mail_timeout(&self) -> Duration {
        self.mail_timeout
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_TIMEOUT)
    }

    pub fn database(&self) -> Result<&Path, UsageError> {
        self.database.as_deref().ok_or(UsageError::MissingDatabase)
    }

    /// The selection described by these options.
    pub fn selection(&self) -> Result<Selection, UsageError> {
        let table = self.table.as_deref().ok_or(UsageError::MissingTable)?;
        Ok(Selection {
            table: table.to_string(),
            show: self.show.clone(),
            criteria: self.criteria(),
            window: self.window(),
            row_template: self.row_template.clone(),
            field_separator: self
                .field_separator
                .clone()
                .unwrap_or_else(|| DEFAULT_DELIMITER.to_string()),
        })
    }

    /// Exactly one of `email_address` and `email_col` must be given.
    pub fn recipients(&self) -> Result<Recipients, UsageError> {
        match (self.email_address.is_empty(), &self.email_col) {
            (false, Some(_)) => Err(UsageError::ConflictingRecipients),
            (false, None) => Ok(Recipients::Broadcast(self.email_address.clone())),
            (true, Some(column)) => Ok(Recipients::Column(column.clone())),
            (true, None) => Err(UsageError::MissingRecipients),
        }
    }
}

/// The on-disk shape of an options file.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileOptions {
    database: Option<PathBuf>,
    table: Option<String>,
    email_address: OneOrMany,
    email_col: Option<String>,
    #[serde(rename = "where")]
    where_: Option<Value>,
    not_where: Option<Value>,
    sort_by: OneOrMany,
    sort_reversed: Option<Value>,
    show: OneOrMany,
    limit: Option<usize>,
    page: Option<usize>,
    row_template: Option<String>,
    subject: Option<String>,
    mailer: Option<String>,
    from: Option<String>,
    field_separator: Option<String>,
    row_separator: Option<String>,
    mail_timeout: Option<u64>,
    dry_run: bool,
    verbose: bool,
    debug: bool,
}

/// A single string or a list of strings.
#[derive(Debug, Default, Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    #[default]
    None,
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    fn into_vec(self) -> Vec<String> {
        match self {
            OneOrMany::None => Vec::new(),
            OneOrMany::One(s) => vec![s],
            OneOrMany::Many(v) => v,
        }
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(if *b { "1" } else { "0" }.to_string()),
        Value::Null => Some(String::new()),
        _ => None,
    }
}

/// Reads a `column: value` mapping in file order.
fn pairs(
    value: Option<Value>,
    key: &'static str,
    path: &Path,
) -> Result<Vec<(String, String)>, ConfigError> {
    let not_a_map = || ConfigError::NotAMap {
        path: path.to_path_buf(),
        key,
    };
    let map: Mapping = match value {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Mapping(map)) => map,
        Some(_) => return Err(not_a_map()),
    };
    map.iter()
        .map(|(k, v)| match (scalar_text(k), scalar_text(v)) {
            (Some(k), Some(v)) if !k.is_empty() => Ok((k, v)),
            _ => Err(not_a_map()),
        })
        .collect()
}

impl FileOptions {
    fn into_options(self, path: &Path) -> Result<Options, ConfigError> {
        Ok(Options {
            database: self.database,
            table: self.table,
            email_address: self.email_address.into_vec(),
            email_col: self.email_col,
            where_: pairs(self.where_, "where", path)?,
            not_where: pairs(self.not_where, "not_where", path)?,
            sort_by: self.sort_by.into_vec(),
            sort_reversed: pairs(self.sort_reversed, "sort_reversed", path)?,
            show: self.show.into_vec(),
            limit: self.limit,
            page: self.page,
            row_template: self.row_template,
            subject: self.subject,
            mailer: self.mailer,
            from: self.from,
            field_separator: self.field_separator,
            row_separator: self.row_separator,
            mail_timeout: self.mail_timeout,
            dry_run: self.dry_run,
            verbose: self.verbose,
            debug: self.debug,
        })
    }
}
