//! The table viewer: three pages over one database.
//!
//! - no table: the list of tables
//! - a table, no search: the search form (the table's columns)
//! - a table and a search: the rendered report page
//!
//! The viewer only routes. Reports go through the same
//! [`Orchestrator`] the mailer uses.

use minijinja::{context, Environment};
use thiserror::Error;

use crate::config::{Options, UsageError};
use crate::error::{ConnectError, QueryError, RunError};
use crate::orchestrator::Orchestrator;
use crate::source::{open, Connection, RowSource};

const TABLES_PAGE: &str = "\
Tables in {{ database }}:
{% for table in tables %}
  {{ table }}
{% else %}
  (none)
{% endfor %}
";

const SEARCH_PAGE: &str = "\
Search {{ table }}
Columns:
{% for column in columns %}
  {{ column }}
{% endfor %}

Run: tableview --database {{ database }} --table {{ table }} --search [--where COLUMN=PATTERN]... [--sort_by COLUMN]...
";

const REPORT_PAGE: &str = "\
{{ table }}, page {{ page }}
{% if lines %}
{{ text }}
{% else %}
(no matching rows)
{% endif %}
{% if has_next %}
next: --page {{ page + 1 }}
{% endif %}
";

/// Which page to show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Tables,
    SearchForm { table: String },
    Report { table: String },
}

impl Route {
    pub fn new(table: Option<&str>, search: bool) -> Self {
        match table {
            None => Route::Tables,
            Some(table) if search => Route::Report {
                table: table.to_string(),
            },
            Some(table) => Route::SearchForm {
                table: table.to_string(),
            },
        }
    }
}

#[derive(Debug, Error)]
pub enum ViewError {
    #[error(transparent)]
    Usage(#[from] UsageError),
    #[error(transparent)]
    Connect(#[from] ConnectError),
    #[error(transparent)]
    Query(#[from] QueryError),
    #[error(transparent)]
    Run(#[from] RunError),
    #[error("cannot render page: {0}")]
    Render(#[from] minijinja::Error),
}

fn environment() -> Result<Environment<'static>, minijinja::Error> {
    let mut env = Environment::new();
    env.set_trim_blocks(true);
    env.set_lstrip_blocks(true);
    env.set_keep_trailing_newline(true);
    env.add_template("tables.txt", TABLES_PAGE)?;
    env.add_template("search.txt", SEARCH_PAGE)?;
    env.add_template("report.txt", REPORT_PAGE)?;
    Ok(env)
}

/// Renders the page for `route`.
pub fn render<S: RowSource>(
    source: &S,
    options: &Options,
    route: &Route,
) -> Result<String, ViewError> {
    let env = environment()?;
    let database = options
        .database
        .as_deref()
        .map(|p| p.display().to_string())
        .unwrap_or_default();

    match route {
        Route::Tables => {
            let mut conn = open(source)?;
            let tables = conn.list_tables()?;
            conn.close();
            Ok(env
                .get_template("tables.txt")?
                .render(context! { database, tables })?)
        }
        Route::SearchForm { table } => {
            let mut conn = open(source)?;
            let columns = conn.list_columns(table)?;
            conn.close();
            Ok(env
                .get_template("search.txt")?
                .render(context! { database, table, columns })?)
        }
        Route::Report { table } => {
            let mut selection = options.selection()?;
            selection.table = table.clone();
            let page = Orchestrator::new(source).report(&selection, options.row_separator())?;
            Ok(env.get_template("report.txt")?.render(context! {
                table,
                page => page.page,
                has_next => page.has_next,
                lines => page.lines,
                text => page.text,
            })?)
        }
    }
}
