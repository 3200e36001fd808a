//! A row source backed by a directory of CSV files.
//!
//! The database is a directory; every `<table>.csv` inside it is a table
//! whose first record names the columns.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tablemail_select::{select, Columns, PageWindow, Row, RowSet, SelectionCriteria};
use tracing::debug;

use crate::error::{ConnectError, QueryError};
use crate::source::{Connection, RowSource};

const EXTENSION: &str = "csv";

/// CSV directory row source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvRowSource {
    dir: PathBuf,
}

impl CsvRowSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        CsvRowSource { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl RowSource for CsvRowSource {
    type Connection = CsvConnection;

    fn connect(&self) -> Result<CsvConnection, ConnectError> {
        let meta = fs::metadata(&self.dir).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                ConnectError::NotFound {
                    path: self.dir.clone(),
                }
            } else {
                ConnectError::Io {
                    path: self.dir.clone(),
                    source,
                }
            }
        })?;
        if !meta.is_dir() {
            return Err(ConnectError::NotFound {
                path: self.dir.clone(),
            });
        }
        debug!(dir = %self.dir.display(), "opened csv database");
        Ok(CsvConnection {
            dir: self.dir.clone(),
            tables: HashMap::new(),
        })
    }
}

/// An open CSV database. Tables are read on first use and kept for the
/// life of the connection.
#[derive(Debug)]
pub struct CsvConnection {
    dir: PathBuf,
    tables: HashMap<String, RowSet>,
}

impl CsvConnection {
    fn table_path(&self, table: &str) -> Option<PathBuf> {
        let valid = !table.is_empty()
            && !table.starts_with('.')
            && table
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'_' | b'-' | b'.'));
        valid.then(|| self.dir.join(format!("{}.{}", table, EXTENSION)))
    }

    fn load(&mut self, table: &str) -> Result<&RowSet, QueryError> {
        if !self.tables.contains_key(table) {
            let unknown = || QueryError::UnknownTable {
                table: table.to_string(),
            };
            let path = self.table_path(table).ok_or_else(unknown)?;
            if !path.is_file() {
                return Err(unknown());
            }
            let rows = read_table(&path).map_err(|source| QueryError::Csv {
                table: table.to_string(),
                source,
            })?;
            debug!(table, rows = rows.len(), "loaded table");
            self.tables.insert(table.to_string(), rows);
        }
        self.tables.get(table).ok_or_else(|| QueryError::UnknownTable {
            table: table.to_string(),
        })
    }
}

fn read_table(path: &Path) -> Result<RowSet, csv::Error> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)?;

    let columns: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    let shared: Arc<[String]> = columns.clone().into();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let values = record.iter().map(str::to_string).collect();
        rows.push(Row::new(Arc::clone(&shared), values));
    }
    Ok(RowSet::new(columns, rows))
}

impl Connection for CsvConnection {
    fn fetch_rows(
        &mut self,
        table: &str,
        columns: &Columns,
        criteria: &SelectionCriteria,
        window: PageWindow,
    ) -> Result<RowSet, QueryError> {
        let data = self.load(table)?;
        select(data, columns, criteria, window).map_err(|e| QueryError::from_select(table, e))
    }

    fn list_tables(&mut self) -> Result<Vec<String>, QueryError> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                if self.table_path(stem).is_some() {
                    names.push(stem.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    fn list_columns(&mut self, table: &str) -> Result<Vec<String>, QueryError> {
        Ok(self.load(table)?.columns.clone())
    }

    fn disconnect(&mut self) {
        self.tables.clear();
        debug!(dir = %self.dir.display(), "closed csv database");
    }
}
