//! Row sources: where rows come from.
//!
//! A [`RowSource`] hands out one [`Connection`] per run. The connection
//! answers fetches and is released when the run ends, through
//! [`ConnectionGuard`], on every exit path.

use std::collections::BTreeMap;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tablemail_select::{select, Columns, PageWindow, RowSet, SelectionCriteria};
use tracing::debug;

use crate::error::{ConnectError, QueryError};

/// Something that can be connected to for rows.
pub trait RowSource {
    type Connection: Connection;

    /// Opens a connection. No retry is attempted on failure.
    fn connect(&self) -> Result<Self::Connection, ConnectError>;
}

/// An open connection to a row source.
pub trait Connection {
    /// Fetches one page of rows from `table`.
    ///
    /// The result holds only the requested `columns` (or all of them), the
    /// rows that satisfy `criteria`, ordered by its sort keys and cut to
    /// `window`. A page past the end is empty, not an error.
    fn fetch_rows(
        &mut self,
        table: &str,
        columns: &Columns,
        criteria: &SelectionCriteria,
        window: PageWindow,
    ) -> Result<RowSet, QueryError>;

    /// Names of the tables this source holds, sorted.
    fn list_tables(&mut self) -> Result<Vec<String>, QueryError>;

    /// Column names of `table`, in table order.
    fn list_columns(&mut self, table: &str) -> Result<Vec<String>, QueryError>;

    /// Releases the connection. Called once, by [`ConnectionGuard`].
    fn disconnect(&mut self);
}

/// Owns a connection and disconnects it when dropped.
pub struct ConnectionGuard<C: Connection> {
    conn: Option<C>,
}

impl<C: Connection> ConnectionGuard<C> {
    pub fn new(conn: C) -> Self {
        ConnectionGuard { conn: Some(conn) }
    }

    /// Disconnects now instead of at end of scope.
    pub fn close(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(mut conn) = self.conn.take() {
            conn.disconnect();
            debug!("connection released");
        }
    }
}

impl<C: Connection> Deref for ConnectionGuard<C> {
    type Target = C;

    fn deref(&self) -> &C {
        // `conn` is only taken by `release`, which consumes or drops the guard.
        match &self.conn {
            Some(conn) => conn,
            None => unreachable!("connection used after release"),
        }
    }
}

impl<C: Connection> DerefMut for ConnectionGuard<C> {
    fn deref_mut(&mut self) -> &mut C {
        match &mut self.conn {
            Some(conn) => conn,
            None => unreachable!("connection used after release"),
        }
    }
}

impl<C: Connection> Drop for ConnectionGuard<C> {
    fn drop(&mut self) {
        self.release();
    }
}

/// Connects to `source` and wraps the connection in a guard.
pub fn open<S: RowSource>(source: &S) -> Result<ConnectionGuard<S::Connection>, ConnectError> {
    source.connect().map(ConnectionGuard::new)
}

/// Connection counters shared by a [`MemoryRowSource`] and its connections.
#[derive(Debug, Default)]
struct Counters {
    connects: AtomicUsize,
    disconnects: AtomicUsize,
}

/// A row source holding its tables in memory.
///
/// Useful for tests and for callers that already have their rows.
#[derive(Debug, Clone)]
pub struct MemoryRowSource {
    tables: Arc<BTreeMap<String, RowSet>>,
    reachable: bool,
    counters: Arc<Counters>,
}

impl Default for MemoryRowSource {
    fn default() -> Self {
        MemoryRowSource {
            tables: Arc::default(),
            reachable: true,
            counters: Arc::default(),
        }
    }
}

impl MemoryRowSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// A source whose `connect` always fails.
    pub fn unreachable() -> Self {
        MemoryRowSource {
            reachable: false,
            ..Self::default()
        }
    }

    /// Adds or replaces a table.
    pub fn with_table(mut self, name: impl Into<String>, table: RowSet) -> Self {
        Arc::make_mut(&mut self.tables).insert(name.into(), table);
        self
    }

    /// How many connections have been opened.
    pub fn connects(&self) -> usize {
        self.counters.connects.load(Ordering::SeqCst)
    }

    /// How many connections have been released.
    pub fn disconnects(&self) -> usize {
        self.counters.disconnects.load(Ordering::SeqCst)
    }
}

impl RowSource for MemoryRowSource {
    type Connection = MemoryConnection;

    fn connect(&self) -> Result<MemoryConnection, ConnectError> {
        if !self.reachable {
            return Err(ConnectError::NotFound {
                path: "memory".into(),
            });
        }
        self.counters.connects.fetch_add(1, Ordering::SeqCst);
        Ok(MemoryConnection {
            tables: Arc::clone(&self.tables),
            counters: Arc::clone(&self.counters),
        })
    }
}

/// A connection to a [`MemoryRowSource`].
#[derive(Debug)]
pub struct MemoryConnection {
    tables: Arc<BTreeMap<String, RowSet>>,
    counters: Arc<Counters>,
}

impl MemoryConnection {
    fn table(&self, table: &str) -> Result<&RowSet, QueryError> {
        self.tables.get(table).ok_or_else(|| QueryError::UnknownTable {
            table: table.to_string(),
        })
    }
}

impl Connection for MemoryConnection {
    fn fetch_rows(
        &mut self,
        table: &str,
        columns: &Columns,
        criteria: &SelectionCriteria,
        window: PageWindow,
    ) -> Result<RowSet, QueryError> {
        select(self.table(table)?, columns, criteria, window)
            .map_err(|e| QueryError::from_select(table, e))
    }

    fn list_tables(&mut self) -> Result<Vec<String>, QueryError> {
        Ok(self.tables.keys().cloned().collect())
    }

    fn list_columns(&mut self, table: &str) -> Result<Vec<String>, QueryError> {
        Ok(self.table(table)?.columns.clone())
    }

    fn disconnect(&mut self) {
        self.counters.disconnects.fetch_add(1, Ordering::SeqCst);
    }
}
