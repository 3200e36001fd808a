//! Row and result-set types.
//!
//! A [`Row`] is an ordered mapping from column name to string value. Rows of
//! one result set share their column list.

use std::sync::Arc;

use tablemail_template::Fields;

/// One result record.
///
/// Values are strings; the empty string stands for "no value".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    columns: Arc<[String]>,
    values: Vec<String>,
}

impl Row {
    /// Creates a row. Missing trailing values are filled with empty strings.
    pub fn new(columns: Arc<[String]>, mut values: Vec<String>) -> Self {
        values.resize(columns.len(), String::new());
        Row { columns, values }
    }

    /// Builds a row from `(column, value)` pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let (columns, values): (Vec<String>, Vec<String>) = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .unzip();
        Row {
            columns: columns.into(),
            values,
        }
    }

    /// Returns the value of a column, if the row has that column.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.columns
            .iter()
            .position(|c| c == column)
            .map(|i| self.values[i].as_str())
    }

    /// The row's column names, in order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Iterates `(column, value)` pairs in column order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.columns
            .iter()
            .zip(&self.values)
            .map(|(c, v)| (c.as_str(), v.as_str()))
    }

    /// Keeps only the given columns, in the given order.
    ///
    /// Columns the row lacks come out empty.
    pub fn project(&self, columns: &Arc<[String]>) -> Row {
        let values = columns
            .iter()
            .map(|c| self.get(c).unwrap_or_default().to_string())
            .collect();
        Row {
            columns: Arc::clone(columns),
            values,
        }
    }
}

impl Fields for Row {
    fn field(&self, name: &str) -> Option<&str> {
        self.get(name)
    }
}

/// An ordered list of rows plus the column list they were produced with.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RowSet {
    /// Column names, in order.
    pub columns: Vec<String>,
    /// Rows, in the order the source returned them.
    pub rows: Vec<Row>,
}

impl RowSet {
    /// Creates a row set.
    pub fn new(columns: Vec<String>, rows: Vec<Row>) -> Self {
        RowSet { columns, rows }
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if there are no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
