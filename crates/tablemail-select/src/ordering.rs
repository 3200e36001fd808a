//! Ordering types for sorting rows.
//!
//! Provides [`Dir`] for sort direction and [`SortKey`] for column-based
//! ordering.

use std::cmp::Ordering;

use crate::row::Row;

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Dir {
    /// Ascending order (smallest first).
    #[default]
    Asc,
    /// Descending order (largest first).
    Desc,
}

impl Dir {
    /// Direction for a `reversed` flag.
    pub fn from_reversed(reversed: bool) -> Self {
        if reversed {
            Dir::Desc
        } else {
            Dir::Asc
        }
    }

    /// Returns `true` if this is descending order.
    pub fn is_desc(self) -> bool {
        matches!(self, Dir::Desc)
    }

    /// Applies this direction to an ordering.
    pub fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            Dir::Asc => ordering,
            Dir::Desc => ordering.reverse(),
        }
    }

    /// Returns the SQL keyword for this direction.
    pub fn as_str(self) -> &'static str {
        match self {
            Dir::Asc => "asc",
            Dir::Desc => "desc",
        }
    }
}

impl std::fmt::Display for Dir {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single ordering clause: a column and a direction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    /// The column to sort by.
    pub column: String,
    /// The sort direction.
    pub dir: Dir,
}

impl SortKey {
    /// Creates a new ordering with the given direction.
    pub fn new(column: impl Into<String>, dir: Dir) -> Self {
        SortKey {
            column: column.into(),
            dir,
        }
    }

    /// Creates a new ascending ordering for the given column.
    pub fn asc(column: impl Into<String>) -> Self {
        Self::new(column, Dir::Asc)
    }

    /// Creates a new descending ordering for the given column.
    pub fn desc(column: impl Into<String>) -> Self {
        Self::new(column, Dir::Desc)
    }

    /// Returns true if this key sorts in descending order.
    pub fn reversed(&self) -> bool {
        self.dir.is_desc()
    }

    /// Compares two cell values according to this key.
    pub fn compare(&self, a: &str, b: &str) -> Ordering {
        self.dir.apply(compare_cells(a, b))
    }
}

/// Compares two cell values.
///
/// Empty values sort after everything else. Values that parse as finite
/// numbers compare numerically and sort before all other text, which
/// compares byte-wise. This keeps the order total for mixed columns.
pub fn compare_cells(a: &str, b: &str) -> Ordering {
    match (a.is_empty(), b.is_empty()) {
        (true, true) => return Ordering::Equal,
        (true, false) => return Ordering::Greater,
        (false, true) => return Ordering::Less,
        (false, false) => {}
    }

    match (as_number(a), as_number(b)) {
        (Some(x), Some(y)) => x.total_cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.cmp(b),
    }
}

fn as_number(cell: &str) -> Option<f64> {
    cell.trim().parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Compares two rows using a list of sort keys.
///
/// The first key is the primary sort key, the second breaks ties, and so
/// on. Columns a row lacks compare as empty.
pub fn compare_rows(a: &Row, b: &Row, keys: &[SortKey]) -> Ordering {
    for key in keys {
        let ordering = key.compare(
            a.get(&key.column).unwrap_or_default(),
            b.get(&key.column).unwrap_or_default(),
        );
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}
