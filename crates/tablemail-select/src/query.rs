//! In-memory execution of selection criteria.
//!
//! Row sources that hold their data in memory (files, fixtures) use
//! [`select`] to apply criteria, ordering and a page window the way a SQL
//! backend would.

use std::sync::Arc;

use crate::criteria::SelectionCriteria;
use crate::error::{Result, SelectError};
use crate::like::LikePattern;
use crate::ordering::{compare_rows, SortKey};
use crate::page::PageWindow;
use crate::row::{Row, RowSet};

/// Which columns a fetch returns.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Columns {
    /// Every column of the table, in table order.
    #[default]
    All,
    /// Only these columns, in this order.
    Only(Vec<String>),
}

impl Columns {
    /// `All` for an empty list, otherwise `Only(list)`.
    pub fn from_list(list: Vec<String>) -> Self {
        if list.is_empty() {
            Columns::All
        } else {
            Columns::Only(list)
        }
    }
}

/// Criteria with their LIKE patterns compiled.
///
/// All clauses must hold for a row to match: a positive clause holds when
/// its pattern matches, a negated clause when it does not.
#[derive(Debug, Clone)]
pub struct CompiledCriteria {
    clauses: Vec<(String, LikePattern, bool)>,
    sort_list: Vec<SortKey>,
}

impl CompiledCriteria {
    /// Compiles every pattern of `criteria`.
    ///
    /// # Errors
    ///
    /// Returns [`SelectError::InvalidPattern`] for a pattern that cannot be
    /// compiled.
    pub fn new(criteria: &SelectionCriteria) -> Result<Self> {
        let clauses = criteria
            .where_list
            .iter()
            .map(|c| Ok((c.column.clone(), LikePattern::new(&c.pattern)?, c.negated)))
            .collect::<Result<Vec<_>>>()?;
        Ok(CompiledCriteria {
            clauses,
            sort_list: criteria.sort_list.clone(),
        })
    }

    /// Returns true if `row` satisfies every clause.
    ///
    /// A column the row lacks is matched as the empty string.
    pub fn matches(&self, row: &Row) -> bool {
        self.clauses.iter().all(|(column, pattern, negated)| {
            pattern.matches(row.get(column).unwrap_or_default()) != *negated
        })
    }

    /// Filters and stably sorts rows.
    pub fn filter(&self, rows: &[Row]) -> Vec<Row> {
        let mut results: Vec<Row> = rows.iter().filter(|r| self.matches(r)).cloned().collect();
        if !self.sort_list.is_empty() {
            results.sort_by(|a, b| compare_rows(a, b, &self.sort_list));
        }
        results
    }
}

/// Runs a selection against a whole table held in memory.
///
/// Steps: validate column names, filter, sort, cut the page, project the
/// requested columns.
///
/// # Errors
///
/// Returns [`SelectError::UnknownColumn`] if the criteria or the column
/// list name a column `table` lacks, and [`SelectError::InvalidPattern`]
/// for an uncompilable pattern.
pub fn select(
    table: &RowSet,
    columns: &Columns,
    criteria: &SelectionCriteria,
    window: PageWindow,
) -> Result<RowSet> {
    let requested: Vec<&str> = match columns {
        Columns::All => Vec::new(),
        Columns::Only(list) => list.iter().map(String::as_str).collect(),
    };
    for column in criteria.columns().into_iter().chain(requested) {
        if !table.columns.iter().any(|c| c == column) {
            return Err(SelectError::UnknownColumn {
                column: column.to_string(),
            });
        }
    }

    let compiled = CompiledCriteria::new(criteria)?;
    let page = window.apply(compiled.filter(&table.rows));

    match columns {
        Columns::All => Ok(RowSet::new(table.columns.clone(), page)),
        Columns::Only(list) => {
            let shared: Arc<[String]> = list.iter().cloned().collect();
            let rows = page.iter().map(|r| r.project(&shared)).collect();
            Ok(RowSet::new(list.clone(), rows))
        }
    }
}
