//! Selection criteria and the builder that normalizes user input into them.
//!
//! Front ends collect four loosely typed inputs: `where` (column to LIKE
//! pattern), `not_where` (column to flag), `sort_by` (ordered column names)
//! and `sort_reversed` (column to flag). [`SelectionCriteria::build`] turns
//! them into an ordered predicate list and an ordered sort list.
//!
//! The builder never looks at a schema. Unknown column names pass through
//! untouched and are rejected by whichever row source executes the
//! criteria.

use crate::ordering::{Dir, SortKey};

/// One `column LIKE pattern` predicate, optionally negated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WhereClause {
    /// The column to match.
    pub column: String,
    /// LIKE pattern (`%` any run, `_` one character).
    pub pattern: String,
    /// When true the clause selects rows that do NOT match.
    pub negated: bool,
}

impl WhereClause {
    /// Creates a positive clause.
    pub fn like(column: impl Into<String>, pattern: impl Into<String>) -> Self {
        WhereClause {
            column: column.into(),
            pattern: pattern.into(),
            negated: false,
        }
    }

    /// Creates a negated clause.
    pub fn not_like(column: impl Into<String>, pattern: impl Into<String>) -> Self {
        WhereClause {
            negated: true,
            ..Self::like(column, pattern)
        }
    }
}

/// Normalized predicates and ordering handed to a row source.
///
/// All clauses are ANDed together. Sort keys are in precedence order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SelectionCriteria {
    /// Predicates, in the order their columns were first given.
    pub where_list: Vec<WhereClause>,
    /// Sort keys, primary first.
    pub sort_list: Vec<SortKey>,
}

impl SelectionCriteria {
    /// Creates empty criteria: every row, source order.
    pub fn new() -> Self {
        SelectionCriteria::default()
    }

    /// Builds criteria from front-end inputs.
    ///
    /// - Every `where_` column yields a clause. It is negated iff the same
    ///   column is flagged in `not_where`. A repeated column keeps its first
    ///   position and its last pattern.
    /// - A `not_where` column with no `where_` entry is ignored: there is no
    ///   criterion to negate.
    /// - Every `sort_by` column yields a sort key, descending iff flagged in
    ///   `sort_reversed`.
    ///
    /// A flag is set when its value is non-empty and not `"0"`; the last
    /// occurrence of a column wins.
    pub fn build<W, N, S, R, K, V, C, NK, NV, RK, RV>(
        where_: W,
        not_where: N,
        sort_by: S,
        sort_reversed: R,
    ) -> Self
    where
        W: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
        N: IntoIterator<Item = (NK, NV)>,
        NK: AsRef<str>,
        NV: AsRef<str>,
        S: IntoIterator<Item = C>,
        C: Into<String>,
        R: IntoIterator<Item = (RK, RV)>,
        RK: AsRef<str>,
        RV: AsRef<str>,
    {
        let negated = flagged(not_where);
        let reversed = flagged(sort_reversed);

        let mut where_list: Vec<WhereClause> = Vec::new();
        for (column, pattern) in where_ {
            let column = column.into();
            let pattern = pattern.into();
            match where_list.iter_mut().find(|c| c.column == column) {
                Some(existing) => existing.pattern = pattern,
                None => where_list.push(WhereClause::like(column, pattern)),
            }
        }
        for clause in &mut where_list {
            clause.negated = negated.iter().any(|c| *c == clause.column);
        }

        let sort_list = sort_by
            .into_iter()
            .map(|column| {
                let column = column.into();
                let dir = Dir::from_reversed(reversed.iter().any(|c| *c == column));
                SortKey::new(column, dir)
            })
            .collect();

        SelectionCriteria {
            where_list,
            sort_list,
        }
    }

    /// Adds a clause.
    pub fn and(mut self, clause: WhereClause) -> Self {
        self.where_list.push(clause);
        self
    }

    /// Adds a sort key.
    pub fn order_by(mut self, key: SortKey) -> Self {
        self.sort_list.push(key);
        self
    }

    /// Returns true if the criteria select every row in source order.
    pub fn is_empty(&self) -> bool {
        self.where_list.is_empty() && self.sort_list.is_empty()
    }

    /// Every column the criteria mention, in order, without repeats.
    pub fn columns(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        let names = self
            .where_list
            .iter()
            .map(|c| c.column.as_str())
            .chain(self.sort_list.iter().map(|k| k.column.as_str()));
        for name in names {
            if !out.contains(&name) {
                out.push(name);
            }
        }
        out
    }
}

/// Returns true if a flag value counts as set.
pub fn is_flag_set(value: &str) -> bool {
    !value.is_empty() && value != "0"
}

/// Resolves `(column, flag)` pairs to the columns whose last flag is set.
fn flagged<I, K, V>(pairs: I) -> Vec<String>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut out: Vec<(String, bool)> = Vec::new();
    for (column, value) in pairs {
        let column = column.as_ref();
        let set = is_flag_set(value.as_ref());
        match out.iter_mut().find(|(c, _)| c == column) {
            Some(entry) => entry.1 = set,
            None => out.push((column.to_string(), set)),
        }
    }
    out.into_iter()
        .filter(|(_, set)| *set)
        .map(|(column, _)| column)
        .collect()
}
