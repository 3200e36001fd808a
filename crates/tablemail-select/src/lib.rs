//! Row selection for tablemail: criteria, LIKE matching, ordering, paging.
//!
//! This crate provides the pieces between a front end and a row source:
//!
//! - [`SelectionCriteria::build`] normalizes `where` / `not_where` /
//!   `sort_by` / `sort_reversed` inputs into ordered predicates and sort
//!   keys
//! - [`LikePattern`] implements SQL LIKE wildcards (`%`, `_`)
//! - [`PageWindow`] models LIMIT plus a 1-based page number
//! - [`select`] executes all of the above against a table held in memory
//!
//! # Quick Start
//!
//! ```rust
//! use tablemail_select::{select, Columns, PageWindow, Row, RowSet, SelectionCriteria};
//!
//! let table = RowSet::new(
//!     vec!["name".into(), "email".into()],
//!     vec![
//!         Row::from_pairs([("name", "Ada"), ("email", "ada@example.com")]),
//!         Row::from_pairs([("name", "Bob"), ("email", "bob@example.org")]),
//!     ],
//! );
//!
//! let criteria = SelectionCriteria::build(
//!     [("email", "%.com")],
//!     [("email", "1")],
//!     ["name"],
//!     Vec::<(String, String)>::new(),
//! );
//!
//! let page = select(&table, &Columns::All, &criteria, PageWindow::unbounded()).unwrap();
//! assert_eq!(page.rows[0].get("name"), Some("Bob"));
//! ```
//!
//! # Selection Semantics
//!
//! ```text
//! match = every clause holds
//! clause holds = (value LIKE pattern) XOR negated
//! ```
//!
//! Sorting is stable. Numeric values compare numerically and sort before
//! other text; empty values sort last (first when reversed).

mod criteria;
mod error;
mod like;
mod ordering;
mod page;
mod query;
mod row;

pub use criteria::{is_flag_set, SelectionCriteria, WhereClause};
pub use error::{Result, SelectError};
pub use like::LikePattern;
pub use ordering::{compare_cells, compare_rows, Dir, SortKey};
pub use page::PageWindow;
pub use query::{select, Columns, CompiledCriteria};
pub use row::{Row, RowSet};
