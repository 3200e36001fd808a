//! Compiled template representation.

/// One rendering instruction of a compiled template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Verbatim output.
    Literal(String),
    /// Replaced by the row's value for the column, or nothing.
    Var(String),
    /// Branches on whether a column has a non-empty value.
    Conditional(Conditional),
}

/// A conditional block keyed on one column.
///
/// The branches may reference any column of the row, not only `column`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conditional {
    /// Column whose value decides the branch.
    pub column: String,
    /// Rendered when the column has a non-empty value.
    pub then_branch: Vec<Segment>,
    /// Rendered otherwise, if present.
    pub else_branch: Option<Vec<Segment>>,
}

impl Segment {
    /// Creates a literal segment.
    pub fn literal(text: impl Into<String>) -> Self {
        Segment::Literal(text.into())
    }

    /// Creates a variable reference segment.
    pub fn var(column: impl Into<String>) -> Self {
        Segment::Var(column.into())
    }

    /// Creates a conditional segment.
    pub fn conditional(
        column: impl Into<String>,
        then_branch: Vec<Segment>,
        else_branch: Option<Vec<Segment>>,
    ) -> Self {
        Segment::Conditional(Conditional {
            column: column.into(),
            then_branch,
            else_branch,
        })
    }
}
