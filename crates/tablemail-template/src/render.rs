//! Rendering compiled segments against a row.

use std::collections::{BTreeMap, HashMap};
use std::hash::BuildHasher;

use crate::segment::Segment;

/// Named column values a template can be rendered against.
///
/// A missing column and a column holding the empty string are treated the
/// same way by the renderer: both mean "no value".
///
/// # Example
///
/// ```
/// use tablemail_template::Fields;
///
/// struct Contact {
///     email: String,
/// }
///
/// impl Fields for Contact {
///     fn field(&self, name: &str) -> Option<&str> {
///         match name {
///             "email" => Some(&self.email),
///             _ => None,
///         }
///     }
/// }
/// ```
pub trait Fields {
    /// Returns the value of a column, if the row has one.
    fn field(&self, name: &str) -> Option<&str>;
}

impl<S: BuildHasher> Fields for HashMap<String, String, S> {
    fn field(&self, name: &str) -> Option<&str> {
        self.get(name).map(String::as_str)
    }
}

impl Fields for BTreeMap<String, String> {
    fn field(&self, name: &str) -> Option<&str> {
        self.get(name).map(String::as_str)
    }
}

impl Fields for [(String, String)] {
    fn field(&self, name: &str) -> Option<&str> {
        self.iter()
            .find(|(column, _)| column == name)
            .map(|(_, value)| value.as_str())
    }
}

impl Fields for Vec<(String, String)> {
    fn field(&self, name: &str) -> Option<&str> {
        self.as_slice().field(name)
    }
}

impl<F: Fields + ?Sized> Fields for &F {
    fn field(&self, name: &str) -> Option<&str> {
        (**self).field(name)
    }
}

/// Returns true if a looked-up value counts as present.
///
/// Only a missing value or the empty string is falsy; `"0"` is truthy text.
pub fn is_truthy(value: Option<&str>) -> bool {
    value.is_some_and(|v| !v.is_empty())
}

pub(crate) fn render_segments<'a, F>(segments: &[Segment], lookup: &F, out: &mut String)
where
    F: Fn(&str) -> Option<&'a str>,
{
    for segment in segments {
        match segment {
            Segment::Literal(text) => out.push_str(text),
            Segment::Var(column) => {
                if let Some(value) = lookup(column) {
                    out.push_str(value);
                }
            }
            Segment::Conditional(cond) => {
                if is_truthy(lookup(&cond.column)) {
                    render_segments(&cond.then_branch, lookup, out);
                } else if let Some(else_branch) = &cond.else_branch {
                    render_segments(else_branch, lookup, out);
                }
            }
        }
    }
}
