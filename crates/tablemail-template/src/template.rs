//! The [`Template`] type: compile once, render many.

use std::fmt;
use std::str::FromStr;

use crate::error::{Result, TemplateSyntaxError};
use crate::parser;
use crate::render::{render_segments, Fields};
use crate::segment::Segment;

/// Delimiter used between columns by [`Template::synthesize_default`].
pub const DEFAULT_DELIMITER: &str = " ";

/// A compiled template.
///
/// Templates are immutable once built and can be rendered against any
/// number of rows.
///
/// # Example
///
/// ```
/// use std::collections::HashMap;
/// use tablemail_template::Template;
///
/// let template = Template::compile("Dear {$name}{?city  from [$city]}").unwrap();
///
/// let mut row = HashMap::new();
/// row.insert("name".to_string(), "Ada".to_string());
/// assert_eq!(template.render(&row), "Dear Ada");
///
/// row.insert("city".to_string(), "London".to_string());
/// assert_eq!(template.render(&row), "Dear Ada from London");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    source: String,
    segments: Vec<Segment>,
}

impl Template {
    /// Compiles a raw template string.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateSyntaxError`] if a conditional is never closed or
    /// an `!!` separator appears outside a conditional.
    pub fn compile(raw: &str) -> Result<Self> {
        Ok(Template {
            source: raw.to_string(),
            segments: parser::parse(raw)?,
        })
    }

    /// Builds a template that prints each column in order, separated by
    /// `delimiter`.
    ///
    /// The delimiter is taken verbatim; it is never parsed as template
    /// syntax. Column names are used as given, so a synthesized template can
    /// reference names that `{$name}` syntax cannot spell, such as CSV
    /// headers with spaces. Its [`source`](Template::source) then describes
    /// the template but does not compile back to it.
    pub fn synthesize<I, S>(columns: I, delimiter: &str) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut segments = Vec::new();
        let mut source = String::new();
        for (i, column) in columns.into_iter().enumerate() {
            let column = column.as_ref();
            if i > 0 && !delimiter.is_empty() {
                segments.push(Segment::literal(delimiter));
                source.push_str(delimiter);
            }
            segments.push(Segment::var(column));
            source.push_str("{$");
            source.push_str(column);
            source.push('}');
        }
        Template { source, segments }
    }

    /// [`Template::synthesize`] with the default single-space delimiter.
    pub fn synthesize_default<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::synthesize(columns, DEFAULT_DELIMITER)
    }

    /// Builds a template that always renders `text` unchanged.
    pub fn literal(text: impl Into<String>) -> Self {
        let text = text.into();
        let segments = if text.is_empty() {
            Vec::new()
        } else {
            vec![Segment::literal(text.clone())]
        };
        Template {
            source: text,
            segments,
        }
    }

    /// Renders the template against a row.
    pub fn render<F: Fields + ?Sized>(&self, row: &F) -> String {
        self.render_with(|column| row.field(column))
    }

    /// Renders the template using a lookup function for column values.
    pub fn render_with<'a, F>(&self, lookup: F) -> String
    where
        F: Fn(&str) -> Option<&'a str>,
    {
        let mut out = String::with_capacity(self.source.len());
        render_segments(&self.segments, &lookup, &mut out);
        out
    }

    /// The text this template was compiled from.
    ///
    /// For synthesized templates this is the equivalent template string,
    /// which only round-trips when every column name is a valid template
    /// name.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The compiled segments.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }
}

impl FromStr for Template {
    type Err = TemplateSyntaxError;

    fn from_str(s: &str) -> Result<Self> {
        Template::compile(s)
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}
