//! SQL LIKE wildcard patterns.
//!
//! `%` matches any run of characters (including none) and `_` matches
//! exactly one character. A backslash makes the next character literal, so
//! `\%` matches a percent sign. Matching is case-sensitive and always
//! covers the whole value.

use regex::Regex;

use crate::error::{Result, SelectError};

/// A compiled LIKE pattern.
#[derive(Debug, Clone)]
pub struct LikePattern {
    pattern: String,
    regex: Regex,
}

impl LikePattern {
    /// Compiles a LIKE pattern.
    ///
    /// # Errors
    ///
    /// Returns [`SelectError::InvalidPattern`] if the translated expression
    /// exceeds the regex engine's limits.
    pub fn new(pattern: &str) -> Result<Self> {
        let regex = Regex::new(&translate(pattern)).map_err(|source| {
            SelectError::InvalidPattern {
                pattern: pattern.to_string(),
                source,
            }
        })?;
        Ok(LikePattern {
            pattern: pattern.to_string(),
            regex,
        })
    }

    /// Returns true if `value` matches the whole pattern.
    pub fn matches(&self, value: &str) -> bool {
        self.regex.is_match(value)
    }

    /// The pattern as written.
    pub fn as_str(&self) -> &str {
        &self.pattern
    }
}

impl PartialEq for LikePattern {
    fn eq(&self, other: &Self) -> bool {
        self.pattern == other.pattern
    }
}

impl Eq for LikePattern {}

/// Translates a LIKE pattern into an anchored regular expression.
fn translate(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len() + 8);
    out.push_str("(?s)^");
    let mut chars = pattern.chars();
    let mut buf = [0u8; 4];
    while let Some(ch) = chars.next() {
        match ch {
            '%' => out.push_str(".*"),
            '_' => out.push('.'),
            '\\' => {
                let literal = chars.next().unwrap_or('\\');
                out.push_str(&regex::escape(literal.encode_utf8(&mut buf)));
            }
            other => out.push_str(&regex::escape(other.encode_utf8(&mut buf))),
        }
    }
    out.push('$');
    out
}
