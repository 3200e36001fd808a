//! Error types for template compilation.

use thiserror::Error;

/// Errors that can occur when compiling a template.
///
/// Rendering never fails; only compilation does. Offsets are byte offsets
/// into the raw template string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateSyntaxError {
    /// A `{?column ...` block has no closing brace.
    #[error("conditional on '{column}' opened at offset {offset} is never closed")]
    UnclosedConditional { column: String, offset: usize },

    /// The `!!` else separator appears outside any conditional block.
    #[error("else separator '!!' at offset {offset} is outside any conditional")]
    StrayElse { offset: usize },
}

impl TemplateSyntaxError {
    /// Byte offset in the raw template where the problem starts.
    pub fn offset(&self) -> usize {
        match self {
            TemplateSyntaxError::UnclosedConditional { offset, .. } => *offset,
            TemplateSyntaxError::StrayElse { offset } => *offset,
        }
    }
}

/// Result type for template compilation.
pub type Result<T> = std::result::Result<T, TemplateSyntaxError>;
