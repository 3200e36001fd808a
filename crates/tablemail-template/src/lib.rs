//! Compact conditional template language for rendering table rows.
//!
//! A template is compiled once into a sequence of segments and then rendered
//! against any number of rows. The same templates drive on-screen reports,
//! mail subjects and mail bodies.
//!
//! # Syntax
//!
//! | Form | Meaning |
//! |------|---------|
//! | `{$name}` | Value of column `name`, or nothing |
//! | `{?name text}` | `text` if `name` has a non-empty value |
//! | `{?name text!!other}` | `text` if `name` has a value, else `other` |
//! | `[$name]` | Inside a conditional body: same as `{$name}` |
//!
//! Column names are made of ASCII letters, digits, `_`, `-` and `.`. One
//! whitespace character after a conditional's column name is skipped.
//!
//! A `{` that does not start a recognized form is literal text, so older
//! hand-written templates with stray braces keep rendering. Only two things
//! are errors: a conditional that is never closed and a `!!` outside any
//! conditional.
//!
//! # Truthiness
//!
//! A column is "set" when the row has it and its value is not the empty
//! string. `"0"` is set.
//!
//! # Quick Start
//!
//! ```rust
//! use std::collections::HashMap;
//! use tablemail_template::Template;
//!
//! let body = Template::compile("Hello {$first}{?due , you owe [$due]!!, thanks}!").unwrap();
//!
//! let mut row = HashMap::new();
//! row.insert("first".to_string(), "Grace".to_string());
//! row.insert("due".to_string(), "12.50".to_string());
//! assert_eq!(body.render(&row), "Hello Grace, you owe 12.50!");
//!
//! row.insert("due".to_string(), String::new());
//! assert_eq!(body.render(&row), "Hello Grace, thanks!");
//! ```

mod error;
mod parser;
mod render;
mod segment;
mod template;

pub use error::{Result, TemplateSyntaxError};
pub use render::{is_truthy, Fields};
pub use segment::{Conditional, Segment};
pub use template::{Template, DEFAULT_DELIMITER};
