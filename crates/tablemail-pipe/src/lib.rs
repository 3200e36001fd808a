//! Feed text to an external command through a shell.
//!
//! Used by tablemail to hand finished messages to `sendmail` or any other
//! program that reads a message on stdin.
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use tablemail_pipe::{CommandPipe, PipeTarget};
//!
//! let pipe = CommandPipe::new("sendmail -t -oi").with_timeout(Duration::from_secs(10));
//! pipe.pipe("To: ada@example.com\nSubject: hi\n\nhello\n").unwrap();
//! ```

pub mod pipe;
pub mod shell;

pub use pipe::{CommandPipe, PipeError, PipeTarget, DEFAULT_TIMEOUT};
pub use shell::{run_piped, ShellError};
