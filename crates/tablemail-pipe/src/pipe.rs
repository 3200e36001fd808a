use crate::shell::{run_piped, ShellError};
use std::time::Duration;

/// How long a command may run before it is killed.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, thiserror::Error)]
pub enum PipeError {
    #[error("Shell error: {0}")]
    Shell(#[from] ShellError),
}

/// A target that can receive piped text.
pub trait PipeTarget: Send + Sync {
    /// Pipe the input to the target and return what it printed.
    fn pipe(&self, input: &str) -> Result<String, PipeError>;
}

/// A shell command run once per [`PipeTarget::pipe`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandPipe {
    command: String,
    timeout: Duration,
}

impl CommandPipe {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl PipeTarget for CommandPipe {
    fn pipe(&self, input: &str) -> Result<String, PipeError> {
        Ok(run_piped(&self.command, input, Some(self.timeout))?)
    }
}
