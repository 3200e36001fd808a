//! Mail delivery.
//!
//! A [`Mailer`] takes one rendered message at a time. Two are provided:
//! [`StdoutMailer`] prints messages (a dry run), [`CommandMailer`] feeds
//! each message to a shell command such as `sendmail -t -oi`.

use std::fmt;
use std::io::{self, Write};
use std::time::Duration;

use tablemail_pipe::{CommandPipe, PipeTarget};
use tracing::debug;

use crate::error::SendError;

/// The command used when no mailer is configured.
pub const DEFAULT_MAILER: &str = "sendmail -t -oi";

/// The `--mailer` value that selects [`StdoutMailer`].
pub const STDOUT_MAILER: &str = "stdout";

/// Delivers one message.
pub trait Mailer {
    fn send(&mut self, to: &str, subject: &str, body: &str) -> Result<(), SendError>;
}

impl<M: Mailer + ?Sized> Mailer for Box<M> {
    fn send(&mut self, to: &str, subject: &str, body: &str) -> Result<(), SendError> {
        (**self).send(to, subject, body)
    }
}

/// Checks that `address` can be put in a `To:` header.
///
/// Needs an `@` and no whitespace or control characters.
pub fn validate_address(address: &str) -> Result<(), SendError> {
    let bad = !address.contains('@')
        || address
            .chars()
            .any(|c| c.is_whitespace() || c.is_control());
    if bad {
        return Err(SendError::InvalidAddress {
            address: address.to_string(),
        });
    }
    Ok(())
}

/// A message in RFC 822 layout: headers, a blank line, the body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Message<'a> {
    pub from: Option<&'a str>,
    pub to: &'a str,
    pub subject: &'a str,
    pub body: &'a str,
}

impl fmt::Display for Message<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(from) = self.from {
            writeln!(f, "From: {}", from)?;
        }
        writeln!(f, "To: {}", self.to)?;
        writeln!(f, "Subject: {}", header_value(self.subject))?;
        writeln!(f)?;
        f.write_str(self.body)?;
        if !self.body.ends_with('\n') {
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Folds line breaks so a value stays on its header line.
fn header_value(value: &str) -> String {
    value
        .split(['\r', '\n'])
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Prints every message to a writer instead of sending it.
pub struct StdoutMailer<W: Write> {
    out: W,
    from: Option<String>,
}

impl StdoutMailer<io::Stdout> {
    pub fn stdout(from: Option<String>) -> Self {
        StdoutMailer::new(io::stdout(), from)
    }
}

impl<W: Write> StdoutMailer<W> {
    pub fn new(out: W, from: Option<String>) -> Self {
        StdoutMailer { out, from }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Mailer for StdoutMailer<W> {
    fn send(&mut self, to: &str, subject: &str, body: &str) -> Result<(), SendError> {
        validate_address(to)?;
        let message = Message {
            from: self.from.as_deref(),
            to,
            subject,
            body,
        };
        writeln!(self.out, "{}", message)?;
        self.out.flush()?;
        Ok(())
    }
}

/// Pipes every message to a shell command, one process per message.
#[derive(Debug, Clone)]
pub struct CommandMailer {
    pipe: CommandPipe,
    from: Option<String>,
}

impl CommandMailer {
    pub fn new(command: impl Into<String>, timeout: Duration, from: Option<String>) -> Self {
        CommandMailer {
            pipe: CommandPipe::new(command).with_timeout(timeout),
            from,
        }
    }

    pub fn command(&self) -> &str {
        self.pipe.command()
    }
}

impl Mailer for CommandMailer {
    fn send(&mut self, to: &str, subject: &str, body: &str) -> Result<(), SendError> {
        validate_address(to)?;
        let message = Message {
            from: self.from.as_deref(),
            to,
            subject,
            body,
        }
        .to_string();
        let output = self.pipe.pipe(&message)?;
        if !output.trim().is_empty() {
            debug!(to, output = output.trim(), "mailer output");
        }
        Ok(())
    }
}

/// Picks a mailer for a `--mailer` value.
///
/// `stdout` prints messages; anything else is run as a shell command.
pub fn from_setting(setting: &str, timeout: Duration, from: Option<String>) -> Box<dyn Mailer> {
    if setting.trim() == STDOUT_MAILER {
        Box::new(StdoutMailer::stdout(from))
    } else {
        Box::new(CommandMailer::new(setting, timeout, from))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_validation() {
        assert!(validate_address("ada@example.com").is_ok());
        assert!(validate_address("Ada <ada@example.com>").is_err());
        for bad in ["", "ada", "ada @example.com", "ada@example.com\nBcc: x@y", "a\t@b"] {
            assert!(
                matches!(validate_address(bad), Err(SendError::InvalidAddress { .. })),
                "{bad:?}"
            );
        }
    }

    #[test]
    fn message_layout() {
        let msg = Message {
            from: Some("me@example.com"),
            to: "ada@example.com",
            subject: "Hello",
            body: "Hi Ada",
        };
        assert_eq!(
            msg.to_string(),
            "From: me@example.com\nTo: ada@example.com\nSubject: Hello\n\nHi Ada\n"
        );
    }

    #[test]
    fn subject_line_breaks_are_folded() {
        let msg = Message {
            from: None,
            to: "a@b",
            subject: "one\r\ntwo\nthree",
            body: "x\n",
        };
        assert_eq!(msg.to_string(), "To: a@b\nSubject: one two three\n\nx\n");
    }

    #[test]
    fn stdout_mailer_prints_messages() {
        let mut mailer = StdoutMailer::new(Vec::new(), None);
        mailer.send("a@b", "s1", "one").unwrap();
        mailer.send("c@d", "s2", "two").unwrap();
        let out = String::from_utf8(mailer.into_inner()).unwrap();
        assert_eq!(
            out,
            "To: a@b\nSubject: s1\n\none\n\nTo: c@d\nSubject: s2\n\ntwo\n\n"
        );
    }

    #[test]
    fn stdout_mailer_rejects_bad_addresses() {
        let mut mailer = StdoutMailer::new(Vec::new(), None);
        assert!(mailer.send("nobody", "s", "b").is_err());
        assert!(mailer.into_inner().is_empty());
    }

    #[test]
    fn setting_selects_mailer() {
        let timeout = Duration::from_secs(1);
        // Only the command mailer is observable without sending.
        let mailer = CommandMailer::new(DEFAULT_MAILER, timeout, None);
        assert_eq!(mailer.command(), "sendmail -t -oi");
        let _ = from_setting(STDOUT_MAILER, timeout, None);
    }

    #[cfg(unix)]
    #[test]
    fn command_mailer_pipes_the_message() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("mail.txt");
        let mut mailer = CommandMailer::new(
            format!("cat >> '{}'", out.display()),
            Duration::from_secs(5),
            Some("me@example.com".into()),
        );
        mailer.send("ada@example.com", "Hi", "Body\n").unwrap();
        assert_eq!(
            std::fs::read_to_string(&out).unwrap(),
            "From: me@example.com\nTo: ada@example.com\nSubject: Hi\n\nBody\n"
        );
    }

    #[cfg(unix)]
    #[test]
    fn command_failure_is_a_send_error() {
        let mut mailer = CommandMailer::new("exit 75", Duration::from_secs(5), None);
        let err = mailer.send("ada@example.com", "Hi", "Body").unwrap_err();
        assert!(matches!(err, SendError::Command(_)));
    }
}
