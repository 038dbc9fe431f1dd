//! The command runner seam between the metric queries and the transport

use async_trait::async_trait;
use serde::Serialize;

use crate::error::SessionResult;

/// Standard output of one remote command, split into lines.
///
/// Line terminators (`\n`, `\r\n`) are removed; nothing else is trimmed so
/// parsers see the columns exactly as the remote tool printed them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RawOutput {
    lines: Vec<String>,
}

impl RawOutput {
    /// Splits captured stdout into lines
    #[must_use]
    pub fn from_stdout(stdout: &str) -> Self {
        Self {
            lines: stdout.lines().map(str::to_owned).collect(),
        }
    }

    /// Builds output from already split lines
    #[must_use]
    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
        }
    }

    /// All captured lines in order
    #[must_use]
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// The first line that is not blank
    #[must_use]
    pub fn first_line(&self) -> Option<&str> {
        self.lines
            .iter()
            .map(String::as_str)
            .find(|l| !l.trim().is_empty())
    }

    /// Returns `true` when every line is blank (or there are none)
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.first_line().is_none()
    }
}

/// Executes shell commands on the monitored host.
///
/// Implemented by [`super::SshSession`] for real hosts and by
/// [`super::ScriptedRunner`] in tests. Callers are sequential: the trait does
/// not promise anything about concurrent use.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Runs `command` and returns its standard output.
    ///
    /// # Errors
    ///
    /// Returns a [`crate::error::SessionError`]; see
    /// [`crate::error::SessionError::is_fatal`] for which ones end the session.
    async fn execute(&self, command: &str) -> SessionResult<RawOutput>;
}

#[async_trait]
impl<R: CommandRunner + ?Sized> CommandRunner for Box<R> {
    async fn execute(&self, command: &str) -> SessionResult<RawOutput> {
        (**self).execute(command).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_stdout_strips_line_endings() {
        let out = RawOutput::from_stdout("temp=48.3'C\r\nsecond\n");
        assert_eq!(out.lines(), ["temp=48.3'C", "second"]);
    }

    #[test]
    fn test_first_line_skips_blank_lines() {
        let out = RawOutput::from_lines(["", "   ", "5.10.103-v7l+"]);
        assert_eq!(out.first_line(), Some("5.10.103-v7l+"));
        assert!(!out.is_blank());
    }

    #[test]
    fn test_empty_output_is_blank() {
        assert!(RawOutput::from_stdout("").is_blank());
        assert!(RawOutput::from_stdout("\n\n").is_blank());
    }
}
