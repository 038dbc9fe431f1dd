//! In-memory [`CommandRunner`] that replays canned command output
//!
//! Used by the collector and probe tests, and handy for exercising the
//! dashboard without a Raspberry Pi on the network.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use super::runner::{CommandRunner, RawOutput};
use crate::error::{SessionError, SessionResult};

/// A scripted failure for one command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptedFailure {
    /// The remote command exits with the given status
    CommandFailed {
        /// Exit status
        code: i32,
        /// Standard error text
        stderr: String,
    },
    /// The connection drops while the command runs
    ConnectionLost,
}

#[derive(Debug, Clone)]
enum Reply {
    Stdout(String),
    Fail(ScriptedFailure),
}

/// Runner that answers each command from a script.
///
/// One-shot replies queued with [`ScriptedRunner::queue`] are consumed first;
/// after that the persistent reply set with [`ScriptedRunner::with_output`]
/// or [`ScriptedRunner::with_failure`] is returned. Unscripted commands fail
/// like a missing binary would (exit 127).
#[derive(Debug, Default)]
pub struct ScriptedRunner {
    persistent: HashMap<String, Reply>,
    queued: Mutex<HashMap<String, VecDeque<Reply>>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedRunner {
    /// Creates an empty script
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Answers every run of `command` with `stdout`
    #[must_use]
    pub fn with_output(mut self, command: impl Into<String>, stdout: impl Into<String>) -> Self {
        self.persistent
            .insert(command.into(), Reply::Stdout(stdout.into()));
        self
    }

    /// Makes every run of `command` fail
    #[must_use]
    pub fn with_failure(mut self, command: impl Into<String>, failure: ScriptedFailure) -> Self {
        self.persistent.insert(command.into(), Reply::Fail(failure));
        self
    }

    /// Queues a one-shot answer for the next run of `command`
    pub fn queue(&self, command: impl Into<String>, stdout: impl Into<String>) {
        self.queued
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(command.into())
            .or_default()
            .push_back(Reply::Stdout(stdout.into()));
    }

    /// Every command executed so far, in order
    #[must_use]
    pub fn calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of times `command` was executed
    #[must_use]
    pub fn call_count(&self, command: &str) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|c| *c == command)
            .count()
    }

    fn next_reply(&self, command: &str) -> Option<Reply> {
        let queued = self
            .queued
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get_mut(command)
            .and_then(VecDeque::pop_front);
        queued.or_else(|| self.persistent.get(command).cloned())
    }
}

#[async_trait]
impl CommandRunner for ScriptedRunner {
    async fn execute(&self, command: &str) -> SessionResult<RawOutput> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(command.to_string());

        match self.next_reply(command) {
            Some(Reply::Stdout(stdout)) => Ok(RawOutput::from_stdout(&stdout)),
            Some(Reply::Fail(ScriptedFailure::CommandFailed { code, stderr })) => {
                Err(SessionError::CommandFailed {
                    command: command.to_string(),
                    status: format!("exit {code}"),
                    stderr,
                })
            }
            Some(Reply::Fail(ScriptedFailure::ConnectionLost)) => Err(SessionError::Connection(
                "connection closed by remote host".to_string(),
            )),
            None => Err(SessionError::CommandFailed {
                command: command.to_string(),
                status: "exit 127".to_string(),
                stderr: format!("{command}: command not found"),
            }),
        }
    }
}
