//! Remote session transport
//!
//! The metric queries only see the [`CommandRunner`] trait. [`SshSession`]
//! implements it over the system `ssh` client; [`ScriptedRunner`] replays
//! canned output.

mod runner;
mod scripted;
mod ssh;

pub use runner::{CommandRunner, RawOutput};
pub use scripted::{ScriptedFailure, ScriptedRunner};
pub use ssh::{
    DEFAULT_COMMAND_TIMEOUT_SECS, DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_SSH_PORT, SshSession,
    SshTarget,
};
