//! Error types shared across `pisensors-core`
//!
//! Parser errors live next to the parsers in [`crate::metrics`]; this module
//! holds the transport and configuration errors plus the umbrella type used
//! by front-ends.

use std::path::PathBuf;

use thiserror::Error;

use crate::metrics::MetricsError;

/// Errors raised by the remote session transport
#[derive(Debug, Error)]
pub enum SessionError {
    /// A command was issued before `connect` succeeded or after `disconnect`
    #[error("Session is not established")]
    NotConnected,

    /// The remote host rejected the credentials
    #[error("Authentication failed for {destination}: {reason}")]
    Auth {
        /// `user@host` that was rejected
        destination: String,
        /// Message reported by ssh/sshpass
        reason: String,
    },

    /// Connecting or running a command took longer than allowed
    #[error("{operation} timed out after {secs}s")]
    Timeout {
        /// What was being waited on
        operation: String,
        /// The limit that was exceeded
        secs: u64,
    },

    /// The connection could not be established or dropped mid-command
    #[error("Connection error: {0}")]
    Connection(String),

    /// The remote command ran but exited with a non-zero status
    #[error("Remote command `{command}` failed ({status}): {stderr}")]
    CommandFailed {
        /// The command string that was executed
        command: String,
        /// Exit status description
        status: String,
        /// Trimmed standard error of the remote command
        stderr: String,
    },

    /// A password was supplied but `sshpass` is not installed
    #[error("Password authentication requires `sshpass`, which was not found in PATH")]
    SshpassUnavailable,

    /// Spawning or talking to the local ssh process failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SessionError {
    /// Returns `true` when the session can no longer be used.
    ///
    /// Only a failing remote command is recoverable: the connection itself
    /// is still healthy and the next poll may succeed.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        !matches!(self, Self::CommandFailed { .. })
    }

    /// Returns `true` for credential problems detected at startup
    #[must_use]
    pub const fn is_auth(&self) -> bool {
        matches!(self, Self::Auth { .. } | Self::SshpassUnavailable)
    }
}

/// Result type for session operations
pub type SessionResult<T> = Result<T, SessionError>;

/// Errors raised while loading, saving or validating configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Reading or writing the settings file failed
    #[error("Failed to access {path}: {source}")]
    Io {
        /// File that could not be accessed
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// The settings file is not valid TOML for [`crate::config::Settings`]
    #[error("Failed to parse {path}: {message}")]
    Parse {
        /// File that failed to parse
        path: PathBuf,
        /// Deserializer message
        message: String,
    },

    /// Settings could not be serialized
    #[error("Failed to serialize settings: {0}")]
    Serialize(String),

    /// A value is outside its allowed range
    #[error("Invalid value for {field}: {reason}")]
    InvalidValue {
        /// Name of the offending option
        field: &'static str,
        /// Why it was rejected
        reason: String,
    },

    /// No platform configuration directory could be determined
    #[error("Could not determine the configuration directory")]
    NoConfigDir,
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Umbrella error for front-ends that drive the whole stack
#[derive(Debug, Error)]
pub enum PiSensorsError {
    /// Transport failure
    #[error(transparent)]
    Session(#[from] SessionError),

    /// Metric query failure
    #[error(transparent)]
    Metrics(#[from] MetricsError),

    /// Configuration failure
    #[error(transparent)]
    Config(#[from] ConfigError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_command_failures_are_recoverable() {
        let failed = SessionError::CommandFailed {
            command: "vcgencmd measure_temp".into(),
            status: "exit status: 127".into(),
            stderr: "vcgencmd: not found".into(),
        };
        assert!(!failed.is_fatal());
        assert!(SessionError::NotConnected.is_fatal());
        assert!(SessionError::Connection("reset by peer".into()).is_fatal());
        assert!(
            SessionError::Timeout {
                operation: "connect".into(),
                secs: 5
            }
            .is_fatal()
        );
    }

    #[test]
    fn test_auth_classification() {
        let auth = SessionError::Auth {
            destination: "pi@raspberrypi".into(),
            reason: "Permission denied".into(),
        };
        assert!(auth.is_auth());
        assert!(SessionError::SshpassUnavailable.is_auth());
        assert!(!SessionError::NotConnected.is_auth());
    }

    #[test]
    fn test_error_messages() {
        let err = SessionError::Timeout {
            operation: "Command `cat /proc/stat`".into(),
            secs: 10,
        };
        assert_eq!(err.to_string(), "Command `cat /proc/stat` timed out after 10s");

        let err = ConfigError::InvalidValue {
            field: "refresh_secs",
            reason: "must be positive".into(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid value for refresh_secs: must be positive"
        );
    }
}
