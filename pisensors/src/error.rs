//! CLI error types and exit codes.

use pisensors_core::error::{ConfigError, PiSensorsError, SessionError};
use pisensors_core::metrics::MetricsError;

/// Exit codes for CLI operations
pub mod exit_codes {
    /// General error - configuration, validation, or other non-connection errors
    pub const GENERAL_ERROR: i32 = 1;
    /// Connection failure - the host could not be reached or the session dropped
    pub const CONNECTION_FAILURE: i32 = 2;
    /// Authentication failure - credentials rejected or sshpass missing
    pub const AUTH_FAILURE: i32 = 3;
}

/// CLI error type
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Authentication error
    #[error("Authentication error: {0}")]
    Auth(String),

    /// A metric could not be read
    #[error("Metrics error: {0}")]
    Metrics(String),

    /// Output formatting error
    #[error("Output error: {0}")]
    Output(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<SessionError> for CliError {
    fn from(err: SessionError) -> Self {
        if err.is_auth() {
            Self::Auth(err.to_string())
        } else {
            Self::Connection(err.to_string())
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<MetricsError> for CliError {
    fn from(err: MetricsError) -> Self {
        match err {
            MetricsError::Session(e) => e.into(),
            e @ MetricsError::Parse { .. } => Self::Metrics(e.to_string()),
        }
    }
}

impl From<PiSensorsError> for CliError {
    fn from(err: PiSensorsError) -> Self {
        match err {
            PiSensorsError::Session(e) => e.into(),
            PiSensorsError::Metrics(e) => e.into(),
            PiSensorsError::Config(e) => e.into(),
        }
    }
}

impl CliError {
    /// Returns the appropriate exit code for this error type.
    ///
    /// Exit codes:
    /// - 0: Success (not an error)
    /// - 1: General error (configuration, metrics, output, IO)
    /// - 2: Connection failure
    /// - 3: Authentication failure
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Connection(_) => exit_codes::CONNECTION_FAILURE,
            Self::Auth(_) => exit_codes::AUTH_FAILURE,
            Self::Config(_) | Self::Metrics(_) | Self::Output(_) | Self::Io(_) => {
                exit_codes::GENERAL_ERROR
            }
        }
    }
}
