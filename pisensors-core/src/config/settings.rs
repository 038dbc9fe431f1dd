//! Persistent settings stored in `config.toml`
//!
//! Every field has a serde default, so a partial (or empty) file is valid
//! and missing sections fall back to the values below.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::keybindings::KeybindingSettings;
use super::runtime::validate_refresh_secs;
use crate::error::{ConfigError, ConfigResult};
use crate::metrics::DiskUnits;
use crate::session::{
    DEFAULT_COMMAND_TIMEOUT_SECS, DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_SSH_PORT,
};
use crate::tracing::TracingLevel;

/// Root of `config.toml`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// How to reach the monitored host
    #[serde(default)]
    pub connection: ConnectionSettings,
    /// Dashboard appearance and refresh rate
    #[serde(default)]
    pub dashboard: DashboardSettings,
    /// Log level and destination
    #[serde(default)]
    pub logging: LoggingSettings,
    /// Key overrides
    #[serde(default)]
    pub keybindings: KeybindingSettings,
}

impl Settings {
    /// Checks every section
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] naming the first bad option.
    pub fn validate(&self) -> ConfigResult<()> {
        self.connection.validate()?;
        self.dashboard.validate()?;
        self.logging.validate()?;
        self.keybindings.validate()
    }
}

/// `[connection]` section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionSettings {
    /// Host name or address; the command line takes precedence
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    /// Login name (ssh picks its own default when absent)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    /// SSH port (default: 22)
    #[serde(default = "default_port")]
    pub port: u16,
    /// Private key, `~` and `$VAR` are expanded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity_file: Option<String>,
    /// Seconds to wait for the connection (default: 5)
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// Seconds to wait for each remote command (default: 10)
    #[serde(default = "default_command_timeout_secs")]
    pub command_timeout_secs: u64,
    /// Share one connection between commands (default: true)
    #[serde(default = "default_true")]
    pub multiplex: bool,
}

const fn default_port() -> u16 {
    DEFAULT_SSH_PORT
}

const fn default_connect_timeout_secs() -> u64 {
    DEFAULT_CONNECT_TIMEOUT_SECS
}

const fn default_command_timeout_secs() -> u64 {
    DEFAULT_COMMAND_TIMEOUT_SECS
}

const fn default_true() -> bool {
    true
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            host: None,
            user: None,
            port: default_port(),
            identity_file: None,
            connect_timeout_secs: default_connect_timeout_secs(),
            command_timeout_secs: default_command_timeout_secs(),
            multiplex: true,
        }
    }
}

impl ConnectionSettings {
    /// The identity file with `~` and environment variables expanded
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if a referenced variable is unset.
    pub fn identity_path(&self) -> ConfigResult<Option<PathBuf>> {
        self.identity_file
            .as_deref()
            .map(|raw| {
                shellexpand::full(raw)
                    .map(|p| PathBuf::from(p.into_owned()))
                    .map_err(|e| ConfigError::InvalidValue {
                        field: "identity_file",
                        reason: e.to_string(),
                    })
            })
            .transpose()
    }

    fn validate(&self) -> ConfigResult<()> {
        if self.port == 0 {
            return Err(ConfigError::InvalidValue {
                field: "port",
                reason: "must be between 1 and 65535".into(),
            });
        }
        if self.connect_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "connect_timeout_secs",
                reason: "must be at least 1".into(),
            });
        }
        if self.command_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "command_timeout_secs",
                reason: "must be at least 1".into(),
            });
        }
        Ok(())
    }
}

/// `[dashboard]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardSettings {
    /// Seconds between refreshes (default: 0.5)
    #[serde(default = "default_refresh_secs")]
    pub refresh_secs: f64,
    /// Human readable disk sizes instead of MiB (default: true)
    #[serde(default = "default_true")]
    pub human_units: bool,
    /// Temperature that fills a temperature bar (default: 70)
    #[serde(default = "default_max_temp")]
    pub max_temp: f64,
    /// Bars turn yellow at this temperature (default: 55)
    #[serde(default = "default_warn_temp")]
    pub warn_temp: f64,
    /// Bars turn red at this temperature (default: 65)
    #[serde(default = "default_critical_temp")]
    pub critical_temp: f64,
    /// Widest a bar is drawn, in columns (default: 50)
    #[serde(default = "default_bar_width")]
    pub bar_width: u16,
}

const fn default_refresh_secs() -> f64 {
    0.5
}

const fn default_max_temp() -> f64 {
    70.0
}

const fn default_warn_temp() -> f64 {
    55.0
}

const fn default_critical_temp() -> f64 {
    65.0
}

const fn default_bar_width() -> u16 {
    50
}

impl Default for DashboardSettings {
    fn default() -> Self {
        Self {
            refresh_secs: default_refresh_secs(),
            human_units: true,
            max_temp: default_max_temp(),
            warn_temp: default_warn_temp(),
            critical_temp: default_critical_temp(),
            bar_width: default_bar_width(),
        }
    }
}

impl DashboardSettings {
    /// Disk unit mode at startup
    #[must_use]
    pub const fn disk_units(&self) -> DiskUnits {
        if self.human_units {
            DiskUnits::Human
        } else {
            DiskUnits::Megabytes
        }
    }

    fn validate(&self) -> ConfigResult<()> {
        validate_refresh_secs(self.refresh_secs)?;
        if !(self.max_temp.is_finite() && self.max_temp > 0.0) {
            return Err(ConfigError::InvalidValue {
                field: "max_temp",
                reason: "must be positive".into(),
            });
        }
        if !(self.warn_temp <= self.critical_temp && self.critical_temp <= self.max_temp) {
            return Err(ConfigError::InvalidValue {
                field: "critical_temp",
                reason: format!(
                    "thresholds must satisfy warn ({}) <= critical ({}) <= max ({})",
                    self.warn_temp, self.critical_temp, self.max_temp
                ),
            });
        }
        if self.bar_width == 0 {
            return Err(ConfigError::InvalidValue {
                field: "bar_width",
                reason: "must be at least 1".into(),
            });
        }
        Ok(())
    }
}

/// `[logging]` section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// error, warn, info, debug or trace (default: info)
    #[serde(default = "default_level")]
    pub level: String,
    /// Log file; the dashboard uses a temp file when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

fn default_level() -> String {
    "info".to_string()
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_level(),
            file: None,
        }
    }
}

impl LoggingSettings {
    /// The configured level; invalid names fall back to info
    #[must_use]
    pub fn tracing_level(&self) -> TracingLevel {
        self.level.parse().unwrap_or_default()
    }

    fn validate(&self) -> ConfigResult<()> {
        self.level
            .parse::<TracingLevel>()
            .map(|_| ())
            .map_err(|()| ConfigError::InvalidValue {
                field: "level",
                reason: format!("unknown log level {:?}", self.level),
            })
    }
}
