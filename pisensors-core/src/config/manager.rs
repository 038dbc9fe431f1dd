//! Loading and saving `config.toml`

use std::fs;
use std::path::{Path, PathBuf};

use super::settings::Settings;
use crate::error::{ConfigError, ConfigResult};
use crate::tracing::span_names;

/// Directory name under the platform configuration directory
pub const CONFIG_DIR_NAME: &str = "pisensors";

/// Settings file name
pub const SETTINGS_FILE: &str = "config.toml";

/// Locates, reads and writes the settings file
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config_dir: PathBuf,
}

impl ConfigManager {
    /// Uses `<config dir>/pisensors` (e.g. `~/.config/pisensors`)
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NoConfigDir`] if the platform has no
    /// configuration directory.
    pub fn new() -> ConfigResult<Self> {
        let base = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(Self::with_config_dir(base.join(CONFIG_DIR_NAME)))
    }

    /// Uses an explicit directory (`--config`, tests)
    #[must_use]
    pub fn with_config_dir(config_dir: impl Into<PathBuf>) -> Self {
        Self {
            config_dir: config_dir.into(),
        }
    }

    /// The configuration directory
    #[must_use]
    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Full path of `config.toml`
    #[must_use]
    pub fn settings_path(&self) -> PathBuf {
        self.config_dir.join(SETTINGS_FILE)
    }

    /// Reads and validates the settings; a missing file yields defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file exists but cannot be read,
    /// [`ConfigError::Parse`] for malformed TOML and
    /// [`ConfigError::InvalidValue`] for out-of-range options.
    pub fn load_settings(&self) -> ConfigResult<Settings> {
        let _span = tracing::debug_span!(span_names::CONFIG_LOAD).entered();
        let path = self.settings_path();

        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No settings file, using defaults");
                return Ok(Settings::default());
            }
            Err(source) => return Err(ConfigError::Io { path, source }),
        };

        let settings: Settings = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.clone(),
            message: e.to_string(),
        })?;
        settings.validate()?;

        tracing::debug!(path = %path.display(), "Settings loaded");
        Ok(settings)
    }

    /// Writes `settings`, creating the directory if needed
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Serialize`] or [`ConfigError::Io`].
    pub fn save_settings(&self, settings: &Settings) -> ConfigResult<()> {
        let _span = tracing::debug_span!(span_names::CONFIG_SAVE).entered();
        let content =
            toml::to_string_pretty(settings).map_err(|e| ConfigError::Serialize(e.to_string()))?;

        fs::create_dir_all(&self.config_dir).map_err(|source| ConfigError::Io {
            path: self.config_dir.clone(),
            source,
        })?;
        let path = self.settings_path();
        fs::write(&path, content).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;

        tracing::info!(path = %path.display(), "Settings saved");
        Ok(())
    }

    /// Writes default settings unless a file already exists.
    ///
    /// Returns the settings path and whether it was created.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`Self::save_settings`].
    pub fn init_settings(&self) -> ConfigResult<(PathBuf, bool)> {
        let path = self.settings_path();
        if path.exists() {
            return Ok((path, false));
        }
        self.save_settings(&Settings::default())?;
        Ok((path, true))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let manager = ConfigManager::with_config_dir(dir.path());
        assert_eq!(manager.load_settings().unwrap(), Settings::default());
    }

    #[test]
    fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let manager = ConfigManager::with_config_dir(dir.path().join("nested"));

        let mut settings = Settings::default();
        settings.connection.host = Some("10.0.0.7".into());
        settings.connection.user = Some("pi".into());
        settings.dashboard.refresh_secs = 1.5;
        settings
            .keybindings
            .overrides
            .insert("quit".into(), "x".into());
        manager.save_settings(&settings).unwrap();

        assert_eq!(manager.load_settings().unwrap(), settings);
    }

    #[test]
    fn test_init_does_not_overwrite() {
        let dir = TempDir::new().unwrap();
        let manager = ConfigManager::with_config_dir(dir.path());

        let (path, created) = manager.init_settings().unwrap();
        assert!(created);
        assert!(path.exists());

        fs::write(&path, "[dashboard]\nrefresh_secs = 3.0\n").unwrap();
        let (_, created) = manager.init_settings().unwrap();
        assert!(!created);
        let loaded = manager.load_settings().unwrap();
        assert!((loaded.dashboard.refresh_secs - 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_malformed_file_is_parse_error() {
        let dir = TempDir::new().unwrap();
        let manager = ConfigManager::with_config_dir(dir.path());
        fs::write(manager.settings_path(), "[dashboard\nrefresh_secs = ").unwrap();
        assert!(matches!(
            manager.load_settings(),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_invalid_value_is_rejected() {
        let dir = TempDir::new().unwrap();
        let manager = ConfigManager::with_config_dir(dir.path());
        fs::write(manager.settings_path(), "[dashboard]\nrefresh_secs = -1.0\n").unwrap();
        assert!(matches!(
            manager.load_settings(),
            Err(ConfigError::InvalidValue { .. })
        ));
    }
}
