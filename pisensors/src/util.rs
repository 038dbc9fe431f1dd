//! Shared utility functions used across command modules.

use std::path::{Path, PathBuf};
use std::time::Duration;

use pisensors_core::config::{ConfigManager, Settings};
use pisensors_core::session::SshTarget;
use pisensors_core::tracing::{TracingConfig, TracingLevel, TracingOutput, init_tracing};
use secrecy::SecretString;

use crate::cli::ConnectionArgs;
use crate::error::CliError;

/// File name used for dashboard logs when none is configured
const DEFAULT_LOG_FILE: &str = "pisensors.log";

/// Creates a `ConfigManager` using the optional custom config directory
/// from CLI args.
pub fn create_config_manager(config_path: Option<&Path>) -> Result<ConfigManager, CliError> {
    match config_path {
        Some(path) => Ok(ConfigManager::with_config_dir(path.to_path_buf())),
        None => ConfigManager::new()
            .map_err(|e| CliError::Config(format!("Failed to initialize config: {e}"))),
    }
}

/// Loads the settings file, falling back to defaults when it does not exist
pub fn load_settings(config_path: Option<&Path>) -> Result<Settings, CliError> {
    let manager = create_config_manager(config_path)?;
    Ok(manager.load_settings()?)
}

/// Builds the SSH target; command line values win over the settings file
pub fn build_target(args: &ConnectionArgs, settings: &Settings) -> Result<SshTarget, CliError> {
    let conn = &settings.connection;
    let host = args
        .host
        .clone()
        .or_else(|| conn.host.clone())
        .filter(|h| !h.trim().is_empty())
        .ok_or_else(|| {
            CliError::Config(
                "No host given. Pass --host, set PISENSORS_HOST or add `host` to [connection]"
                    .to_string(),
            )
        })?;

    let mut target = SshTarget::new(host)
        .with_port(args.port.unwrap_or(conn.port))
        .with_timeouts(
            Duration::from_secs(conn.connect_timeout_secs),
            Duration::from_secs(conn.command_timeout_secs),
        )
        .with_multiplex(conn.multiplex);

    if let Some(user) = args.user.clone().or_else(|| conn.user.clone()) {
        target = target.with_user(user);
    }

    let identity = match args.identity {
        Some(ref path) => Some(path.clone()),
        None => conn.identity_path()?,
    };
    if let Some(path) = identity {
        target = target.with_identity_file(path);
    }

    Ok(target)
}

/// Password from `--password`/`PISENSORS_PASSWORD` or an interactive prompt
pub fn resolve_password(
    args: &ConnectionArgs,
    target: &SshTarget,
) -> Result<Option<SecretString>, CliError> {
    if let Some(ref password) = args.password {
        return Ok(Some(SecretString::from(password.clone())));
    }
    if args.ask_pass {
        let prompt = format!("Password for {}: ", target.destination());
        let password = rpassword::prompt_password(prompt)?;
        return Ok(Some(SecretString::from(password)));
    }
    Ok(None)
}

/// Runtime for one command; every query runs on the calling thread
pub fn build_runtime() -> Result<tokio::runtime::Runtime, CliError> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(CliError::Io)
}

/// Where dashboard logs go: `--log-file`, then `[logging] file`, then a temp file
pub fn dashboard_log_path(cli_log_file: Option<&Path>, settings: &Settings) -> PathBuf {
    cli_log_file
        .map(Path::to_path_buf)
        .or_else(|| settings.logging.file.clone())
        .unwrap_or_else(|| std::env::temp_dir().join(DEFAULT_LOG_FILE))
}

/// Tracing setup for the dashboard: the screen belongs to the TUI, so logs
/// always go to a file at the configured level
pub fn dashboard_tracing(log_file: PathBuf, settings: &Settings, verbose: u8) -> TracingConfig {
    TracingConfig::new()
        .with_level(settings.logging.tracing_level().raised(verbose))
        .with_output(TracingOutput::File { path: log_file })
}

/// Tracing setup for one-shot commands: warnings on stderr unless `-v` or
/// `--log-file` is given
pub fn command_tracing(log_file: Option<&Path>, verbose: u8) -> TracingConfig {
    let config = TracingConfig::new().with_level(TracingLevel::Warn.raised(verbose));
    match log_file {
        Some(path) => config.with_output(TracingOutput::File {
            path: path.to_path_buf(),
        }),
        None => config,
    }
}

/// Installs the subscriber; logging problems never stop a command.
///
/// A non-empty `RUST_LOG` replaces the level-derived filter.
pub fn init_logging(config: TracingConfig) {
    let config = match std::env::var("RUST_LOG") {
        Ok(filter) if !filter.trim().is_empty() => config.with_filter(filter),
        _ => config,
    };
    if let Err(e) = init_tracing(&config) {
        eprintln!("Warning: logging disabled: {e}");
    }
}
