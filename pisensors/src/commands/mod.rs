//! Command handler modules for the CLI.

mod completions;
mod config;
mod snapshot;
mod watch;

use std::path::Path;

use pisensors_core::config::Settings;
use pisensors_core::session::SshSession;

use crate::cli::{Cli, Commands, ConnectionArgs, WatchArgs};
use crate::error::CliError;
use crate::util;

/// Options shared by every command
pub struct Globals<'a> {
    /// Connection overrides
    pub connection: &'a ConnectionArgs,
    /// Custom configuration directory
    pub config_path: Option<&'a Path>,
    /// Number of `-v` flags
    pub verbose: u8,
    /// Explicit log file
    pub log_file: Option<&'a Path>,
}

/// Dispatch a CLI command to the appropriate handler.
///
/// Without a subcommand the live dashboard runs.
pub fn dispatch(cli: Cli) -> Result<(), CliError> {
    let globals = Globals {
        connection: &cli.connection,
        config_path: cli.config.as_deref(),
        verbose: cli.verbose,
        log_file: cli.log_file.as_deref(),
    };

    match cli
        .command
        .unwrap_or_else(|| Commands::Watch(WatchArgs::default()))
    {
        Commands::Watch(args) => watch::cmd_watch(&globals, &args),
        Commands::Snapshot {
            format,
            interval,
            arch,
        } => snapshot::cmd_snapshot(&globals, format, interval, arch),
        Commands::Config { init, show } => config::cmd_config(&globals, init, show),
        Commands::Completions { shell } => completions::cmd_completions(shell),
    }
}

/// Resolves the target and credentials, then opens the session.
///
/// Any password prompt happens here, before the dashboard takes the screen.
async fn open_session(globals: &Globals<'_>, settings: &Settings) -> Result<SshSession, CliError> {
    let target = util::build_target(globals.connection, settings)?;
    let password = util::resolve_password(globals.connection, &target)?;
    tracing::info!(destination = %target.destination(), port = target.port, "Connecting");
    Ok(SshSession::connect(target, password).await?)
}

/// Closes the session, logging instead of failing
async fn close_session(session: &mut SshSession) {
    if let Err(e) = session.disconnect().await {
        tracing::warn!(error = %e, "Failed to close the SSH session cleanly");
    }
}
