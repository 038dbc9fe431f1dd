//! Live dashboard command.

use pisensors_core::config::{DashboardConfig, Settings};
use pisensors_core::{Collector, Probe};

use super::{Globals, close_session, open_session};
use crate::cli::WatchArgs;
use crate::dashboard::{self, App};
use crate::error::CliError;
use crate::util;

/// Connects and runs the dashboard until the user quits or the session dies.
pub fn cmd_watch(globals: &Globals<'_>, args: &WatchArgs) -> Result<(), CliError> {
    let settings = util::load_settings(globals.config_path)?;
    let log_path = util::dashboard_log_path(globals.log_file, &settings);
    util::init_logging(util::dashboard_tracing(log_path, &settings, globals.verbose));

    let config = dashboard_config(&settings, args)?;
    let runtime = util::build_runtime()?;
    runtime.block_on(watch(globals, &settings, args, config))
}

async fn watch(
    globals: &Globals<'_>,
    settings: &Settings,
    args: &WatchArgs,
    config: DashboardConfig,
) -> Result<(), CliError> {
    let session = open_session(globals, settings).await?;
    let destination = session.target().destination();
    tracing::info!(%destination, interval = config.refresh_secs(), "Dashboard started");

    let mut collector = Collector::new(Probe::new(session)).with_arch(args.arch);
    let app = App::new(config, settings, destination);
    let result = dashboard::run(&mut collector, app).await;

    let mut session = collector.into_probe().into_runner();
    close_session(&mut session).await;
    if let Err(ref e) = result {
        tracing::error!(error = %e, "Dashboard stopped");
    }
    result
}

/// Initial runtime options: settings file first, then command line flags
fn dashboard_config(settings: &Settings, args: &WatchArgs) -> Result<DashboardConfig, CliError> {
    let mut dashboard = settings.dashboard.clone();
    if args.raw_units {
        dashboard.human_units = false;
    }
    let mut config = DashboardConfig::from_settings(&dashboard);
    if let Some(secs) = args.interval {
        config.set_refresh_interval(secs)?;
    }
    Ok(config)
}
