//! One-shot reading command.

use std::fmt::Write as _;

use pisensors_core::config::{DashboardConfig, Settings};
use pisensors_core::session::CommandRunner;
use pisensors_core::{Collector, DashboardSnapshot, Probe};

use super::{Globals, close_session, open_session};
use crate::cli::OutputFormat;
use crate::error::CliError;
use crate::format;
use crate::util;

/// Collects one reading and prints it.
///
/// Two CPU samples are taken one refresh interval apart so the utilization
/// is a live value rather than the since-boot average.
pub fn cmd_snapshot(
    globals: &Globals<'_>,
    output_format: OutputFormat,
    interval: Option<f64>,
    arch: bool,
) -> Result<(), CliError> {
    let settings = util::load_settings(globals.config_path)?;
    util::init_logging(util::command_tracing(globals.log_file, globals.verbose));

    let config = snapshot_config(&settings, interval)?;

    let runtime = util::build_runtime()?;
    let (destination, snapshot) = runtime.block_on(snapshot(globals, &settings, config, arch))?;

    let output = match output_format {
        OutputFormat::Text => render_text(&destination, &snapshot),
        OutputFormat::Json => serde_json::to_string_pretty(&snapshot)
            .map_err(|e| CliError::Output(format!("Failed to serialize snapshot: {e}")))?,
    };
    println!("{output}");
    Ok(())
}

async fn snapshot(
    globals: &Globals<'_>,
    settings: &Settings,
    mut config: DashboardConfig,
    arch: bool,
) -> Result<(String, DashboardSnapshot), CliError> {
    let session = open_session(globals, settings).await?;
    let destination = session.target().destination();

    let mut collector = Collector::new(Probe::new(session)).with_arch(arch);
    let result = sample_twice(&mut collector, &mut config).await;

    let mut session = collector.into_probe().into_runner();
    close_session(&mut session).await;
    result.map(|snapshot| (destination, snapshot))
}

/// Sampling interval: `--interval` when given, else the settings file
fn snapshot_config(
    settings: &Settings,
    interval: Option<f64>,
) -> Result<DashboardConfig, CliError> {
    let mut config = DashboardConfig::from_settings(&settings.dashboard);
    if let Some(secs) = interval {
        config.set_refresh_interval(secs)?;
    }
    Ok(config)
}

async fn sample_twice<R: CommandRunner>(
    collector: &mut Collector<R>,
    config: &mut DashboardConfig,
) -> Result<DashboardSnapshot, CliError> {
    collector.collect(config).await?;
    tokio::time::sleep(config.refresh_interval()).await;
    Ok(collector.collect(config).await?.clone())
}

/// Human readable report of one snapshot
fn render_text(destination: &str, snapshot: &DashboardSnapshot) -> String {
    let mut out = String::new();
    let hostname = snapshot.hostname.as_deref().unwrap_or(format::PLACEHOLDER);
    let kernel = snapshot.kernel.as_deref().unwrap_or(format::PLACEHOLDER);
    let _ = writeln!(out, "{destination} ({hostname}) {kernel}");
    if let Some(at) = snapshot.collected_at {
        let _ = writeln!(out, "Collected at   {}", at.format("%Y-%m-%d %H:%M:%S UTC"));
    }
    out.push('\n');

    let rows = [
        ("GPU temp", format::or_placeholder(snapshot.gpu_temp, format::temperature)),
        ("CPU temp", format::or_placeholder(snapshot.cpu_temp, format::temperature)),
        ("CPU usage", format::or_placeholder(snapshot.cpu_usage, format::cpu_usage)),
        ("RAM", format::or_placeholder(snapshot.memory, format::memory)),
        ("Processes", format::or_placeholder(snapshot.load, format::processes)),
        ("Load", format::or_placeholder(snapshot.load, format::load_average)),
        (
            "CPU freq",
            format::or_placeholder(snapshot.cpu_frequency_mhz, format::frequency),
        ),
        ("Uptime", format::or_placeholder(snapshot.uptime.clone(), |u| u)),
        (
            "Governor",
            format::or_placeholder(snapshot.governors.as_ref(), format::governors),
        ),
        ("GPU memory", format::or_placeholder(snapshot.gpu_memory.clone(), |m| m)),
        ("Codecs", format::or_placeholder(snapshot.codecs.as_ref(), format::codecs)),
    ];
    for (label, value) in rows {
        let _ = writeln!(out, "{label:<14} {value}");
    }

    out.push('\n');
    match snapshot.throttle {
        Some(throttle) => {
            let _ = writeln!(
                out,
                "Throttling     current: {}",
                format::conditions(&throttle.active())
            );
            let _ = writeln!(
                out,
                "               since boot: {}",
                format::conditions(&throttle.occurred())
            );
        }
        None => {
            let _ = writeln!(out, "Throttling     {}", format::PLACEHOLDER);
        }
    }

    out.push('\n');
    let _ = writeln!(
        out,
        "{:<20} {:>8} {:>8} {:>8} {:>7}   ({})",
        "Mount",
        "Total",
        "Used",
        "Free",
        "% Used",
        format::units(snapshot.disk_units)
    );
    match snapshot.disks {
        Some(ref disks) => {
            for disk in disks {
                let _ = writeln!(
                    out,
                    "{:<20} {:>8} {:>8} {:>8} {:>6}%",
                    disk.mount, disk.total, disk.used, disk.free, disk.percent_used
                );
            }
        }
        None => {
            let _ = writeln!(out, "{}", format::PLACEHOLDER);
        }
    }

    if !snapshot.problems.is_empty() {
        out.push('\n');
        let _ = writeln!(out, "Problems:");
        for problem in &snapshot.problems {
            let _ = writeln!(out, "  - {problem}");
        }
    }

    out.trim_end().to_string()
}
