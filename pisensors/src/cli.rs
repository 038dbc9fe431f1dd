//! CLI argument parsing types using `clap`.

use std::path::PathBuf;

use clap::{ArgGroup, Args, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;

/// Live Raspberry Pi monitoring dashboard over SSH
#[derive(Parser)]
#[command(name = "pisensors")]
#[command(author, version, about = "Live Raspberry Pi monitoring dashboard over SSH")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// Path to the configuration directory
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Write logs to this file instead of the default destination
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// How to reach the Pi; overrides `[connection]` in the settings file
#[derive(Args, Clone, Debug, Default)]
pub struct ConnectionArgs {
    /// Host name or address of the Pi
    #[arg(short = 'H', long, global = true, env = "PISENSORS_HOST")]
    pub host: Option<String>,

    /// Login name
    #[arg(short, long, global = true)]
    pub user: Option<String>,

    /// SSH port
    #[arg(short, long, global = true)]
    pub port: Option<u16>,

    /// Private key file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub identity: Option<PathBuf>,

    /// Password (requires sshpass); prefer --ask-pass or keys
    #[arg(long, global = true, env = "PISENSORS_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Prompt for the password
    #[arg(long, global = true, conflicts_with = "password")]
    pub ask_pass: bool,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Live dashboard (default)
    #[command(about = "Show the live dashboard")]
    Watch(WatchArgs),

    /// Print one reading and exit
    #[command(about = "Collect one reading and print it")]
    Snapshot {
        /// Output format
        #[arg(short, long, default_value = "text", value_enum)]
        format: OutputFormat,

        /// Seconds between the two CPU samples
        #[arg(long, value_name = "SECS")]
        interval: Option<f64>,

        /// Include the machine architecture in the kernel line
        #[arg(long)]
        arch: bool,
    },

    /// Manage the settings file
    #[command(about = "Create or print the settings file")]
    #[command(group(ArgGroup::new("action").required(true).multiple(true).args(["init", "show"])))]
    Config {
        /// Write default settings if no file exists
        #[arg(long)]
        init: bool,

        /// Print the effective settings as TOML
        #[arg(long)]
        show: bool,
    },

    /// Generate shell completions
    #[command(about = "Generate shell completion scripts")]
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Options of the live dashboard
#[derive(Args, Clone, Debug, Default)]
pub struct WatchArgs {
    /// Seconds between refreshes
    #[arg(long, value_name = "SECS")]
    pub interval: Option<f64>,

    /// Show disk sizes in MiB instead of human readable units
    #[arg(long)]
    pub raw_units: bool,

    /// Include the machine architecture in the kernel line
    #[arg(long)]
    pub arch: bool,
}

/// Output format for the snapshot command
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human readable report
    Text,
    /// JSON document
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_no_subcommand_means_watch() {
        let cli = Cli::try_parse_from(["pisensors", "-H", "raspberrypi.local"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.connection.host.as_deref(), Some("raspberrypi.local"));
    }

    #[test]
    fn test_global_options_after_subcommand() {
        let cli = Cli::try_parse_from([
            "pisensors", "snapshot", "--format", "json", "-H", "10.0.0.7", "-u", "pi", "-p", "2222",
            "-vv",
        ])
        .unwrap();
        assert_eq!(cli.connection.port, Some(2222));
        assert_eq!(cli.verbose, 2);
        assert!(matches!(
            cli.command,
            Some(Commands::Snapshot {
                format: OutputFormat::Json,
                ..
            })
        ));
    }

    #[test]
    fn test_config_requires_an_action() {
        assert!(Cli::try_parse_from(["pisensors", "config"]).is_err());
        assert!(Cli::try_parse_from(["pisensors", "config", "--init"]).is_ok());
    }

    #[test]
    fn test_password_conflicts_with_ask_pass() {
        assert!(
            Cli::try_parse_from(["pisensors", "--password", "x", "--ask-pass"]).is_err()
        );
    }

    #[test]
    fn test_watch_options() {
        let cli =
            Cli::try_parse_from(["pisensors", "watch", "--interval", "2", "--raw-units"]).unwrap();
        let Some(Commands::Watch(args)) = cli.command else {
            panic!("expected watch");
        };
        assert_eq!(args.interval, Some(2.0));
        assert!(args.raw_units);
    }
}
