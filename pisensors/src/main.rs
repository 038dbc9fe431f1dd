//! `pisensors` - Live Raspberry Pi monitoring dashboard over SSH
//!
//! Connects to a Pi with the system `ssh` client and shows temperatures,
//! throttling, CPU, memory, disks and codec support in a terminal dashboard.
//! Also provides a one-shot snapshot, settings file management and shell
//! completions.

mod cli;
mod commands;
mod dashboard;
mod error;
mod format;
mod util;

use clap::Parser;
use cli::Cli;

fn main() {
    let cli = Cli::parse();

    let result = commands::dispatch(cli);

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(e.exit_code());
    }
}
