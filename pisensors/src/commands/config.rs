//! Settings file command.

use super::Globals;
use crate::error::CliError;
use crate::util;

/// `config --init` writes the defaults when no file exists; `config --show`
/// prints the effective settings.
pub fn cmd_config(globals: &Globals<'_>, init: bool, show: bool) -> Result<(), CliError> {
    util::init_logging(util::command_tracing(globals.log_file, globals.verbose));
    let manager = util::create_config_manager(globals.config_path)?;

    if init {
        let (path, created) = manager.init_settings()?;
        if created {
            println!("Created {}", path.display());
        } else {
            println!("Settings already exist at {}", path.display());
        }
    }

    if show {
        let settings = manager.load_settings()?;
        let text = toml::to_string_pretty(&settings)
            .map_err(|e| CliError::Output(format!("Failed to format settings: {e}")))?;
        println!("# {}", manager.settings_path().display());
        print!("{text}");
    }

    Ok(())
}
