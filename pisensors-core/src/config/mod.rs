//! Configuration
//!
//! [`Settings`] is the persistent `config.toml`, loaded through
//! [`ConfigManager`]. [`DashboardConfig`] is the runtime object the key
//! handler mutates while the dashboard runs.

mod keybindings;
mod manager;
mod runtime;
mod settings;

pub use keybindings::{
    KeyAction, KeybindingCategory, KeybindingDef, KeybindingSettings, NAMED_KEYS,
    default_keybindings, is_valid_key,
};
pub use manager::{CONFIG_DIR_NAME, ConfigManager, SETTINGS_FILE};
pub use runtime::{
    DashboardConfig, MAX_REFRESH_SECS, MIN_REFRESH_SECS, REFRESH_STEP_SECS, validate_refresh_secs,
};
pub use settings::{ConnectionSettings, DashboardSettings, LoggingSettings, Settings};
