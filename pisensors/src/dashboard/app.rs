//! Dashboard state

use pisensors_core::config::{DashboardConfig, DashboardSettings, Settings};

use super::input::Keymap;

/// State shared by the event loop, the key handler and the renderer
pub struct App {
    /// Refresh interval, disk units and the refresh trigger
    pub config: DashboardConfig,
    /// Temperature thresholds and bar width
    pub settings: DashboardSettings,
    /// Resolved keybindings
    pub keymap: Keymap,
    /// `user@host` shown in the header
    pub destination: String,
    /// Set when the user asked to leave
    pub should_quit: bool,
}

impl App {
    pub fn new(config: DashboardConfig, settings: &Settings, destination: String) -> Self {
        Self {
            config,
            settings: settings.dashboard.clone(),
            keymap: Keymap::from_settings(&settings.keybindings),
            destination,
            should_quit: false,
        }
    }
}
