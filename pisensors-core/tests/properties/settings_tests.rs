//! Property-based tests for settings persistence

use pisensors_core::config::{ConfigManager, Settings};
use proptest::prelude::*;
use tempfile::TempDir;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    /// Any valid settings written to disk load back unchanged
    #[test]
    fn prop_settings_survive_save_and_load(
        host in "[a-z][a-z0-9-]{0,15}(\\.local)?",
        port in 1u16..,
        refresh_tenths in 1u32..600,
        bar_width in 1u16..200,
        human_units in any::<bool>(),
        multiplex in any::<bool>(),
    ) {
        let dir = TempDir::new().unwrap();
        let manager = ConfigManager::with_config_dir(dir.path());

        let mut settings = Settings::default();
        settings.connection.host = Some(host);
        settings.connection.port = port;
        settings.connection.multiplex = multiplex;
        settings.dashboard.refresh_secs = f64::from(refresh_tenths) / 10.0;
        settings.dashboard.bar_width = bar_width;
        settings.dashboard.human_units = human_units;

        manager.save_settings(&settings).unwrap();
        prop_assert_eq!(manager.load_settings().unwrap(), settings);
    }
}
