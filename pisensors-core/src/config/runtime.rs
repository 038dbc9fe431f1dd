//! Mutable dashboard state shared by the key handler and the collector

use std::time::Duration;

use super::settings::DashboardSettings;
use crate::error::{ConfigError, ConfigResult};
use crate::metrics::DiskUnits;

/// Step applied by [`DashboardConfig::faster`] and [`DashboardConfig::slower`]
pub const REFRESH_STEP_SECS: f64 = 0.1;

/// Shortest refresh interval reachable with the keys
pub const MIN_REFRESH_SECS: f64 = 0.1;

/// Longest accepted refresh interval (one hour)
pub const MAX_REFRESH_SECS: f64 = 3600.0;

/// Checks that `secs` is a usable refresh interval.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidValue`] unless `secs` is finite, positive
/// and at most [`MAX_REFRESH_SECS`].
pub fn validate_refresh_secs(secs: f64) -> ConfigResult<()> {
    if !secs.is_finite() || secs <= 0.0 {
        return Err(ConfigError::InvalidValue {
            field: "refresh_secs",
            reason: format!("must be a positive number of seconds, got {secs}"),
        });
    }
    if secs > MAX_REFRESH_SECS {
        return Err(ConfigError::InvalidValue {
            field: "refresh_secs",
            reason: format!("must be at most {MAX_REFRESH_SECS} seconds, got {secs}"),
        });
    }
    Ok(())
}

/// Runtime dashboard options.
///
/// Passed by `&mut` to the key handler and read by the collector each
/// cycle. All changes go through the setters so invariants hold: the
/// interval is always positive, finite and at most [`MAX_REFRESH_SECS`].
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardConfig {
    refresh_secs: f64,
    disk_units: DiskUnits,
    refresh_requested: bool,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self::from_settings(&DashboardSettings::default())
    }
}

impl DashboardConfig {
    /// Initial state from the `[dashboard]` section.
    ///
    /// A non-positive interval in the file falls back to the minimum and
    /// an overlong one is capped at [`MAX_REFRESH_SECS`].
    #[must_use]
    pub fn from_settings(settings: &DashboardSettings) -> Self {
        let secs = settings.refresh_secs;
        let refresh_secs = if !secs.is_finite() || secs <= 0.0 {
            MIN_REFRESH_SECS
        } else {
            secs.min(MAX_REFRESH_SECS)
        };
        Self {
            refresh_secs,
            disk_units: settings.disk_units(),
            refresh_requested: false,
        }
    }

    /// Seconds between refresh cycles
    #[must_use]
    pub const fn refresh_secs(&self) -> f64 {
        self.refresh_secs
    }

    /// Refresh interval as a [`Duration`]
    #[must_use]
    pub fn refresh_interval(&self) -> Duration {
        Duration::try_from_secs_f64(self.refresh_secs)
            .unwrap_or_else(|_| Duration::from_secs_f64(MAX_REFRESH_SECS))
    }

    /// Sets the refresh interval.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] for values rejected by
    /// [`validate_refresh_secs`]; the current interval is kept.
    pub fn set_refresh_interval(&mut self, secs: f64) -> ConfigResult<()> {
        validate_refresh_secs(secs)?;
        self.refresh_secs = secs;
        Ok(())
    }

    /// Shortens the interval by 0.1 s, never below 0.1 s
    pub fn faster(&mut self) {
        let next = round_step(self.refresh_secs - REFRESH_STEP_SECS);
        self.refresh_secs = next.max(MIN_REFRESH_SECS);
        tracing::debug!(refresh_secs = self.refresh_secs, "Refresh interval decreased");
    }

    /// Lengthens the interval by 0.1 s, never above one hour
    pub fn slower(&mut self) {
        let next = round_step(self.refresh_secs + REFRESH_STEP_SECS);
        self.refresh_secs = next.min(MAX_REFRESH_SECS);
        tracing::debug!(refresh_secs = self.refresh_secs, "Refresh interval increased");
    }

    /// Current disk unit mode
    #[must_use]
    pub const fn disk_units(&self) -> DiskUnits {
        self.disk_units
    }

    /// Switches disk units and requests a refresh so the table is re-read
    pub fn toggle_disk_units(&mut self) {
        self.disk_units = self.disk_units.toggled();
        self.refresh_requested = true;
    }

    /// Asks the collector to re-fetch static values on its next cycle
    pub fn request_refresh(&mut self) {
        self.refresh_requested = true;
    }

    /// Returns whether a refresh was requested and clears the request
    pub fn take_refresh_request(&mut self) -> bool {
        std::mem::take(&mut self.refresh_requested)
    }

    /// Returns `true` if a refresh is pending
    #[must_use]
    pub const fn refresh_pending(&self) -> bool {
        self.refresh_requested
    }
}

/// Keeps repeated 0.1 steps from drifting (0.30000000000000004)
fn round_step(secs: f64) -> f64 {
    (secs * 10.0).round() / 10.0
}
