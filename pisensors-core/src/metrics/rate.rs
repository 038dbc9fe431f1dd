//! CPU utilization from consecutive `/proc/stat` samples

use super::model::{CpuUsage, UsageQuality, UtilizationSample};
use super::parser::round_to;

/// Turns cumulative CPU counters into a busy percentage.
///
/// The calculator starts cold with a zero baseline: the first reading is the
/// average since boot and is flagged [`UsageQuality::WarmUp`]. Counters that
/// go backwards (reboot) re-seed the baseline the same way. A sample with no
/// elapsed time repeats the previous value as [`UsageQuality::Stale`]
/// without replacing the baseline.
#[derive(Debug, Clone, Default)]
pub struct RateCalculator {
    previous: UtilizationSample,
    warm: bool,
    last_percent: f64,
}

impl RateCalculator {
    /// Creates a cold calculator
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` once a baseline has been recorded
    #[must_use]
    pub const fn is_warm(&self) -> bool {
        self.warm
    }

    /// Feeds a new sample and returns the utilization since the last one
    pub fn update(&mut self, sample: UtilizationSample) -> CpuUsage {
        if self.warm && sample.regressed_from(&self.previous) {
            tracing::debug!(
                prev_total = self.previous.total,
                total = sample.total,
                "CPU counters went backwards, resetting baseline"
            );
            self.reset();
        }

        let quality = if self.warm {
            UsageQuality::Live
        } else {
            UsageQuality::WarmUp
        };
        let total_delta = sample.total - self.previous.total;
        let idle_delta = sample.idle - self.previous.idle;

        if total_delta == 0 {
            return if self.warm {
                CpuUsage {
                    percent: self.last_percent,
                    quality: UsageQuality::Stale,
                }
            } else {
                // Nothing counted yet; stay cold
                CpuUsage {
                    percent: 0.0,
                    quality,
                }
            };
        }

        let busy = 100.0 * (1.0 - idle_delta as f64 / total_delta as f64);
        let percent = round_to(busy.clamp(0.0, 100.0), 2);

        self.previous = sample;
        self.warm = true;
        self.last_percent = percent;

        CpuUsage { percent, quality }
    }

    /// Returns to the cold state (e.g. after reconnecting)
    pub fn reset(&mut self) {
        self.previous = UtilizationSample::ZERO;
        self.warm = false;
        self.last_percent = 0.0;
    }
}
