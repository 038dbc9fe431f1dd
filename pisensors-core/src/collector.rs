//! Refresh cycles for the dashboard
//!
//! The [`Collector`] runs every metric query once per cycle and folds the
//! results into a [`DashboardSnapshot`]. Values that rarely change (kernel,
//! hostname, codecs, governor list, GPU memory split) and the disk table are only
//! re-read on the first cycle or when a refresh is requested. Static values
//! that could not be read are retried every cycle until they arrive.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::Instrument;

use crate::config::DashboardConfig;
use crate::metrics::{
    CodecStatus, CpuUsage, DiskTableRow, DiskUnits, Governors, LoadAverage, MemoryUsage,
    MetricResult, MetricsError, Probe, ThrottleStatus, commands,
};
use crate::session::CommandRunner;
use crate::tracing::span_names;

/// Everything shown on one dashboard frame.
///
/// `None` means the value could not be read this cycle and is drawn as a
/// placeholder; the reason is listed in [`DashboardSnapshot::problems`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DashboardSnapshot {
    /// When the cycle finished
    pub collected_at: Option<DateTime<Utc>>,
    /// Kernel release line
    pub kernel: Option<String>,
    /// Host name of the monitored machine
    pub hostname: Option<String>,
    /// Mounted filesystems
    pub disks: Option<Vec<DiskTableRow>>,
    /// Units the disk table was read in
    pub disk_units: DiskUnits,
    /// Firmware throttling flags
    pub throttle: Option<ThrottleStatus>,
    /// GPU temperature (°C)
    pub gpu_temp: Option<f64>,
    /// SoC temperature (°C)
    pub cpu_temp: Option<f64>,
    /// CPU utilization
    pub cpu_usage: Option<CpuUsage>,
    /// RAM usage
    pub memory: Option<MemoryUsage>,
    /// Load averages and process counts
    pub load: Option<LoadAverage>,
    /// ARM clock (MHz)
    pub cpu_frequency_mhz: Option<u64>,
    /// Time since boot
    pub uptime: Option<String>,
    /// cpufreq governors
    pub governors: Option<Governors>,
    /// GPU memory split (with unit)
    pub gpu_memory: Option<String>,
    /// Hardware codec support
    pub codecs: Option<CodecStatus>,
    /// Recoverable errors hit during the last cycle
    pub problems: Vec<String>,
}

/// Produces [`DashboardSnapshot`]s from a [`Probe`].
///
/// Keeps the last snapshot so values fetched only on demand stay visible
/// between refreshes.
pub struct Collector<R> {
    probe: Probe<R>,
    snapshot: DashboardSnapshot,
    static_loaded: bool,
    disks_units: Option<DiskUnits>,
    with_arch: bool,
}

impl<R: CommandRunner> Collector<R> {
    /// Creates a collector; nothing is fetched until [`Self::collect`]
    pub fn new(probe: Probe<R>) -> Self {
        Self {
            probe,
            snapshot: DashboardSnapshot::default(),
            static_loaded: false,
            disks_units: None,
            with_arch: false,
        }
    }

    /// Report the machine architecture next to the kernel release
    #[must_use]
    pub const fn with_arch(mut self, with_arch: bool) -> Self {
        self.with_arch = with_arch;
        self
    }

    /// The most recent snapshot
    pub const fn snapshot(&self) -> &DashboardSnapshot {
        &self.snapshot
    }

    /// The probe, e.g. to reach the runner
    pub const fn probe(&self) -> &Probe<R> {
        &self.probe
    }

    /// Consumes the collector, returning the probe
    pub fn into_probe(self) -> Probe<R> {
        self.probe
    }

    /// Forgets everything so the next cycle starts from scratch
    pub fn reset(&mut self) {
        self.probe.reset_rate();
        self.snapshot = DashboardSnapshot::default();
        self.static_loaded = false;
        self.disks_units = None;
    }

    /// Runs one refresh cycle.
    ///
    /// Consumes a pending refresh request from `config`.
    ///
    /// # Errors
    ///
    /// Returns the first fatal session error; recoverable errors are
    /// recorded in [`DashboardSnapshot::problems`] instead.
    pub async fn collect(
        &mut self,
        config: &mut DashboardConfig,
    ) -> MetricResult<&DashboardSnapshot> {
        let forced = config.take_refresh_request();
        let units = config.disk_units();
        let span = tracing::debug_span!(span_names::COLLECT_CYCLE, forced, ?units);

        self.cycle(forced, units).instrument(span).await?;
        Ok(&self.snapshot)
    }

    async fn cycle(&mut self, forced: bool, units: DiskUnits) -> MetricResult<()> {
        let mut problems = Vec::new();

        if forced || !self.static_loaded {
            self.static_loaded = self.collect_static(&mut problems).await?;
        }

        if forced || self.disks_units != Some(units) {
            let disks = self.probe.disk_usage(units).await;
            self.snapshot.disks = recover(disks, &mut problems)?;
            self.snapshot.disk_units = units;
            self.disks_units = Some(units);
        }

        let throttle = self.probe.throttle_status().await;
        self.snapshot.throttle = recover(throttle, &mut problems)?;
        let gpu_temp = self.probe.gpu_temperature().await;
        self.snapshot.gpu_temp = recover(gpu_temp, &mut problems)?;
        let cpu_temp = self.probe.cpu_temperature().await;
        self.snapshot.cpu_temp = recover(cpu_temp, &mut problems)?;
        let cpu_usage = self.probe.cpu_usage().await;
        self.snapshot.cpu_usage = recover(cpu_usage, &mut problems)?;
        let memory = self.probe.memory_usage().await;
        self.snapshot.memory = recover(memory, &mut problems)?;
        let load = self.probe.load_average().await;
        self.snapshot.load = recover(load, &mut problems)?;
        let frequency = self.probe.cpu_frequency().await;
        self.snapshot.cpu_frequency_mhz = recover(frequency, &mut problems)?;
        let uptime = self.probe.uptime().await;
        self.snapshot.uptime = recover(uptime, &mut problems)?;
        // The governor list is static; only the active one can change
        if let Some(governors) = self.snapshot.governors.as_mut() {
            let current = self.probe.current_governor().await;
            if let Some(current) = recover(current, &mut problems)? {
                governors.current = current;
            }
        }

        self.snapshot.problems = problems;
        self.snapshot.collected_at = Some(Utc::now());
        Ok(())
    }

    /// Fetches the values that only change on request.
    ///
    /// Returns `false` if any of them is missing, so the next cycle tries
    /// again.
    async fn collect_static(&mut self, problems: &mut Vec<String>) -> MetricResult<bool> {
        tracing::debug!("Fetching static host information");
        let before = problems.len();
        let kernel = self.probe.kernel_info(self.with_arch).await;
        self.snapshot.kernel = recover(kernel, problems)?;
        let hostname = self.probe.hostname().await;
        self.snapshot.hostname = recover(hostname, problems)?;
        let gpu_memory = self.probe.gpu_memory().await;
        self.snapshot.gpu_memory = recover(gpu_memory, problems)?;
        let codecs = self.probe.codec_status().await;
        self.snapshot.codecs = recover(codecs, problems)?;
        let governors = self.probe.governors().await;
        self.snapshot.governors = recover(governors, problems)?;

        let codecs_complete = self
            .snapshot
            .codecs
            .as_ref()
            .is_some_and(|c| c.len() == commands::KNOWN_CODECS.len());
        Ok(problems.len() == before && codecs_complete)
    }
}

/// Splits a query result into a value, a logged problem or a fatal error
fn recover<T>(
    result: MetricResult<T>,
    problems: &mut Vec<String>,
) -> Result<Option<T>, MetricsError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(err) if err.is_fatal() => Err(err),
        Err(err) => {
            tracing::warn!(error = %err, "Metric unavailable");
            problems.push(err.to_string());
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::UsageQuality;
    use crate::session::{ScriptedFailure, ScriptedRunner};

    const DF_HUMAN_OUT: &str = "Filesystem      Size  Used Avail Use% Mounted on\n\
                                /dev/root        29G  4.1G   24G  15% /\n";
    const DF_MB_OUT: &str = "Filesystem 1M-blocks Used Available Use% Mounted on\n\
                             /dev/root 29000 4100 24000 15% /\n";

    fn healthy_runner() -> ScriptedRunner {
        let mut runner = ScriptedRunner::new()
            .with_output(commands::KERNEL, "Linux 6.1.21-v8+\n")
            .with_output(commands::HOSTNAME, "raspberrypi\n")
            .with_output(commands::GPU_MEMORY, "gpu=76M\n")
            .with_output(commands::DF_HUMAN, DF_HUMAN_OUT)
            .with_output(commands::DF_MEGABYTES, DF_MB_OUT)
            .with_output(commands::THROTTLED, "throttled=0x0\n")
            .with_output(commands::GPU_TEMP, "temp=48.3'C\n")
            .with_output(commands::CPU_TEMP, "45678\n")
            .with_output(commands::PROC_STAT, "cpu  100 0 50 850 0 0 0\n")
            .with_output(
                commands::FREE,
                "       total used free shared buff/cache available\n\
                 Mem:   1000  300  500    100        200       600\n",
            )
            .with_output(commands::LOADAVG, "0.52 0.34 0.28 3/1234 56789\n")
            .with_output(commands::ARM_CLOCK, "frequency(48)=1500398464\n")
            .with_output(commands::UPTIME, "up 2 hours, 3 minutes\n")
            .with_output(commands::AVAILABLE_GOVERNORS, "ondemand performance\n")
            .with_output(commands::CURRENT_GOVERNOR, "ondemand\n");
        for codec in commands::KNOWN_CODECS {
            runner =
                runner.with_output(commands::codec_enabled(codec), format!("{codec}=disabled"));
        }
        runner
    }

    #[tokio::test]
    async fn test_first_cycle_fills_every_field() {
        let mut collector = Collector::new(Probe::new(healthy_runner()));
        let mut config = DashboardConfig::default();

        let snapshot = collector.collect(&mut config).await.unwrap();
        assert_eq!(snapshot.kernel.as_deref(), Some("Linux 6.1.21-v8+"));
        assert_eq!(snapshot.hostname.as_deref(), Some("raspberrypi"));
        assert_eq!(snapshot.disks.as_ref().map(Vec::len), Some(1));
        assert_eq!(snapshot.cpu_frequency_mhz, Some(1500));
        assert_eq!(snapshot.uptime.as_deref(), Some("2 hours, 3 minutes"));
        assert_eq!(snapshot.gpu_memory.as_deref(), Some("76M"));
        assert_eq!(snapshot.codecs.as_ref().map(CodecStatus::len), Some(18));
        assert_eq!(
            snapshot.cpu_usage.map(|u| u.quality),
            Some(UsageQuality::WarmUp)
        );
        assert!(snapshot.problems.is_empty());
        assert!(snapshot.collected_at.is_some());
    }

    #[tokio::test]
    async fn test_static_values_fetched_once_until_refresh() {
        let mut collector = Collector::new(Probe::new(healthy_runner()));
        let mut config = DashboardConfig::default();

        collector.collect(&mut config).await.unwrap();
        collector.collect(&mut config).await.unwrap();
        let runner = collector.probe().runner();
        assert_eq!(runner.call_count(commands::KERNEL), 1);
        assert_eq!(runner.call_count(commands::DF_HUMAN), 1);
        assert_eq!(runner.call_count(commands::GPU_TEMP), 2);
        assert_eq!(runner.call_count(commands::AVAILABLE_GOVERNORS), 1);
        assert_eq!(runner.call_count(commands::CURRENT_GOVERNOR), 2);

        config.request_refresh();
        collector.collect(&mut config).await.unwrap();
        let runner = collector.probe().runner();
        assert_eq!(runner.call_count(commands::KERNEL), 2);
        assert_eq!(runner.call_count(commands::HOSTNAME), 2);
        assert_eq!(runner.call_count(commands::DF_HUMAN), 2);
    }

    #[tokio::test]
    async fn test_failed_static_value_is_retried_next_cycle() {
        let runner = healthy_runner();
        runner.queue(commands::HOSTNAME, "");
        let mut collector = Collector::new(Probe::new(runner));
        let mut config = DashboardConfig::default();

        let snapshot = collector.collect(&mut config).await.unwrap();
        assert_eq!(snapshot.hostname, None);
        assert_eq!(snapshot.problems.len(), 1);

        let snapshot = collector.collect(&mut config).await.unwrap();
        assert_eq!(snapshot.hostname.as_deref(), Some("raspberrypi"));
        assert!(snapshot.problems.is_empty());

        collector.collect(&mut config).await.unwrap();
        assert_eq!(collector.probe().runner().call_count(commands::HOSTNAME), 2);
    }

    #[tokio::test]
    async fn test_missing_static_value_stays_reported() {
        let runner = healthy_runner().with_failure(
            commands::GPU_MEMORY,
            ScriptedFailure::CommandFailed {
                code: 1,
                stderr: "vcgencmd: not found".into(),
            },
        );
        let mut collector = Collector::new(Probe::new(runner));
        let mut config = DashboardConfig::default();

        for _ in 0..3 {
            let snapshot = collector.collect(&mut config).await.unwrap();
            assert_eq!(snapshot.gpu_memory, None);
            assert_eq!(snapshot.problems.len(), 1);
        }
        assert_eq!(collector.probe().runner().call_count(commands::GPU_MEMORY), 3);
    }

    #[tokio::test]
    async fn test_unit_toggle_rereads_disks() {
        let mut collector = Collector::new(Probe::new(healthy_runner()));
        let mut config = DashboardConfig::default();
        collector.collect(&mut config).await.unwrap();

        config.toggle_disk_units();
        let snapshot = collector.collect(&mut config).await.unwrap();
        assert_eq!(snapshot.disk_units, DiskUnits::Megabytes);
        assert_eq!(snapshot.disks.as_ref().unwrap()[0].total, "29000");
        assert_eq!(collector.probe().runner().call_count(commands::DF_MEGABYTES), 1);
    }

    #[tokio::test]
    async fn test_recoverable_errors_leave_placeholders() {
        let runner = healthy_runner()
            .with_output(commands::GPU_TEMP, "not a temperature")
            .with_failure(
                commands::ARM_CLOCK,
                ScriptedFailure::CommandFailed {
                    code: 1,
                    stderr: "vcgencmd: not found".into(),
                },
            );
        let mut collector = Collector::new(Probe::new(runner));
        let mut config = DashboardConfig::default();

        let snapshot = collector.collect(&mut config).await.unwrap();
        assert_eq!(snapshot.gpu_temp, None);
        assert_eq!(snapshot.cpu_frequency_mhz, None);
        assert!(snapshot.cpu_temp.is_some());
        assert_eq!(snapshot.problems.len(), 2);
    }

    #[tokio::test]
    async fn test_fatal_error_aborts_cycle() {
        let runner =
            healthy_runner().with_failure(commands::LOADAVG, ScriptedFailure::ConnectionLost);
        let mut collector = Collector::new(Probe::new(runner));
        let mut config = DashboardConfig::default();

        let err = collector.collect(&mut config).await.unwrap_err();
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn test_snapshot_serializes_to_json() {
        let mut collector = Collector::new(Probe::new(healthy_runner()));
        let mut config = DashboardConfig::default();
        let snapshot = collector.collect(&mut config).await.unwrap();

        let json = serde_json::to_value(snapshot).unwrap();
        assert_eq!(json["hostname"], "raspberrypi");
        assert_eq!(json["cpu_usage"]["quality"], "warm_up");
        assert_eq!(json["disk_units"], "human");
    }
}
