//! One async query per metric on top of a [`CommandRunner`]

use thiserror::Error;

use super::commands;
use super::model::{
    CodecStatus, CpuUsage, DiskTableRow, DiskUnits, Governors, LoadAverage, MemoryUsage,
    ThrottleStatus,
};
use super::parser::{MetricsParser, ParseError};
use super::rate::RateCalculator;
use crate::error::SessionError;
use crate::session::{CommandRunner, RawOutput};

/// Errors returned by metric queries
#[derive(Debug, Error)]
pub enum MetricsError {
    /// The command could not be run
    #[error(transparent)]
    Session(#[from] SessionError),

    /// The command ran but its output was not understood
    #[error("Failed to parse {metric}: {source}")]
    Parse {
        /// Metric being queried
        metric: &'static str,
        /// Parser failure
        #[source]
        source: ParseError,
    },
}

impl MetricsError {
    /// Returns `true` if the session is unusable and polling must stop
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        match self {
            Self::Session(e) => e.is_fatal(),
            Self::Parse { .. } => false,
        }
    }
}

/// Result type for metric queries
pub type MetricResult<T> = Result<T, MetricsError>;

/// Issues metric commands and parses their output.
///
/// Owns the command runner and the CPU [`RateCalculator`]; queries run one
/// at a time.
pub struct Probe<R> {
    runner: R,
    rate: RateCalculator,
}

impl<R: CommandRunner> Probe<R> {
    /// Creates a probe with a cold rate calculator
    pub fn new(runner: R) -> Self {
        Self {
            runner,
            rate: RateCalculator::new(),
        }
    }

    /// The underlying runner
    pub const fn runner(&self) -> &R {
        &self.runner
    }

    /// Consumes the probe, returning the runner
    pub fn into_runner(self) -> R {
        self.runner
    }

    /// Forgets the CPU baseline (e.g. after reconnecting)
    pub fn reset_rate(&mut self) {
        self.rate.reset();
    }

    async fn run(&self, command: &str) -> MetricResult<RawOutput> {
        tracing::trace!(command, "Running metric command");
        Ok(self.runner.execute(command).await?)
    }

    async fn query<T>(
        &self,
        metric: &'static str,
        command: &str,
        parse: impl FnOnce(&RawOutput) -> Result<T, ParseError>,
    ) -> MetricResult<T> {
        let output = self.run(command).await?;
        parse(&output).map_err(|source| MetricsError::Parse { metric, source })
    }

    /// GPU temperature in Celsius
    ///
    /// # Errors
    ///
    /// Returns a session or parse error.
    pub async fn gpu_temperature(&self) -> MetricResult<f64> {
        self.query(
            "gpu temperature",
            commands::GPU_TEMP,
            MetricsParser::gpu_temperature,
        )
        .await
    }

    /// SoC temperature in Celsius
    ///
    /// # Errors
    ///
    /// Returns a session or parse error.
    pub async fn cpu_temperature(&self) -> MetricResult<f64> {
        self.query(
            "cpu temperature",
            commands::CPU_TEMP,
            MetricsParser::cpu_temperature,
        )
        .await
    }

    /// CPU utilization since the previous call.
    ///
    /// The first call after creation or [`Probe::reset_rate`] returns the
    /// since-boot average flagged as warm-up.
    ///
    /// # Errors
    ///
    /// Returns a session or parse error; the baseline is left untouched.
    pub async fn cpu_usage(&mut self) -> MetricResult<CpuUsage> {
        let sample = self
            .query("cpu usage", commands::PROC_STAT, MetricsParser::utilization)
            .await?;
        Ok(self.rate.update(sample))
    }

    /// Firmware throttling flags
    ///
    /// # Errors
    ///
    /// Returns a session or parse error.
    pub async fn throttle_status(&self) -> MetricResult<ThrottleStatus> {
        self.query(
            "throttle status",
            commands::THROTTLED,
            MetricsParser::throttle_status,
        )
        .await
    }

    /// Hardware acceleration for every known codec.
    ///
    /// A codec whose query fails is left out of the result; the others are
    /// still reported.
    ///
    /// # Errors
    ///
    /// Returns a fatal session error at once, or the first error when no
    /// codec could be queried.
    pub async fn codec_status(&self) -> MetricResult<CodecStatus> {
        let mut status = CodecStatus::new();
        let mut first_error = None;
        for codec in commands::KNOWN_CODECS {
            let result = self
                .query("codec status", &commands::codec_enabled(codec), |out| {
                    MetricsParser::codec_enabled(out, codec)
                })
                .await;
            match result {
                Ok(enabled) => status.insert(codec, enabled),
                Err(err) if err.is_fatal() => return Err(err),
                Err(err) => {
                    tracing::warn!(codec, error = %err, "Skipping codec");
                    first_error.get_or_insert(err);
                }
            }
        }
        match first_error {
            Some(err) if status.is_empty() => Err(err),
            _ => Ok(status),
        }
    }

    /// Kernel release, optionally with the machine architecture
    ///
    /// # Errors
    ///
    /// Returns a session or parse error.
    pub async fn kernel_info(&self, with_arch: bool) -> MetricResult<String> {
        let command = if with_arch {
            commands::KERNEL_WITH_ARCH
        } else {
            commands::KERNEL
        };
        self.query("kernel", command, MetricsParser::single_line)
            .await
    }

    /// Host name of the monitored machine
    ///
    /// # Errors
    ///
    /// Returns a session or parse error.
    pub async fn hostname(&self) -> MetricResult<String> {
        self.query("hostname", commands::HOSTNAME, MetricsParser::single_line)
            .await
    }

    /// RAM usage
    ///
    /// # Errors
    ///
    /// Returns a session or parse error.
    pub async fn memory_usage(&self) -> MetricResult<MemoryUsage> {
        self.query("ram usage", commands::FREE, MetricsParser::memory_usage)
            .await
    }

    /// Mounted filesystems, sizes formatted per `units`
    ///
    /// # Errors
    ///
    /// Returns a session or parse error.
    pub async fn disk_usage(&self, units: DiskUnits) -> MetricResult<Vec<DiskTableRow>> {
        let command = match units {
            DiskUnits::Human => commands::DF_HUMAN,
            DiskUnits::Megabytes => commands::DF_MEGABYTES,
        };
        self.query("disk usage", command, MetricsParser::disk_usage)
            .await
    }

    /// Load averages and process counts
    ///
    /// # Errors
    ///
    /// Returns a session or parse error.
    pub async fn load_average(&self) -> MetricResult<LoadAverage> {
        self.query(
            "load average",
            commands::LOADAVG,
            MetricsParser::load_average,
        )
        .await
    }

    /// Time since boot, e.g. `1 day, 5 hours, 5 minutes`
    ///
    /// # Errors
    ///
    /// Returns a session or parse error.
    pub async fn uptime(&self) -> MetricResult<String> {
        self.query("uptime", commands::UPTIME, MetricsParser::uptime)
            .await
    }

    /// Available and active cpufreq governors
    ///
    /// # Errors
    ///
    /// Returns a session or parse error.
    pub async fn governors(&self) -> MetricResult<Governors> {
        let available = self.run(commands::AVAILABLE_GOVERNORS).await?;
        let current = self.run(commands::CURRENT_GOVERNOR).await?;
        MetricsParser::governors(&available, &current).map_err(|source| MetricsError::Parse {
            metric: "governors",
            source,
        })
    }

    /// The active cpufreq governor only
    ///
    /// # Errors
    ///
    /// Returns a session or parse error.
    pub async fn current_governor(&self) -> MetricResult<String> {
        self.query(
            "governors",
            commands::CURRENT_GOVERNOR,
            MetricsParser::current_governor,
        )
        .await
    }

    /// Memory reserved for the GPU, with unit (e.g. `76M`)
    ///
    /// # Errors
    ///
    /// Returns a session or parse error.
    pub async fn gpu_memory(&self) -> MetricResult<String> {
        self.query("gpu memory", commands::GPU_MEMORY, MetricsParser::gpu_memory)
            .await
    }

    /// ARM clock in MHz
    ///
    /// # Errors
    ///
    /// Returns a session or parse error.
    pub async fn cpu_frequency(&self) -> MetricResult<u64> {
        self.query(
            "cpu frequency",
            commands::ARM_CLOCK,
            MetricsParser::cpu_frequency,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::model::UsageQuality;
    use crate::session::{ScriptedFailure, ScriptedRunner};

    #[tokio::test]
    async fn test_cpu_usage_uses_consecutive_samples() {
        let runner = ScriptedRunner::new();
        runner.queue(commands::PROC_STAT, "cpu  100 0 50 850 0 0 0\n");
        runner.queue(commands::PROC_STAT, "cpu  110 0 55 900 0 0 0\n");
        let mut probe = Probe::new(runner);

        let first = probe.cpu_usage().await.unwrap();
        assert_eq!(first.quality, UsageQuality::WarmUp);
        let second = probe.cpu_usage().await.unwrap();
        assert_eq!(second.quality, UsageQuality::Live);
        assert!((second.percent - 23.08).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_parse_errors_are_tagged_with_metric() {
        let runner = ScriptedRunner::new().with_output(commands::GPU_TEMP, "garbage");
        let probe = Probe::new(runner);
        let err = probe.gpu_temperature().await.unwrap_err();
        assert!(matches!(
            err,
            MetricsError::Parse {
                metric: "gpu temperature",
                ..
            }
        ));
        assert!(!err.is_fatal());
    }

    #[tokio::test]
    async fn test_codec_status_queries_every_codec() {
        let mut runner = ScriptedRunner::new();
        for codec in commands::KNOWN_CODECS {
            let state = if codec == "H264" { "enabled" } else { "disabled" };
            runner =
                runner.with_output(&commands::codec_enabled(codec), &format!("{codec}={state}"));
        }
        let probe = Probe::new(runner);
        let status = probe.codec_status().await.unwrap();
        assert_eq!(status.len(), commands::KNOWN_CODECS.len());
        assert_eq!(status.get("H264"), Some(true));
        assert_eq!(status.hardware_count(), 1);
    }

    #[tokio::test]
    async fn test_codec_status_skips_failing_codec() {
        let mut runner = ScriptedRunner::new();
        for codec in commands::KNOWN_CODECS {
            runner =
                runner.with_output(&commands::codec_enabled(codec), &format!("{codec}=enabled"));
        }
        let runner = runner.with_failure(
            &commands::codec_enabled("WVC1"),
            ScriptedFailure::CommandFailed {
                code: 1,
                stderr: "error=2 error_msg=\"Command not registered\"".to_string(),
            },
        );
        let probe = Probe::new(runner);
        let status = probe.codec_status().await.unwrap();
        assert_eq!(status.len(), commands::KNOWN_CODECS.len() - 1);
        assert_eq!(status.get("WVC1"), None);
        assert_eq!(status.get("H264"), Some(true));
    }

    #[tokio::test]
    async fn test_codec_status_without_any_answer_fails() {
        let probe = Probe::new(ScriptedRunner::new());
        let err = probe.codec_status().await.unwrap_err();
        assert!(!err.is_fatal());

        let runner = ScriptedRunner::new()
            .with_output(&commands::codec_enabled("AGIF"), "AGIF=enabled")
            .with_failure(&commands::codec_enabled("FLAC"), ScriptedFailure::ConnectionLost);
        let err = Probe::new(runner).codec_status().await.unwrap_err();
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn test_disk_usage_picks_command_by_units() {
        let runner = ScriptedRunner::new()
            .with_output(
                commands::DF_HUMAN,
                "Filesystem Size Used Avail Use% Mounted on\n/dev/root 29G 4.1G 24G 15% /\n",
            )
            .with_output(
                commands::DF_MEGABYTES,
                "Filesystem 1M-blocks Used Available Use% Mounted on\n\
                 /dev/root 29000 4100 24000 15% /\n",
            );
        let probe = Probe::new(runner);
        assert_eq!(probe.disk_usage(DiskUnits::Human).await.unwrap()[0].total, "29G");
        assert_eq!(
            probe.disk_usage(DiskUnits::Megabytes).await.unwrap()[0].total,
            "29000"
        );
    }

    #[tokio::test]
    async fn test_session_errors_propagate() {
        let runner =
            ScriptedRunner::new().with_failure(commands::UPTIME, ScriptedFailure::ConnectionLost);
        let probe = Probe::new(runner);
        let err = probe.uptime().await.unwrap_err();
        assert!(matches!(err, MetricsError::Session(_)));
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn test_kernel_info_with_arch() {
        let runner = ScriptedRunner::new()
            .with_output(commands::KERNEL, "Linux 6.1.21-v8+\n")
            .with_output(commands::KERNEL_WITH_ARCH, "Linux 6.1.21-v8+ aarch64\n");
        let probe = Probe::new(runner);
        assert_eq!(probe.kernel_info(false).await.unwrap(), "Linux 6.1.21-v8+");
        assert_eq!(
            probe.kernel_info(true).await.unwrap(),
            "Linux 6.1.21-v8+ aarch64"
        );
    }
}
