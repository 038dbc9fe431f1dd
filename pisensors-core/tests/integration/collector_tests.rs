//! End-to-end refresh cycles against a scripted host

use pisensors_core::config::DashboardConfig;
use pisensors_core::metrics::{DiskUnits, ThrottleCondition, UsageQuality, commands};
use pisensors_core::session::{ScriptedFailure, ScriptedRunner};
use pisensors_core::{Collector, Probe};

/// A Pi 4 that is under-volted and throttled right now
fn throttled_pi() -> ScriptedRunner {
    let mut runner = ScriptedRunner::new()
        .with_output(commands::KERNEL_WITH_ARCH, "Linux 6.1.21-v8+ aarch64\n")
        .with_output(commands::HOSTNAME, "kitchen-pi\n")
        .with_output(commands::GPU_MEMORY, "gpu=128M\n")
        .with_output(
            commands::DF_HUMAN,
            "Filesystem      Size  Used Avail Use% Mounted on\n\
             /dev/root        29G  4.1G   24G  15% /\n\
             devtmpfs        1.7G     0  1.7G   0% /dev\n\
             tmpfs           1.9G     0  1.9G   0% /dev/shm\n\
             /dev/mmcblk0p1  255M   51M  205M  20% /boot\n",
        )
        .with_output(commands::THROTTLED, "throttled=0x50005\n")
        .with_output(commands::GPU_TEMP, "temp=66.2'C\n")
        .with_output(commands::CPU_TEMP, "66704\n")
        .with_output(
            commands::FREE,
            "               total        used        free      shared  buff/cache   available\n\
             Mem:            3794         612        2389          36         792        3012\n\
             Swap:             99           0          99\n",
        )
        .with_output(commands::LOADAVG, "3.91 2.10 1.05 5/312 9123\n")
        .with_output(commands::ARM_CLOCK, "frequency(48)=600117184\n")
        .with_output(commands::UPTIME, "up 3 weeks, 2 days, 1 hour, 4 minutes\n")
        .with_output(
            commands::AVAILABLE_GOVERNORS,
            "conservative ondemand userspace powersave performance schedutil\n",
        )
        .with_output(commands::CURRENT_GOVERNOR, "ondemand\n");
    for codec in commands::KNOWN_CODECS {
        let state = if matches!(codec, "H264" | "MPG2" | "WVC1") {
            "enabled"
        } else {
            "disabled"
        };
        runner = runner.with_output(commands::codec_enabled(codec), format!("{codec}={state}"));
    }
    runner.queue(commands::PROC_STAT, "cpu  100 0 50 850 0 0 0 0 0 0\n");
    runner.queue(commands::PROC_STAT, "cpu  110 0 55 900 0 0 0 0 0 0\n");
    runner.queue(commands::PROC_STAT, "cpu  110 0 55 900 0 0 0 0 0 0\n");
    runner
}

#[tokio::test]
async fn test_three_cycles_on_a_throttled_pi() {
    let mut collector = Collector::new(Probe::new(throttled_pi())).with_arch(true);
    let mut config = DashboardConfig::default();

    let first = collector.collect(&mut config).await.unwrap().clone();
    assert_eq!(first.kernel.as_deref(), Some("Linux 6.1.21-v8+ aarch64"));
    assert_eq!(first.hostname.as_deref(), Some("kitchen-pi"));
    let disks = first.disks.unwrap();
    assert_eq!(disks.len(), 2);
    assert_eq!(disks[1].mount, "/boot");
    assert_eq!(disks[1].percent_used, 20);

    let throttle = first.throttle.unwrap();
    assert!(throttle.is_active(ThrottleCondition::UnderVoltage));
    assert!(throttle.has_occurred(ThrottleCondition::Throttled));
    assert!(!throttle.is_active(ThrottleCondition::SoftTemperatureLimit));

    assert_eq!(first.cpu_temp, Some(66.7));
    assert_eq!(first.cpu_frequency_mhz, Some(600));
    assert_eq!(first.memory.map(|m| m.total_mib), Some(3794));
    assert_eq!(first.load.map(|l| l.active_processes()), Some(4));
    assert_eq!(first.codecs.map(|c| c.hardware_count()), Some(3));
    assert_eq!(first.cpu_usage.map(|u| u.quality), Some(UsageQuality::WarmUp));

    let second = collector.collect(&mut config).await.unwrap();
    let usage = second.cpu_usage.unwrap();
    assert_eq!(usage.quality, UsageQuality::Live);
    assert!((usage.percent - 23.08).abs() < 1e-9);

    let third = collector.collect(&mut config).await.unwrap();
    let usage = third.cpu_usage.unwrap();
    assert_eq!(usage.quality, UsageQuality::Stale);
    assert!((usage.percent - 23.08).abs() < 1e-9);
}

#[tokio::test]
async fn test_missing_vcgencmd_only_blanks_firmware_values() {
    let mut runner = throttled_pi();
    for command in [
        commands::THROTTLED,
        commands::GPU_TEMP,
        commands::ARM_CLOCK,
        commands::GPU_MEMORY,
    ] {
        runner = runner.with_failure(
            command,
            ScriptedFailure::CommandFailed {
                code: 127,
                stderr: "vcgencmd: command not found".into(),
            },
        );
    }
    let mut collector = Collector::new(Probe::new(runner));
    let mut config = DashboardConfig::default();

    let snapshot = collector.collect(&mut config).await.unwrap();
    assert!(snapshot.throttle.is_none());
    assert!(snapshot.gpu_temp.is_none());
    assert!(snapshot.gpu_memory.is_none());
    assert!(snapshot.cpu_temp.is_some());
    assert!(snapshot.memory.is_some());
    // Kernel is fetched with `uname -sr` here, which is not scripted
    assert!(snapshot.kernel.is_none());
    assert_eq!(snapshot.problems.len(), 5);
}

#[tokio::test]
async fn test_reset_refetches_everything() {
    let mut collector = Collector::new(Probe::new(throttled_pi())).with_arch(true);
    let mut config = DashboardConfig::default();
    collector.collect(&mut config).await.unwrap();

    collector.reset();
    assert!(collector.snapshot().hostname.is_none());

    let snapshot = collector.collect(&mut config).await.unwrap();
    assert_eq!(snapshot.hostname.as_deref(), Some("kitchen-pi"));
    assert_eq!(snapshot.disk_units, DiskUnits::Human);
    assert_eq!(
        snapshot.cpu_usage.map(|u| u.quality),
        Some(UsageQuality::WarmUp)
    );
    let runner = collector.probe().runner();
    assert_eq!(runner.call_count(commands::HOSTNAME), 2);
}
