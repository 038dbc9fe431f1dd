//! Remote commands issued by the probe
//!
//! These strings are the de facto protocol with the monitored host: each
//! parser in [`super::parser`] documents the output it expects from the
//! matching command. `vcgencmd` ships with Raspberry Pi OS; the rest are
//! standard Linux tools and pseudo-files.

/// GPU temperature: `temp=48.3'C`
pub const GPU_TEMP: &str = "vcgencmd measure_temp";

/// SoC temperature in millidegrees Celsius: `48312`
pub const CPU_TEMP: &str = "cat /sys/class/thermal/thermal_zone0/temp";

/// Aggregate CPU time counters: `cpu  1093 0 577 17628 ...`
pub const PROC_STAT: &str = "head -n 1 /proc/stat";

/// Firmware throttling register: `throttled=0x50005`
pub const THROTTLED: &str = "vcgencmd get_throttled";

/// Kernel name and release: `Linux 6.1.21-v8+`
pub const KERNEL: &str = "uname -sr";

/// Kernel name, machine and release: `Linux 6.1.21-v8+ aarch64`
pub const KERNEL_WITH_ARCH: &str = "uname -smr";

/// Host name: `raspberrypi`
pub const HOSTNAME: &str = "hostname";

/// Memory report in MiB (header row + `Mem:` row)
pub const FREE: &str = "free -m";

/// Disk report with human readable sizes
pub const DF_HUMAN: &str = "df -mh";

/// Disk report in MiB
pub const DF_MEGABYTES: &str = "df -m";

/// Load averages and scheduler counts: `0.52 0.34 0.28 3/1234 56789`
pub const LOADAVG: &str = "cat /proc/loadavg";

/// Pretty uptime: `up 1 day, 5 hours, 5 minutes`
pub const UPTIME: &str = "uptime -p";

/// Space separated list of cpufreq governors
pub const AVAILABLE_GOVERNORS: &str =
    "cat /sys/devices/system/cpu/cpu0/cpufreq/scaling_available_governors";

/// The active cpufreq governor
pub const CURRENT_GOVERNOR: &str = "cat /sys/devices/system/cpu/cpu0/cpufreq/scaling_governor";

/// Memory split reserved for the GPU: `gpu=76M`
pub const GPU_MEMORY: &str = "vcgencmd get_mem gpu";

/// ARM core clock in Hz: `frequency(48)=1500398464`
pub const ARM_CLOCK: &str = "vcgencmd measure_clock arm";

/// Codec identifiers understood by `vcgencmd codec_enabled`
pub const KNOWN_CODECS: [&str; 18] = [
    "AGIF", "FLAC", "H263", "H264", "H265", "MJPA", "MJPB", "MJPG", "MPG2", "MPG4", "MVC0", "PCM",
    "THRA", "VORB", "VP6", "VP8", "WMV9", "WVC1",
];

/// Command that reports whether `codec` is hardware accelerated
#[must_use]
pub fn codec_enabled(codec: &str) -> String {
    format!("vcgencmd codec_enabled {codec}")
}
