//! Text formatting of snapshot values shared by the dashboard and `snapshot`.

use pisensors_core::metrics::{
    CodecStatus, CpuUsage, DiskUnits, Governors, LoadAverage, MemoryUsage, ThrottleCondition,
    UsageQuality,
};

/// Shown for values that could not be read
pub const PLACEHOLDER: &str = "n/a";

/// Formats `value` or returns the placeholder
pub fn or_placeholder<T>(value: Option<T>, format: impl FnOnce(T) -> String) -> String {
    value.map_or_else(|| PLACEHOLDER.to_string(), format)
}

/// `48.3 °C`
pub fn temperature(celsius: f64) -> String {
    format!("{celsius:.1} °C")
}

/// `23.08 %`, with a marker while the reading is a since-boot average
pub fn cpu_usage(usage: CpuUsage) -> String {
    match usage.quality {
        UsageQuality::Live => format!("{:.2} %", usage.percent),
        UsageQuality::WarmUp => format!("{:.2} % (warming up)", usage.percent),
        UsageQuality::Stale => format!("{:.2} % (stale)", usage.percent),
    }
}

/// `40.00 % (used 300 MiB + shared 100 MiB of 1000 MiB)`
pub fn memory(memory: MemoryUsage) -> String {
    format!(
        "{:.2} % (used {} MiB + shared {} MiB of {} MiB)",
        memory.percent, memory.used_mib, memory.shared_mib, memory.total_mib
    )
}

/// `2/1233` active/total processes
pub fn processes(load: LoadAverage) -> String {
    format!("{}/{}", load.active_processes(), load.total_processes())
}

/// `0.52 0.34 0.28`
pub fn load_average(load: LoadAverage) -> String {
    format!("{:.2} {:.2} {:.2}", load.one, load.five, load.fifteen)
}

/// `1500 MHz`
pub fn frequency(mhz: u64) -> String {
    format!("{mhz} MHz")
}

/// `ondemand (available: ondemand, performance)`
pub fn governors(governors: &Governors) -> String {
    if governors.available.is_empty() {
        governors.current.clone()
    } else {
        format!(
            "{} (available: {})",
            governors.current,
            governors.available.join(", ")
        )
    }
}

/// Hardware-accelerated codecs, or `none`
pub fn codecs(codecs: &CodecStatus) -> String {
    let enabled: Vec<&str> = codecs
        .iter()
        .filter(|(_, hardware)| *hardware)
        .map(|(name, _)| name)
        .collect();
    if enabled.is_empty() {
        "none".to_string()
    } else {
        enabled.join(" ")
    }
}

/// Condition labels joined with commas, or `none`
pub fn conditions(conditions: &[ThrottleCondition]) -> String {
    if conditions.is_empty() {
        "none".to_string()
    } else {
        conditions
            .iter()
            .map(|c| c.label())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Name of a disk unit mode
pub const fn units(units: DiskUnits) -> &'static str {
    match units {
        DiskUnits::Human => "human",
        DiskUnits::Megabytes => "MiB",
    }
}
