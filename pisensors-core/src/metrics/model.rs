//! Typed values produced by the metric parsers
//!
//! Everything here is a transient, per-poll value. Types derive `Serialize`
//! so a whole dashboard snapshot can be printed as JSON.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Idle and total CPU time accumulators from the aggregate `/proc/stat` line
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UtilizationSample {
    /// Idle time (USER_HZ ticks)
    pub idle: u64,
    /// Sum of every time counter on the line (USER_HZ ticks)
    pub total: u64,
}

impl UtilizationSample {
    /// The baseline of a calculator that has never seen a sample
    pub const ZERO: Self = Self { idle: 0, total: 0 };

    /// Creates a sample
    #[must_use]
    pub const fn new(idle: u64, total: u64) -> Self {
        Self { idle, total }
    }

    /// Returns `true` if any counter went backwards since `prev`.
    ///
    /// Counters only grow on a live system; a decrease means the host
    /// rebooted or the counters were reset.
    #[must_use]
    pub const fn regressed_from(&self, prev: &Self) -> bool {
        self.idle < prev.idle || self.total < prev.total
    }
}

/// How much a [`CpuUsage`] reading can be trusted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UsageQuality {
    /// Computed against the zero baseline (first poll or after a counter
    /// reset): the average since boot, not the current load
    WarmUp,
    /// Computed from two consecutive samples
    Live,
    /// No time elapsed between samples; the previous value is repeated
    Stale,
}

/// CPU utilization derived by the rate calculator
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CpuUsage {
    /// Busy percentage (0.0–100.0), two decimals
    pub percent: f64,
    /// Whether `percent` reflects the current load
    pub quality: UsageQuality,
}

impl CpuUsage {
    /// Returns `true` for readings computed from two real samples
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.quality == UsageQuality::Live
    }
}

/// Number of flags carried by the firmware throttling register
pub const THROTTLE_BITS: usize = 20;

/// Conditions reported by `vcgencmd get_throttled`.
///
/// Each condition has a "currently active" bit (0–3) and a latched
/// "has occurred since boot" bit (16–19).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ThrottleCondition {
    /// Supply voltage dropped below 4.63 V
    UnderVoltage,
    /// ARM frequency was capped
    ArmFrequencyCapped,
    /// The SoC was throttled
    Throttled,
    /// The soft temperature limit was reached
    SoftTemperatureLimit,
}

impl ThrottleCondition {
    /// All conditions in register order
    pub const ALL: [Self; 4] = [
        Self::UnderVoltage,
        Self::ArmFrequencyCapped,
        Self::Throttled,
        Self::SoftTemperatureLimit,
    ];

    /// Bit set while the condition is active
    #[must_use]
    pub const fn active_bit(self) -> usize {
        match self {
            Self::UnderVoltage => 0,
            Self::ArmFrequencyCapped => 1,
            Self::Throttled => 2,
            Self::SoftTemperatureLimit => 3,
        }
    }

    /// Bit latched once the condition has occurred since boot
    #[must_use]
    pub const fn occurred_bit(self) -> usize {
        self.active_bit() + 16
    }

    /// Human readable label
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::UnderVoltage => "Under voltage",
            Self::ArmFrequencyCapped => "Arm frequency capped",
            Self::Throttled => "Throttled",
            Self::SoftTemperatureLimit => "Soft temperature limit",
        }
    }
}

impl fmt::Display for ThrottleCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Decoded firmware throttling register.
///
/// Index `i` of [`ThrottleStatus::bits`] is documentation bit `i`
/// (index 0 is the least significant bit).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ThrottleStatus {
    bits: [bool; THROTTLE_BITS],
}

impl ThrottleStatus {
    /// Decodes the low 20 bits of `word`; higher bits are ignored
    #[must_use]
    pub fn from_word(word: u32) -> Self {
        let mut bits = [false; THROTTLE_BITS];
        for (i, bit) in bits.iter_mut().enumerate() {
            *bit = word & (1 << i) != 0;
        }
        Self { bits }
    }

    /// The decoded flags
    #[must_use]
    pub const fn bits(&self) -> &[bool; THROTTLE_BITS] {
        &self.bits
    }

    /// Documentation bit `index`; out of range bits read as `false`
    #[must_use]
    pub fn bit(&self, index: usize) -> bool {
        self.bits.get(index).copied().unwrap_or(false)
    }

    /// Re-encodes the register
    #[must_use]
    pub fn word(&self) -> u32 {
        self.bits
            .iter()
            .enumerate()
            .filter(|(_, set)| **set)
            .fold(0, |acc, (i, _)| acc | (1 << i))
    }

    /// Whether `condition` is active right now
    #[must_use]
    pub fn is_active(&self, condition: ThrottleCondition) -> bool {
        self.bit(condition.active_bit())
    }

    /// Whether `condition` has occurred since boot
    #[must_use]
    pub fn has_occurred(&self, condition: ThrottleCondition) -> bool {
        self.bit(condition.occurred_bit())
    }

    /// Conditions active right now, in register order
    #[must_use]
    pub fn active(&self) -> Vec<ThrottleCondition> {
        ThrottleCondition::ALL
            .into_iter()
            .filter(|c| self.is_active(*c))
            .collect()
    }

    /// Conditions latched since boot, in register order
    #[must_use]
    pub fn occurred(&self) -> Vec<ThrottleCondition> {
        ThrottleCondition::ALL
            .into_iter()
            .filter(|c| self.has_occurred(*c))
            .collect()
    }

    /// Returns `true` when no flag is set
    #[must_use]
    pub fn is_clear(&self) -> bool {
        !self.bits.contains(&true)
    }
}

/// One mounted filesystem from the disk report
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiskTableRow {
    /// Mount point
    pub mount: String,
    /// Size, as printed (`29G` in human mode, MiB otherwise)
    pub total: String,
    /// Used space, as printed
    pub used: String,
    /// Available space, as printed
    pub free: String,
    /// Used percentage
    pub percent_used: u8,
}

/// Hardware acceleration state for each known codec
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CodecStatus {
    codecs: BTreeMap<String, bool>,
}

impl CodecStatus {
    /// Creates an empty mapping
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records whether `codec` is decoded in hardware
    pub fn insert(&mut self, codec: impl Into<String>, hardware: bool) {
        self.codecs.insert(codec.into(), hardware);
    }

    /// `Some(true)` if `codec` is hardware accelerated, `None` if unknown
    #[must_use]
    pub fn get(&self, codec: &str) -> Option<bool> {
        self.codecs.get(codec).copied()
    }

    /// Codecs and their state, sorted by name
    pub fn iter(&self) -> impl Iterator<Item = (&str, bool)> {
        self.codecs.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Number of codecs with hardware support
    #[must_use]
    pub fn hardware_count(&self) -> usize {
        self.codecs.values().filter(|v| **v).count()
    }

    /// Number of codecs recorded
    #[must_use]
    pub fn len(&self) -> usize {
        self.codecs.len()
    }

    /// Returns `true` if nothing was recorded
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.codecs.is_empty()
    }
}

/// RAM usage from `free -m`
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MemoryUsage {
    /// Total memory (MiB)
    pub total_mib: u64,
    /// Used memory (MiB)
    pub used_mib: u64,
    /// Shared memory, mostly tmpfs (MiB)
    pub shared_mib: u64,
    /// `(used + shared) / total` as a percentage, two decimals
    pub percent: f64,
}

/// Load averages and scheduler counts from `/proc/loadavg`
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct LoadAverage {
    /// 1-minute load average
    pub one: f32,
    /// 5-minute load average
    pub five: f32,
    /// 15-minute load average
    pub fifteen: f32,
    /// Runnable scheduling entities
    pub running: u32,
    /// Existing scheduling entities
    pub total: u32,
    /// PID most recently created on the host
    pub last_pid: u32,
}

impl LoadAverage {
    /// Runnable processes, not counting the probe's own `cat`
    #[must_use]
    pub const fn active_processes(&self) -> u32 {
        self.running.saturating_sub(1)
    }

    /// Existing processes, not counting the probe's own `cat`
    #[must_use]
    pub const fn total_processes(&self) -> u32 {
        self.total.saturating_sub(1)
    }
}

/// cpufreq governors of CPU 0
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Governors {
    /// Governors the kernel offers
    pub available: Vec<String>,
    /// The governor in use
    pub current: String,
}

/// Disk report flavour
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiskUnits {
    /// Binary human-readable sizes (`df -mh`)
    #[default]
    Human,
    /// Raw mebibytes (`df -m`)
    Megabytes,
}

impl DiskUnits {
    /// The other mode
    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::Human => Self::Megabytes,
            Self::Megabytes => Self::Human,
        }
    }

    /// Returns `true` for human-readable sizes
    #[must_use]
    pub const fn is_human(self) -> bool {
        matches!(self, Self::Human)
    }
}
