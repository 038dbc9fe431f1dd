//! Raspberry Pi metrics
//!
//! Provides the remote commands, the parsers for their output, the CPU
//! utilization rate calculator and the [`Probe`] that ties them to a
//! [`crate::session::CommandRunner`].

pub mod commands;
mod model;
mod parser;
mod probe;
mod rate;

pub use model::{
    CodecStatus, CpuUsage, DiskTableRow, DiskUnits, Governors, LoadAverage, MemoryUsage,
    THROTTLE_BITS, ThrottleCondition, ThrottleStatus, UsageQuality, UtilizationSample,
};
pub use parser::{MetricsParser, ParseError, ParseResult, round_to};
pub use probe::{MetricResult, MetricsError, Probe};
pub use rate::RateCalculator;
