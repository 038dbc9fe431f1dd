//! Parsers for the output of the remote metric commands
//!
//! Each parser consumes the [`RawOutput`] of exactly one command from
//! [`super::commands`] and documents the format it expects. Extra columns and
//! extra lines are tolerated; missing fields and non-numeric values are
//! reported as [`ParseError`]s instead of panicking on an index.

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

use super::model::{
    DiskTableRow, Governors, LoadAverage, MemoryUsage, ThrottleStatus, UtilizationSample,
};
use crate::session::RawOutput;

/// Errors produced while parsing command output
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// The command printed nothing
    #[error("Output is empty")]
    Empty,

    /// A required field was not present
    #[error("Missing field: {0}")]
    MissingField(&'static str),

    /// A field was present but not a number
    #[error("Invalid number for {field}: {value:?}")]
    InvalidNumber {
        /// Field being parsed
        field: &'static str,
        /// Offending text
        value: String,
    },

    /// The output did not have the documented shape
    #[error("Expected {expected}, got {line:?}")]
    UnexpectedFormat {
        /// Description of the expected format
        expected: &'static str,
        /// The line that did not match
        line: String,
    },
}

/// Result type for parsers
pub type ParseResult<T> = Result<T, ParseError>;

/// Index of the idle counter on the `/proc/stat` line (after the label)
const IDLE_COUNTER: usize = 3;

/// `vcgencmd measure_clock arm` output
static FREQUENCY_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^frequency\(\d+\)=(\d+)$").expect("FREQUENCY_REGEX is a valid regex pattern")
});

/// Rounds `value` to `decimals` decimal places
#[must_use]
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

fn number<T: std::str::FromStr>(field: &'static str, value: &str) -> ParseResult<T> {
    value.trim().parse().map_err(|_| ParseError::InvalidNumber {
        field,
        value: value.to_string(),
    })
}

/// Stateless parsers, one per metric
pub struct MetricsParser;

impl MetricsParser {
    /// First non-blank line, trimmed
    fn line(output: &RawOutput) -> ParseResult<&str> {
        output.first_line().map(str::trim).ok_or(ParseError::Empty)
    }

    /// Parses the GPU temperature in Celsius.
    ///
    /// Format: `temp=48.3'C`
    ///
    /// # Errors
    ///
    /// Fails if the `=` label or the `'` unit marker is missing, or the
    /// value between them is not a finite number.
    pub fn gpu_temperature(output: &RawOutput) -> ParseResult<f64> {
        let line = Self::line(output)?;
        let value = line
            .split_once('=')
            .and_then(|(_, rest)| rest.split_once('\''))
            .map(|(value, _)| value)
            .ok_or_else(|| ParseError::UnexpectedFormat {
                expected: "temp=<value>'C",
                line: line.to_string(),
            })?;
        let celsius: f64 = number("gpu temperature", value)?;
        if !celsius.is_finite() {
            return Err(ParseError::InvalidNumber {
                field: "gpu temperature",
                value: value.to_string(),
            });
        }
        Ok(celsius)
    }

    /// Parses the SoC temperature, rounded to one decimal.
    ///
    /// Format: integer millidegrees Celsius, e.g. `45678` (45.7 °C)
    ///
    /// # Errors
    ///
    /// Fails on empty output or a non-integer value.
    pub fn cpu_temperature(output: &RawOutput) -> ParseResult<f64> {
        let millis: i32 = number("cpu temperature", Self::line(output)?)?;
        // Half away from zero, done on integers so 45650 is 45.7, not 45.6.
        // Works on quotient and remainder so extreme readings cannot overflow.
        let (whole, rest) = (millis / 100, millis % 100);
        let tenths = match rest {
            50.. => whole + 1,
            ..=-50 => whole - 1,
            _ => whole,
        };
        Ok(f64::from(tenths) / 10.0)
    }

    /// Parses the aggregate CPU counters.
    ///
    /// Format: `cpu  user nice system idle iowait irq softirq steal ...`
    /// (the idle counter is the fourth; every counter counts towards total)
    ///
    /// # Errors
    ///
    /// Fails if the line is not labelled `cpu`, has fewer than four
    /// counters, or a counter is not an unsigned integer.
    pub fn utilization(output: &RawOutput) -> ParseResult<UtilizationSample> {
        let line = Self::line(output)?;
        let mut fields = line.split_whitespace();
        if fields.next() != Some("cpu") {
            return Err(ParseError::UnexpectedFormat {
                expected: "aggregate `cpu` line",
                line: line.to_string(),
            });
        }

        let counters = fields
            .map(|f| number::<u64>("cpu counter", f))
            .collect::<ParseResult<Vec<_>>>()?;
        let idle = *counters
            .get(IDLE_COUNTER)
            .ok_or(ParseError::MissingField("idle"))?;
        let total = counters.iter().fold(0u64, |acc, c| acc.saturating_add(*c));

        Ok(UtilizationSample::new(idle, total))
    }

    /// Parses the firmware throttling register.
    ///
    /// Format: `throttled=0x50005` (the `0x` prefix is optional)
    ///
    /// # Errors
    ///
    /// Fails if the `throttled=` label is missing or the value is not hex.
    pub fn throttle_status(output: &RawOutput) -> ParseResult<ThrottleStatus> {
        let line = Self::line(output)?;
        let hex = line
            .strip_prefix("throttled=")
            .ok_or_else(|| ParseError::UnexpectedFormat {
                expected: "throttled=<hex>",
                line: line.to_string(),
            })?
            .trim();
        let digits = hex
            .strip_prefix("0x")
            .or_else(|| hex.strip_prefix("0X"))
            .unwrap_or(hex);
        let word = u64::from_str_radix(digits, 16).map_err(|_| ParseError::InvalidNumber {
            field: "throttled",
            value: hex.to_string(),
        })?;

        Ok(ThrottleStatus::from_word((word & 0xF_FFFF) as u32))
    }

    /// Parses whether `codec` is hardware accelerated.
    ///
    /// Format: `H264=enabled` / `H264=disabled`
    ///
    /// # Errors
    ///
    /// Fails if there is no `=` or the reported name is not `codec`.
    pub fn codec_enabled(output: &RawOutput, codec: &str) -> ParseResult<bool> {
        let line = Self::line(output)?;
        match line.split_once('=') {
            Some((name, value)) if name.trim() == codec => {
                Ok(value.trim_start().starts_with('e'))
            }
            _ => Err(ParseError::UnexpectedFormat {
                expected: "<codec>=enabled|disabled",
                line: line.to_string(),
            }),
        }
    }

    /// Passes through the first non-empty line (`uname` and `hostname`)
    ///
    /// # Errors
    ///
    /// Fails on empty output.
    pub fn single_line(output: &RawOutput) -> ParseResult<String> {
        Self::line(output).map(str::to_string)
    }

    /// Parses RAM usage.
    ///
    /// Format (`free -m`):
    /// ```text
    ///                total        used        free      shared  buff/cache   available
    /// Mem:            7809        1234        5000         100        1575        6300
    /// ```
    /// Columns are located by header name; without a header the standard
    /// order `total used free shared` is assumed.
    ///
    /// # Errors
    ///
    /// Fails if there is no `Mem` row, a column is missing or not a number,
    /// or total is zero.
    pub fn memory_usage(output: &RawOutput) -> ParseResult<MemoryUsage> {
        if output.is_blank() {
            return Err(ParseError::Empty);
        }
        let header: Option<Vec<&str>> = output
            .lines()
            .iter()
            .map(|l| l.split_whitespace().collect::<Vec<_>>())
            .find(|cols| {
                cols.contains(&"total") && cols.first().is_some_and(|c| !c.ends_with(':'))
            });
        let row: Vec<&str> = output
            .lines()
            .iter()
            .find(|l| l.trim_start().starts_with("Mem"))
            .map(|l| l.split_whitespace().collect())
            .ok_or(ParseError::MissingField("Mem"))?;

        // Header columns have no label, so column i is row field i + 1
        let column = |name: &'static str, fallback: usize| -> ParseResult<u64> {
            let index = header
                .as_ref()
                .map_or(Some(fallback), |h| h.iter().position(|c| *c == name))
                .ok_or(ParseError::MissingField(name))?;
            let value = row.get(index + 1).ok_or(ParseError::MissingField(name))?;
            number(name, value)
        };

        let total_mib = column("total", 0)?;
        let used_mib = column("used", 1)?;
        let shared_mib = column("shared", 3)?;
        if total_mib == 0 {
            return Err(ParseError::InvalidNumber {
                field: "total",
                value: "0".to_string(),
            });
        }

        let percent = (used_mib + shared_mib) as f64 / total_mib as f64 * 100.0;
        Ok(MemoryUsage {
            total_mib,
            used_mib,
            shared_mib,
            percent: round_to(percent, 2),
        })
    }

    /// Parses the disk report, skipping pseudo filesystems.
    ///
    /// Format (`df -mh` / `df -m`): a header row followed by
    /// `filesystem size used avail use% mount` rows. Rows for `tmpfs` and
    /// `devtmpfs` are dropped; rows without exactly six columns or with a
    /// malformed percentage are skipped and logged.
    ///
    /// # Errors
    ///
    /// Fails only on empty output.
    pub fn disk_usage(output: &RawOutput) -> ParseResult<Vec<DiskTableRow>> {
        if output.is_blank() {
            return Err(ParseError::Empty);
        }

        let rows = output
            .lines()
            .iter()
            .skip(1)
            .filter(|l| !l.trim().is_empty())
            .filter(|l| !(l.starts_with("tmpfs") || l.starts_with("devtmpfs")))
            .filter_map(|line| {
                let row = Self::disk_row(line);
                if row.is_none() {
                    tracing::warn!(line = %line, "Skipping malformed disk row");
                }
                row
            })
            .collect();
        Ok(rows)
    }

    fn disk_row(line: &str) -> Option<DiskTableRow> {
        let fields: Vec<&str> = line.split_whitespace().collect();
        let [_, total, used, free, percent, mount] = fields.as_slice() else {
            return None;
        };
        let percent_used = percent.strip_suffix('%')?.parse().ok()?;
        Some(DiskTableRow {
            mount: (*mount).to_string(),
            total: (*total).to_string(),
            used: (*used).to_string(),
            free: (*free).to_string(),
            percent_used,
        })
    }

    /// Parses load averages and scheduler counts.
    ///
    /// Format: `0.52 0.34 0.28 3/1234 56789`
    ///
    /// # Errors
    ///
    /// Fails if fewer than five fields are present or any is malformed.
    pub fn load_average(output: &RawOutput) -> ParseResult<LoadAverage> {
        let line = Self::line(output)?;
        let fields: Vec<&str> = line.split_whitespace().collect();
        let [one, five, fifteen, entities, last_pid, ..] = fields.as_slice() else {
            return Err(ParseError::UnexpectedFormat {
                expected: "five loadavg fields",
                line: line.to_string(),
            });
        };
        let (running, total) =
            entities
                .split_once('/')
                .ok_or_else(|| ParseError::UnexpectedFormat {
                    expected: "running/total",
                    line: line.to_string(),
                })?;

        Ok(LoadAverage {
            one: number("load 1m", one)?,
            five: number("load 5m", five)?,
            fifteen: number("load 15m", fifteen)?,
            running: number("running", running)?,
            total: number("total", total)?,
            last_pid: number("last pid", last_pid)?,
        })
    }

    /// Parses the pretty uptime, dropping the `up ` prefix.
    ///
    /// Format: `up 1 day, 5 hours, 5 minutes`
    ///
    /// # Errors
    ///
    /// Fails if the prefix is missing.
    pub fn uptime(output: &RawOutput) -> ParseResult<String> {
        let line = Self::line(output)?;
        line.strip_prefix("up ")
            .map(|rest| rest.trim().to_string())
            .ok_or_else(|| ParseError::UnexpectedFormat {
                expected: "up <duration>",
                line: line.to_string(),
            })
    }

    /// Combines the available governor list and the active governor.
    ///
    /// Format: `conservative ondemand userspace powersave performance schedutil`
    /// and a single name such as `ondemand`
    ///
    /// # Errors
    ///
    /// Fails if the active governor is empty.
    pub fn governors(available: &RawOutput, current: &RawOutput) -> ParseResult<Governors> {
        let available = available
            .lines()
            .iter()
            .flat_map(|l| l.split_whitespace())
            .map(str::to_string)
            .collect();
        let current = Self::current_governor(current)?;
        Ok(Governors { available, current })
    }

    /// Parses the active governor name.
    ///
    /// # Errors
    ///
    /// Fails if the output is blank.
    pub fn current_governor(output: &RawOutput) -> ParseResult<String> {
        Self::line(output)
            .map(str::to_string)
            .map_err(|_| ParseError::MissingField("scaling_governor"))
    }

    /// Parses the GPU memory split, keeping the unit suffix.
    ///
    /// Format: `gpu=76M`
    ///
    /// # Errors
    ///
    /// Fails if there is no `=` or nothing after it.
    pub fn gpu_memory(output: &RawOutput) -> ParseResult<String> {
        let line = Self::line(output)?;
        match line.split_once('=') {
            Some((_, value)) if !value.trim().is_empty() => Ok(value.trim().to_string()),
            _ => Err(ParseError::UnexpectedFormat {
                expected: "gpu=<size>",
                line: line.to_string(),
            }),
        }
    }

    /// Parses the ARM clock and converts it to whole MHz.
    ///
    /// Format: `frequency(48)=1500398464`
    ///
    /// # Errors
    ///
    /// Fails if the line does not match the format.
    pub fn cpu_frequency(output: &RawOutput) -> ParseResult<u64> {
        let line = Self::line(output)?;
        let hz = FREQUENCY_REGEX
            .captures(line)
            .and_then(|c| c.get(1))
            .ok_or_else(|| ParseError::UnexpectedFormat {
                expected: "frequency(<n>)=<hz>",
                line: line.to_string(),
            })?;
        let hz: u64 = number("frequency", hz.as_str())?;
        Ok(hz / 1_000_000)
    }
}
