//! Property-based tests for the metric parsers
//!
//! Tests correctness properties for temperature, throttle, disk and load
//! average parsing.

use pisensors_core::RawOutput;
use pisensors_core::metrics::{MetricsParser, ParseError, THROTTLE_BITS, ThrottleCondition};
use proptest::prelude::*;

/// Strategy for plausible SoC temperatures in millidegrees
fn arb_millidegrees() -> impl Strategy<Value = i32> {
    -40_000i32..125_000
}

/// Strategy for a mount point path
fn arb_mount() -> impl Strategy<Value = String> {
    "/[a-z]{1,8}(/[a-z]{1,8}){0,2}"
}

/// Strategy for a real (non tmpfs) disk row and its expected percentage
fn arb_disk_row() -> impl Strategy<Value = (String, u8)> {
    (arb_mount(), 0u8..=100, 1u32..100_000).prop_map(|(mount, percent, size)| {
        let used = size / 2;
        (
            format!("/dev/sd{} {size} {used} {} {percent}% {mount}", mount.len(), size - used),
            percent,
        )
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// GPU temperature is exactly the decimal between `=` and `'`
    #[test]
    fn prop_gpu_temperature_between_markers(whole in -40i32..120, tenth in 0u8..10) {
        let text = format!("temp={whole}.{tenth}'C");
        let expected: f64 = format!("{whole}.{tenth}").parse().unwrap();
        let parsed = MetricsParser::gpu_temperature(&RawOutput::from_stdout(&text)).unwrap();
        prop_assert_eq!(parsed, expected);
    }

    /// CPU temperature is within half a tenth of a degree of the raw value
    #[test]
    fn prop_cpu_temperature_rounds_to_tenths(millis in arb_millidegrees()) {
        let parsed =
            MetricsParser::cpu_temperature(&RawOutput::from_stdout(&millis.to_string())).unwrap();
        let error = (parsed * 1000.0 - f64::from(millis)).abs();
        prop_assert!(error <= 50.0 + 1e-6, "{millis} parsed as {parsed}");
        let tenths = parsed * 10.0;
        prop_assert!((tenths - tenths.round()).abs() < 1e-6);
    }

    /// Any integer reading parses without overflowing
    #[test]
    fn prop_cpu_temperature_accepts_full_integer_range(millis in any::<i64>()) {
        let parsed = MetricsParser::cpu_temperature(&RawOutput::from_stdout(&millis.to_string()));
        if i32::try_from(millis).is_ok() {
            prop_assert!(parsed.is_ok(), "{millis} rejected");
        } else {
            let is_invalid = matches!(parsed, Err(ParseError::InvalidNumber { .. }));
            prop_assert!(is_invalid);
        }
    }

    /// Every one of the 20 flags mirrors the corresponding bit of the word
    #[test]
    fn prop_throttle_bits_mirror_word(word in any::<u32>(), with_prefix in any::<bool>()) {
        let text = if with_prefix {
            format!("throttled=0x{word:x}")
        } else {
            format!("throttled={word:x}")
        };
        let status = MetricsParser::throttle_status(&RawOutput::from_stdout(&text)).unwrap();
        for i in 0..THROTTLE_BITS {
            prop_assert_eq!(status.bit(i), word & (1 << i) != 0, "bit {}", i);
        }
        prop_assert_eq!(status.word(), word & 0xF_FFFF);
        for condition in ThrottleCondition::ALL {
            prop_assert_eq!(
                status.is_active(condition),
                word & (1 << condition.active_bit()) != 0
            );
        }
    }

    /// tmpfs rows are dropped and every well-formed row is kept in order
    #[test]
    fn prop_disk_rows_survive_filtering(
        rows in prop::collection::vec(arb_disk_row(), 0..8),
        tmpfs_count in 0usize..4,
    ) {
        let mut text = String::from("Filesystem 1M-blocks Used Available Use% Mounted on\n");
        for _ in 0..tmpfs_count {
            text.push_str("tmpfs 100 1 99 1% /run\n");
        }
        for (row, _) in &rows {
            text.push_str(row);
            text.push('\n');
        }
        text.push_str("devtmpfs 10 0 10 0% /dev\n");

        let parsed = MetricsParser::disk_usage(&RawOutput::from_stdout(&text)).unwrap();
        prop_assert_eq!(parsed.len(), rows.len());
        for (row, (_, percent)) in parsed.iter().zip(&rows) {
            prop_assert_eq!(row.percent_used, *percent);
        }
    }

    /// Process counts are the scheduler counts minus the probing process
    #[test]
    fn prop_load_average_process_counts(running in 0u32..10_000, total in 0u32..100_000) {
        let text = format!("0.10 0.20 0.30 {running}/{total} 4242");
        let load = MetricsParser::load_average(&RawOutput::from_stdout(&text)).unwrap();
        prop_assert_eq!(load.running, running);
        prop_assert_eq!(load.active_processes(), running.saturating_sub(1));
        prop_assert_eq!(load.total_processes(), total.saturating_sub(1));
    }

    /// RAM percentage matches (used + shared) / total
    #[test]
    fn prop_memory_percent(total in 1u64..65_536, used_ratio in 0u64..=100, shared in 0u64..512) {
        let used = total * used_ratio / 100;
        let text = format!(
            "total used free shared buff/cache available\nMem: {total} {used} 0 {shared} 0 0\n"
        );
        let ram = MetricsParser::memory_usage(&RawOutput::from_stdout(&text)).unwrap();
        let expected = (used + shared) as f64 / total as f64 * 100.0;
        prop_assert!((ram.percent - expected).abs() <= 0.005 + 1e-9);
    }

    /// Parsers never panic on arbitrary input
    #[test]
    fn prop_parsers_do_not_panic(text in ".{0,200}") {
        let out = RawOutput::from_stdout(&text);
        let _ = MetricsParser::gpu_temperature(&out);
        let _ = MetricsParser::cpu_temperature(&out);
        let _ = MetricsParser::utilization(&out);
        let _ = MetricsParser::throttle_status(&out);
        let _ = MetricsParser::memory_usage(&out);
        let _ = MetricsParser::disk_usage(&out);
        let _ = MetricsParser::load_average(&out);
        let _ = MetricsParser::uptime(&out);
        let _ = MetricsParser::gpu_memory(&out);
        let _ = MetricsParser::cpu_frequency(&out);
    }
}
