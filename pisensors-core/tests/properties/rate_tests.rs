//! Property-based tests for the CPU rate calculator

use pisensors_core::metrics::{RateCalculator, UsageQuality, UtilizationSample};
use proptest::prelude::*;

/// Strategy for per-interval counter increments `(idle, busy)`
fn arb_increment() -> impl Strategy<Value = (u64, u64)> {
    (0u64..10_000, 0u64..10_000)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Usage stays within 0..=100 and only the first reading is a warm-up
    #[test]
    fn prop_usage_bounded_for_growing_counters(
        start in arb_increment(),
        increments in prop::collection::vec(arb_increment(), 1..30),
    ) {
        let mut calc = RateCalculator::new();
        let (mut idle, mut busy) = start;
        let first = calc.update(UtilizationSample::new(idle, idle + busy));
        prop_assert!(first.quality == UsageQuality::WarmUp);

        for (d_idle, d_busy) in increments {
            idle += d_idle;
            busy += d_busy;
            let usage = calc.update(UtilizationSample::new(idle, idle + busy));
            prop_assert!((0.0..=100.0).contains(&usage.percent));
            if !calc.is_warm() {
                continue;
            }
            if d_idle + d_busy == 0 {
                prop_assert_eq!(usage.quality, UsageQuality::Stale);
            } else if idle + busy - d_idle - d_busy > 0 {
                prop_assert_eq!(usage.quality, UsageQuality::Live);
                let expected = 100.0 * d_busy as f64 / (d_idle + d_busy) as f64;
                prop_assert!((usage.percent - expected).abs() <= 0.005 + 1e-9);
            }
        }
    }

    /// A repeated sample never changes the reported value
    #[test]
    fn prop_repeated_sample_is_stale(idle in 1u64..1_000_000, busy in 1u64..1_000_000) {
        let mut calc = RateCalculator::new();
        let sample = UtilizationSample::new(idle, idle + busy);
        let first = calc.update(sample);
        let again = calc.update(sample);
        prop_assert_eq!(again.quality, UsageQuality::Stale);
        prop_assert_eq!(again.percent, first.percent);
    }

    /// Any decrease re-seeds the baseline and is reported as a warm-up
    #[test]
    fn prop_counter_decrease_resets(
        idle in 1_000u64..1_000_000,
        busy in 1_000u64..1_000_000,
        drop in 1u64..1_000,
    ) {
        let mut calc = RateCalculator::new();
        calc.update(UtilizationSample::new(idle, idle + busy));
        let usage = calc.update(UtilizationSample::new(idle - drop, idle + busy - drop));
        prop_assert_eq!(usage.quality, UsageQuality::WarmUp);
        prop_assert!((0.0..=100.0).contains(&usage.percent));
    }
}
