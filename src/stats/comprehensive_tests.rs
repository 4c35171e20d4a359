//! Comprehensive tests for latency aggregation
//!
//! Property-based checks of the statistics invariants plus edge cases around
//! empty, uniform and extreme sample sets.

use super::{aggregate_consumers, aggregate_producers, LatencyStatistics};
use crate::models::{ConsumerResult, ProducerResult};
use crate::types::{DisplayUnit, TransportKind};
use proptest::collection::vec;
use proptest::prelude::*;

/// Property-based test generators
mod generators {
    use super::*;

    /// Latency samples in ticks, up to about an hour at nanosecond resolution
    pub fn samples() -> impl Strategy<Value = Vec<u64>> {
        vec(0u64..4_000_000_000_000, 1..500)
    }

    pub fn consumer_results() -> impl Strategy<Value = Vec<ConsumerResult>> {
        vec(vec(0u64..1_000_000_000, 0..50), 0..10).prop_map(|sets| {
            sets.into_iter()
                .enumerate()
                .map(|(index, samples)| ConsumerResult {
                    index,
                    connection_id: format!("consumer-{}", index),
                    transport_kind: TransportKind::InProcess,
                    samples,
                    rejected: 0,
                })
                .collect()
        })
    }

    pub fn frequencies() -> impl Strategy<Value = u64> {
        prop_oneof![Just(1_000u64), Just(10_000_000u64), Just(1_000_000_000u64), 1u64..2_000_000_000]
    }
}

mod property_tests {
    use super::*;

    proptest! {
        /// Average always lies between min and max, and all come from the sample range
        #[test]
        fn average_between_min_max(samples in generators::samples()) {
            let stats = LatencyStatistics::from_samples(&samples).unwrap();
            prop_assert!(stats.min <= stats.average);
            prop_assert!(stats.average <= stats.max);
            prop_assert_eq!(stats.min, *samples.iter().min().unwrap());
            prop_assert_eq!(stats.max, *samples.iter().max().unwrap());
            prop_assert_eq!(stats.count, samples.len() as u64);
        }

        /// Percentiles are ordered and drawn from the sample set
        #[test]
        fn percentiles_are_ordered(samples in generators::samples()) {
            let stats = LatencyStatistics::from_samples(&samples).unwrap();
            prop_assert!(stats.min <= stats.p50);
            prop_assert!(stats.p50 <= stats.p95);
            prop_assert!(stats.p95 <= stats.p99);
            prop_assert!(stats.p99 <= stats.max);
            prop_assert!(samples.contains(&stats.p50));
            prop_assert!(samples.contains(&stats.p99));
        }

        /// Sample order does not affect the summary
        #[test]
        fn order_independent(mut samples in generators::samples()) {
            let forward = LatencyStatistics::from_samples(&samples).unwrap();
            samples.reverse();
            let backward = LatencyStatistics::from_samples(&samples).unwrap();
            prop_assert_eq!(forward, backward);
        }

        /// Average matches a floating point mean within half a tick
        #[test]
        fn average_matches_float_mean(samples in vec(0u64..1_000_000, 1..200)) {
            let stats = LatencyStatistics::from_samples(&samples).unwrap();
            let mean = samples.iter().map(|&s| s as f64).sum::<f64>() / samples.len() as f64;
            prop_assert!((stats.average as f64 - mean).abs() <= 0.5 + 1e-9);
        }

        /// Folding consumers equals summarizing the concatenated samples
        #[test]
        fn aggregate_equals_concatenation(results in generators::consumer_results()) {
            let all: Vec<u64> = results.iter().flat_map(|r| r.samples.iter().copied()).collect();
            prop_assert_eq!(aggregate_consumers(&results), LatencyStatistics::from_samples(&all));
        }

        /// Converting to seconds and scaling back by the frequency recovers the ticks
        #[test]
        fn unit_conversion_round_trip(ticks in 0u64..1_000_000_000_000, frequency in generators::frequencies()) {
            let seconds = DisplayUnit::Seconds.convert(ticks, frequency);
            let back = seconds * frequency as f64;
            prop_assert!((back - ticks as f64).abs() <= (ticks as f64 * 1e-9).max(1e-6));

            let millis = DisplayUnit::Milliseconds.convert(ticks, frequency);
            prop_assert!((millis - seconds * 1e3).abs() <= (millis.abs() * 1e-9).max(1e-9));
        }

        /// Producer totals are the sum of per-worker counts
        #[test]
        fn producer_total_is_sum(counts in vec((0u64..100_000, 0u64..100), 0..50)) {
            let results: Vec<ProducerResult> = counts
                .iter()
                .enumerate()
                .map(|(index, &(sent, failed))| ProducerResult {
                    index,
                    connection_id: format!("producer-{}", index),
                    transport_kind: TransportKind::InProcess,
                    sent,
                    failed,
                })
                .collect();

            let total = aggregate_producers(&results);
            prop_assert_eq!(total.workers, counts.len());
            prop_assert_eq!(total.count, counts.iter().map(|c| c.0).sum::<u64>());
            prop_assert_eq!(total.failed, counts.iter().map(|c| c.1).sum::<u64>());
        }
    }
}

/// Test edge cases and boundary conditions
mod edge_case_tests {
    use super::*;

    #[test]
    fn test_identical_samples() {
        let stats = LatencyStatistics::from_samples(&[250; 40]).unwrap();
        assert_eq!(stats.min, 250);
        assert_eq!(stats.max, 250);
        assert_eq!(stats.average, 250);
        assert_eq!(stats.p99, 250);
    }

    #[test]
    fn test_zero_latency_samples() {
        let stats = LatencyStatistics::from_samples(&[0, 0, 0]).unwrap();
        assert_eq!(stats.average, 0);
        assert_eq!(stats.max, 0);
    }

    #[test]
    fn test_single_outlier_moves_p99_not_p50() {
        let mut samples = vec![10u64; 99];
        samples.push(1_000_000);
        let stats = LatencyStatistics::from_samples(&samples).unwrap();
        assert_eq!(stats.p50, 10);
        assert_eq!(stats.p99, 10);
        assert_eq!(stats.max, 1_000_000);
    }

    #[test]
    fn test_ticks_unit_is_identity() {
        let stats = LatencyStatistics::from_samples(&[123, 456]).unwrap();
        let shown = stats.in_unit(DisplayUnit::Ticks, 1_000_000_000);
        assert_eq!(shown.min, 123.0);
        assert_eq!(shown.max, 456.0);
    }

    #[test]
    fn test_millisecond_clock_display() {
        let stats = LatencyStatistics::from_samples(&[3, 5]).unwrap();
        let shown = stats.in_unit(DisplayUnit::Microseconds, 1_000);
        assert_eq!(shown.min, 3_000.0);
        assert_eq!(shown.average, 4_000.0);
    }
}
