//! Metric aggregation over worker results
//!
//! Everything here is a pure function of the collected results. Latencies stay
//! in clock ticks until they are rendered; [`DisplayStatistics`] converts a
//! tick summary into the selected display unit using the clock frequency.

use crate::models::{ConsumerResult, ProducerResult};
use crate::types::DisplayUnit;
use serde::{Deserialize, Serialize};

/// Latency summary in clock ticks
///
/// Only exists for a non-empty sample set, so `min <= average <= max` always
/// holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LatencyStatistics {
    pub count: u64,
    pub min: u64,
    pub max: u64,
    /// Mean rounded half away from zero
    pub average: u64,
    pub p50: u64,
    pub p95: u64,
    pub p99: u64,
}

impl LatencyStatistics {
    /// Summarize a sample set; `None` when it is empty
    pub fn from_samples(samples: &[u64]) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }

        let mut sorted = samples.to_vec();
        sorted.sort_unstable();
        Some(Self::from_sorted(&sorted))
    }

    fn from_sorted(sorted: &[u64]) -> Self {
        let count = sorted.len() as u64;
        let sum: u128 = sorted.iter().map(|&s| u128::from(s)).sum();

        Self {
            count,
            min: sorted[0],
            max: sorted[sorted.len() - 1],
            average: rounded_mean(sum, count),
            p50: nearest_rank(sorted, 50),
            p95: nearest_rank(sorted, 95),
            p99: nearest_rank(sorted, 99),
        }
    }

    /// Render in a display unit
    pub fn in_unit(&self, unit: DisplayUnit, frequency: u64) -> DisplayStatistics {
        DisplayStatistics {
            unit,
            count: self.count,
            min: unit.convert(self.min, frequency),
            max: unit.convert(self.max, frequency),
            average: unit.convert(self.average, frequency),
            p50: unit.convert(self.p50, frequency),
            p95: unit.convert(self.p95, frequency),
            p99: unit.convert(self.p99, frequency),
        }
    }
}

/// Latency summary converted to a display unit
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DisplayStatistics {
    pub unit: DisplayUnit,
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub average: f64,
    pub p50: f64,
    pub p95: f64,
    pub p99: f64,
}

/// Send totals across producers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProducerStatistics {
    /// Producers that ran to completion
    pub workers: usize,
    /// Successful sends
    pub count: u64,
    /// Sends that failed or timed out
    pub failed: u64,
}

/// `round(sum / count)` with ties away from zero, in integer arithmetic
fn rounded_mean(sum: u128, count: u64) -> u64 {
    let count = u128::from(count);
    let mean = (2 * sum + count) / (2 * count);
    u64::try_from(mean).unwrap_or(u64::MAX)
}

/// Nearest-rank percentile of a sorted, non-empty slice
fn nearest_rank(sorted: &[u64], percentile: usize) -> u64 {
    let rank = (percentile * sorted.len()).div_ceil(100).max(1);
    sorted[rank.min(sorted.len()) - 1]
}

/// Statistics of a single consumer, `None` if it received nothing
pub fn consumer_statistics(result: &ConsumerResult) -> Option<LatencyStatistics> {
    LatencyStatistics::from_samples(&result.samples)
}

/// Fold every consumer's samples into one summary
pub fn aggregate_consumers(results: &[ConsumerResult]) -> Option<LatencyStatistics> {
    let mut all: Vec<u64> = Vec::with_capacity(results.iter().map(|r| r.samples.len()).sum());
    for result in results {
        all.extend_from_slice(&result.samples);
    }
    LatencyStatistics::from_samples(&all)
}

pub fn aggregate_producers(results: &[ProducerResult]) -> ProducerStatistics {
    results.iter().fold(ProducerStatistics::default(), |mut total, result| {
        total.workers += 1;
        total.count += result.sent;
        total.failed += result.failed;
        total
    })
}


#[cfg(test)]
mod comprehensive_tests;
