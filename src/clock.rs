//! Monotonic tick source used to stamp outgoing messages and measure receipt
//!
//! A [`Clock`] is created once per run and copied into every worker. All copies
//! share the same anchor instant, so a tick value written by one producer can be
//! subtracted from a reading taken by any consumer in the same process.

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Ticks per second of the high-resolution source (nanoseconds)
pub const HIGH_RESOLUTION_FREQUENCY: u64 = 1_000_000_000;

/// Ticks per second of the coarse fallback source (milliseconds)
pub const MILLISECOND_FREQUENCY: u64 = 1_000;

/// Upper bound on time spent probing the host timer
const PROBE_BUDGET: Duration = Duration::from_millis(5);

/// Counter the clock reads from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ClockResolution {
    /// Nanosecond ticks from the monotonic `Instant`
    HighResolution,
    /// Millisecond ticks, used when the host timer is too coarse
    Millisecond,
}

#[derive(Debug, Clone, Copy)]
pub struct Clock {
    anchor: Instant,
    resolution: ClockResolution,
}

impl Clock {
    /// Nanosecond clock anchored at the moment of construction
    pub fn high_resolution() -> Self {
        Self {
            anchor: Instant::now(),
            resolution: ClockResolution::HighResolution,
        }
    }

    /// Millisecond clock anchored at the moment of construction
    pub fn millisecond() -> Self {
        Self {
            anchor: Instant::now(),
            resolution: ClockResolution::Millisecond,
        }
    }

    /// Probe the host timer and pick the best available resolution
    ///
    /// Falls back to milliseconds when the smallest observable step of the
    /// monotonic timer is a millisecond or more.
    pub fn system() -> Self {
        match probe_granularity() {
            Some(step) if step < Duration::from_millis(1) => Self::high_resolution(),
            _ => Self::millisecond(),
        }
    }

    pub fn resolution(&self) -> ClockResolution {
        self.resolution
    }

    /// Ticks per second; fixed for the lifetime of this clock
    pub fn frequency(&self) -> u64 {
        match self.resolution {
            ClockResolution::HighResolution => HIGH_RESOLUTION_FREQUENCY,
            ClockResolution::Millisecond => MILLISECOND_FREQUENCY,
        }
    }

    /// Current tick count; never decreases
    #[inline]
    pub fn now(&self) -> u64 {
        let elapsed = self.anchor.elapsed();
        match self.resolution {
            ClockResolution::HighResolution => saturating_u64(elapsed.as_nanos()),
            ClockResolution::Millisecond => saturating_u64(elapsed.as_millis()),
        }
    }

    /// Ticks elapsed since an earlier reading, zero if `since` is ahead of us
    pub fn elapsed_since(&self, since: u64) -> u64 {
        self.now().saturating_sub(since)
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::system()
    }
}

fn saturating_u64(value: u128) -> u64 {
    u64::try_from(value).unwrap_or(u64::MAX)
}

/// Smallest non-zero step observed between consecutive `Instant` reads
fn probe_granularity() -> Option<Duration> {
    let started = Instant::now();
    let mut last = started;
    let mut smallest: Option<Duration> = None;

    while started.elapsed() < PROBE_BUDGET {
        let current = Instant::now();
        let step = current.duration_since(last);
        if !step.is_zero() {
            smallest = Some(smallest.map_or(step, |s| s.min(step)));
            if step < Duration::from_micros(1) {
                break;
            }
        }
        last = current;
    }

    smallest
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frequencies() {
        assert_eq!(Clock::high_resolution().frequency(), 1_000_000_000);
        assert_eq!(Clock::millisecond().frequency(), 1_000);
    }

    #[test]
    fn test_now_is_monotonic() {
        let clock = Clock::high_resolution();
        let mut previous = clock.now();
        for _ in 0..10_000 {
            let current = clock.now();
            assert!(current >= previous);
            previous = current;
        }
    }

    #[test]
    fn test_copies_share_anchor() {
        let clock = Clock::high_resolution();
        let copy = clock;
        let stamped = clock.now();
        std::thread::sleep(Duration::from_millis(2));
        let elapsed = copy.elapsed_since(stamped);
        assert!(elapsed >= 2_000_000, "elapsed {} ticks", elapsed);
    }

    #[test]
    fn test_elapsed_since_future_timestamp_is_zero() {
        let clock = Clock::millisecond();
        assert_eq!(clock.elapsed_since(u64::MAX), 0);
    }

    #[test]
    fn test_millisecond_clock_ticks() {
        let clock = Clock::millisecond();
        std::thread::sleep(Duration::from_millis(15));
        let now = clock.now();
        assert!(now >= 15);
        assert!(now < 15_000);
    }

    #[test]
    fn test_system_clock_picks_a_resolution() {
        let clock = Clock::system();
        assert!(matches!(
            clock.resolution(),
            ClockResolution::HighResolution | ClockResolution::Millisecond
        ));
        assert!(clock.frequency() >= MILLISECOND_FREQUENCY);
    }
}
