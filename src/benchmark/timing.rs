//! Timing accumulators.

use std::iter::Sum;
use std::ops::{Add, AddAssign};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Total time and operation count for one benchmark phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseTiming {
    /// Accumulated wall time in nanoseconds.
    pub nanos: u64,
    /// Number of operations the time covers.
    pub count: u64,
}

impl PhaseTiming {
    /// Add `elapsed` covering `count` operations.
    pub fn record(&mut self, elapsed: Duration, count: u64) {
        let nanos = u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX);
        self.nanos = self.nanos.saturating_add(nanos);
        self.count += count;
    }

    pub fn merge(&mut self, other: &PhaseTiming) {
        self.nanos = self.nanos.saturating_add(other.nanos);
        self.count += other.count;
    }

    /// Total time in milliseconds.
    pub fn total_ms(&self) -> f64 {
        self.nanos as f64 / 1_000_000.0
    }

    /// Mean latency per operation in milliseconds; NaN when nothing was counted.
    pub fn mean_latency_ms(&self) -> f64 {
        if self.count == 0 {
            return f64::NAN;
        }
        self.total_ms() / self.count as f64
    }

    /// Operations per second; NaN when no time was recorded.
    pub fn throughput(&self) -> f64 {
        if self.nanos == 0 {
            return f64::NAN;
        }
        self.count as f64 / (self.nanos as f64 / 1_000_000_000.0)
    }
}

/// Per-phase timings of one or more benchmark workers.
///
/// Merging is associative and commutative, so worker results can be folded
/// in any order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregatedTiming {
    /// Reader open.
    pub init: PhaseTiming,
    /// Document fetches.
    pub fetch: PhaseTiming,
    /// Range queries; the count is the number of hits.
    pub search: PhaseTiming,
    /// Reader close.
    pub close: PhaseTiming,
}

impl AggregatedTiming {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold `other` into `self`.
    pub fn merge(&mut self, other: &AggregatedTiming) {
        self.init.merge(&other.init);
        self.fetch.merge(&other.fetch);
        self.search.merge(&other.search);
        self.close.merge(&other.close);
    }

    /// Whether no phase recorded anything.
    pub fn is_empty(&self) -> bool {
        *self == AggregatedTiming::default()
    }
}

impl Add for AggregatedTiming {
    type Output = AggregatedTiming;

    fn add(mut self, rhs: AggregatedTiming) -> AggregatedTiming {
        self.merge(&rhs);
        self
    }
}

impl AddAssign for AggregatedTiming {
    fn add_assign(&mut self, rhs: AggregatedTiming) {
        self.merge(&rhs);
    }
}

impl Sum for AggregatedTiming {
    fn sum<I: Iterator<Item = AggregatedTiming>>(iter: I) -> Self {
        iter.fold(AggregatedTiming::default(), Add::add)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timing(init: (u64, u64), fetch: (u64, u64)) -> AggregatedTiming {
        AggregatedTiming {
            init: PhaseTiming {
                nanos: init.0,
                count: init.1,
            },
            fetch: PhaseTiming {
                nanos: fetch.0,
                count: fetch.1,
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_record() {
        let mut phase = PhaseTiming::default();
        phase.record(Duration::from_millis(3), 2);
        phase.record(Duration::from_millis(1), 2);
        assert_eq!(phase.nanos, 4_000_000);
        assert_eq!(phase.count, 4);
        assert_eq!(phase.mean_latency_ms(), 1.0);
        assert_eq!(phase.throughput(), 1000.0);
    }

    #[test]
    fn test_empty_phase_is_nan() {
        let phase = PhaseTiming::default();
        assert!(phase.mean_latency_ms().is_nan());
        assert!(phase.throughput().is_nan());
    }

    #[test]
    fn test_merge_is_associative_and_commutative() {
        let a = timing((1, 1), (10, 5));
        let b = timing((2, 1), (20, 7));
        let c = timing((0, 0), (5, 1));

        assert_eq!((a + b) + c, a + (b + c));
        assert_eq!(a + b, b + a);
        assert_eq!([a, b, c].into_iter().sum::<AggregatedTiming>(), a + b + c);
        assert_eq!((a + b + c).fetch.count, 13);
    }

    #[test]
    fn test_empty_identity() {
        let a = timing((3, 1), (4, 2));
        assert_eq!(a + AggregatedTiming::new(), a);
        assert!(AggregatedTiming::new().is_empty());
        assert!(!a.is_empty());
    }
}
