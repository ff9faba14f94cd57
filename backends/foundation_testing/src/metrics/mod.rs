//! Latency and throughput figures gathered during stress runs.

pub mod reporter;

pub use reporter::PerformanceReport;

use core::time::Duration;

/// Per-operation latency samples plus the wall time they were taken over.
#[derive(Debug, Clone, Default)]
pub struct Metrics {
    samples: Vec<u64>,
    operations: usize,
    duration: Duration,
}

/// Order statistics over a set of latency samples, in nanoseconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatencySummary {
    pub min: u64,
    pub max: u64,
    pub mean: f64,
    pub median: u64,
    pub p95: u64,
    pub p99: u64,
}

impl Metrics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one operation that took `elapsed`.
    pub fn record(&mut self, elapsed: Duration) {
        self.samples
            .push(u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX));
        self.operations += 1;
    }

    /// Counts operations whose latency was not sampled.
    pub fn add_operations(&mut self, count: usize) {
        self.operations += count;
    }

    /// Folds the samples of `other` into `self`.
    pub fn merge(&mut self, other: Metrics) {
        self.samples.extend(other.samples);
        self.operations += other.operations;
        self.duration = self.duration.max(other.duration);
    }

    pub fn set_duration(&mut self, duration: Duration) {
        self.duration = duration;
    }

    #[must_use]
    pub fn operations(&self) -> usize {
        self.operations
    }

    #[must_use]
    pub fn duration(&self) -> Duration {
        self.duration
    }

    #[must_use]
    pub fn samples(&self) -> &[u64] {
        &self.samples
    }

    /// Operations per second over the recorded duration.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn throughput(&self) -> f64 {
        let secs = self.duration.as_secs_f64();
        if secs > 0.0 {
            self.operations as f64 / secs
        } else {
            0.0
        }
    }

    /// Computes the latency summary, or `None` without samples.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn summary(&self) -> Option<LatencySummary> {
        if self.samples.is_empty() {
            return None;
        }

        let mut sorted = self.samples.clone();
        sorted.sort_unstable();

        let len = sorted.len();
        let median = if len % 2 == 0 {
            sorted[len / 2 - 1].midpoint(sorted[len / 2])
        } else {
            sorted[len / 2]
        };
        let total: u128 = sorted.iter().map(|&s| u128::from(s)).sum();

        Some(LatencySummary {
            min: sorted[0],
            max: sorted[len - 1],
            mean: total as f64 / len as f64,
            median,
            p95: nearest_rank(&sorted, 95),
            p99: nearest_rank(&sorted, 99),
        })
    }
}

/// Nearest-rank percentile over already sorted samples.
fn nearest_rank(sorted: &[u64], percent: usize) -> u64 {
    let rank = (sorted.len() * percent).div_ceil(100);
    sorted[rank.saturating_sub(1).min(sorted.len() - 1)]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics_of(nanos: &[u64]) -> Metrics {
        let mut metrics = Metrics::new();
        for &n in nanos {
            metrics.record(Duration::from_nanos(n));
        }
        metrics
    }

    #[test]
    fn test_summary_of_nothing() {
        assert!(Metrics::new().summary().is_none());
        assert!(Metrics::new().throughput().abs() < f64::EPSILON);
    }

    #[test]
    fn test_summary_statistics() {
        let metrics = metrics_of(&(1..=100).collect::<Vec<_>>());
        let summary = metrics.summary().unwrap();

        assert_eq!(summary.min, 1);
        assert_eq!(summary.max, 100);
        assert_eq!(summary.median, 50);
        assert_eq!(summary.p95, 95);
        assert_eq!(summary.p99, 99);
        assert!((summary.mean - 50.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_odd_median_and_single_sample() {
        assert_eq!(metrics_of(&[30, 10, 20]).summary().unwrap().median, 20);

        let one = metrics_of(&[7]).summary().unwrap();
        assert_eq!((one.min, one.median, one.p99, one.max), (7, 7, 7, 7));
    }

    #[test]
    fn test_merge_and_throughput() {
        let mut left = metrics_of(&[1, 2]);
        left.set_duration(Duration::from_millis(500));

        let mut right = metrics_of(&[3]);
        right.add_operations(1);
        right.set_duration(Duration::from_secs(1));

        left.merge(right);
        assert_eq!(left.operations(), 4);
        assert_eq!(left.samples().len(), 3);
        assert_eq!(left.duration(), Duration::from_secs(1));
        assert!((left.throughput() - 4.0).abs() < f64::EPSILON);
    }
}
