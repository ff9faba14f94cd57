//! Contention harness and the stress drivers built on it.
//!
//! Every thread of a [`StressHarness`] run parks on a [`CountDownLatch`]
//! start gate, so all of them hit the code under test at the same moment
//! instead of trickling in as they are spawned.

use core::time::Duration;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use foundation_sync::CountDownLatch;

use crate::metrics::{Metrics, PerformanceReport};

pub mod config;
pub mod drivers;

pub use config::StressConfig;
pub use drivers::{
    run_bounded_queue_stress, run_latch_stress, run_worker_pool_stress, LatchStressReport,
    PoolStressReport, QueueStressReport,
};

/// Outcome of a [`StressHarness`] run.
#[derive(Debug, Clone)]
pub struct StressResult {
    pub successes: usize,
    /// Operations that returned `false` or panicked.
    pub failures: usize,
    pub duration: Duration,
    pub threads: usize,
    pub metrics: Metrics,
}

impl StressResult {
    #[must_use]
    pub const fn total_operations(&self) -> usize {
        self.successes + self.failures
    }

    /// Fraction of operations that succeeded, 0.0 for an empty run.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn success_rate(&self) -> f64 {
        match self.total_operations() {
            0 => 0.0,
            total => self.successes as f64 / total as f64,
        }
    }

    #[must_use]
    pub fn operations_per_second(&self) -> f64 {
        self.metrics.throughput()
    }

    #[must_use]
    pub fn report(&self, title: impl Into<String>) -> PerformanceReport {
        PerformanceReport::new(title, self.metrics.clone())
    }
}

/// Runs one operation closure on many threads at once.
///
/// # Examples
///
/// ```rust
/// use foundation_testing::stress::{StressConfig, StressHarness};
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
///
/// let hits = Arc::new(AtomicUsize::new(0));
/// let harness = StressHarness::new(StressConfig::new().with_threads(4).with_iterations(250));
///
/// let counter = Arc::clone(&hits);
/// let result = harness.run(move |_thread, _iteration| {
///     counter.fetch_add(1, Ordering::Relaxed);
///     true
/// });
///
/// assert_eq!(hits.load(Ordering::Relaxed), 1000);
/// assert_eq!(result.successes, 1000);
/// assert_eq!(result.metrics.samples().len(), 1000);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct StressHarness {
    config: StressConfig,
}

impl StressHarness {
    #[must_use]
    pub const fn new(config: StressConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub const fn config(&self) -> &StressConfig {
        &self.config
    }

    /// Calls `operation(thread, iteration)` until the iteration budget or the
    /// deadline runs out on every thread, timing each call.
    ///
    /// A panicking operation counts as a failure and its thread carries on.
    ///
    /// # Panics
    ///
    /// Panics if a harness thread cannot be spawned.
    pub fn run<F>(&self, operation: F) -> StressResult
    where
        F: Fn(usize, usize) -> bool + Send + Sync + 'static,
    {
        let threads = self.config.threads();
        let iterations = self.config.iterations();

        let span = tracing::trace_span!("StressHarness::run", threads, iterations);
        let _enter = span.enter();

        let operation = Arc::new(operation);
        let failures = Arc::new(AtomicUsize::new(0));
        let gate = CountDownLatch::new(1);

        let started = Instant::now();
        let deadline = self.config.duration().map(|limit| started + limit);

        let handles: Vec<_> = (0..threads)
            .map(|thread_id| {
                let operation = Arc::clone(&operation);
                let failures = Arc::clone(&failures);
                let gate = gate.clone();

                thread::Builder::new()
                    .name(format!("stress-{thread_id}"))
                    .spawn(move || {
                        gate.wait();

                        let mut metrics = Metrics::new();
                        for iteration in 0..iterations {
                            if deadline.is_some_and(|at| Instant::now() >= at) {
                                break;
                            }

                            let begin = Instant::now();
                            let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                                operation(thread_id, iteration)
                            }));
                            metrics.record(begin.elapsed());

                            if !matches!(outcome, Ok(true)) {
                                failures.fetch_add(1, Ordering::Relaxed);
                            }
                        }
                        metrics
                    })
                    .expect("should spawn stress thread")
            })
            .collect();

        gate.count_down();

        let mut metrics = Metrics::new();
        for handle in handles {
            match handle.join() {
                Ok(thread_metrics) => metrics.merge(thread_metrics),
                Err(_) => tracing::error!("stress thread terminated abnormally"),
            }
        }
        let duration = started.elapsed();
        metrics.set_duration(duration);

        let failures = failures.load(Ordering::Relaxed);
        let result = StressResult {
            successes: metrics.operations() - failures,
            failures,
            duration,
            threads,
            metrics,
        };

        tracing::debug!(
            successes = result.successes,
            failures = result.failures,
            ?duration,
            "stress run finished"
        );
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_false_and_panics_as_failures() {
        let harness = StressHarness::new(StressConfig::new().with_threads(2).with_iterations(10));
        let result = harness.run(|_thread, iteration| {
            assert!(iteration != 3, "iteration three always fails");
            iteration % 2 == 0
        });

        // Per thread: 5 odd iterations return false, iteration 3 (odd) panics.
        assert_eq!(result.total_operations(), 20);
        assert_eq!(result.failures, 10);
        assert_eq!(result.successes, 10);
        assert!((result.success_rate() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    #[ntest::timeout(10000)]
    fn test_deadline_stops_early() {
        let config = StressConfig::new()
            .with_threads(2)
            .with_iterations(usize::MAX)
            .with_duration(Duration::from_millis(50));

        let result = StressHarness::new(config).run(|_, _| {
            thread::sleep(Duration::from_millis(1));
            true
        });

        assert!(result.successes > 0);
        assert!(result.duration >= Duration::from_millis(50));
    }

    #[test]
    fn test_threads_start_together() {
        let arrived = Arc::new(AtomicUsize::new(0));
        let harness = StressHarness::new(StressConfig::new().with_threads(6).with_iterations(1));

        let counter = Arc::clone(&arrived);
        let result = harness.run(move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
            let name = thread::current().name().map(str::to_owned);
            name.is_some_and(|n| n.starts_with("stress-"))
        });

        assert_eq!(arrived.load(Ordering::SeqCst), 6);
        assert_eq!(result.successes, 6);
        assert_eq!(result.threads, 6);
    }
}
