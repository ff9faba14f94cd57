//! Stress run sizing.

use core::time::Duration;
use std::env;
use std::str::FromStr;

/// Overrides the thread count of [`StressConfig::from_env`].
pub const STRESS_THREADS_ENV: &str = "FOUNDATION_STRESS_THREADS";

/// Overrides the per-thread iteration count of [`StressConfig::from_env`].
pub const STRESS_ITERATIONS_ENV: &str = "FOUNDATION_STRESS_ITERATIONS";

/// How many threads a stress run uses and how long each keeps going.
///
/// A run ends per thread after `iterations` operations or once the optional
/// `duration` has elapsed, whichever comes first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StressConfig {
    threads: usize,
    iterations: usize,
    duration: Option<Duration>,
}

impl StressConfig {
    /// 4 threads, 1000 iterations each, no time limit.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            threads: 4,
            iterations: 1000,
            duration: None,
        }
    }

    /// Starts from [`StressConfig::new`] and applies `FOUNDATION_STRESS_THREADS`
    /// and `FOUNDATION_STRESS_ITERATIONS` when they hold positive integers.
    ///
    /// Unusable values are ignored so a CI job can scale runs without
    /// making them fail.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::new();
        if let Some(threads) = positive_from_env(STRESS_THREADS_ENV) {
            config.threads = threads;
        }
        if let Some(iterations) = positive_from_env(STRESS_ITERATIONS_ENV) {
            config.iterations = iterations;
        }
        config
    }

    #[must_use]
    pub const fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    #[must_use]
    pub const fn with_iterations(mut self, iterations: usize) -> Self {
        self.iterations = iterations;
        self
    }

    /// Stops every thread once `duration` has elapsed.
    #[must_use]
    pub const fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }

    #[must_use]
    pub const fn threads(&self) -> usize {
        self.threads
    }

    #[must_use]
    pub const fn iterations(&self) -> usize {
        self.iterations
    }

    #[must_use]
    pub const fn duration(&self) -> Option<Duration> {
        self.duration
    }

    /// Operations a run performs when no deadline cuts it short.
    #[must_use]
    pub const fn total_operations(&self) -> usize {
        self.threads * self.iterations
    }
}

impl Default for StressConfig {
    fn default() -> Self {
        Self::new()
    }
}

fn positive_from_env(variable: &str) -> Option<usize> {
    let raw = env::var(variable).ok()?;
    match usize::from_str(raw.trim()) {
        Ok(value @ 1..) => {
            tracing::debug!("Retrieved {} = {} from environment", variable, value);
            Some(value)
        }
        _ => {
            tracing::warn!("Ignoring unusable {} value {:?}", variable, raw);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_builder() {
        let config = StressConfig::new()
            .with_threads(8)
            .with_iterations(50)
            .with_duration(Duration::from_millis(10));

        assert_eq!(config.threads(), 8);
        assert_eq!(config.iterations(), 50);
        assert_eq!(config.duration(), Some(Duration::from_millis(10)));
        assert_eq!(config.total_operations(), 400);
    }

    #[test]
    #[serial]
    fn test_from_env_overrides_and_ignores_garbage() {
        env::set_var(STRESS_THREADS_ENV, "12");
        env::set_var(STRESS_ITERATIONS_ENV, "0");

        let config = StressConfig::from_env();
        env::remove_var(STRESS_THREADS_ENV);
        env::remove_var(STRESS_ITERATIONS_ENV);

        assert_eq!(config.threads(), 12);
        assert_eq!(config.iterations(), StressConfig::new().iterations());
    }

    #[test]
    #[serial]
    fn test_from_env_unset_is_default() {
        env::remove_var(STRESS_THREADS_ENV);
        env::remove_var(STRESS_ITERATIONS_ENV);
        assert_eq!(StressConfig::from_env(), StressConfig::default());
    }
}
