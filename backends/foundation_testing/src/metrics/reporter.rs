//! Human readable rendering of [`Metrics`].

use super::Metrics;
use std::fmt;

/// A titled [`Metrics`] snapshot that renders as a plain-text table.
#[derive(Debug, Clone)]
pub struct PerformanceReport {
    title: String,
    metrics: Metrics,
}

impl PerformanceReport {
    #[must_use]
    pub fn new(title: impl Into<String>, metrics: Metrics) -> Self {
        Self {
            title: title.into(),
            metrics,
        }
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub const fn metrics(&self) -> &Metrics {
        &self.metrics
    }
}

impl fmt::Display for PerformanceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== {} ===", self.title)?;
        writeln!(f, "Operations: {}", self.metrics.operations())?;
        writeln!(f, "Duration: {:?}", self.metrics.duration())?;
        writeln!(f, "Throughput: {:.2} ops/sec", self.metrics.throughput())?;

        if let Some(latency) = self.metrics.summary() {
            writeln!(f, "Latency (ns):")?;
            writeln!(f, "  Min: {}", latency.min)?;
            writeln!(f, "  Mean: {:.0}", latency.mean)?;
            writeln!(f, "  Median: {}", latency.median)?;
            writeln!(f, "  P95: {}", latency.p95)?;
            writeln!(f, "  P99: {}", latency.p99)?;
            writeln!(f, "  Max: {}", latency.max)?;
        }

        Ok(())
    }
}
