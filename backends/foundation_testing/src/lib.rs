//! Stress testing infrastructure for the `foundation_sync` primitives.
//!
//! This crate provides:
//! - **Stress harness**: many threads released at once against one operation
//! - **Stress drivers**: contention runs checking exactly-once delivery for the
//!   bounded queue and worker pool, and release semantics for the latch
//! - **Scenarios**: pipelines and fan-out built from the primitives
//! - **Metrics**: latency percentiles and throughput reports
//!
//! # Examples
//!
//! ```rust
//! use foundation_sync::WorkerPoolConfig;
//! use foundation_testing::stress::{run_worker_pool_stress, StressConfig};
//!
//! let stress = StressConfig::new().with_threads(4).with_iterations(250);
//! let pool = WorkerPoolConfig::new("Stressed").with_threads(3).with_max_queue_size(16);
//!
//! let report = run_worker_pool_stress(&stress, &pool).unwrap();
//! assert!(report.is_sound());
//! assert_eq!(report.submitted, 1000);
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod metrics;
pub mod scenarios;
pub mod stress;

pub use metrics::{LatencySummary, Metrics, PerformanceReport};
pub use stress::{StressConfig, StressHarness, StressResult};
