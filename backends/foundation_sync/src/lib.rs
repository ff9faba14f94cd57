//! Blocking concurrency runtime built on OS threads, mutexes and condition variables.
//!
//! This crate provides:
//! - **[`BoundedQueue`]**: a fixed-capacity FIFO whose `put` and `take` block
//! - **[`CountDownLatch`]**: a one-shot barrier opened when its counter reaches zero
//! - **[`WorkerPool`]**: a fixed set of named worker threads draining a task queue
//! - **Failure taxonomy**: [`TaskError`], [`TaskPanic`] and the [`FailurePolicy`]
//!   applied when a task panics on a worker
//! - **[`Singleton`]** and **[`ThreadLocalSingleton`]**: lazily built shared instances
//!
//! # Examples
//!
//! ```rust
//! use foundation_sync::{CountDownLatch, WorkerPool};
//!
//! let mut pool = WorkerPool::new("Jobs");
//! pool.start(2).unwrap();
//!
//! let done = CountDownLatch::new(10);
//! for _ in 0..10 {
//!     let done = done.clone();
//!     pool.run(move || done.count_down());
//! }
//!
//! done.wait();
//! pool.stop();
//! ```
//!
//! The crate logs through `tracing` and never installs a subscriber.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

mod bounded_queue;
mod countdown_latch;
mod drops;
mod singleton;
mod task;

pub mod config;
pub mod failures;
pub mod pool;

pub use bounded_queue::BoundedQueue;
pub use config::{ConfigError, ConfigResult, WorkerPoolConfig};
pub use countdown_latch::CountDownLatch;
pub use failures::{FailureAction, FailureHandler, FailurePolicy, FailureReport};
pub use pool::{InitHook, PoolError, PoolResult, WorkerPool};
pub use singleton::{Singleton, ThreadLocalSingleton};
pub use task::{FailureKind, Task, TaskError, TaskPanic};
