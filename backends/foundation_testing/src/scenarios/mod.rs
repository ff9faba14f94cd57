//! Higher level concurrency patterns assembled from the sync primitives:
//! - Multi-stage pipelines joined by bounded queues
//! - Fan-out/fan-in over a worker pool

pub mod fan_out;
pub mod pipeline;

pub use fan_out::FanOut;
pub use pipeline::Pipeline;
