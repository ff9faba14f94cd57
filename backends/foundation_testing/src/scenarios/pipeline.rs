//! Multi-stage processing pipeline.
//!
//! ```text
//!  feed ──► [queue0] ──► stage 0 pool ──► [queue1] ──► ... ──► [queueN] ──► collect
//! ```
//!
//! Every stage is served by its own [`WorkerPool`] whose workers loop on the
//! stage's inbound [`BoundedQueue`]. End of stream travels as one `None` per
//! worker of the receiving stage.

use std::sync::Arc;
use std::thread;

use foundation_sync::{BoundedQueue, PoolResult, WorkerPool};

type Transform<T> = Arc<dyn Fn(T) -> T + Send + Sync + 'static>;

struct Stage<T> {
    name: String,
    workers: usize,
    transform: Transform<T>,
}

/// A chain of transforms applied to every item, each stage running in parallel
/// with the others.
///
/// Items may leave the pipeline in a different order than they entered it
/// once any stage has more than one worker.
///
/// ```rust
/// use foundation_testing::scenarios::Pipeline;
///
/// let mut output = Pipeline::new(4)
///     .stage("double", 2, |x: u64| x * 2)
///     .stage("increment", 1, |x| x + 1)
///     .run(1..=5)
///     .unwrap();
///
/// output.sort_unstable();
/// assert_eq!(output, vec![3, 5, 7, 9, 11]);
/// ```
pub struct Pipeline<T> {
    capacity: usize,
    stages: Vec<Stage<T>>,
}

impl<T: Send + 'static> Pipeline<T> {
    /// Creates an empty pipeline whose inter-stage queues hold `capacity` items.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is 0.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "Pipeline capacity must be > 0");
        Self {
            capacity,
            stages: Vec::new(),
        }
    }

    /// Appends a stage applying `transform` on `workers` threads.
    ///
    /// # Panics
    ///
    /// Panics if `workers` is 0.
    #[must_use]
    pub fn stage<F>(mut self, name: impl Into<String>, workers: usize, transform: F) -> Self
    where
        F: Fn(T) -> T + Send + Sync + 'static,
    {
        assert!(workers > 0, "a pipeline stage needs at least one worker");
        self.stages.push(Stage {
            name: name.into(),
            workers,
            transform: Arc::new(transform),
        });
        self
    }

    #[must_use]
    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    /// Pushes every input through all stages and returns what comes out.
    ///
    /// # Errors
    ///
    /// Returns the error of the first stage pool that fails to start.
    pub fn run<I>(self, inputs: I) -> PoolResult<Vec<T>>
    where
        I: IntoIterator<Item = T>,
        I::IntoIter: Send + 'static,
    {
        let span = tracing::trace_span!("Pipeline::run", stages = self.stages.len());
        let _enter = span.enter();

        let queues: Vec<BoundedQueue<Option<T>>> = (0..=self.stages.len())
            .map(|_| BoundedQueue::new(self.capacity))
            .collect();

        // Start every pool before any worker blocks on a queue, so a failed
        // start leaves behind only pools without work, which drop cleanly.
        let mut pools = Vec::with_capacity(self.stages.len());
        for stage in &self.stages {
            let mut pool = WorkerPool::new(stage.name.clone());
            pool.start(stage.workers)?;
            pools.push(pool);
        }

        for (index, (stage, pool)) in self.stages.iter().zip(&pools).enumerate() {
            for _ in 0..stage.workers {
                let inbound = queues[index].clone();
                let outbound = queues[index + 1].clone();
                let transform = Arc::clone(&stage.transform);
                pool.run(move || {
                    while let Some(item) = inbound.take() {
                        outbound.put(Some(transform(item)));
                    }
                });
            }
        }

        let first_workers = self.stages.first().map_or(1, |stage| stage.workers);
        let feed = {
            let inbound = queues[0].clone();
            let inputs = inputs.into_iter();
            thread::spawn(move || {
                for item in inputs {
                    inbound.put(Some(item));
                }
                for _ in 0..first_workers {
                    inbound.put(None);
                }
            })
        };

        let collect = {
            let outbound = queues[self.stages.len()].clone();
            thread::spawn(move || {
                let mut output = Vec::new();
                while let Some(item) = outbound.take() {
                    output.push(item);
                }
                output
            })
        };

        // A stage is finished once its pool has drained; only then may the
        // next stage learn that no more items are coming.
        for (index, mut pool) in pools.into_iter().enumerate() {
            pool.stop();
            let downstream = self.stages.get(index + 1).map_or(1, |stage| stage.workers);
            for _ in 0..downstream {
                queues[index + 1].put(None);
            }
        }

        if feed.join().is_err() {
            tracing::error!("pipeline feed thread panicked");
        }
        let output = match collect.join() {
            Ok(output) => output,
            Err(payload) => std::panic::resume_unwind(payload),
        };

        tracing::debug!(items = output.len(), "pipeline drained");
        Ok(output)
    }
}

impl<T> core::fmt::Debug for Pipeline<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let stages: Vec<(&str, usize)> = self
            .stages
            .iter()
            .map(|stage| (stage.name.as_str(), stage.workers))
            .collect();
        f.debug_struct("Pipeline")
            .field("capacity", &self.capacity)
            .field("stages", &stages)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[ntest::timeout(10000)]
    fn test_stages_apply_in_sequence() {
        let output = Pipeline::new(2)
            .stage("append-a", 1, |s: String| s + "a")
            .stage("append-b", 1, |s| s + "b")
            .run(vec![String::from("1"), String::from("2")])
            .unwrap();

        // With one worker per stage order is preserved end to end.
        assert_eq!(output, vec!["1ab", "2ab"]);
    }

    #[test]
    #[ntest::timeout(10000)]
    fn test_wide_stages_deliver_everything() {
        let mut output = Pipeline::new(3)
            .stage("square", 4, |x: u64| x * x)
            .stage("shift", 3, |x| x + 1_000_000)
            .stage("identity", 2, |x| x)
            .run(0..1000)
            .unwrap();

        output.sort_unstable();
        let expected: Vec<u64> = (0..1000).map(|x| x * x + 1_000_000).collect();
        assert_eq!(output, expected);
    }

    #[test]
    #[ntest::timeout(10000)]
    fn test_no_stages_passes_through() {
        let pipeline = Pipeline::<u8>::new(1);
        assert_eq!(pipeline.stage_count(), 0);
        assert_eq!(pipeline.run([1, 2, 3]).unwrap(), vec![1, 2, 3]);
    }
}
