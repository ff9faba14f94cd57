//! Scatter jobs over a worker pool and gather their results.

use std::sync::{Arc, Mutex};

use foundation_sync::{CountDownLatch, WorkerPool};

/// Submits one job per input to a running [`WorkerPool`] and waits on a
/// [`CountDownLatch`] until all of them have reported back.
///
/// A job that panics never counts down, so under
/// [`foundation_sync::FailureAction::ExitWorker`] [`FanOut::map`] waits
/// forever; jobs are expected not to fail.
///
/// ```rust
/// use foundation_sync::WorkerPool;
/// use foundation_testing::scenarios::FanOut;
///
/// let mut pool = WorkerPool::new("FanOut");
/// pool.start(3).unwrap();
///
/// let lengths = FanOut::new(&pool).map(vec!["a", "bb", "ccc"], |s| s.len());
/// assert_eq!(lengths, vec![1, 2, 3]);
///
/// pool.stop();
/// ```
#[derive(Debug)]
pub struct FanOut<'a> {
    pool: &'a WorkerPool,
}

impl<'a> FanOut<'a> {
    #[must_use]
    pub const fn new(pool: &'a WorkerPool) -> Self {
        Self { pool }
    }

    /// Applies `job` to every input on the pool; results keep input order.
    pub fn map<I, R, F>(&self, inputs: Vec<I>, job: F) -> Vec<R>
    where
        I: Send + 'static,
        R: Send + 'static,
        F: Fn(I) -> R + Send + Sync + 'static,
    {
        let total = inputs.len();
        let job = Arc::new(job);
        let results: Arc<Mutex<Vec<Option<R>>>> =
            Arc::new(Mutex::new((0..total).map(|_| None).collect()));
        let done = CountDownLatch::new(total);

        for (index, input) in inputs.into_iter().enumerate() {
            let (job, results, done) = (Arc::clone(&job), Arc::clone(&results), done.clone());
            self.pool.run(move || {
                let output = job(input);
                match results.lock() {
                    Ok(mut slots) => slots[index] = Some(output),
                    Err(poisoned) => poisoned.into_inner()[index] = Some(output),
                }
                done.count_down();
            });
        }

        done.wait();
        tracing::trace!(jobs = total, pool = self.pool.name(), "fan out gathered");

        let mut slots = match results.lock() {
            Ok(slots) => slots,
            Err(poisoned) => poisoned.into_inner(),
        };
        slots.drain(..).flatten().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::thread;

    #[test]
    #[ntest::timeout(10000)]
    fn test_results_keep_input_order_and_spread_over_workers() {
        let mut pool = WorkerPool::new("Spread");
        pool.start(4).unwrap();

        let outputs = FanOut::new(&pool).map((0..200).collect(), |n: u32| {
            let name = thread::current().name().map(str::to_owned).unwrap_or_default();
            (n * 3, name)
        });
        pool.stop();

        let values: Vec<u32> = outputs.iter().map(|(v, _)| *v).collect();
        assert_eq!(values, (0..200).map(|n| n * 3).collect::<Vec<_>>());

        let names: HashSet<&str> = outputs.iter().map(|(_, name)| name.as_str()).collect();
        assert!(names.iter().all(|name| name.starts_with("Spread")));
    }

    #[test]
    fn test_inline_pool_and_empty_input() {
        let mut pool = WorkerPool::new("Inline");
        pool.start(0).unwrap();

        let fan_out = FanOut::new(&pool);
        assert_eq!(fan_out.map(vec![1, 2], |n: i32| -n), vec![-1, -2]);
        assert!(fan_out.map(Vec::<i32>::new(), |n| n).is_empty());

        pool.stop();
    }
}
