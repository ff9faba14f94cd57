//! Stress drivers checking the delivery guarantees of the sync primitives
//! under contention.
//!
//! Each driver returns a report whose `is_sound` tells whether every
//! invariant held; the counters explain what went wrong when it did not.

use core::time::Duration;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use foundation_sync::{BoundedQueue, CountDownLatch, PoolResult, WorkerPool, WorkerPoolConfig};

use super::StressConfig;

/// One delivery counter per item, indexed by `producer * iterations + sequence`.
struct Ledger {
    slots: Vec<AtomicUsize>,
}

impl Ledger {
    fn new(items: usize) -> Self {
        Self {
            slots: (0..items).map(|_| AtomicUsize::new(0)).collect(),
        }
    }

    fn mark(&self, item: usize) {
        self.slots[item].fetch_add(1, Ordering::Relaxed);
    }

    /// Returns `(delivered_once, duplicated, missing)`.
    fn tally(&self) -> (usize, usize, usize) {
        self.slots
            .iter()
            .map(|slot| slot.load(Ordering::Relaxed))
            .fold((0, 0, 0), |(once, dup, miss), hits| match hits {
                0 => (once, dup, miss + 1),
                1 => (once + 1, dup, miss),
                _ => (once, dup + 1, miss),
            })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueStressReport {
    pub capacity: usize,
    pub produced: usize,
    pub delivered_once: usize,
    pub duplicated: usize,
    pub missing: usize,
    /// Largest queue length any producer observed right after a put.
    pub max_observed_len: usize,
    /// Items that left the queue out of put order for their producer.
    pub reordered: usize,
    pub duration: Duration,
}

impl QueueStressReport {
    #[must_use]
    pub fn is_sound(&self) -> bool {
        self.duplicated == 0
            && self.missing == 0
            && self.reordered == 0
            && self.delivered_once == self.produced
            && self.max_observed_len <= self.capacity
    }
}

/// Runs `config.threads()` producers and as many consumers against one
/// [`BoundedQueue`] of `capacity`.
///
/// Every producer puts `config.iterations()` items; consumers claim takes
/// until all items are accounted for. The deadline of `config` is ignored
/// since every put must be matched by a take.
///
/// # Panics
///
/// Panics if `capacity` is 0 or a producer or consumer thread panics.
#[must_use]
pub fn run_bounded_queue_stress(config: &StressConfig, capacity: usize) -> QueueStressReport {
    let threads = config.threads();
    let iterations = config.iterations();
    let produced = threads * iterations;

    let queue = BoundedQueue::new(capacity);
    let ledger = Ledger::new(produced);
    let claimed = AtomicUsize::new(0);
    let max_observed_len = AtomicUsize::new(0);
    let reordered = AtomicUsize::new(0);
    let gate = CountDownLatch::new(1);

    let started = Instant::now();
    thread::scope(|scope| {
        for producer in 0..threads {
            let (queue, gate, max_observed_len) = (&queue, &gate, &max_observed_len);
            scope.spawn(move || {
                gate.wait();
                for sequence in 0..iterations {
                    queue.put((producer, sequence));
                    max_observed_len.fetch_max(queue.len(), Ordering::Relaxed);
                }
            });
        }

        for _ in 0..threads {
            let (queue, gate, ledger) = (&queue, &gate, &ledger);
            let (claimed, reordered) = (&claimed, &reordered);
            scope.spawn(move || {
                gate.wait();
                let mut last_seen = vec![None; threads];
                while claimed.fetch_add(1, Ordering::Relaxed) < produced {
                    let (producer, sequence) = queue.take();
                    if last_seen[producer].is_some_and(|prev| prev >= sequence) {
                        reordered.fetch_add(1, Ordering::Relaxed);
                    }
                    last_seen[producer] = Some(sequence);
                    ledger.mark(producer * iterations + sequence);
                }
            });
        }

        gate.count_down();
    });

    let (delivered_once, duplicated, missing) = ledger.tally();
    let report = QueueStressReport {
        capacity,
        produced,
        delivered_once,
        duplicated,
        missing,
        max_observed_len: max_observed_len.into_inner(),
        reordered: reordered.into_inner(),
        duration: started.elapsed(),
    };

    tracing::debug!(?report, "bounded queue stress finished");
    report
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolStressReport {
    pub workers: usize,
    pub max_queue_size: usize,
    pub submitted: usize,
    pub executed_once: usize,
    pub duplicated: usize,
    pub missing: usize,
    pub duration: Duration,
}

impl PoolStressReport {
    #[must_use]
    pub fn is_sound(&self) -> bool {
        self.duplicated == 0 && self.missing == 0 && self.executed_once == self.submitted
    }
}

/// Floods a pool launched from `pool_config` with tasks from
/// `config.threads()` submitters, then stops it and checks every task ran
/// exactly once.
///
/// # Errors
///
/// Returns the pool's error when its workers cannot be started.
///
/// # Panics
///
/// Panics if a submitter thread panics.
pub fn run_worker_pool_stress(
    config: &StressConfig,
    pool_config: &WorkerPoolConfig,
) -> PoolResult<PoolStressReport> {
    let submitters = config.threads();
    let iterations = config.iterations();
    let submitted = submitters * iterations;

    let ledger = Arc::new(Ledger::new(submitted));
    let gate = CountDownLatch::new(1);

    let started = Instant::now();
    let mut pool = WorkerPool::launch(pool_config)?;

    thread::scope(|scope| {
        for submitter in 0..submitters {
            let (pool, gate, ledger) = (&pool, &gate, &ledger);
            scope.spawn(move || {
                gate.wait();
                for sequence in 0..iterations {
                    let ledger = Arc::clone(ledger);
                    pool.run(move || ledger.mark(submitter * iterations + sequence));
                }
            });
        }

        gate.count_down();
    });

    pool.stop();

    let (executed_once, duplicated, missing) = ledger.tally();
    let report = PoolStressReport {
        workers: pool.worker_count(),
        max_queue_size: pool.max_queue_size(),
        submitted,
        executed_once,
        duplicated,
        missing,
        duration: started.elapsed(),
    };

    tracing::debug!(?report, "worker pool stress finished");
    Ok(report)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LatchStressReport {
    pub initial_count: usize,
    pub waiters: usize,
    pub waiters_released: usize,
    /// Count downs issued after the latch had already opened.
    pub surplus_count_downs: usize,
    pub final_count: usize,
    pub duration: Duration,
}

impl LatchStressReport {
    #[must_use]
    pub fn is_sound(&self) -> bool {
        self.final_count == 0 && self.waiters_released == self.waiters
    }
}

/// Races `config.threads()` counting threads and as many waiters on one
/// latch of `threads * iterations`; every counting thread also issues one
/// surplus count down that must leave the latch at zero.
///
/// # Panics
///
/// Panics if a counting or waiting thread panics.
#[must_use]
pub fn run_latch_stress(config: &StressConfig) -> LatchStressReport {
    let threads = config.threads();
    let iterations = config.iterations();
    let initial_count = threads * iterations;

    let latch = CountDownLatch::new(initial_count);
    let gate = CountDownLatch::new(1);
    let released = AtomicUsize::new(0);

    let started = Instant::now();
    thread::scope(|scope| {
        for _ in 0..threads {
            let (latch, gate, released) = (&latch, &gate, &released);
            scope.spawn(move || {
                gate.wait();
                latch.wait();
                released.fetch_add(1, Ordering::SeqCst);
            });
        }

        for _ in 0..threads {
            let (latch, gate) = (&latch, &gate);
            scope.spawn(move || {
                gate.wait();
                for _ in 0..iterations {
                    latch.count_down();
                }
            });
        }

        gate.count_down();
    });

    // The latch is open once the scope has joined every counting thread.
    for _ in 0..threads {
        latch.count_down();
    }

    let report = LatchStressReport {
        initial_count,
        waiters: threads,
        waiters_released: released.into_inner(),
        surplus_count_downs: threads,
        final_count: latch.count(),
        duration: started.elapsed(),
    };

    tracing::debug!(?report, "latch stress finished");
    report
}
