//! Fixed-size worker pool draining a shared task queue.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                       WorkerPool                         │
//! ├──────────────────────────────────────────────────────────┤
//! │   run() ──► ┌──────────────────────────────┐             │
//! │  (blocks if │ Mutex<{ VecDeque<Task>,      │ not_full    │
//! │   bounded & │         running }>           │ not_empty   │
//! │   full)     └──────────────┬───────────────┘             │
//! │                            │ take()                      │
//! │          ┌─────────────────┼─────────────────┐           │
//! │     ┌────▼────┐       ┌────▼────┐       ┌────▼────┐      │
//! │     │ Worker1 │       │ Worker2 │  ...  │ WorkerN │      │
//! │     └─────────┘       └─────────┘       └─────────┘      │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! The pool moves through three states: idle after construction, running
//! after [`WorkerPool::start`], stopped after [`WorkerPool::stop`]. Stopped is
//! terminal. Configuration happens while idle only.
//!
//! With zero workers the pool runs every submitted task inline on the
//! submitting thread, and task failures propagate to that caller.
//!
//! A task that calls back into [`WorkerPool::run`] on a full bounded pool from
//! a worker thread can deadlock the pool; nothing guards against that.

mod errors;
mod shared;

pub use errors::{PoolError, PoolResult};

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::config::WorkerPoolConfig;
use crate::failures::{FailureHandler, FailurePolicy, FailureReport};
use crate::task::{Task, TaskError};

use shared::Shared;

/// Callback run once on every worker thread before it takes its first task.
pub type InitHook = Arc<dyn Fn() + Send + Sync + 'static>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Lifecycle {
    Idle,
    Running,
    Stopped,
}

/// A fixed set of worker threads executing submitted tasks in FIFO order.
///
/// # Examples
///
/// ```
/// use foundation_sync::{CountDownLatch, WorkerPool};
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
///
/// let mut pool = WorkerPool::new("Example");
/// pool.set_max_queue_size(8);
/// pool.start(4).unwrap();
///
/// let counter = Arc::new(AtomicUsize::new(0));
/// for _ in 0..100 {
///     let counter = Arc::clone(&counter);
///     pool.run(move || {
///         counter.fetch_add(1, Ordering::Relaxed);
///     });
/// }
///
/// // Once this task is dequeued every earlier task has been dequeued too.
/// let latch = CountDownLatch::new(1);
/// let signal = latch.clone();
/// pool.run(move || signal.count_down());
/// latch.wait();
///
/// pool.stop();
/// assert_eq!(counter.load(Ordering::Relaxed), 100);
/// ```
pub struct WorkerPool {
    shared: Arc<Shared>,
    workers: Vec<JoinHandle<()>>,
    worker_count: usize,
    lifecycle: Lifecycle,
}

impl WorkerPool {
    /// Creates an idle, unbounded pool named `name`.
    ///
    /// # Panics
    ///
    /// Panics if `name` contains a NUL byte, which no worker thread name may hold.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        assert!(
            !name.contains('\0'),
            "WorkerPool name {name:?} must not contain NUL bytes"
        );

        Self {
            shared: Arc::new(Shared::new(name)),
            workers: Vec::new(),
            worker_count: 0,
            lifecycle: Lifecycle::Idle,
        }
    }

    /// Creates an idle pool carrying the name and queue bound of `config`.
    #[must_use]
    pub fn from_config(config: &WorkerPoolConfig) -> Self {
        let mut pool = Self::new(config.name.clone());
        pool.set_max_queue_size(config.max_queue_size);
        pool
    }

    /// Creates a pool from `config` and starts `config.threads` workers.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::FailedStart`] if a worker thread cannot be spawned.
    pub fn launch(config: &WorkerPoolConfig) -> PoolResult<Self> {
        let mut pool = Self::from_config(config);
        pool.start(config.threads)?;
        Ok(pool)
    }

    fn configure(&mut self) -> &mut Shared {
        assert_eq!(
            self.lifecycle,
            Lifecycle::Idle,
            "WorkerPool {} must be configured before start",
            self.shared.name
        );
        // idle pools have spawned no worker holding a clone
        let Some(shared) = Arc::get_mut(&mut self.shared) else {
            unreachable!("idle WorkerPool shares its state with a worker")
        };
        shared
    }

    /// Bounds the task queue; `run` blocks while `max_size` tasks are queued.
    ///
    /// 0 (the default) leaves the queue unbounded.
    ///
    /// # Panics
    ///
    /// Panics if the pool has already been started.
    pub fn set_max_queue_size(&mut self, max_size: usize) {
        self.configure().max_queue_size = max_size;
    }

    /// Sets a callback every worker runs once before taking tasks.
    ///
    /// When the pool starts with zero workers the callback runs once on the
    /// thread calling [`WorkerPool::start`].
    ///
    /// # Panics
    ///
    /// Panics if the pool has already been started.
    pub fn set_thread_init_callback<F>(&mut self, callback: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.configure().init_hook = Some(Arc::new(callback));
    }

    /// Chooses what happens to a worker whose task panics.
    ///
    /// # Panics
    ///
    /// Panics if the pool has already been started.
    pub fn set_failure_policy(&mut self, policy: FailurePolicy) {
        self.configure().failure_policy = policy;
    }

    /// Sets a callback receiving every task failure before the policy applies.
    ///
    /// # Panics
    ///
    /// Panics if the pool has already been started.
    pub fn set_failure_handler<F>(&mut self, handler: F)
    where
        F: Fn(&FailureReport<'_>) + Send + Sync + 'static,
    {
        let handler: FailureHandler = Arc::new(handler);
        self.configure().failure_handler = Some(handler);
    }

    /// Spawns `num_threads` workers named `{name}1..={name}N`.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::FailedStart`] if a worker thread cannot be spawned;
    /// workers spawned before the failure are stopped and joined first.
    ///
    /// # Panics
    ///
    /// Panics unless the pool is idle: a pool starts at most once.
    pub fn start(&mut self, num_threads: usize) -> PoolResult<()> {
        let span = tracing::trace_span!("WorkerPool::start", pool = %self.shared.name);
        let _enter = span.enter();

        assert_eq!(
            self.lifecycle,
            Lifecycle::Idle,
            "WorkerPool {} can only be started once",
            self.shared.name
        );
        assert!(self.workers.is_empty());

        self.shared.set_running(true);
        self.lifecycle = Lifecycle::Running;
        self.worker_count = num_threads;
        self.workers.reserve(num_threads);

        for index in 1..=num_threads {
            let shared = Arc::clone(&self.shared);
            shared.live_workers.fetch_add(1, Ordering::SeqCst);

            let spawned = thread::Builder::new()
                .name(format!("{}{}", self.shared.name, index))
                .spawn(move || shared.run_worker());

            match spawned {
                Ok(handle) => self.workers.push(handle),
                Err(err) => {
                    self.shared.live_workers.fetch_sub(1, Ordering::SeqCst);
                    tracing::error!(
                        pool = %self.shared.name,
                        worker = index,
                        error = %err,
                        "failed to spawn worker thread"
                    );
                    self.stop();
                    return Err(PoolError::FailedStart(err));
                }
            }
        }

        if num_threads == 0 {
            if let Some(hook) = &self.shared.init_hook {
                hook();
            }
        }

        tracing::info!(
            pool = %self.shared.name,
            workers = num_threads,
            max_queue_size = self.shared.max_queue_size,
            "worker pool started"
        );

        Ok(())
    }

    /// Stops the pool, letting workers drain every queued task before joining them.
    ///
    /// Stopping an idle pool makes it terminal without spawning anything;
    /// stopping a stopped pool does nothing.
    pub fn stop(&mut self) {
        let span = tracing::trace_span!("WorkerPool::stop", pool = %self.shared.name);
        let _enter = span.enter();

        if self.lifecycle == Lifecycle::Stopped {
            return;
        }

        self.shared.set_running(false);

        for handle in self.workers.drain(..) {
            let worker = handle.thread().name().unwrap_or("<unnamed>").to_owned();
            if handle.join().is_err() {
                tracing::warn!(
                    pool = %self.shared.name,
                    worker = %worker,
                    "worker thread terminated abnormally"
                );
            }
        }

        self.lifecycle = Lifecycle::Stopped;
        tracing::info!(pool = %self.shared.name, "worker pool stopped");
    }

    /// Submits `f` for execution.
    ///
    /// Without workers `f` runs before `run` returns. Otherwise `f` is queued,
    /// blocking first while a bounded queue is full.
    ///
    /// # Panics
    ///
    /// Panics if the pool has been stopped. In inline mode a panic inside `f`
    /// propagates to the caller.
    pub fn run<F>(&self, f: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.run_task(Task::new(f));
    }

    /// Submits an already built [`Task`]; empty tasks are discarded.
    ///
    /// # Panics
    ///
    /// Panics if the pool has been stopped.
    pub fn run_task(&self, task: Task) {
        assert_ne!(
            self.lifecycle,
            Lifecycle::Stopped,
            "task submitted to stopped WorkerPool {}",
            self.shared.name
        );

        if task.is_empty() {
            return;
        }

        if self.workers.is_empty() {
            task.run();
        } else {
            self.shared.submit(task);
        }
    }

    /// Submits a fallible job; an `Err` it returns is raised as a [`TaskError`].
    ///
    /// # Panics
    ///
    /// Panics if the pool has been stopped.
    pub fn run_fallible<F, E>(&self, f: F)
    where
        F: FnOnce() -> Result<(), E> + Send + 'static,
        E: std::error::Error,
    {
        self.run(move || {
            if let Err(err) = f() {
                TaskError::from_error(&err).raise();
            }
        });
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// Number of queued tasks when observed.
    #[must_use]
    pub fn queue_size(&self) -> usize {
        self.shared.queue_size()
    }

    #[must_use]
    pub fn max_queue_size(&self) -> usize {
        self.shared.max_queue_size
    }

    /// Number of workers created by [`WorkerPool::start`].
    #[must_use]
    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Number of workers that have not exited yet.
    #[must_use]
    pub fn live_workers(&self) -> usize {
        self.shared.live_workers.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.shared.is_running()
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        if self.lifecycle == Lifecycle::Running {
            self.stop();
        }
    }
}

impl core::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("name", &self.shared.name)
            .field("lifecycle", &self.lifecycle)
            .field("worker_count", &self.worker_count)
            .field("max_queue_size", &self.shared.max_queue_size)
            .finish_non_exhaustive()
    }
}
