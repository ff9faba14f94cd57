//! State shared between a [`super::WorkerPool`] and its worker threads.

use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};

use crate::drops::RunOnDrop;
use crate::failures::{self, FailureHandler, FailurePolicy};
use crate::task::{Task, TaskPanic};

use super::InitHook;

/// The task queue and the running flag, guarded by one mutex.
struct QueueState {
    tasks: VecDeque<Task>,
    running: bool,
}

pub(crate) struct Shared {
    pub(crate) name: String,
    pub(crate) max_queue_size: usize,
    pub(crate) init_hook: Option<InitHook>,
    pub(crate) failure_policy: FailurePolicy,
    pub(crate) failure_handler: Option<FailureHandler>,
    pub(crate) live_workers: AtomicUsize,
    state: Mutex<QueueState>,
    not_empty: Condvar,
    not_full: Condvar,
}

impl Shared {
    pub(crate) fn new(name: String) -> Self {
        Self {
            name,
            max_queue_size: 0,
            init_hook: None,
            failure_policy: FailurePolicy::default(),
            failure_handler: None,
            live_workers: AtomicUsize::new(0),
            state: Mutex::new(QueueState {
                tasks: VecDeque::new(),
                running: false,
            }),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        match self.state.lock() {
            Ok(g) => g,
            Err(e) => e.into_inner(),
        }
    }

    /// Full only applies to bounded pools; a `max_queue_size` of 0 never fills.
    fn is_full(&self, state: &QueueState) -> bool {
        self.max_queue_size > 0 && state.tasks.len() >= self.max_queue_size
    }

    pub(crate) fn set_running(&self, running: bool) {
        let mut guard = self.lock();
        guard.running = running;
        drop(guard);

        if !running {
            // every parked worker must see the flag, not just one
            self.not_empty.notify_all();
        }
    }

    pub(crate) fn is_running(&self) -> bool {
        self.lock().running
    }

    pub(crate) fn queue_size(&self) -> usize {
        self.lock().tasks.len()
    }

    /// Appends `task` at the tail, blocking while a bounded queue is full.
    pub(crate) fn submit(&self, task: Task) {
        let mut guard = self.lock();

        while self.is_full(&guard) {
            guard = match self.not_full.wait(guard) {
                Ok(g) => g,
                Err(e) => e.into_inner(),
            };
        }

        debug_assert!(!self.is_full(&guard));
        guard.tasks.push_back(task);

        drop(guard);
        self.not_empty.notify_one();
    }

    /// Dequeues the head task, blocking while the queue is empty and the pool runs.
    ///
    /// Yields [`Task::empty`] only once the pool has stopped and the queue is drained.
    fn take(&self) -> Task {
        let mut guard = self.lock();

        while guard.tasks.is_empty() && guard.running {
            guard = match self.not_empty.wait(guard) {
                Ok(g) => g,
                Err(e) => e.into_inner(),
            };
        }

        let Some(task) = guard.tasks.pop_front() else {
            return Task::empty();
        };

        drop(guard);
        if self.max_queue_size > 0 {
            self.not_full.notify_one();
        }

        task
    }

    /// Body of every worker thread.
    pub(crate) fn run_worker(&self) {
        let span = tracing::trace_span!("WorkerPool::worker", pool = %self.name);
        let _enter = span.enter();

        let _live = RunOnDrop::new(|| {
            self.live_workers.fetch_sub(1, Ordering::SeqCst);
        });

        tracing::debug!("worker started");

        if let Some(hook) = &self.init_hook {
            self.guarded(|| hook());
        }

        loop {
            let task = self.take();
            if task.is_empty() {
                break;
            }
            self.guarded(|| task.run());
        }

        tracing::debug!("worker stopped");
    }

    fn guarded<F: FnOnce()>(&self, f: F) {
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(f)) {
            failures::escalate(
                &self.name,
                self.failure_policy,
                self.failure_handler.as_ref(),
                TaskPanic::classify(payload),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_take_yields_empty_once_stopped_and_drained() {
        let shared = Shared::new(String::from("drain"));
        shared.set_running(true);
        shared.submit(Task::new(|| {}));

        shared.set_running(false);
        assert!(!shared.take().is_empty(), "queued work survives stop");
        assert!(shared.take().is_empty());
    }

    #[test]
    fn test_bounded_full_predicate() {
        let mut shared = Shared::new(String::from("bounded"));
        shared.max_queue_size = 1;
        shared.set_running(true);

        shared.submit(Task::new(|| {}));
        assert!(shared.is_full(&shared.lock()));

        let _ = shared.take();
        assert!(!shared.is_full(&shared.lock()));
    }

    #[test]
    fn test_unbounded_never_full() {
        let shared = Shared::new(String::from("unbounded"));
        shared.set_running(true);
        for _ in 0..1000 {
            shared.submit(Task::new(|| {}));
        }
        assert_eq!(shared.queue_size(), 1000);
        assert!(!shared.is_full(&shared.lock()));
    }

    #[test]
    #[ntest::timeout(5000)]
    fn test_stop_wakes_parked_take() {
        let shared = Arc::new(Shared::new(String::from("wake")));
        shared.set_running(true);

        let taker = {
            let shared = Arc::clone(&shared);
            thread::spawn(move || shared.take().is_empty())
        };

        thread::sleep(Duration::from_millis(50));
        shared.set_running(false);

        assert!(taker.join().unwrap());
    }
}
