//! One-shot countdown barrier.

use std::sync::{Arc, Condvar, Mutex, MutexGuard};

/// A single-use barrier that opens permanently once its counter reaches zero.
///
/// Any number of threads may call [`CountDownLatch::count_down`]; every thread
/// blocked in [`CountDownLatch::wait`] is released when the count first hits
/// zero. Once open the latch stays open, further `count_down` calls are no-ops
/// and later `wait` calls return immediately.
///
/// Cloning a `CountDownLatch` hands out another handle to the same counter.
///
/// # Examples
///
/// ```
/// use foundation_sync::CountDownLatch;
/// use std::thread;
///
/// let latch = CountDownLatch::new(3);
///
/// for _ in 0..3 {
///     let latch = latch.clone();
///     thread::spawn(move || latch.count_down());
/// }
///
/// latch.wait();
/// assert_eq!(latch.count(), 0);
/// ```
pub struct CountDownLatch {
    inner: Arc<Inner>,
}

struct Inner {
    count: Mutex<usize>,
    opened: Condvar,
}

impl CountDownLatch {
    /// Creates a latch that opens after `count` calls to `count_down`.
    ///
    /// A latch created with a count of 0 is already open.
    #[must_use]
    pub fn new(count: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                count: Mutex::new(count),
                opened: Condvar::new(),
            }),
        }
    }

    /// Blocks the current thread until the count reaches zero.
    pub fn wait(&self) {
        let mut guard = self.lock();
        while *guard > 0 {
            guard = match self.inner.opened.wait(guard) {
                Ok(g) => g,
                Err(e) => e.into_inner(),
            };
        }
    }

    /// Decrements the count, releasing all waiters when it reaches zero.
    ///
    /// Has no effect once the latch is open.
    pub fn count_down(&self) {
        let mut guard = self.lock();
        if *guard == 0 {
            return;
        }

        *guard -= 1;
        if *guard == 0 {
            drop(guard);
            tracing::debug!("CountDownLatch opened");
            self.inner.opened.notify_all();
        }
    }

    /// Returns the remaining count when observed.
    #[must_use]
    pub fn count(&self) -> usize {
        *self.lock()
    }

    fn lock(&self) -> MutexGuard<'_, usize> {
        match self.inner.count.lock() {
            Ok(g) => g,
            Err(e) => e.into_inner(),
        }
    }
}

impl Clone for CountDownLatch {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl core::fmt::Debug for CountDownLatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CountDownLatch")
            .field("count", &self.count())
            .finish()
    }
}
