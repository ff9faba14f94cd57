//! Fixed-capacity blocking FIFO queue.

use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex, MutexGuard};

/// A thread-safe FIFO buffer with a fixed capacity.
///
/// [`BoundedQueue::put`] blocks while the queue is full and
/// [`BoundedQueue::take`] blocks while it is empty. Both re-check their
/// predicate in a loop after every wake-up so spurious wake-ups and
/// competing waiters are tolerated.
///
/// Cloning a `BoundedQueue` hands out another handle to the same buffer.
///
/// # Examples
///
/// ```
/// use foundation_sync::BoundedQueue;
/// use std::thread;
///
/// let queue = BoundedQueue::new(2);
///
/// let producer_queue = queue.clone();
/// let producer = thread::spawn(move || {
///     for i in 0..5 {
///         producer_queue.put(i);
///     }
/// });
///
/// let taken: Vec<i32> = (0..5).map(|_| queue.take()).collect();
/// producer.join().unwrap();
///
/// assert_eq!(taken, vec![0, 1, 2, 3, 4]);
/// ```
pub struct BoundedQueue<T> {
    inner: Arc<Inner<T>>,
}

struct Inner<T> {
    items: Mutex<VecDeque<T>>,
    not_empty: Condvar,
    not_full: Condvar,
    capacity: usize,
}

impl<T> BoundedQueue<T> {
    /// Creates a queue holding at most `capacity` items.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is 0.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "BoundedQueue capacity must be > 0");

        Self {
            inner: Arc::new(Inner {
                items: Mutex::new(VecDeque::with_capacity(capacity)),
                not_empty: Condvar::new(),
                not_full: Condvar::new(),
                capacity,
            }),
        }
    }

    /// Appends `value` at the tail, blocking while the queue is full.
    pub fn put(&self, value: T) {
        let mut guard = self.lock();

        while guard.len() == self.inner.capacity {
            guard = match self.inner.not_full.wait(guard) {
                Ok(g) => g,
                Err(e) => e.into_inner(),
            };
        }

        debug_assert!(guard.len() < self.inner.capacity);
        guard.push_back(value);

        drop(guard);
        self.inner.not_empty.notify_one();
    }

    /// Removes and returns the head item, blocking while the queue is empty.
    pub fn take(&self) -> T {
        let mut guard = self.lock();

        while guard.is_empty() {
            guard = match self.inner.not_empty.wait(guard) {
                Ok(g) => g,
                Err(e) => e.into_inner(),
            };
        }

        let Some(item) = guard.pop_front() else {
            unreachable!("queue observed non-empty under the lock");
        };

        drop(guard);
        self.inner.not_full.notify_one();

        item
    }

    /// Returns true if the queue held no items when observed.
    ///
    /// The answer may be stale as soon as it is returned.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Returns true if the queue was at capacity when observed.
    ///
    /// The answer may be stale as soon as it is returned.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.lock().len() == self.inner.capacity
    }

    /// Returns the number of queued items when observed.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns the fixed capacity of the queue.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<T>> {
        match self.inner.items.lock() {
            Ok(g) => g,
            Err(e) => e.into_inner(),
        }
    }
}

impl<T> Clone for BoundedQueue<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> core::fmt::Debug for BoundedQueue<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundedQueue")
            .field("len", &self.len())
            .field("capacity", &self.inner.capacity)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_put_take_is_fifo() {
        let queue = BoundedQueue::new(4);
        queue.put("a");
        queue.put("b");
        queue.put("c");

        assert_eq!(queue.len(), 3);
        assert_eq!(queue.take(), "a");
        assert_eq!(queue.take(), "b");
        assert_eq!(queue.take(), "c");
        assert!(queue.is_empty());
    }

    #[test]
    fn test_full_and_capacity() {
        let queue = BoundedQueue::new(2);
        assert_eq!(queue.capacity(), 2);
        assert!(!queue.is_full());

        queue.put(1);
        queue.put(2);
        assert!(queue.is_full());

        let _ = queue.take();
        assert!(!queue.is_full());
    }

    #[test]
    #[should_panic(expected = "capacity must be > 0")]
    fn test_zero_capacity_panics() {
        let _ = BoundedQueue::<u8>::new(0);
    }

    #[test]
    #[ntest::timeout(5000)]
    fn test_put_blocks_until_take() {
        let queue = BoundedQueue::new(1);
        queue.put(1);

        let put_done = Arc::new(AtomicBool::new(false));
        let producer = {
            let queue = queue.clone();
            let put_done = Arc::clone(&put_done);
            thread::spawn(move || {
                queue.put(2);
                put_done.store(true, Ordering::Release);
            })
        };

        thread::sleep(Duration::from_millis(50));
        assert!(!put_done.load(Ordering::Acquire), "put must block on a full queue");

        assert_eq!(queue.take(), 1);
        producer.join().unwrap();

        assert!(put_done.load(Ordering::Acquire));
        assert_eq!(queue.take(), 2);
    }

    #[test]
    #[ntest::timeout(5000)]
    fn test_take_blocks_until_put() {
        let queue = BoundedQueue::new(1);

        let consumer = {
            let queue = queue.clone();
            thread::spawn(move || queue.take())
        };

        thread::sleep(Duration::from_millis(50));
        assert!(!consumer.is_finished(), "take must block on an empty queue");

        queue.put(7_u32);
        assert_eq!(consumer.join().unwrap(), 7);
    }
}
