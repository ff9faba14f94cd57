//! Lazily constructed process-wide and per-thread instances.

use std::cell::OnceCell;
use std::sync::OnceLock;
use std::thread::LocalKey;

/// A process-wide instance built on first use.
///
/// Concurrent first callers race on construction but `init` runs exactly
/// once; the losers block until the winner finishes. The instance is never
/// dropped.
///
/// ```
/// use foundation_sync::Singleton;
///
/// static REGISTRY: Singleton<Vec<&'static str>> = Singleton::new(|| vec!["default"]);
///
/// assert!(REGISTRY.get().is_none());
/// assert_eq!(REGISTRY.instance()[0], "default");
/// assert!(REGISTRY.get().is_some());
/// ```
pub struct Singleton<T> {
    cell: OnceLock<T>,
    init: fn() -> T,
}

impl<T> Singleton<T> {
    pub const fn new(init: fn() -> T) -> Self {
        Self {
            cell: OnceLock::new(),
            init,
        }
    }

    /// Returns the instance, constructing it if needed.
    pub fn instance(&self) -> &T {
        self.cell.get_or_init(self.init)
    }

    /// Returns the instance only if it has been constructed.
    pub fn get(&self) -> Option<&T> {
        self.cell.get()
    }
}

impl<T: core::fmt::Debug> core::fmt::Debug for Singleton<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Singleton").field(&self.cell.get()).finish()
    }
}

/// A per-thread instance over a `thread_local!` slot.
///
/// Each thread builds its own value on first access; thread-local teardown
/// drops it when the thread exits.
///
/// ```
/// use foundation_sync::ThreadLocalSingleton;
/// use std::cell::{Cell, OnceCell};
///
/// thread_local! {
///     static SLOT: OnceCell<Cell<u32>> = const { OnceCell::new() };
/// }
/// static COUNTER: ThreadLocalSingleton<Cell<u32>> =
///     ThreadLocalSingleton::new(&SLOT, || Cell::new(0));
///
/// COUNTER.with(|c| c.set(c.get() + 1));
/// assert_eq!(COUNTER.with(Cell::get), 1);
///
/// std::thread::spawn(|| assert!(!COUNTER.is_initialized())).join().unwrap();
/// ```
pub struct ThreadLocalSingleton<T: 'static> {
    slot: &'static LocalKey<OnceCell<T>>,
    init: fn() -> T,
}

impl<T: 'static> ThreadLocalSingleton<T> {
    pub const fn new(slot: &'static LocalKey<OnceCell<T>>, init: fn() -> T) -> Self {
        Self { slot, init }
    }

    /// Runs `f` with this thread's instance, constructing it if needed.
    pub fn with<R, F>(&self, f: F) -> R
    where
        F: FnOnce(&T) -> R,
    {
        self.slot.with(|cell| f(cell.get_or_init(self.init)))
    }

    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.slot.with(|cell| cell.get().is_some())
    }
}

impl<T: 'static> core::fmt::Debug for ThreadLocalSingleton<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadLocalSingleton")
            .field("initialized", &self.is_initialized())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::thread;

    use crate::CountDownLatch;

    static CONSTRUCTIONS: AtomicUsize = AtomicUsize::new(0);

    fn build_counted() -> String {
        CONSTRUCTIONS.fetch_add(1, Ordering::SeqCst);
        String::from("shared")
    }

    static RACED: Singleton<String> = Singleton::new(build_counted);

    #[test]
    fn test_singleton_constructed_once_under_race() {
        let gate = CountDownLatch::new(1);
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let gate = gate.clone();
                thread::spawn(move || {
                    gate.wait();
                    std::ptr::from_ref(RACED.instance()) as usize
                })
            })
            .collect();

        gate.count_down();
        let addresses: Vec<usize> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(CONSTRUCTIONS.load(Ordering::SeqCst), 1);
        assert!(addresses.windows(2).all(|pair| pair[0] == pair[1]));
        assert_eq!(RACED.get().map(String::as_str), Some("shared"));
    }

    thread_local! {
        static EVENTS: OnceCell<RefCell<Vec<u32>>> = const { OnceCell::new() };
    }
    static PER_THREAD: ThreadLocalSingleton<RefCell<Vec<u32>>> =
        ThreadLocalSingleton::new(&EVENTS, || RefCell::new(Vec::new()));

    #[test]
    fn test_thread_local_singleton_is_per_thread() {
        assert!(!PER_THREAD.is_initialized());
        PER_THREAD.with(|events| events.borrow_mut().push(1));
        PER_THREAD.with(|events| events.borrow_mut().push(2));
        assert!(PER_THREAD.is_initialized());

        let other = Arc::new(AtomicUsize::new(usize::MAX));
        let other_clone = Arc::clone(&other);
        thread::spawn(move || {
            let len = PER_THREAD.with(|events| events.borrow().len());
            other_clone.store(len, Ordering::SeqCst);
        })
        .join()
        .unwrap();

        assert_eq!(other.load(Ordering::SeqCst), 0);
        assert_eq!(PER_THREAD.with(|events| events.borrow().clone()), vec![1, 2]);
    }

    static DROPS: AtomicUsize = AtomicUsize::new(0);

    struct CountsDrops;

    impl Drop for CountsDrops {
        fn drop(&mut self) {
            DROPS.fetch_add(1, Ordering::SeqCst);
        }
    }

    thread_local! {
        static DROP_SLOT: OnceCell<CountsDrops> = const { OnceCell::new() };
    }
    static DROPPED_ON_EXIT: ThreadLocalSingleton<CountsDrops> =
        ThreadLocalSingleton::new(&DROP_SLOT, || CountsDrops);

    #[test]
    fn test_thread_local_singleton_dropped_when_thread_exits() {
        thread::spawn(|| {
            DROPPED_ON_EXIT.with(|_| ());
            DROPPED_ON_EXIT.with(|_| ());
            assert_eq!(DROPS.load(Ordering::SeqCst), 0);
        })
        .join()
        .unwrap();

        assert_eq!(DROPS.load(Ordering::SeqCst), 1);
    }
}
