/// `RunOnDrop` runs a function when it gets dropped, including while the
/// owning thread unwinds, providing a similar convention to go's defer.
pub(crate) struct RunOnDrop<F: FnOnce()>(Option<F>);

impl<F: FnOnce()> RunOnDrop<F> {
    pub(crate) fn new(f: F) -> Self {
        Self(Some(f))
    }
}

impl<F: FnOnce()> Drop for RunOnDrop<F> {
    fn drop(&mut self) {
        if let Some(cb) = self.0.take() {
            cb();
        }
    }
}

/// `AbortIfPanic` aborts the process if it is dropped while its thread
/// unwinds. Code that finishes normally lets it drop silently.
pub(crate) struct AbortIfPanic;

impl Drop for AbortIfPanic {
    fn drop(&mut self) {
        if std::thread::panicking() {
            tracing::error!("detected panic while a fatal failure was being reported; aborting");
            std::process::abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_runs_during_unwind() {
        let hits = AtomicUsize::new(0);

        let result = std::panic::catch_unwind(|| {
            let _guard = RunOnDrop::new(|| {
                hits.fetch_add(1, Ordering::SeqCst);
            });
            panic!("unwinding");
        });

        assert!(result.is_err());
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_abort_guard_is_silent_without_panic() {
        let guard = AbortIfPanic;
        drop(guard);
    }
}
