//! What a worker does when a task panics.
//!
//! A caught panic is classified by [`TaskPanic::classify`] into a
//! [`FailureKind`]; the pool's [`FailurePolicy`] then picks a
//! [`FailureAction`] for that kind. The default policy keeps the historic
//! asymmetry of this pool:
//!
//! | Kind | Action |
//! |---|---|
//! | Recognized (`TaskError`, string messages) | [`FailureAction::Abort`] |
//! | Unrecognized (any other payload) | [`FailureAction::ExitWorker`] |
//!
//! `ExitWorker` silently shrinks the pool by one worker; callers relying on
//! it should watch [`crate::WorkerPool::live_workers`].

use std::sync::Arc;

use crate::drops::AbortIfPanic;
use crate::task::{FailureKind, TaskPanic};

/// Action applied after a task failure has been logged and reported.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailureAction {
    /// Terminate the whole process.
    Abort,

    /// Re-raise the failure so only the current worker thread terminates.
    ExitWorker,
}

/// Maps each [`FailureKind`] to a [`FailureAction`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FailurePolicy {
    recognized: FailureAction,
    unrecognized: FailureAction,
}

impl FailurePolicy {
    #[must_use]
    pub const fn new(recognized: FailureAction, unrecognized: FailureAction) -> Self {
        Self {
            recognized,
            unrecognized,
        }
    }

    /// Every task failure terminates the process.
    #[must_use]
    pub const fn uniformly_fatal() -> Self {
        Self::new(FailureAction::Abort, FailureAction::Abort)
    }

    /// Every task failure terminates only the worker that ran the task.
    #[must_use]
    pub const fn worker_exit() -> Self {
        Self::new(FailureAction::ExitWorker, FailureAction::ExitWorker)
    }

    #[must_use]
    pub const fn action_for(&self, kind: FailureKind) -> FailureAction {
        match kind {
            FailureKind::Recognized => self.recognized,
            FailureKind::Unrecognized => self.unrecognized,
        }
    }
}

impl Default for FailurePolicy {
    fn default() -> Self {
        Self::new(FailureAction::Abort, FailureAction::ExitWorker)
    }
}

/// Everything known about a task failure when it is reported.
#[derive(Debug)]
pub struct FailureReport<'a> {
    pub pool: &'a str,
    pub worker: &'a str,
    pub failure: &'a TaskPanic,
    pub action: FailureAction,
}

impl FailureReport<'_> {
    #[must_use]
    pub fn kind(&self) -> FailureKind {
        self.failure.kind()
    }
}

/// Callback invoked with every [`FailureReport`] before its action is applied.
pub type FailureHandler = Arc<dyn Fn(&FailureReport<'_>) + Send + Sync + 'static>;

/// Logs `failure`, hands it to `handler` and applies the policy's action.
///
/// Never returns: the process aborts or the current thread resumes unwinding.
pub(crate) fn escalate(
    pool: &str,
    policy: FailurePolicy,
    handler: Option<&FailureHandler>,
    failure: TaskPanic,
) -> ! {
    let current = std::thread::current();
    let worker = current.name().unwrap_or("<unnamed>");
    let action = policy.action_for(failure.kind());

    match &failure {
        TaskPanic::Recognized(err) => {
            tracing::error!(
                pool = %pool,
                worker = %worker,
                kind = ?failure.kind(),
                action = ?action,
                reason = %err,
                stack_trace = %err.backtrace(),
                "exception caught in worker pool"
            );
        }
        TaskPanic::Unrecognized(_) => {
            tracing::error!(
                pool = %pool,
                worker = %worker,
                kind = ?failure.kind(),
                action = ?action,
                "unknown exception caught in worker pool"
            );
        }
    }

    // A panicking handler must not turn an abort into a worker exit.
    let _fatal = (action == FailureAction::Abort).then_some(AbortIfPanic);

    if let Some(handler) = handler {
        handler(&FailureReport {
            pool,
            worker,
            failure: &failure,
            action,
        });
    }

    match action {
        FailureAction::Abort => std::process::abort(),
        FailureAction::ExitWorker => failure.resume(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy_is_asymmetric() {
        let policy = FailurePolicy::default();
        assert_eq!(
            policy.action_for(FailureKind::Recognized),
            FailureAction::Abort
        );
        assert_eq!(
            policy.action_for(FailureKind::Unrecognized),
            FailureAction::ExitWorker
        );
    }

    #[test]
    fn test_uniform_policies() {
        let fatal = FailurePolicy::uniformly_fatal();
        assert_eq!(fatal.action_for(FailureKind::Unrecognized), FailureAction::Abort);

        let exit = FailurePolicy::worker_exit();
        assert_eq!(exit.action_for(FailureKind::Recognized), FailureAction::ExitWorker);
    }
}
