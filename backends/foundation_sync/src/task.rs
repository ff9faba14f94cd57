//! Units of deferred work and the failures they can raise.

use std::any::Any;
use std::backtrace::Backtrace;
use std::panic;

pub(crate) type Job = Box<dyn FnOnce() + Send + 'static>;

/// A zero-argument, fire-and-forget unit of work.
///
/// A `Task` may be empty. The worker pool hands an empty task to a worker
/// whose wait ended because the pool stopped with nothing left to drain.
#[derive(Default)]
pub struct Task(Option<Job>);

impl Task {
    /// Wraps `f` into a task.
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self(Some(Box::new(f)))
    }

    /// Returns a task carrying no work.
    #[must_use]
    pub const fn empty() -> Self {
        Self(None)
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_none()
    }

    /// Runs the task on the current thread. Running an empty task does nothing.
    pub fn run(self) {
        if let Some(job) = self.0 {
            job();
        }
    }
}

impl core::fmt::Debug for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_empty() {
            write!(f, "Task(<empty>)")
        } else {
            write!(f, "Task(<job>)")
        }
    }
}

/// A structured application failure raised from inside a task.
///
/// Raising a `TaskError` (see [`TaskError::raise`]) marks the failure as
/// recognized: the pool logs the message, its context and the backtrace
/// captured at construction before applying its failure policy.
#[derive(Debug)]
pub struct TaskError {
    message: String,
    context: Vec<(String, String)>,
    backtrace: String,
}

impl TaskError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            context: Vec::new(),
            backtrace: Backtrace::capture().to_string(),
        }
    }

    /// Builds a `TaskError` from `err`, flattening its source chain into the message.
    pub fn from_error<E>(err: &E) -> Self
    where
        E: std::error::Error + ?Sized,
    {
        let mut message = err.to_string();
        let mut source = err.source();
        while let Some(cause) = source {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            source = cause.source();
        }
        Self::new(message)
    }

    /// Attaches a diagnostic key/value pair.
    #[must_use]
    pub fn with_context(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.context.push((key.into(), value.to_string()));
        self
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    #[must_use]
    pub fn context(&self) -> &[(String, String)] {
        &self.context
    }

    /// The backtrace captured when the error was built.
    ///
    /// Reports "disabled backtrace" unless `RUST_BACKTRACE` or
    /// `RUST_LIB_BACKTRACE` enables capturing.
    #[must_use]
    pub fn backtrace(&self) -> &str {
        &self.backtrace
    }

    /// Unwinds the current thread carrying this error as the panic payload.
    pub fn raise(self) -> ! {
        panic::panic_any(self)
    }
}

impl std::error::Error for TaskError {}

impl core::fmt::Display for TaskError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)?;
        for (key, value) in &self.context {
            write!(f, " {key}={value}")?;
        }
        Ok(())
    }
}

/// Classification of a panic caught while running a task.
pub enum TaskPanic {
    /// A [`TaskError`] or a plain string panic message.
    Recognized(TaskError),

    /// Any other panic payload, kept intact so it can be re-raised.
    Unrecognized(Box<dyn Any + Send>),
}

/// Discriminator for [`TaskPanic`] used by [`crate::FailurePolicy`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailureKind {
    Recognized,
    Unrecognized,
}

impl TaskPanic {
    /// Sorts a caught panic payload into recognized and unrecognized failures.
    #[must_use]
    pub fn classify(payload: Box<dyn Any + Send>) -> Self {
        let payload = match payload.downcast::<TaskError>() {
            Ok(err) => return Self::Recognized(*err),
            Err(other) => other,
        };

        let payload = match payload.downcast::<&'static str>() {
            Ok(msg) => return Self::Recognized(TaskError::new(*msg)),
            Err(other) => other,
        };

        match payload.downcast::<String>() {
            Ok(msg) => Self::Recognized(TaskError::new(*msg)),
            Err(other) => Self::Unrecognized(other),
        }
    }

    #[must_use]
    pub const fn kind(&self) -> FailureKind {
        match self {
            Self::Recognized(_) => FailureKind::Recognized,
            Self::Unrecognized(_) => FailureKind::Unrecognized,
        }
    }

    /// A human readable description of the failure.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Recognized(err) => err.to_string(),
            Self::Unrecognized(_) => String::from("unknown panic payload"),
        }
    }

    /// Continues unwinding the current thread with this failure.
    pub fn resume(self) -> ! {
        match self {
            Self::Recognized(err) => panic::resume_unwind(Box::new(err)),
            Self::Unrecognized(payload) => panic::resume_unwind(payload),
        }
    }
}

impl core::fmt::Debug for TaskPanic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Recognized(err) => write!(f, "TaskPanic::Recognized({err:?})"),
            Self::Unrecognized(_) => write!(f, "TaskPanic::Unrecognized(_)"),
        }
    }
}
