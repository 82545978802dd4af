//! Error types used by the treevisor runtime and by worker functions.
//!
//! This module defines two main error enums:
//!
//! - [`RuntimeError`]: failures of the supervision tree itself (resource
//!   acquisition, restart tolerance, start aborts, ...).
//! - [`TaskError`]: failures returned by (or observed on) a single worker run.
//!
//! Both types provide [`as_label`](RuntimeError::as_label) for logs/metrics.
//! Errors that escalate keep their cause as a boxed `source`, so the full
//! escalation chain can be walked with [`std::error::Error::source`] or
//! [`RuntimeError::origin`].

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

/// Boxed error returned by user callbacks (child-set builders and cleanups).
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// # Errors produced by the supervision tree.
///
/// Every variant carries the `path` of the node that raised it
/// (slash-joined ancestor ids, e.g. `root/pipeline/producer`).
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// The child-set builder of a supervisor failed; no child was started.
    #[error("{path}: resource acquisition failed: {error}")]
    ResourceAcquisition {
        /// Supervisor whose builder failed.
        path: Arc<str>,
        /// Error returned by the builder.
        #[source]
        error: BoxError,
    },

    /// A worker function returned an error or terminated abnormally.
    #[error("{path}: worker failed")]
    WorkerFailure {
        /// Worker path.
        path: Arc<str>,
        /// What the worker run produced.
        #[source]
        source: TaskError,
    },

    /// A permanent child returned without error, which still counts as a failure.
    #[error("{path}: exited unexpectedly")]
    UnexpectedExit {
        /// Child path.
        path: Arc<str>,
    },

    /// A cleanup callback failed; shutdown still completed.
    #[error("{path}: resource cleanup failed: {error}")]
    ResourceCleanup {
        /// Supervisor whose cleanup failed.
        path: Arc<str>,
        /// Error returned by the cleanup.
        #[source]
        error: BoxError,
    },

    /// More than `intensity` restarts happened within `period`.
    #[error("{path}: restart tolerance exceeded ({intensity} restarts in {period:?})")]
    ToleranceExceeded {
        /// Supervisor that gave up.
        path: Arc<str>,
        /// Configured restart intensity.
        intensity: u32,
        /// Configured restart period.
        period: Duration,
        /// The child failure that tripped the window.
        #[source]
        source: Box<RuntimeError>,
    },

    /// A child could not be started, so the supervisor aborted its own start.
    #[error("{path}: supervisor failed to start")]
    StartFailed {
        /// Supervisor that aborted.
        path: Arc<str>,
        /// The child start error.
        #[source]
        source: Box<RuntimeError>,
    },

    /// Two siblings share the same id.
    #[error("{path}: duplicate child id {id:?}")]
    DuplicateChild {
        /// Supervisor whose child set is invalid.
        path: Arc<str>,
        /// The repeated id.
        id: String,
    },

    /// A supervisor monitoring loop panicked.
    #[error("{path}: supervisor panicked: {info}")]
    Panicked {
        /// Supervisor path.
        path: Arc<str>,
        /// Panic payload, if it was a string.
        info: String,
    },
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use treevisor::RuntimeError;
    ///
    /// let err = RuntimeError::UnexpectedExit { path: "root/worker".into() };
    /// assert_eq!(err.as_label(), "runtime_unexpected_exit");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::ResourceAcquisition { .. } => "runtime_resource_acquisition",
            RuntimeError::WorkerFailure { .. } => "runtime_worker_failure",
            RuntimeError::UnexpectedExit { .. } => "runtime_unexpected_exit",
            RuntimeError::ResourceCleanup { .. } => "runtime_resource_cleanup",
            RuntimeError::ToleranceExceeded { .. } => "runtime_tolerance_exceeded",
            RuntimeError::StartFailed { .. } => "runtime_start_failed",
            RuntimeError::DuplicateChild { .. } => "runtime_duplicate_child",
            RuntimeError::Panicked { .. } => "runtime_panicked",
        }
    }

    /// Path of the node that raised this error.
    pub fn path(&self) -> &str {
        match self {
            RuntimeError::ResourceAcquisition { path, .. }
            | RuntimeError::WorkerFailure { path, .. }
            | RuntimeError::UnexpectedExit { path }
            | RuntimeError::ResourceCleanup { path, .. }
            | RuntimeError::ToleranceExceeded { path, .. }
            | RuntimeError::StartFailed { path, .. }
            | RuntimeError::DuplicateChild { path, .. }
            | RuntimeError::Panicked { path, .. } => path,
        }
    }

    /// Follows escalation links down to the deepest runtime error.
    ///
    /// For a root failure caused by a subtree giving up, this returns the
    /// subtree's [`RuntimeError::ToleranceExceeded`] or whatever lies below it.
    ///
    /// # Example
    /// ```
    /// use std::time::Duration;
    /// use treevisor::RuntimeError;
    ///
    /// let inner = RuntimeError::UnexpectedExit { path: "root/a/w".into() };
    /// let err = RuntimeError::ToleranceExceeded {
    ///     path: "root/a".into(),
    ///     intensity: 1,
    ///     period: Duration::from_secs(5),
    ///     source: Box::new(inner),
    /// };
    /// assert_eq!(err.origin().path(), "root/a/w");
    /// ```
    pub fn origin(&self) -> &RuntimeError {
        let mut current = self;
        while let RuntimeError::ToleranceExceeded { source, .. }
        | RuntimeError::StartFailed { source, .. } = current
        {
            current = &**source;
        }
        current
    }

    /// Innermost supervisor that escalated with [`RuntimeError::ToleranceExceeded`].
    pub fn exhausted_supervisor(&self) -> Option<&str> {
        let mut found = None;
        let mut current = self;
        loop {
            match current {
                RuntimeError::ToleranceExceeded { path, source, .. } => {
                    found = Some(&**path);
                    current = &**source;
                }
                RuntimeError::StartFailed { source, .. } => current = &**source,
                _ => return found,
            }
        }
    }
}

/// # Errors produced by a single worker run.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum TaskError {
    /// Worker function failed.
    #[error("execution failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// Worker observed its cancellation token and gave up; treated as a clean exit.
    #[error("context cancelled")]
    Canceled,

    /// Worker task panicked or was aborted.
    #[error("worker panicked: {info}")]
    Panicked {
        /// Panic payload, if it was a string.
        info: String,
    },
}

impl TaskError {
    /// Convenience constructor for [`TaskError::Fail`].
    pub fn fail(error: impl ToString) -> Self {
        TaskError::Fail {
            error: error.to_string(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use treevisor::TaskError;
    ///
    /// assert_eq!(TaskError::fail("boom").as_label(), "task_failed");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            TaskError::Fail { .. } => "task_failed",
            TaskError::Canceled => "task_canceled",
            TaskError::Panicked { .. } => "task_panicked",
        }
    }
}

/// Extracts a readable message from a panic payload.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
