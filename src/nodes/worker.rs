//! # Worker specification.
//!
//! [`WorkerSpec`] describes a leaf of the tree: the [`Task`](crate::Task) to
//! run, its [`RestartPolicy`], and an optional [`BackoffPolicy`] applied
//! before restarted runs. The worker id is the task name.
//!
//! A spec can be created:
//! - **Explicitly** with [`WorkerSpec::new`]
//! - **From config** with [`WorkerSpec::with_defaults`]
//! - **Fluently** with [`WorkerSpec::builder`]

use std::borrow::Cow;
use std::future::Future;

use tokio_util::sync::CancellationToken;

use crate::core::Config;
use crate::error::TaskError;
use crate::nodes::task::TaskRef;
use crate::nodes::task_fn::TaskFn;
use crate::policies::{BackoffPolicy, RestartPolicy};

/// Immutable description of a worker node.
///
/// ## Example
/// ```rust
/// use tokio_util::sync::CancellationToken;
/// use treevisor::{RestartPolicy, TaskError, TaskFn, TaskRef, WorkerSpec};
///
/// let task: TaskRef = TaskFn::arc("ingest", |ctx: CancellationToken| async move {
///     ctx.cancelled().await;
///     Ok::<(), TaskError>(())
/// });
/// let spec = WorkerSpec::new(task, RestartPolicy::Transient);
/// assert_eq!(spec.id(), "ingest");
/// ```
#[derive(Clone)]
pub struct WorkerSpec {
    task: TaskRef,
    restart: RestartPolicy,
    backoff: Option<BackoffPolicy>,
}

impl WorkerSpec {
    /// Creates a worker spec with no restart delay.
    pub fn new(task: TaskRef, restart: RestartPolicy) -> Self {
        Self {
            task,
            restart,
            backoff: None,
        }
    }

    /// Creates a worker spec inheriting restart policy and delay from `cfg`.
    pub fn with_defaults(task: TaskRef, cfg: &Config) -> Self {
        Self {
            task,
            restart: cfg.restart,
            backoff: cfg.restart_delay(),
        }
    }

    /// Starts a fluent builder for a worker with the given id.
    pub fn builder(id: impl Into<Cow<'static, str>>) -> WorkerSpecBuilder {
        WorkerSpecBuilder::new(id)
    }

    /// Worker id (the task name).
    pub fn id(&self) -> &str {
        self.task.name()
    }

    /// Returns the task.
    pub fn task(&self) -> &TaskRef {
        &self.task
    }

    /// Returns the restart policy.
    pub fn restart(&self) -> RestartPolicy {
        self.restart
    }

    /// Returns the restart delay policy, if any.
    pub fn backoff(&self) -> Option<BackoffPolicy> {
        self.backoff
    }

    /// Returns a new spec with updated restart policy.
    pub fn with_restart(mut self, restart: RestartPolicy) -> Self {
        self.restart = restart;
        self
    }

    /// Returns a new spec with a restart delay.
    pub fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = Some(backoff);
        self
    }
}

impl std::fmt::Debug for WorkerSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerSpec")
            .field("id", &self.id())
            .field("restart", &self.restart)
            .field("backoff", &self.backoff)
            .finish()
    }
}

/// Builder for [`WorkerSpec`] with fluent API.
#[derive(Clone)]
pub struct WorkerSpecBuilder {
    id: Cow<'static, str>,
    restart: RestartPolicy,
    backoff: Option<BackoffPolicy>,
}

impl WorkerSpecBuilder {
    /// Creates a builder with `Permanent` restart and no delay.
    pub fn new(id: impl Into<Cow<'static, str>>) -> Self {
        Self {
            id: id.into(),
            restart: RestartPolicy::default(),
            backoff: None,
        }
    }

    /// Sets the restart policy.
    pub fn with_restart(mut self, restart: RestartPolicy) -> Self {
        self.restart = restart;
        self
    }

    /// Sets a restart delay.
    pub fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = Some(backoff);
        self
    }

    /// Builds the spec from a closure.
    pub fn build<F, Fut>(self, f: F) -> WorkerSpec
    where
        F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), TaskError>> + Send + 'static,
    {
        WorkerSpec {
            task: TaskFn::arc(self.id, f),
            restart: self.restart,
            backoff: self.backoff,
        }
    }

    /// Builds the spec around an existing task, ignoring the builder id.
    pub fn build_from_task(self, task: TaskRef) -> WorkerSpec {
        WorkerSpec {
            task,
            restart: self.restart,
            backoff: self.backoff,
        }
    }
}
