//! # Worker function abstraction.
//!
//! A [`Task`] is the work a worker node runs: it has a stable name (the
//! worker's id among its siblings) and an async [`run`](Task::run) that
//! receives a [`CancellationToken`]. Every (re)start of the worker calls `run`
//! again on the same task value.
//!
//! Tasks must honor cancellation: the supervisor stops a worker by cancelling
//! its token and then **waits** for `run` to return. A task that ignores the
//! token blocks its supervisor's shutdown.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::TaskError;

/// Shared handle to a task.
pub type TaskRef = Arc<dyn Task>;

/// # Asynchronous, cancelable unit of work.
///
/// # Example
/// ```
/// use tokio_util::sync::CancellationToken;
/// use async_trait::async_trait;
/// use treevisor::{Task, TaskError};
///
/// struct Heartbeat;
///
/// #[async_trait]
/// impl Task for Heartbeat {
///     fn name(&self) -> &str { "heartbeat" }
///
///     async fn run(&self, ctx: CancellationToken) -> Result<(), TaskError> {
///         ctx.cancelled().await;
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Task: Send + Sync + 'static {
    /// Stable id of the worker running this task.
    fn name(&self) -> &str;

    /// Runs until completion, failure or cancellation of `ctx`.
    async fn run(&self, ctx: CancellationToken) -> Result<(), TaskError>;
}
