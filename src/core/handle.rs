//! # Handle to a running tree.
//!
//! [`SupervisorSpec::start`] starts the root supervisor and returns a
//! [`Handle`] once every node of the tree is running.
//!
//! ```text
//! SupervisorSpec::start(ctx)
//!   ├─ token = ctx.child_token()
//!   ├─ SupervisorRuntime::start(spec, "root-id", token)   (pre-order)
//!   └─ spawn(runtime.run()) ──► Handle { path, token, join }
//!
//! handle.stop() / ctx.cancel() ──► token cancelled ──► post-order shutdown
//! handle.wait()                ──► Ok(())  root terminated
//!                               └► Err(e)  failure escalated to the root
//! ```
//!
//! Dropping a [`Handle`] does not stop the tree; cancel `ctx` or call
//! [`Handle::stop`] first.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::core::shutdown;
use crate::core::supervisor::SupervisorRuntime;
use crate::error::RuntimeError;
use crate::events::Notifier;
use crate::nodes::SupervisorSpec;

/// Controls and awaits a started tree.
#[derive(Debug)]
pub struct Handle {
    path: Arc<str>,
    token: CancellationToken,
    join: JoinHandle<Result<(), RuntimeError>>,
}

impl SupervisorSpec {
    /// Starts this supervisor as the root of a tree.
    ///
    /// Returns once every node is running. Cancelling `ctx` stops the tree
    /// the same way as [`Handle::stop`].
    ///
    /// # Errors
    /// The start error of the root: [`RuntimeError::ResourceAcquisition`],
    /// [`RuntimeError::DuplicateChild`] or [`RuntimeError::StartFailed`].
    ///
    /// # Example
    /// ```rust
    /// use tokio_util::sync::CancellationToken;
    /// use treevisor::{Node, SupervisorSpec, TaskError};
    ///
    /// # #[tokio::main(flavor = "current_thread")]
    /// # async fn main() -> Result<(), treevisor::RuntimeError> {
    /// let handle = SupervisorSpec::new("root", vec![
    ///     Node::worker("idle", |ctx| async move { ctx.cancelled().await; Ok::<(), TaskError>(()) }),
    /// ])
    /// .start(CancellationToken::new())
    /// .await?;
    ///
    /// handle.terminate().await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn start(self, ctx: CancellationToken) -> Result<Handle, RuntimeError> {
        let path: Arc<str> = Arc::from(self.id());
        let token = ctx.child_token();

        let runtime =
            SupervisorRuntime::start(self, Arc::clone(&path), token.clone(), &Notifier::default(), 0)
                .await?;
        info!(%path, "supervision tree started");

        Ok(Handle {
            path,
            token,
            join: tokio::spawn(runtime.run()),
        })
    }
}

impl Handle {
    /// Path (id) of the root supervisor.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// True once the root has terminated or failed.
    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Begins shutdown: children are stopped in reverse order, then cleanups run.
    pub fn stop(&self) {
        self.token.cancel();
    }

    /// Waits until the root terminates (`Ok`) or fails (the escalated error).
    pub async fn wait(self) -> Result<(), RuntimeError> {
        joined(&self.path, self.join.await)
    }

    /// Stops the tree and waits for the shutdown to finish.
    pub async fn terminate(self) -> Result<(), RuntimeError> {
        self.stop();
        self.wait().await
    }

    /// Like [`wait`](Self::wait), but an OS termination signal stops the tree first.
    pub async fn wait_or_signal(mut self) -> Result<(), RuntimeError> {
        tokio::select! {
            res = &mut self.join => return joined(&self.path, res),
            sig = shutdown::wait_for_shutdown_signal() => match sig {
                Ok(()) => {
                    info!(path = %self.path, "termination signal received");
                    self.stop();
                }
                Err(e) => warn!(error = %e, "signal handlers unavailable; waiting without them"),
            },
        }
        self.wait().await
    }
}

fn joined(
    path: &Arc<str>,
    res: Result<Result<(), RuntimeError>, tokio::task::JoinError>,
) -> Result<(), RuntimeError> {
    match res {
        Ok(res) => res,
        Err(e) => Err(RuntimeError::Panicked {
            path: Arc::clone(path),
            info: e.to_string(),
        }),
    }
}
