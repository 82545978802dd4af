//! # Supervisor runtime: starts, monitors and restarts one level of the tree.
//!
//! A [`SupervisorRuntime`] is the live counterpart of a
//! [`SupervisorSpec`]. It exists from a successful start until it terminates
//! or gives up; a restart by its parent always builds a fresh runtime (new
//! child set, new resources, empty restart window).
//!
//! ## State machine
//! ```text
//! start():
//!   resolve children ──Err──► emit Failed ──► ResourceAcquisition
//!        │
//!   check sibling ids ──dup──► cleanup ──► emit Failed ──► DuplicateChild
//!        │
//!   for child in order: child.start()
//!        └─Err──► stop started (reverse) ──► cleanup ──► emit Failed ──► StartFailed
//!        │
//!   emit Started
//!
//! run():
//!   loop select! {
//!     token.cancelled()  ──► stop all (reverse) ──► cleanup ──► emit Terminated ──► Ok
//!     exit notice        ──► handle_exit()
//!   }
//!
//! handle_exit(child):
//!   collect outcome ──► restart policy says no ──► keep running
//!        │
//!   window.record(now) ──exceeded──► stop all (reverse) ──► cleanup
//!        │                                ──► emit Failed ──► ToleranceExceeded
//!   restart only this child (one-for-one)
//!        └─Err──► counts as another restart attempt
//!
//!   token cancelled before an attempt ──► give up restarting, run() terminates
//! ```
//!
//! ## Rules
//! - Transitions of one supervisor are serialized by its loop
//! - Start is pre-order (a subtree is fully running before its next sibling starts)
//! - Shutdown is post-order in reverse sibling order, cleanup last
//! - Cleanup failures are reported as `CleanupFailed` and never block shutdown
//! - A runtime dropped with live children (e.g. its loop panicked) stops them
//!   and runs its cleanup on a background task; it emits no event of its own

use std::collections::HashSet;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::core::child::{Child, ExitNotice};
use crate::error::RuntimeError;
use crate::events::{Event, NodeTag, Notifier};
use crate::nodes::{ChildSet, Cleanup, Node, SupervisorSpec};
use crate::policies::{RestartStrategy, RestartWindow};

/// Live supervisor of one level of the tree.
pub(crate) struct SupervisorRuntime {
    path: Arc<str>,
    token: CancellationToken,
    strategy: RestartStrategy,
    children: Vec<Child>,
    window: RestartWindow,
    cleanup: Option<Cleanup>,
    notifier: Notifier,
    exits_tx: UnboundedSender<ExitNotice>,
    exits_rx: UnboundedReceiver<ExitNotice>,
}

impl SupervisorRuntime {
    /// Starts the supervisor described by `spec` at `path`.
    ///
    /// Resolves there once every child is running. `restarts` is only used
    /// for reporting. Observers of `spec` are added to those of `parent`.
    pub(crate) fn start(
        spec: SupervisorSpec,
        path: Arc<str>,
        token: CancellationToken,
        parent: &Notifier,
        restarts: u32,
    ) -> BoxFuture<'static, Result<Self, RuntimeError>> {
        let notifier = parent.extend(spec.observers());

        async move {
            debug!(%path, restarts, "starting supervisor");
            let ChildSet { nodes, cleanup } = match spec.source().resolve(&path).await {
                Ok(set) => set,
                Err(e) => {
                    warn!(%path, error = %e, "child set unavailable");
                    notifier.emit(Event::failed(NodeTag::Supervisor, &path, &e));
                    return Err(e);
                }
            };

            let (exits_tx, exits_rx) = mpsc::unbounded_channel();
            let mut runtime = Self {
                path: Arc::clone(&path),
                token,
                strategy: spec.strategy(),
                children: Vec::with_capacity(nodes.len()),
                window: RestartWindow::new(spec.intensity(), spec.period()),
                cleanup,
                notifier,
                exits_tx,
                exits_rx,
            };

            if let Some(id) = duplicate_id(&nodes) {
                let err = RuntimeError::DuplicateChild { path, id };
                return Err(runtime.abort(err).await);
            }

            runtime.children = nodes
                .into_iter()
                .map(|node| Child::new(node, &path))
                .collect();

            for index in 0..runtime.children.len() {
                if let Err(e) = runtime.start_child(index).await {
                    warn!(%path, error = %e, "child failed to start; aborting");
                    let err = RuntimeError::StartFailed {
                        path,
                        source: Box::new(e),
                    };
                    return Err(runtime.abort(err).await);
                }
            }

            runtime
                .notifier
                .emit(Event::started(NodeTag::Supervisor, &path, restarts));
            Ok(runtime)
        }
        .boxed()
    }

    /// Monitors children until cancelled or until restart tolerance runs out.
    pub(crate) fn run(mut self) -> BoxFuture<'static, Result<(), RuntimeError>> {
        async move {
            loop {
                tokio::select! {
                    biased;

                    _ = self.token.cancelled() => {
                        self.terminate().await;
                        return Ok(());
                    }
                    Some(notice) = self.exits_rx.recv() => {
                        self.handle_exit(notice).await?;
                    }
                }
            }
        }
        .boxed()
    }

    async fn start_child(&mut self, index: usize) -> Result<(), RuntimeError> {
        let Some(child) = self.children.get_mut(index) else {
            return Ok(());
        };
        child.start(index, &self.exits_tx, &self.notifier).await
    }

    async fn handle_exit(&mut self, notice: ExitNotice) -> Result<(), RuntimeError> {
        let Some(child) = self.children.get_mut(notice.index) else {
            return Ok(());
        };
        if !child.is_current(notice.generation) {
            return Ok(());
        }

        let result = child.collect(&self.notifier).await;
        let restart = child.node().restart();
        let path = Arc::clone(child.path());

        if let Err(e) = &result {
            warn!(%path, error = %e, policy = restart.as_label(), "child failed");
        } else {
            debug!(%path, policy = restart.as_label(), "child exited");
        }

        if !restart.should_restart(result.is_err()) {
            return Ok(());
        }

        let mut cause = match result {
            Err(e) => e,
            Ok(()) => RuntimeError::UnexpectedExit { path },
        };

        loop {
            // A stop wins over further attempts; `run` terminates next.
            if self.token.is_cancelled() {
                debug!(path = %self.path, "stop requested; restart abandoned");
                return Ok(());
            }
            if !self.window.record(Instant::now()) {
                return Err(self.fail(cause).await);
            }
            match self.restart(notice.index).await {
                Ok(()) => return Ok(()),
                Err(e) => {
                    warn!(path = %self.path, error = %e, "restart attempt failed");
                    cause = e;
                }
            }
        }
    }

    /// Restarts after a failure of the child at `index`.
    async fn restart(&mut self, index: usize) -> Result<(), RuntimeError> {
        match self.strategy {
            RestartStrategy::OneForOne => {
                let period = self.window.period();
                if let Some(child) = self.children.get_mut(index) {
                    let now = Instant::now();
                    let process = child.process_mut();
                    process.record_restart(now);
                    debug!(
                        path = %process.path(),
                        restarts = process.restart_count(),
                        recent = process.recent_restarts(now, period),
                        "restarting child"
                    );
                }
                self.start_child(index).await
            }
        }
    }

    /// Gives up: stops everything, releases resources and escalates.
    async fn fail(&mut self, cause: RuntimeError) -> RuntimeError {
        let err = RuntimeError::ToleranceExceeded {
            path: Arc::clone(&self.path),
            intensity: self.window.intensity(),
            period: self.window.period(),
            source: Box::new(cause),
        };
        error!(path = %self.path, error = %err, "restart tolerance exceeded; escalating");
        self.abort(err).await
    }

    async fn abort(&mut self, err: RuntimeError) -> RuntimeError {
        self.stop_children().await;
        self.run_cleanup().await;
        self.notifier
            .emit(Event::failed(NodeTag::Supervisor, &self.path, &err));
        err
    }

    async fn terminate(&mut self) {
        info!(path = %self.path, "terminating supervisor");
        self.stop_children().await;
        self.run_cleanup().await;
        self.notifier
            .emit(Event::terminated(NodeTag::Supervisor, &self.path));
    }

    async fn stop_children(&mut self) {
        for child in self.children.iter_mut().rev() {
            child.stop(&self.notifier).await;
        }
    }

    async fn run_cleanup(&mut self) {
        if let Some(cleanup) = self.cleanup.take() {
            release(cleanup, &self.path, &self.notifier).await;
        }
    }
}

/// A runtime dropped while still owning running children (its loop panicked
/// or its task was dropped) stops them and releases its resources in the
/// background. Nothing is left to do after `terminate` or `abort`.
impl Drop for SupervisorRuntime {
    fn drop(&mut self) {
        let cleanup = self.cleanup.take();
        let mut children = std::mem::take(&mut self.children);
        if cleanup.is_none() && !children.iter().any(Child::is_running) {
            return;
        }
        // Without a runtime the children's tokens are still cancelled on drop.
        let Ok(rt) = tokio::runtime::Handle::try_current() else {
            return;
        };

        let path = Arc::clone(&self.path);
        let notifier = self.notifier.clone();
        debug!(%path, "supervisor dropped while active; stopping its children");
        rt.spawn(async move {
            for child in children.iter_mut().rev() {
                child.stop(&notifier).await;
            }
            if let Some(cleanup) = cleanup {
                release(cleanup, &path, &notifier).await;
            }
        });
    }
}

async fn release(cleanup: Cleanup, path: &Arc<str>, notifier: &Notifier) {
    if let Err(e) = cleanup.run(path).await {
        warn!(%path, error = %e, "resource cleanup failed");
        notifier.emit(Event::cleanup_failed(path, &e));
    }
}

fn duplicate_id(nodes: &[Node]) -> Option<String> {
    let mut seen = HashSet::with_capacity(nodes.len());
    nodes
        .iter()
        .find(|n| !seen.insert(n.id()))
        .map(|n| n.id().to_owned())
}
