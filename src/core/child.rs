//! # Child slot of a supervisor.
//!
//! A [`Child`] pairs the immutable [`Node`] with its [`ProcessRuntime`] and,
//! while it runs, the tokio task executing it.
//!
//! ## Exit signalling
//! ```text
//! Child::start()
//!   ├─ Worker:     spawn(run_worker(task)) ─┐
//!   └─ Supervisor: SupervisorRuntime::start() (children running)
//!                  spawn(runtime.run()) ────┤
//!                                           ▼
//!                       task ends ──► ExitNotice { index, generation } ──► supervisor loop
//!                                                                             │
//!                                             Child::collect() ◄──────────────┘
//!                                             (awaits JoinHandle for the outcome)
//! ```
//!
//! ## Rules
//! - Every child runs with its own `CancellationToken`, owned by the slot
//! - `generation` increments on every start; notices of older runs are stale
//! - Dropping a running slot cancels its token
//! - Worker lifecycle events are emitted here, by the owning supervisor;
//!   nested supervisors emit their own

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::core::process::{ProcessRuntime, ProcessState};
use crate::core::runner::run_worker;
use crate::core::supervisor::SupervisorRuntime;
use crate::error::{RuntimeError, panic_message};
use crate::events::{Event, NodeTag, Notifier};
use crate::nodes::{Node, WorkerSpec};

/// Sent by a child task when it finishes.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ExitNotice {
    pub(crate) index: usize,
    pub(crate) generation: u64,
}

struct Running {
    token: CancellationToken,
    join: JoinHandle<Result<(), RuntimeError>>,
}

impl Drop for Running {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

pub(crate) struct Child {
    node: Node,
    process: ProcessRuntime,
    generation: u64,
    running: Option<Running>,
}

impl Child {
    pub(crate) fn new(node: Node, parent: &str) -> Self {
        let path: Arc<str> = Arc::from(format!("{parent}/{}", node.id()));
        Self {
            node,
            process: ProcessRuntime::new(path),
            generation: 0,
            running: None,
        }
    }

    pub(crate) fn node(&self) -> &Node {
        &self.node
    }

    pub(crate) fn process_mut(&mut self) -> &mut ProcessRuntime {
        &mut self.process
    }

    pub(crate) fn path(&self) -> &Arc<str> {
        self.process.path()
    }

    pub(crate) fn is_running(&self) -> bool {
        self.running.is_some()
    }

    /// True if `generation` names the run currently in this slot.
    pub(crate) fn is_current(&self, generation: u64) -> bool {
        self.running.is_some() && self.generation == generation
    }

    /// Starts the node in this slot.
    ///
    /// Returns once the child is running; for a nested supervisor that means
    /// all of its own children are running too.
    pub(crate) async fn start(
        &mut self,
        index: usize,
        exits: &UnboundedSender<ExitNotice>,
        notifier: &Notifier,
    ) -> Result<(), RuntimeError> {
        self.generation += 1;
        self.process.set_state(ProcessState::Starting);

        let notice = ExitNotice {
            index,
            generation: self.generation,
        };
        let token = CancellationToken::new();
        let path = Arc::clone(self.process.path());
        let restarts = self.process.restart_count();

        let join = match &self.node {
            Node::Worker(spec) => {
                let join = spawn_worker(spec, &path, token.clone(), restarts, notice, exits);
                notifier.emit(Event::started(NodeTag::Worker, &path, restarts));
                join
            }
            Node::Supervisor(spec) => {
                let started = SupervisorRuntime::start(
                    spec.clone(),
                    Arc::clone(&path),
                    token.clone(),
                    notifier,
                    restarts,
                )
                .await;
                let runtime = match started {
                    Ok(runtime) => runtime,
                    Err(e) => {
                        self.process.set_state(ProcessState::Failed);
                        return Err(e);
                    }
                };
                spawn_subtree(runtime, path, notice, exits)
            }
        };

        self.running = Some(Running { token, join });
        self.process.set_state(ProcessState::Running);
        debug!(path = %self.process.path(), restarts, "child started");
        Ok(())
    }

    /// Takes the outcome of a run that already signalled its exit.
    pub(crate) async fn collect(&mut self, notifier: &Notifier) -> Result<(), RuntimeError> {
        let Some(mut running) = self.running.take() else {
            return Ok(());
        };
        let res = join_outcome(self.process.path(), &mut running.join).await;
        self.settle(&res, notifier);
        res
    }

    /// Cancels the child and waits for it to return.
    pub(crate) async fn stop(&mut self, notifier: &Notifier) {
        let Some(mut running) = self.running.take() else {
            return;
        };
        self.process.set_state(ProcessState::Terminating);
        running.token.cancel();
        let res = join_outcome(self.process.path(), &mut running.join).await;
        self.settle(&res, notifier);
        debug!(
            path = %self.process.path(),
            state = self.process.state().as_label(),
            "child stopped"
        );
    }

    fn settle(&mut self, res: &Result<(), RuntimeError>, notifier: &Notifier) {
        let state = match res {
            Ok(()) => ProcessState::Terminated,
            Err(_) => ProcessState::Failed,
        };
        self.process.set_state(state);

        if let Node::Worker(_) = self.node {
            let path = self.process.path();
            let event = match res {
                Ok(()) => Event::terminated(NodeTag::Worker, path),
                Err(RuntimeError::WorkerFailure { source, .. }) => {
                    Event::failed(NodeTag::Worker, path, source)
                }
                Err(e) => Event::failed(NodeTag::Worker, path, e),
            };
            notifier.emit(event);
        }
    }
}

fn spawn_worker(
    spec: &WorkerSpec,
    path: &Arc<str>,
    token: CancellationToken,
    restarts: u32,
    notice: ExitNotice,
    exits: &UnboundedSender<ExitNotice>,
) -> JoinHandle<Result<(), RuntimeError>> {
    let delay: Option<Duration> = match restarts {
        0 => None,
        n => spec.backoff().map(|b| b.next(n - 1)),
    };
    let task = Arc::clone(spec.task());
    let path = Arc::clone(path);
    let exits = exits.clone();

    tokio::spawn(async move {
        let res = run_worker(task, token, delay).await;
        let _ = exits.send(notice);
        res.map_err(|source| RuntimeError::WorkerFailure { path, source })
    })
}

fn spawn_subtree(
    runtime: SupervisorRuntime,
    path: Arc<str>,
    notice: ExitNotice,
    exits: &UnboundedSender<ExitNotice>,
) -> JoinHandle<Result<(), RuntimeError>> {
    let exits = exits.clone();

    tokio::spawn(async move {
        let res = AssertUnwindSafe(runtime.run())
            .catch_unwind()
            .await
            .unwrap_or_else(|payload| {
                Err(RuntimeError::Panicked {
                    path,
                    info: panic_message(payload.as_ref()),
                })
            });
        let _ = exits.send(notice);
        res
    })
}

async fn join_outcome(
    path: &Arc<str>,
    join: &mut JoinHandle<Result<(), RuntimeError>>,
) -> Result<(), RuntimeError> {
    match join.await {
        Ok(res) => res,
        Err(e) => Err(RuntimeError::Panicked {
            path: Arc::clone(path),
            info: e.to_string(),
        }),
    }
}
