//! # treevisor
//!
//! **Treevisor** runs async workers under a tree of supervisors.
//!
//! Workers are leaves running user functions; supervisors start, monitor and
//! restart their children, and give up (escalating to their own parent) when
//! failures exceed a restart tolerance. Resources shared by siblings are
//! created by their supervisor for each restart cycle and released when the
//! cycle ends.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!                 ┌─────────────────────────────────────────────┐
//!                 │ SupervisorSpec "root" (intensity, period)   │
//!                 │  ChildSource: Static(Vec<Node>) | Build(fn) │
//!                 └──────┬────────────────────┬─────────────────┘
//!                        ▼                    ▼
//!          ┌──────────────────────┐  ┌──────────────────────────────┐
//!          │ WorkerSpec "ingest"  │  │ SupervisorSpec "pipeline"    │
//!          │ (task, restart)      │  │ build() → ChildSet {         │
//!          └──────────────────────┘  │   nodes: [producer, consumer]│
//!                                    │   cleanup: close channel }   │
//!                                    └──────────────────────────────┘
//!
//! SupervisorSpec::start(ctx) ──► SupervisorRuntime (one per supervisor, own tokio task)
//!                                  ├─ Child slots (own CancellationToken, JoinHandle)
//!                                  ├─ RestartWindow (intensity / period)
//!                                  ├─ Cleanup of the current child set
//!                                  └─ Notifier ──► Observe::on_event(&Event)
//! ```
//!
//! ### Lifecycle
//! ```text
//! start:    pre-order   root ─► children in order (a subtree is fully running first)
//! failure:  child exits ─► RestartPolicy ─► RestartWindow::record
//!                            ├─ within   ─► restart that child only (one-for-one)
//!                            └─ exceeded ─► stop all (reverse), cleanup,
//!                                           ToleranceExceeded to the parent
//! stop:     post-order  children in reverse order ─► cleanup ─► Terminated
//! ```
//!
//! ## Features
//! | Area             | Description                                            | Key types / traits                                  |
//! |------------------|--------------------------------------------------------|-----------------------------------------------------|
//! | **Nodes**        | Describe the tree: workers, supervisors, child sets.   | [`Node`], [`WorkerSpec`], [`SupervisorSpec`], [`ChildSet`] |
//! | **Tasks**        | Work run by workers, cancellable via a token.          | [`Task`], [`TaskFn`], [`TaskRef`]                   |
//! | **Policies**     | Restart decisions, tolerance window, restart delays.   | [`RestartPolicy`], [`RestartWindow`], [`BackoffPolicy`] |
//! | **Lifecycle**    | Start a tree, stop it, wait for its outcome.           | [`Handle`]                                          |
//! | **Observers**    | Receive every lifecycle event of the tree.             | [`Observe`], [`AliveTracker`], [`Event`]            |
//! | **Errors**       | Typed errors with the escalation chain as sources.     | [`RuntimeError`], [`TaskError`]                     |
//! | **Configuration**| Defaults for tolerance, restart policy and delay.      | [`Config`]                                          |
//!
//! ## Optional features
//! - `logging`: exports [`LogWriter`], an observer writing events through `tracing`.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use tokio_util::sync::CancellationToken;
//! use treevisor::{ChildSet, Node, SupervisorSpec, TaskError};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let pipeline = SupervisorSpec::with_resources("pipeline", || async {
//!         let (tx, rx) = async_channel_like();
//!         let producer = Node::worker("producer", move |ctx: CancellationToken| {
//!             let tx = tx.clone();
//!             async move {
//!                 while !ctx.is_cancelled() {
//!                     let _ = tx.send(1).await;
//!                     tokio::time::sleep(Duration::from_millis(10)).await;
//!                 }
//!                 Ok::<(), TaskError>(())
//!             }
//!         });
//!         let consumer = Node::worker("consumer", move |ctx: CancellationToken| {
//!             let rx = rx.clone();
//!             async move {
//!                 let mut rx = rx.lock().await;
//!                 while let Some(_n) = tokio::select! {
//!                     _ = ctx.cancelled() => None,
//!                     n = rx.recv() => n,
//!                 } {}
//!                 Ok::<(), TaskError>(())
//!             }
//!         });
//!         Ok::<_, treevisor::BoxError>(ChildSet::new(vec![producer, consumer]))
//!     });
//!
//!     let handle = SupervisorSpec::new("root", vec![pipeline.into()])
//!         .start(CancellationToken::new())
//!         .await?;
//!
//!     tokio::time::sleep(Duration::from_millis(50)).await;
//!     handle.terminate().await?;
//!     Ok(())
//! }
//!
//! # use std::sync::Arc;
//! # use tokio::sync::{mpsc, Mutex};
//! # fn async_channel_like() -> (mpsc::Sender<u32>, Arc<Mutex<mpsc::Receiver<u32>>>) {
//! #     let (tx, rx) = mpsc::channel(8);
//! #     (tx, Arc::new(Mutex::new(rx)))
//! # }
//! ```
mod core;
mod error;
mod events;
mod nodes;
mod observers;
mod policies;

// ---- Public re-exports ----

pub use crate::core::{Config, Handle, ProcessState};
pub use error::{BoxError, RuntimeError, TaskError};
pub use events::{Event, EventKind, NodeTag};
pub use nodes::{
    BuildNodes, ChildSet, ChildSource, Cleanup, Node, SupervisorSpec, Task, TaskFn, TaskRef,
    WorkerSpec, WorkerSpecBuilder,
};
pub use observers::{AliveTracker, Observe};
pub use policies::{
    BackoffPolicy, DEFAULT_INTENSITY, DEFAULT_PERIOD, JitterPolicy, RestartPolicy,
    RestartStrategy, RestartWindow,
};

// Optional: expose a built-in observer writing events through `tracing`.
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use observers::LogWriter;
