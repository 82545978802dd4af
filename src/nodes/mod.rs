//! # Node specifications.
//!
//! Immutable descriptions of the tree, built top-down by the caller:
//!
//! - [`Task`] / [`TaskFn`]: the work a worker runs
//! - [`WorkerSpec`]: a leaf (task + restart policy + optional delay)
//! - [`SupervisorSpec`]: an internal node (children + restart tolerance)
//! - [`Node`]: either of the two
//! - [`ChildSet`] / [`ChildSource`]: fixed children or a per-cycle builder with cleanup

mod children;
mod node;
mod supervisor;
mod task;
mod task_fn;
mod worker;

pub use children::{BuildNodes, ChildSet, ChildSource, Cleanup};
pub use node::Node;
pub use supervisor::SupervisorSpec;
pub use task::{Task, TaskRef};
pub use task_fn::TaskFn;
pub use worker::{WorkerSpec, WorkerSpecBuilder};
