//! Runtime core: starting, monitoring and stopping the tree.
//!
//! The public surface of this module is [`Handle`] (returned by
//! [`SupervisorSpec::start`](crate::SupervisorSpec::start)), [`Config`] and
//! [`ProcessState`].
//!
//! Internal modules:
//! - [`supervisor`]: one level of the tree (start, monitor loop, restart, escalation);
//! - [`child`]: a child slot, its tokio task and exit notice;
//! - [`runner`]: one worker run with restart delay and panic capture;
//! - [`process`]: per-child state record;
//! - [`handle`]: root start and the caller-facing handle;
//! - [`shutdown`]: OS termination signals.

mod child;
mod config;
mod handle;
mod process;
mod runner;
mod shutdown;
mod supervisor;

#[cfg(test)]
mod tests;

pub use config::Config;
pub use handle::Handle;
pub use process::ProcessState;
