//! Lifecycle events: data model and synchronous delivery.
//!
//! ## Contents
//! - [`EventKind`], [`NodeTag`], [`Event`] event classification and payload
//! - `Notifier` ordered, synchronous fan-out to observers (crate-internal)
//!
//! ## Quick reference
//! - **Publishers**: supervisor runtimes. A supervisor emits the events of its
//!   worker children and its own `Started`/`Failed`/`Terminated`.
//! - **Consumers**: [`Observe`](crate::Observe) implementations attached to a
//!   [`SupervisorSpec`](crate::SupervisorSpec).

mod event;
mod notifier;

pub use event::{Event, EventKind, NodeTag};
pub(crate) use notifier::Notifier;
