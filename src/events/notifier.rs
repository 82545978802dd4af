//! # Synchronous event fan-out.
//!
//! [`Notifier`] delivers every [`Event`] to a list of observers, in order, on
//! the caller's execution unit. Supervisors call [`Notifier::emit`] right at
//! the transition that produced the event, so delivery order is causal order.
//!
//! ## Architecture
//! ```text
//! root supervisor ── Notifier[root observers]
//!     └─ subtree ─── Notifier[root observers + subtree observers]
//!            └─ subtree ─ Notifier[... + its own observers]
//!
//! emit(event)
//!     ├──► tracing::debug!(event)
//!     ├──► observer 1.on_event(&event)   (panic → caught, warn, continue)
//!     └──► observer N.on_event(&event)
//! ```
//!
//! ## Rules
//! - **Synchronous**: `emit` returns once every observer returned; slow
//!   observers slow the supervisor down, which is the caller's responsibility.
//! - **Isolation**: a panicking observer loses that event; other observers and
//!   the tree are unaffected.
//! - **No buffering, no retry.**

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use crate::error::panic_message;
use crate::events::Event;
use crate::observers::Observe;

/// Cheap-to-clone list of observers.
#[derive(Clone, Default)]
pub(crate) struct Notifier {
    observers: Arc<[Arc<dyn Observe>]>,
}

impl Notifier {
    /// Creates a notifier for the given observers.
    pub(crate) fn new(observers: Vec<Arc<dyn Observe>>) -> Self {
        Self {
            observers: observers.into(),
        }
    }

    /// Returns a notifier delivering to `self`'s observers followed by `more`.
    pub(crate) fn extend(&self, more: &[Arc<dyn Observe>]) -> Self {
        if more.is_empty() {
            return self.clone();
        }
        let mut all: Vec<Arc<dyn Observe>> = self.observers.to_vec();
        all.extend(more.iter().cloned());
        Self::new(all)
    }

    /// Delivers `event` to all observers.
    pub(crate) fn emit(&self, event: Event) {
        tracing::debug!(
            seq = event.seq,
            kind = event.kind.as_label(),
            path = %event.path,
            error = event.error.as_deref(),
            "lifecycle event"
        );
        for observer in self.observers.iter() {
            let delivered = catch_unwind(AssertUnwindSafe(|| observer.on_event(&event)));
            if let Err(payload) = delivered {
                tracing::warn!(
                    observer = observer.name(),
                    seq = event.seq,
                    info = %panic_message(payload.as_ref()),
                    "observer panicked; event dropped for it"
                );
            }
        }
    }

    /// Number of observers.
    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.observers.len()
    }
}
