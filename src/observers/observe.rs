//! # Core observer trait
//!
//! `Observe` is the extension point for plugging lifecycle sinks (logging,
//! metrics, test probes) into a supervision tree. Observers are attached to a
//! [`SupervisorSpec`](crate::SupervisorSpec) and see every event of that
//! supervisor's subtree, with fully qualified paths.
//!
//! ## Contract
//! - `on_event` is called synchronously from the supervisor loop that produced
//!   the event; keep it short (push to a channel if work is slow).
//! - A panic inside `on_event` is caught; the event is lost for that observer only.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use treevisor::{Event, EventKind, Observe};
//!
//! #[derive(Default)]
//! struct FailureCounter(AtomicUsize);
//!
//! impl Observe for FailureCounter {
//!     fn on_event(&self, ev: &Event) {
//!         if ev.kind == EventKind::ProcessFailed {
//!             self.0.fetch_add(1, Ordering::Relaxed);
//!         }
//!     }
//!     fn name(&self) -> &'static str { "failure-counter" }
//! }
//!
//! // Closures are observers too.
//! let printer: Arc<dyn Observe> = Arc::new(|ev: &Event| println!("{} {}", ev.kind.as_label(), ev.path));
//! ```

use crate::events::Event;

/// Contract for lifecycle event sinks.
pub trait Observe: Send + Sync + 'static {
    /// Handle a single event.
    fn on_event(&self, event: &Event);

    /// Human-readable name (for logs).
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

impl<F> Observe for F
where
    F: Fn(&Event) + Send + Sync + 'static,
{
    fn on_event(&self, event: &Event) {
        self(event)
    }
}
