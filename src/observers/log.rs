//! # LogWriter: events as `tracing` records
//!
//! Forwards each [`Event`] to `tracing` under the `treevisor::events` target.
//! Install any `tracing` subscriber (e.g. `tracing_subscriber::fmt`) to see them.
//!
//! ## Example output (fmt subscriber)
//! ```text
//!  INFO treevisor::events: started node=worker path=root/producer restarts=0
//!  WARN treevisor::events: failed node=worker path=root/producer error="execution failed: broken pipe"
//!  INFO treevisor::events: started node=worker path=root/producer restarts=1
//!  INFO treevisor::events: terminated node=supervisor path=root
//! ```

use crate::events::{Event, EventKind, NodeTag};
use crate::observers::Observe;

/// Event writer observer.
#[derive(Default, Clone, Copy)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

fn node_label(tag: NodeTag) -> &'static str {
    match tag {
        NodeTag::Worker => "worker",
        NodeTag::Supervisor => "supervisor",
    }
}

impl Observe for LogWriter {
    fn on_event(&self, e: &Event) {
        let node = node_label(e.node);
        let path = &*e.path;
        match e.kind {
            EventKind::ProcessStarted => {
                tracing::info!(target: "treevisor::events", node, path, restarts = e.restarts, "started");
            }
            EventKind::ProcessTerminated => {
                tracing::info!(target: "treevisor::events", node, path, "terminated");
            }
            EventKind::ProcessFailed => {
                tracing::warn!(target: "treevisor::events", node, path, error = e.error.as_deref(), "failed");
            }
            EventKind::CleanupFailed => {
                tracing::error!(target: "treevisor::events", node, path, error = e.error.as_deref(), "cleanup failed");
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
