//! # Lifecycle events emitted by the supervision tree.
//!
//! Every node transition produces exactly one immutable [`Event`]:
//! - [`EventKind::ProcessStarted`]    a worker was spawned / a supervisor has all children running
//! - [`EventKind::ProcessFailed`]     a node exited with an error or a supervisor gave up
//! - [`EventKind::ProcessTerminated`] a node exited cleanly or was stopped
//! - [`EventKind::CleanupFailed`]     a supervisor's resource cleanup returned an error
//!
//! ## Ordering guarantees
//! Each event carries a process-global, monotonically increasing `seq`.
//! Events are delivered synchronously from the transition that produced them,
//! so `seq` order is causal order.
//!
//! ## Example
//! ```rust
//! use treevisor::{Event, EventKind, NodeTag};
//!
//! let ev = Event::new(EventKind::ProcessFailed, NodeTag::Worker, "root/producer")
//!     .with_error("connection reset")
//!     .with_restarts(2);
//!
//! assert_eq!(ev.id(), "producer");
//! assert_eq!(ev.error.as_deref(), Some("connection reset"));
//! assert!(ev.is_failure());
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::SystemTime;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(1);

/// Classification of lifecycle events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Node reached `Running`.
    ///
    /// Sets: `path`, `node`, `restarts` (how many times this child was restarted so far).
    ProcessStarted,

    /// Node reached `Failed`.
    ///
    /// Sets: `path`, `node`, `error`.
    ProcessFailed,

    /// Node reached `Terminated`.
    ///
    /// Sets: `path`, `node`.
    ProcessTerminated,

    /// Resource cleanup of a supervisor failed. Shutdown still completes.
    ///
    /// Sets: `path` (supervisor), `node` (`Supervisor`), `error`.
    CleanupFailed,
}

impl EventKind {
    /// Short label for logs.
    pub fn as_label(self) -> &'static str {
        match self {
            EventKind::ProcessStarted => "started",
            EventKind::ProcessFailed => "failed",
            EventKind::ProcessTerminated => "terminated",
            EventKind::CleanupFailed => "cleanup-failed",
        }
    }
}

/// Kind of node an event refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeTag {
    /// Leaf running a user function.
    Worker,
    /// Inner node supervising children.
    Supervisor,
}

/// Lifecycle event record.
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,
    /// Kind of node that transitioned.
    pub node: NodeTag,
    /// Fully qualified node path (`root/child/grandchild`).
    pub path: Arc<str>,
    /// Error message, for failures.
    pub error: Option<Arc<str>>,
    /// Restart count of the node, for starts.
    pub restarts: Option<u32>,
}

impl Event {
    /// Creates an event with the current timestamp and the next sequence number.
    pub fn new(kind: EventKind, node: NodeTag, path: impl Into<Arc<str>>) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            node,
            path: path.into(),
            error: None,
            restarts: None,
        }
    }

    /// Attaches an error message.
    #[inline]
    pub fn with_error(mut self, error: impl Into<Arc<str>>) -> Self {
        self.error = Some(error.into());
        self
    }

    /// Attaches a restart count.
    #[inline]
    pub fn with_restarts(mut self, n: u32) -> Self {
        self.restarts = Some(n);
        self
    }

    /// Last segment of the path: the node's own id.
    pub fn id(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }

    /// True for [`EventKind::ProcessFailed`] and [`EventKind::CleanupFailed`].
    #[inline]
    pub fn is_failure(&self) -> bool {
        matches!(
            self.kind,
            EventKind::ProcessFailed | EventKind::CleanupFailed
        )
    }

    pub(crate) fn started(node: NodeTag, path: &Arc<str>, restarts: u32) -> Self {
        Event::new(EventKind::ProcessStarted, node, Arc::clone(path)).with_restarts(restarts)
    }

    pub(crate) fn failed(node: NodeTag, path: &Arc<str>, err: &dyn std::fmt::Display) -> Self {
        Event::new(EventKind::ProcessFailed, node, Arc::clone(path)).with_error(err.to_string())
    }

    pub(crate) fn terminated(node: NodeTag, path: &Arc<str>) -> Self {
        Event::new(EventKind::ProcessTerminated, node, Arc::clone(path))
    }

    pub(crate) fn cleanup_failed(path: &Arc<str>, err: &dyn std::fmt::Display) -> Self {
        Event::new(EventKind::CleanupFailed, NodeTag::Supervisor, Arc::clone(path))
            .with_error(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence_is_monotonic() {
        let a = Event::new(EventKind::ProcessStarted, NodeTag::Worker, "root/a");
        let b = Event::new(EventKind::ProcessStarted, NodeTag::Worker, "root/b");
        assert!(b.seq > a.seq);
    }

    #[test]
    fn test_id_of_root_path() {
        let ev = Event::new(EventKind::ProcessTerminated, NodeTag::Supervisor, "root");
        assert_eq!(ev.id(), "root");
        assert!(!ev.is_failure());
    }

    #[test]
    fn test_helpers_fill_fields() {
        let path: Arc<str> = Arc::from("root/db");
        let ev = Event::cleanup_failed(&path, &"pool still busy");
        assert_eq!(ev.kind, EventKind::CleanupFailed);
        assert_eq!(ev.node, NodeTag::Supervisor);
        assert_eq!(ev.error.as_deref(), Some("pool still busy"));

        let ev = Event::started(NodeTag::Worker, &path, 3);
        assert_eq!(ev.restarts, Some(3));
        assert_eq!(ev.kind.as_label(), "started");
    }
}
