//! # AliveTracker – per-node state from the event stream
//!
//! Rebuilds the [`ProcessState`] of every node path by listening to lifecycle
//! events, and counts how often each path was started.
//!
//! ## Rules
//! - `ProcessStarted` → `Running`, start count += 1
//! - `ProcessFailed` → `Failed`
//! - `ProcessTerminated` → `Terminated`
//! - `CleanupFailed` → no state change
//! - Events with `seq <= last_seq` for a path are rejected (stale).
//!
//! ## Internal scheme
//! ```text
//! on_event(ev) ──► HashMap<path, NodeState { last_seq, state, starts }>
//!
//! snapshot() -> Vec<String>   (sorted paths currently Running)
//! state(path) -> Option<ProcessState>
//! starts(path) -> u32
//! ```

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::core::ProcessState;
use crate::events::{Event, EventKind};
use crate::observers::Observe;

#[derive(Debug, Clone, Copy)]
struct NodeState {
    last_seq: u64,
    state: ProcessState,
    starts: u32,
}

/// Tracks the last known state of every node in a tree.
#[derive(Default)]
pub struct AliveTracker {
    inner: RwLock<HashMap<String, NodeState>>,
}

impl AliveTracker {
    /// Creates an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sorted paths currently `Running`.
    #[must_use]
    pub fn snapshot(&self) -> Vec<String> {
        let g = self.read();
        let mut v: Vec<String> = g
            .iter()
            .filter(|(_, s)| s.state == ProcessState::Running)
            .map(|(p, _)| p.clone())
            .collect();
        v.sort_unstable();
        v
    }

    /// Last known state of `path`.
    #[must_use]
    pub fn state(&self, path: &str) -> Option<ProcessState> {
        self.read().get(path).map(|s| s.state)
    }

    /// How many times `path` reached `Running`.
    #[must_use]
    pub fn starts(&self, path: &str) -> u32 {
        self.read().get(path).map_or(0, |s| s.starts)
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, NodeState>> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, NodeState>> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl Observe for AliveTracker {
    fn on_event(&self, ev: &Event) {
        let next = match ev.kind {
            EventKind::ProcessStarted => ProcessState::Running,
            EventKind::ProcessFailed => ProcessState::Failed,
            EventKind::ProcessTerminated => ProcessState::Terminated,
            EventKind::CleanupFailed => return,
        };

        let mut g = self.write();
        let entry = g.entry(ev.path.to_string()).or_insert(NodeState {
            last_seq: 0,
            state: ProcessState::Starting,
            starts: 0,
        });
        if ev.seq <= entry.last_seq {
            tracing::warn!(path = %ev.path, seq = ev.seq, "AliveTracker: stale event ignored");
            return;
        }
        entry.last_seq = ev.seq;
        entry.state = next;
        if next == ProcessState::Running {
            entry.starts += 1;
        }
    }

    fn name(&self) -> &'static str {
        "AliveTracker"
    }
}
