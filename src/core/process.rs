//! # Per-child runtime record.
//!
//! A supervisor keeps one [`ProcessRuntime`] per child slot. The record lives
//! as long as the slot: restarts reuse it, so the restart count and the recent
//! restart instants accumulate across runs of the same child.
//!
//! ```text
//! Starting ──► Running ──► Failed ──(restart)──► Starting
//!                 │
//!                 └──► Terminating ──► Terminated
//! ```

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

/// Restart instants remembered per child.
const RESTART_HISTORY: usize = 16;

/// Lifecycle state of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    /// Being started by its supervisor.
    Starting,
    /// Started; for a supervisor, all of its children are running.
    Running,
    /// Exited with an error or gave up.
    Failed,
    /// Stop requested, waiting for it to return.
    Terminating,
    /// Stopped or exited cleanly.
    Terminated,
}

impl ProcessState {
    /// Returns a stable lowercase label.
    pub fn as_label(self) -> &'static str {
        match self {
            ProcessState::Starting => "starting",
            ProcessState::Running => "running",
            ProcessState::Failed => "failed",
            ProcessState::Terminating => "terminating",
            ProcessState::Terminated => "terminated",
        }
    }
}

/// Mutable record of one child slot.
#[derive(Debug)]
pub(crate) struct ProcessRuntime {
    path: Arc<str>,
    state: ProcessState,
    restart_count: u32,
    restarts: VecDeque<Instant>,
}

impl ProcessRuntime {
    pub(crate) fn new(path: Arc<str>) -> Self {
        Self {
            path,
            state: ProcessState::Starting,
            restart_count: 0,
            restarts: VecDeque::new(),
        }
    }

    pub(crate) fn path(&self) -> &Arc<str> {
        &self.path
    }

    pub(crate) fn state(&self) -> ProcessState {
        self.state
    }

    pub(crate) fn set_state(&mut self, state: ProcessState) {
        self.state = state;
    }

    pub(crate) fn restart_count(&self) -> u32 {
        self.restart_count
    }

    /// Notes a restart at `now`.
    pub(crate) fn record_restart(&mut self, now: Instant) {
        self.restart_count = self.restart_count.saturating_add(1);
        if self.restarts.len() == RESTART_HISTORY {
            self.restarts.pop_front();
        }
        self.restarts.push_back(now);
    }

    /// Remembered restarts no older than `period` as of `now`.
    pub(crate) fn recent_restarts(&self, now: Instant, period: Duration) -> usize {
        self.restarts
            .iter()
            .filter(|at| now.saturating_duration_since(**at) <= period)
            .count()
    }
}
