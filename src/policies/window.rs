//! # Restart tolerance window.
//!
//! [`RestartWindow`] is the per-supervisor sliding window of restart instants.
//! A supervisor records one instant per restart it performs; once more than
//! `intensity` instants fall inside the trailing `period`, the supervisor
//! gives up and escalates to its parent.
//!
//! ```text
//! intensity = 1, period = 5s
//!
//!   t=0s   restart  → [0]        1 ≤ 1  ok
//!   t=2s   restart  → [0, 2]     2 > 1  exceeded
//!
//!   t=0s   restart  → [0]        1 ≤ 1  ok
//!   t=6s   restart  → [6]        (0 pruned) ok
//! ```
//!
//! ## Rules
//! - Entries strictly older than `period` are pruned before each evaluation.
//! - The window is never reset by a successful child restart; a supervisor
//!   rebuilt by its parent starts with a fresh window.
//! - Storage is bounded by `intensity + 1` entries and grows on demand.

use std::collections::VecDeque;
use std::time::Duration;

use tokio::time::Instant;

/// Default restart intensity (restarts tolerated per period).
pub const DEFAULT_INTENSITY: u32 = 1;

/// Default restart period.
pub const DEFAULT_PERIOD: Duration = Duration::from_secs(5);

/// Upper bound for the slots reserved when a window is created.
const INITIAL_CAPACITY: usize = 16;

/// Sliding window of restart instants.
#[derive(Debug, Clone)]
pub struct RestartWindow {
    intensity: u32,
    period: Duration,
    stamps: VecDeque<Instant>,
}

impl RestartWindow {
    /// Creates an empty window.
    pub fn new(intensity: u32, period: Duration) -> Self {
        Self {
            intensity,
            period,
            stamps: VecDeque::with_capacity(Self::bound(intensity).min(INITIAL_CAPACITY)),
        }
    }

    /// Records a restart at `now`.
    ///
    /// Returns `true` while the window stays within tolerance and `false`
    /// once more than `intensity` restarts fall inside `period`.
    pub fn record(&mut self, now: Instant) -> bool {
        self.prune(now);
        self.stamps.push_back(now);
        let within = self.stamps.len() <= self.intensity as usize;
        while self.stamps.len() > Self::bound(self.intensity) {
            self.stamps.pop_front();
        }
        within
    }

    /// Number of restarts inside the window as of `now`.
    pub fn count(&mut self, now: Instant) -> usize {
        self.prune(now);
        self.stamps.len()
    }

    /// Forgets every recorded restart.
    pub fn reset(&mut self) {
        self.stamps.clear();
    }

    /// Configured intensity.
    pub fn intensity(&self) -> u32 {
        self.intensity
    }

    /// Configured period.
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Most entries ever kept: one past the tolerance.
    fn bound(intensity: u32) -> usize {
        (intensity as usize).saturating_add(1)
    }

    fn prune(&mut self, now: Instant) {
        while let Some(front) = self.stamps.front() {
            if now.saturating_duration_since(*front) > self.period {
                self.stamps.pop_front();
            } else {
                break;
            }
        }
    }
}

impl Default for RestartWindow {
    /// Intensity 1 within 5 seconds.
    fn default() -> Self {
        Self::new(DEFAULT_INTENSITY, DEFAULT_PERIOD)
    }
}
