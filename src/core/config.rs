//! # Tree-wide defaults.
//!
//! [`Config`] centralizes the defaults that specs inherit when built with
//! [`SupervisorSpec::with_config`](crate::SupervisorSpec::with_config) and
//! [`WorkerSpec::with_defaults`](crate::WorkerSpec::with_defaults).
//!
//! ## Sentinel values
//! - `backoff = None` → restarted workers run again immediately.

use std::time::Duration;

use crate::policies::{BackoffPolicy, DEFAULT_INTENSITY, DEFAULT_PERIOD, RestartPolicy};

/// Defaults for supervisors and workers of a tree.
///
/// ## Field semantics
/// - `intensity`: restarts a supervisor tolerates within `period`
/// - `period`: length of the restart tolerance window
/// - `restart`: default worker restart policy
/// - `backoff`: default delay before a restarted worker runs
#[derive(Clone, Debug)]
pub struct Config {
    /// Maximum restarts tolerated inside `period` before a supervisor fails.
    pub intensity: u32,

    /// Length of the sliding restart window.
    pub period: Duration,

    /// Default restart policy for workers.
    pub restart: RestartPolicy,

    /// Default restart delay for workers (`None` = immediate).
    pub backoff: Option<BackoffPolicy>,
}

impl Config {
    /// Default restart delay for workers, if any.
    #[inline]
    pub fn restart_delay(&self) -> Option<BackoffPolicy> {
        self.backoff
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `intensity = 1`, `period = 5s`
    /// - `restart = RestartPolicy::Permanent`
    /// - `backoff = None`
    fn default() -> Self {
        Self {
            intensity: DEFAULT_INTENSITY,
            period: DEFAULT_PERIOD,
            restart: RestartPolicy::default(),
            backoff: None,
        }
    }
}
