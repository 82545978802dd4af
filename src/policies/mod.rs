//! Restart policies, strategies and tolerance accounting.
//!
//! ## Contents
//! - [`RestartPolicy`]   whether a child exit is restarted (permanent / transient / temporary)
//! - [`RestartStrategy`] which children are restarted (one-for-one)
//! - [`RestartWindow`]   sliding window that decides when a supervisor gives up
//! - [`BackoffPolicy`]   optional delay before a worker's restarted run
//! - [`JitterPolicy`]    randomization of that delay
//!
//! ## Quick wiring
//! ```text
//! child exits ─► RestartPolicy::should_restart(failed)?
//!                   └─ yes ─► RestartWindow::record(now)?
//!                               ├─ within  ─► RestartStrategy::OneForOne ─► restart child
//!                               │                                            (BackoffPolicy delay)
//!                               └─ exceeded ─► supervisor fails, escalates to parent
//! ```
//!
//! ## Defaults
//! - `RestartPolicy::Permanent`, `RestartStrategy::OneForOne`.
//! - `RestartWindow`: intensity 1 within 5 seconds.
//! - no restart delay.

mod backoff;
mod jitter;
mod restart;
mod window;

pub use backoff::BackoffPolicy;
pub use jitter::JitterPolicy;
pub use restart::{RestartPolicy, RestartStrategy};
pub use window::{DEFAULT_INTENSITY, DEFAULT_PERIOD, RestartWindow};
