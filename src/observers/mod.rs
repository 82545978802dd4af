//! # Lifecycle observers.
//!
//! This module provides the [`Observe`] trait and built-in observers for
//! lifecycle events produced by the supervision tree.
//!
//! ## Architecture
//! ```text
//! supervisor transition ── Event ──► Notifier ──► Observe::on_event(&Event)
//!                                                    │
//!                                        ┌───────────┼────────────┐
//!                                        ▼           ▼            ▼
//!                                  AliveTracker  LogWriter   user closure
//! ```
//!
//! ## Built-ins
//! - [`AliveTracker`]: last known state and start count per node path.
//! - `LogWriter` (feature `logging`): forwards events to `tracing`.

mod alive;
#[cfg(feature = "logging")]
mod log;
mod observe;

pub use alive::AliveTracker;
#[cfg(feature = "logging")]
pub use log::LogWriter;
pub use observe::Observe;
