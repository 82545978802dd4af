//! # Restart policies and strategies.
//!
//! [`RestartPolicy`] decides, per child, whether an exit is restarted:
//!
//! - [`RestartPolicy::Permanent`] any exit (error or clean) is restarted (default).
//! - [`RestartPolicy::Transient`] only an exit with an error is restarted.
//! - [`RestartPolicy::Temporary`] never restarted, never counted against tolerance.
//!
//! [`RestartStrategy`] decides *which* children are restarted when one of them
//! must be. Only [`RestartStrategy::OneForOne`] exists today.
//!
//! ## Decision table
//! ```text
//!                 clean exit        error exit
//! Permanent   →   restart           restart
//! Transient   →   done (no count)   restart
//! Temporary   →   done (no count)   done (no count)
//! ```

/// Policy controlling whether a child is restarted after it exits.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RestartPolicy {
    /// Always restart, even after a clean exit (default).
    #[default]
    Permanent,
    /// Restart only when the child exits with an error.
    Transient,
    /// Never restart; the exit is accepted as final.
    Temporary,
}

impl RestartPolicy {
    /// Returns `true` when an exit (`failed` = exited with error) must be restarted.
    ///
    /// # Example
    /// ```
    /// use treevisor::RestartPolicy;
    ///
    /// assert!(RestartPolicy::Permanent.should_restart(false));
    /// assert!(!RestartPolicy::Transient.should_restart(false));
    /// assert!(RestartPolicy::Transient.should_restart(true));
    /// assert!(!RestartPolicy::Temporary.should_restart(true));
    /// ```
    #[inline]
    pub fn should_restart(self, failed: bool) -> bool {
        match self {
            RestartPolicy::Permanent => true,
            RestartPolicy::Transient => failed,
            RestartPolicy::Temporary => false,
        }
    }

    /// Short label for logs.
    pub fn as_label(self) -> &'static str {
        match self {
            RestartPolicy::Permanent => "permanent",
            RestartPolicy::Transient => "transient",
            RestartPolicy::Temporary => "temporary",
        }
    }
}

/// Which children a supervisor restarts when one of them has to be restarted.
///
/// Other strategies (restart all siblings, restart the failed child and the
/// ones started after it) plug in here; nothing falls back to them silently.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RestartStrategy {
    /// Restart only the child that exited; siblings keep running.
    #[default]
    OneForOne,
}
