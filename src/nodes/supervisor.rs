//! # Supervisor specification.
//!
//! [`SupervisorSpec`] describes an internal node of the tree:
//!
//! - where its children come from ([`ChildSource`]: fixed list or builder)
//! - its restart tolerance (`intensity` restarts per `period`)
//! - the [`RestartStrategy`] applied to failing children
//! - the [`RestartPolicy`] its own parent applies to it
//! - extra observers that see the events of this subtree
//!
//! The spec is immutable once handed to a parent or to
//! [`SupervisorSpec::start`](crate::SupervisorSpec::start); every (re)start of
//! the supervisor begins from the same spec.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::core::Config;
use crate::error::BoxError;
use crate::nodes::children::{BuildNodes, ChildSet, ChildSource};
use crate::nodes::node::Node;
use crate::observers::Observe;
use crate::policies::{DEFAULT_INTENSITY, DEFAULT_PERIOD, RestartPolicy, RestartStrategy};

/// Immutable description of a supervisor node.
///
/// ## Example
/// ```rust
/// use std::time::Duration;
/// use treevisor::{Node, SupervisorSpec, TaskError};
///
/// let spec = SupervisorSpec::new("root", vec![
///     Node::worker("a", |ctx| async move { ctx.cancelled().await; Ok::<(), TaskError>(()) }),
///     Node::worker("b", |ctx| async move { ctx.cancelled().await; Ok::<(), TaskError>(()) }),
/// ])
/// .with_intensity(3)
/// .with_period(Duration::from_secs(10));
///
/// assert_eq!(spec.id(), "root");
/// assert_eq!(spec.intensity(), 3);
/// ```
#[derive(Clone)]
pub struct SupervisorSpec {
    id: Arc<str>,
    source: ChildSource,
    intensity: u32,
    period: Duration,
    strategy: RestartStrategy,
    restart: RestartPolicy,
    observers: Vec<Arc<dyn Observe>>,
}

impl SupervisorSpec {
    /// Supervisor over a fixed, ordered list of children.
    pub fn new(id: impl Into<Arc<str>>, children: Vec<Node>) -> Self {
        Self::from_source(id, ChildSource::Static(children))
    }

    /// Supervisor whose children are produced by `build` on every (re)start.
    ///
    /// `build` acquires the resources the children share and returns them
    /// together with a cleanup (see [`ChildSet::with_cleanup`]).
    pub fn with_resources<F, Fut>(id: impl Into<Arc<str>>, build: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<ChildSet, BoxError>> + Send + 'static,
    {
        Self::from_source(id, ChildSource::Build(BuildNodes::new(build)))
    }

    fn from_source(id: impl Into<Arc<str>>, source: ChildSource) -> Self {
        Self {
            id: id.into(),
            source,
            intensity: DEFAULT_INTENSITY,
            period: DEFAULT_PERIOD,
            strategy: RestartStrategy::default(),
            restart: RestartPolicy::default(),
            observers: Vec::new(),
        }
    }

    /// Sets how many restarts are tolerated within the period.
    pub fn with_intensity(mut self, intensity: u32) -> Self {
        self.intensity = intensity;
        self
    }

    /// Sets the length of the restart window.
    pub fn with_period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }

    /// Sets the strategy applied to failing children.
    pub fn with_strategy(mut self, strategy: RestartStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Sets the policy the parent applies when this supervisor exits.
    pub fn with_restart(mut self, restart: RestartPolicy) -> Self {
        self.restart = restart;
        self
    }

    /// Adds an observer for the events of this subtree.
    pub fn with_observer(mut self, observer: impl Observe) -> Self {
        self.observers.push(Arc::new(observer));
        self
    }

    /// Adds an already shared observer (e.g. an `Arc<AliveTracker>` kept by the caller).
    pub fn with_shared_observer(mut self, observer: Arc<dyn Observe>) -> Self {
        self.observers.push(observer);
        self
    }

    /// Takes restart tolerance from `cfg`.
    pub fn with_config(mut self, cfg: &Config) -> Self {
        self.intensity = cfg.intensity;
        self.period = cfg.period;
        self
    }

    /// Id among siblings.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Restarts tolerated within [`period`](Self::period).
    pub fn intensity(&self) -> u32 {
        self.intensity
    }

    /// Length of the restart window.
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Strategy applied to failing children.
    pub fn strategy(&self) -> RestartStrategy {
        self.strategy
    }

    /// Policy the parent applies when this supervisor exits.
    pub fn restart(&self) -> RestartPolicy {
        self.restart
    }

    pub(crate) fn source(&self) -> &ChildSource {
        &self.source
    }

    pub(crate) fn observers(&self) -> &[Arc<dyn Observe>] {
        &self.observers
    }
}

impl fmt::Debug for SupervisorSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SupervisorSpec")
            .field("id", &self.id)
            .field("source", &self.source)
            .field("intensity", &self.intensity)
            .field("period", &self.period)
            .field("strategy", &self.strategy)
            .field("restart", &self.restart)
            .field("observers", &self.observers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::Event;

    #[test]
    fn test_defaults() {
        let spec = SupervisorSpec::new("root", Vec::new());
        assert_eq!(spec.intensity(), 1);
        assert_eq!(spec.period(), Duration::from_secs(5));
        assert_eq!(spec.strategy(), RestartStrategy::OneForOne);
        assert_eq!(spec.restart(), RestartPolicy::Permanent);
        assert!(spec.observers().is_empty());
    }

    #[test]
    fn test_config_sets_tolerance() {
        let cfg = Config {
            intensity: 4,
            period: Duration::from_secs(30),
            ..Config::default()
        };
        let spec = SupervisorSpec::new("root", Vec::new())
            .with_config(&cfg)
            .with_observer(|_: &Event| {});
        assert_eq!(spec.intensity(), 4);
        assert_eq!(spec.period(), Duration::from_secs(30));
        assert_eq!(spec.observers().len(), 1);
    }

    #[test]
    fn test_resources_source_is_builder() {
        let spec = SupervisorSpec::with_resources("pool", || async {
            Ok::<_, BoxError>(ChildSet::default())
        });
        assert!(matches!(spec.source(), ChildSource::Build(_)));
    }
}
