//! # Tree node.
//!
//! [`Node`] is the closed set of things a supervisor can own: a leaf
//! [`WorkerSpec`] or a nested [`SupervisorSpec`]. Every consumer (start,
//! stop, event emission) matches on it exhaustively.

use std::borrow::Cow;
use std::future::Future;

use tokio_util::sync::CancellationToken;

use crate::error::TaskError;
use crate::events::NodeTag;
use crate::nodes::supervisor::SupervisorSpec;
use crate::nodes::worker::WorkerSpec;
use crate::policies::RestartPolicy;

/// A child of a supervisor.
#[derive(Clone, Debug)]
pub enum Node {
    /// Leaf running a task.
    Worker(WorkerSpec),
    /// Nested supervisor with its own children.
    Supervisor(SupervisorSpec),
}

impl Node {
    /// Permanent worker running `f`.
    ///
    /// Shorthand for `WorkerSpec::builder(id).build(f).into()`.
    pub fn worker<F, Fut>(id: impl Into<Cow<'static, str>>, f: F) -> Self
    where
        F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), TaskError>> + Send + 'static,
    {
        Node::Worker(WorkerSpec::builder(id).build(f))
    }

    /// Id among siblings.
    pub fn id(&self) -> &str {
        match self {
            Node::Worker(w) => w.id(),
            Node::Supervisor(s) => s.id(),
        }
    }

    /// Kind of node, as reported in events.
    pub fn tag(&self) -> NodeTag {
        match self {
            Node::Worker(_) => NodeTag::Worker,
            Node::Supervisor(_) => NodeTag::Supervisor,
        }
    }

    /// Policy the parent applies when this node exits.
    pub fn restart(&self) -> RestartPolicy {
        match self {
            Node::Worker(w) => w.restart(),
            Node::Supervisor(s) => s.restart(),
        }
    }
}

impl From<WorkerSpec> for Node {
    fn from(spec: WorkerSpec) -> Self {
        Node::Worker(spec)
    }
}

impl From<SupervisorSpec> for Node {
    fn from(spec: SupervisorSpec) -> Self {
        Node::Supervisor(spec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_delegates_to_spec() {
        let w = Node::worker("w", |_ctx| async { Ok::<(), TaskError>(()) });
        assert_eq!(w.id(), "w");
        assert_eq!(w.tag(), NodeTag::Worker);
        assert_eq!(w.restart(), RestartPolicy::Permanent);

        let s: Node = SupervisorSpec::new("sup", vec![w])
            .with_restart(RestartPolicy::Transient)
            .into();
        assert_eq!(s.id(), "sup");
        assert_eq!(s.tag(), NodeTag::Supervisor);
        assert_eq!(s.restart(), RestartPolicy::Transient);
    }
}
