//! # Child-set resolution.
//!
//! A supervisor gets its children from a [`ChildSource`]:
//!
//! - `Static`: a fixed, ordered list of nodes; nothing to clean up.
//! - `Build`: an async builder invoked on **every** (re)start of the owning
//!   supervisor. It acquires shared resources, returns the children that use
//!   them, and a [`Cleanup`] that releases them.
//!
//! ## Resource lifecycle
//! ```text
//! supervisor start ──► build() ──► ChildSet { nodes, cleanup }
//!                                     │
//!                 children run ◄──────┘
//!                      │
//! stop / give up ──► children stopped (reverse) ──► cleanup()
//!                      │
//! restart by parent ──► build() again ──► fresh resources
//! ```
//!
//! A builder that fails (or panics) aborts the supervisor start before any
//! child runs, so there is never a partially built child set to unwind.

use std::future::Future;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;

use crate::error::{BoxError, RuntimeError, panic_message};
use crate::nodes::node::Node;

type CleanupFn = Box<dyn FnOnce() -> BoxFuture<'static, Result<(), BoxError>> + Send>;
type BuildFn = Arc<dyn Fn() -> BoxFuture<'static, Result<ChildSet, BoxError>> + Send + Sync>;

/// Release callback paired with the resources of one [`ChildSet`].
pub struct Cleanup(CleanupFn);

impl Cleanup {
    /// Wraps an async release function.
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        Cleanup(Box::new(move || f().boxed()))
    }

    /// Runs the release function; a panic is reported as an error.
    pub(crate) async fn run(self, path: &Arc<str>) -> Result<(), RuntimeError> {
        let res = std::panic::AssertUnwindSafe((self.0)())
            .catch_unwind()
            .await
            .unwrap_or_else(|payload| Err(panic_message(payload.as_ref()).into()));
        res.map_err(|error| RuntimeError::ResourceCleanup {
            path: Arc::clone(path),
            error,
        })
    }
}

impl std::fmt::Debug for Cleanup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Cleanup")
    }
}

/// Ordered children plus the cleanup of the resources they share.
///
/// # Example
/// ```rust
/// use treevisor::{ChildSet, Node, TaskError};
///
/// let set = ChildSet::new(vec![
///     Node::worker("a", |ctx| async move { ctx.cancelled().await; Ok::<(), TaskError>(()) }),
/// ])
/// .with_cleanup(|| async { Ok::<(), treevisor::BoxError>(()) });
/// assert_eq!(set.len(), 1);
/// ```
#[derive(Debug, Default)]
pub struct ChildSet {
    pub(crate) nodes: Vec<Node>,
    pub(crate) cleanup: Option<Cleanup>,
}

impl ChildSet {
    /// Children without resources to release.
    pub fn new(nodes: Vec<Node>) -> Self {
        Self {
            nodes,
            cleanup: None,
        }
    }

    /// Attaches the release function for the resources the children share.
    pub fn with_cleanup<F, Fut>(mut self, f: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        self.cleanup = Some(Cleanup::new(f));
        self
    }

    /// Number of children.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True if there are no children.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Where a supervisor's children come from.
#[derive(Clone)]
pub enum ChildSource {
    /// Fixed ordered list.
    Static(Vec<Node>),
    /// Builder invoked once per (re)start cycle.
    Build(BuildNodes),
}

/// Shared child-set builder (see [`ChildSource::Build`]).
#[derive(Clone)]
pub struct BuildNodes(BuildFn);

impl BuildNodes {
    /// Wraps an async builder.
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<ChildSet, BoxError>> + Send + 'static,
    {
        BuildNodes(Arc::new(move || f().boxed()))
    }
}

impl ChildSource {
    /// Produces this cycle's children.
    ///
    /// Static lists always succeed. Builder errors and panics become
    /// [`RuntimeError::ResourceAcquisition`] for `path`.
    pub(crate) async fn resolve(&self, path: &Arc<str>) -> Result<ChildSet, RuntimeError> {
        match self {
            ChildSource::Static(nodes) => Ok(ChildSet::new(nodes.clone())),
            ChildSource::Build(build) => {
                let res = std::panic::AssertUnwindSafe((build.0)())
                    .catch_unwind()
                    .await
                    .unwrap_or_else(|payload| Err(panic_message(payload.as_ref()).into()));
                res.map_err(|error| RuntimeError::ResourceAcquisition {
                    path: Arc::clone(path),
                    error,
                })
            }
        }
    }
}

impl std::fmt::Debug for ChildSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChildSource::Static(nodes) => f.debug_tuple("Static").field(nodes).finish(),
            ChildSource::Build(_) => f.write_str("Build(..)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

    fn path() -> Arc<str> {
        Arc::from("root/pool")
    }

    #[tokio::test]
    async fn test_static_source_has_no_cleanup() {
        let src = ChildSource::Static(vec![Node::worker("a", |_ctx| async { Ok::<(), crate::TaskError>(()) })]);
        let set = src.resolve(&path()).await.unwrap();
        assert_eq!(set.len(), 1);
        assert!(set.cleanup.is_none());
    }

    #[tokio::test]
    async fn test_builder_runs_once_per_resolve() {
        let calls = Arc::new(AtomicU32::new(0));
        let seen = Arc::clone(&calls);
        let src = ChildSource::Build(BuildNodes::new(move || {
            let seen = Arc::clone(&seen);
            async move {
                seen.fetch_add(1, Ordering::SeqCst);
                Ok::<_, BoxError>(ChildSet::new(Vec::new()))
            }
        }));

        src.resolve(&path()).await.unwrap();
        src.resolve(&path()).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_builder_error_is_acquisition_error() {
        let src = ChildSource::Build(BuildNodes::new(|| async {
            Err::<ChildSet, BoxError>("no database".into())
        }));
        let err = src.resolve(&path()).await.unwrap_err();
        assert_eq!(err.as_label(), "runtime_resource_acquisition");
        assert_eq!(err.path(), "root/pool");
    }

    #[tokio::test]
    async fn test_builder_panic_is_acquisition_error() {
        let src = ChildSource::Build(BuildNodes::new(|| async {
            if true {
                panic!("builder bug");
            }
            Ok::<_, BoxError>(ChildSet::default())
        }));
        let err = src.resolve(&path()).await.unwrap_err();
        assert!(err.to_string().contains("builder bug"), "{err}");
    }

    #[tokio::test]
    async fn test_cleanup_runs_and_reports_errors() {
        let released = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&released);
        let ok = Cleanup::new(move || async move {
            flag.store(true, Ordering::SeqCst);
            Ok::<(), BoxError>(())
        });
        ok.run(&path()).await.unwrap();
        assert!(released.load(Ordering::SeqCst));

        let bad = Cleanup::new(|| async { Err::<(), BoxError>("still in use".into()) });
        let err = bad.run(&path()).await.unwrap_err();
        assert_eq!(err.as_label(), "runtime_resource_cleanup");
    }
}
