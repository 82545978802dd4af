use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::core::ProcessState;
use crate::core::supervisor::SupervisorRuntime;
use crate::error::{BoxError, RuntimeError, TaskError};
use crate::events::{Event, EventKind, NodeTag, Notifier};
use crate::nodes::{ChildSet, Node, SupervisorSpec, WorkerSpec};
use crate::observers::{AliveTracker, Observe};
use crate::policies::{BackoffPolicy, RestartPolicy};

#[derive(Default)]
struct EventRecorder {
    events: Mutex<Vec<Event>>,
}

impl Observe for EventRecorder {
    fn on_event(&self, event: &Event) {
        self.events.lock().unwrap().push(event.clone());
    }
}

impl EventRecorder {
    fn paths(&self, kind: EventKind) -> Vec<String> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.kind == kind)
            .map(|e| e.path.to_string())
            .collect()
    }

    fn count(&self, kind: EventKind, path: &str) -> usize {
        self.paths(kind).iter().filter(|p| *p == path).count()
    }

    fn find(&self, kind: EventKind, path: &str) -> Vec<Event> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.kind == kind && &*e.path == path)
            .cloned()
            .collect()
    }

    fn sequence(&self) -> Vec<(EventKind, String)> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .map(|e| (e.kind, e.path.to_string()))
            .collect()
    }
}

/// Polls `cond` until it holds, failing the test after five seconds.
async fn eventually(cond: impl Fn() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !cond() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "condition not reached in time"
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

fn idle(id: &'static str) -> Node {
    Node::worker(id, |ctx: CancellationToken| async move {
        ctx.cancelled().await;
        Ok::<(), TaskError>(())
    })
}

fn failing(id: &'static str) -> Node {
    Node::worker(id, |_ctx: CancellationToken| async {
        Err::<(), _>(TaskError::fail("boom"))
    })
}

/// Fails its first `n` runs, then idles until cancelled.
fn fails_first(id: &'static str, n: u32) -> Node {
    let runs = Arc::new(AtomicU32::new(0));
    Node::worker(id, move |ctx: CancellationToken| {
        let runs = Arc::clone(&runs);
        async move {
            if runs.fetch_add(1, Ordering::SeqCst) < n {
                return Err(TaskError::fail("boom"));
            }
            ctx.cancelled().await;
            Ok::<(), TaskError>(())
        }
    })
}

fn with_restart(node: Node, restart: RestartPolicy) -> Node {
    match node {
        Node::Worker(w) => w.with_restart(restart).into(),
        Node::Supervisor(s) => s.with_restart(restart).into(),
    }
}

fn recorded(spec: SupervisorSpec) -> (SupervisorSpec, Arc<EventRecorder>) {
    let recorder = Arc::new(EventRecorder::default());
    let spec = spec.with_shared_observer(recorder.clone());
    (spec, recorder)
}

/// Shared resource with an identity per acquisition.
struct Resource {
    version: u32,
    closed: AtomicBool,
}

impl Resource {
    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[tokio::test]
async fn test_start_is_preorder_and_shutdown_is_exact_reverse() {
    let sub = SupervisorSpec::new("sub", vec![idle("c"), idle("d")]);
    let (spec, rec) = recorded(SupervisorSpec::new(
        "root",
        vec![idle("a"), idle("b"), sub.into(), idle("e")],
    ));

    let handle = spec.start(CancellationToken::new()).await.unwrap();
    assert_eq!(
        rec.paths(EventKind::ProcessStarted),
        vec![
            "root/a",
            "root/b",
            "root/sub/c",
            "root/sub/d",
            "root/sub",
            "root/e",
            "root"
        ]
    );

    handle.terminate().await.unwrap();
    assert_eq!(
        rec.paths(EventKind::ProcessTerminated),
        vec![
            "root/e",
            "root/sub/d",
            "root/sub/c",
            "root/sub",
            "root/b",
            "root/a",
            "root"
        ]
    );
}

#[tokio::test]
async fn test_transient_clean_exit_is_not_a_restart() {
    let done = Node::from(
        WorkerSpec::builder("done")
            .with_restart(RestartPolicy::Transient)
            .build(|_ctx: CancellationToken| async { Ok::<(), TaskError>(()) }),
    );
    let (spec, rec) = recorded(
        SupervisorSpec::new("root", vec![done, idle("idle")]).with_intensity(0),
    );

    let handle = spec.start(CancellationToken::new()).await.unwrap();
    eventually(|| rec.count(EventKind::ProcessTerminated, "root/done") == 1).await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert!(!handle.is_finished(), "a clean transient exit must not trip the window");
    assert_eq!(rec.count(EventKind::ProcessStarted, "root/done"), 1);
    assert_eq!(rec.count(EventKind::ProcessFailed, "root/done"), 0);
    handle.terminate().await.unwrap();
}

#[tokio::test]
async fn test_transient_failure_is_restarted() {
    let flaky = with_restart(fails_first("flaky", 1), RestartPolicy::Transient);
    let (spec, rec) = recorded(SupervisorSpec::new("root", vec![flaky, idle("idle")]));

    let handle = spec.start(CancellationToken::new()).await.unwrap();
    eventually(|| rec.count(EventKind::ProcessStarted, "root/flaky") == 2).await;

    assert_eq!(rec.count(EventKind::ProcessFailed, "root/flaky"), 1);
    assert_eq!(rec.find(EventKind::ProcessStarted, "root/flaky")[1].restarts, Some(1));
    assert!(!handle.is_finished());

    handle.terminate().await.unwrap();
    assert_eq!(rec.count(EventKind::ProcessTerminated, "root/flaky"), 1);
}

#[tokio::test]
async fn test_temporary_failure_is_accepted() {
    let tmp = with_restart(failing("tmp"), RestartPolicy::Temporary);
    let (spec, rec) = recorded(
        SupervisorSpec::new("root", vec![tmp, idle("idle")]).with_intensity(0),
    );

    let handle = spec.start(CancellationToken::new()).await.unwrap();
    eventually(|| rec.count(EventKind::ProcessFailed, "root/tmp") == 1).await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert!(!handle.is_finished());
    assert_eq!(rec.count(EventKind::ProcessStarted, "root/tmp"), 1);
    handle.terminate().await.unwrap();
}

#[tokio::test]
async fn test_permanent_clean_exit_is_restarted() {
    let runs = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&runs);
    let once = Node::worker("once", move |ctx: CancellationToken| {
        let counter = Arc::clone(&counter);
        async move {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                return Ok(());
            }
            ctx.cancelled().await;
            Ok::<(), TaskError>(())
        }
    });
    let (spec, rec) = recorded(SupervisorSpec::new("root", vec![once]).with_intensity(3));

    let handle = spec.start(CancellationToken::new()).await.unwrap();
    eventually(|| rec.count(EventKind::ProcessStarted, "root/once") == 2).await;

    let restarted = rec.find(EventKind::ProcessStarted, "root/once");
    assert_eq!(restarted[0].restarts, Some(0));
    assert_eq!(restarted[1].restarts, Some(1));
    assert_eq!(rec.count(EventKind::ProcessTerminated, "root/once"), 1);
    handle.terminate().await.unwrap();
}

#[tokio::test]
async fn test_permanent_clean_exit_escalates_as_unexpected_exit() {
    let quits = Node::worker("quits", |_ctx: CancellationToken| async {
        Ok::<(), TaskError>(())
    });
    let spec = SupervisorSpec::new("root", vec![quits]).with_intensity(0);

    let handle = spec.start(CancellationToken::new()).await.unwrap();
    let err = handle.wait().await.unwrap_err();

    assert_eq!(err.as_label(), "runtime_tolerance_exceeded");
    assert!(matches!(
        err.origin(),
        RuntimeError::UnexpectedExit { path } if &**path == "root/quits"
    ));
}

#[tokio::test]
async fn test_more_failures_than_intensity_fail_the_supervisor() {
    let (spec, rec) = recorded(
        SupervisorSpec::new("root", vec![idle("idle"), failing("flaky")]).with_intensity(2),
    );

    let handle = spec.start(CancellationToken::new()).await.unwrap();
    let err = handle.wait().await.unwrap_err();

    match &err {
        RuntimeError::ToleranceExceeded {
            path, intensity, ..
        } => {
            assert_eq!(&**path, "root");
            assert_eq!(*intensity, 2);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(err.origin().path(), "root/flaky");
    assert_eq!(err.origin().as_label(), "runtime_worker_failure");

    // initial run + two restarts
    assert_eq!(rec.count(EventKind::ProcessStarted, "root/flaky"), 3);
    assert_eq!(rec.count(EventKind::ProcessFailed, "root/flaky"), 3);

    let seq = rec.sequence();
    let idle_stop = seq
        .iter()
        .position(|e| *e == (EventKind::ProcessTerminated, "root/idle".to_string()))
        .unwrap();
    let root_fail = seq
        .iter()
        .position(|e| *e == (EventKind::ProcessFailed, "root".to_string()))
        .unwrap();
    assert!(idle_stop < root_fail, "children are stopped before the supervisor fails");
    assert_eq!(root_fail, seq.len() - 1);
}

#[tokio::test]
async fn test_failures_of_different_children_share_the_window() {
    let (spec, rec) = recorded(
        SupervisorSpec::new("root", vec![fails_first("w1", 1), fails_first("w2", 1)])
            .with_intensity(1),
    );

    // Both fail right away; the second failure trips intensity 1.
    let handle = spec.start(CancellationToken::new()).await.unwrap();
    let err = handle.wait().await.unwrap_err();

    assert_eq!(err.exhausted_supervisor(), Some("root"));
    assert_eq!(rec.count(EventKind::ProcessFailed, "root"), 1);
}

#[tokio::test]
async fn test_one_for_one_leaves_siblings_alone() {
    let alive = Arc::new(AliveTracker::new());
    let spec = SupervisorSpec::new(
        "root",
        vec![idle("steady"), fails_first("flaky", 2), idle("other")],
    )
    .with_intensity(5)
    .with_shared_observer(alive.clone());

    let handle = spec.start(CancellationToken::new()).await.unwrap();
    eventually(|| alive.starts("root/flaky") == 3).await;
    eventually(|| alive.state("root/flaky") == Some(ProcessState::Running)).await;

    assert_eq!(alive.starts("root/steady"), 1);
    assert_eq!(alive.starts("root/other"), 1);
    assert_eq!(alive.state("root/steady"), Some(ProcessState::Running));
    assert_eq!(alive.state("root/other"), Some(ProcessState::Running));
    assert_eq!(
        alive.snapshot(),
        vec!["root", "root/flaky", "root/other", "root/steady"]
    );

    handle.terminate().await.unwrap();
    assert!(alive.snapshot().is_empty());
}

#[tokio::test]
async fn test_escalation_through_resource_supervisor() {
    let builds = Arc::new(AtomicU32::new(0));
    let resources: Arc<Mutex<Vec<Arc<Resource>>>> = Arc::default();

    let a = {
        let builds = Arc::clone(&builds);
        let resources = Arc::clone(&resources);
        SupervisorSpec::with_resources("A", move || {
            let builds = Arc::clone(&builds);
            let resources = Arc::clone(&resources);
            async move {
                let version = builds.fetch_add(1, Ordering::SeqCst) + 1;
                let res = Arc::new(Resource {
                    version,
                    closed: AtomicBool::new(false),
                });
                resources.lock().unwrap().push(Arc::clone(&res));

                let r1 = Arc::clone(&res);
                let w1 = Node::worker("w1", move |_ctx: CancellationToken| {
                    let r1 = Arc::clone(&r1);
                    async move {
                        assert!(!r1.is_closed());
                        Err::<(), _>(TaskError::fail("w1 broke"))
                    }
                });
                let r2 = Arc::clone(&res);
                let w2 = Node::worker("w2", move |ctx: CancellationToken| {
                    let r2 = Arc::clone(&r2);
                    async move {
                        assert!(!r2.is_closed());
                        ctx.cancelled().await;
                        Ok::<(), TaskError>(())
                    }
                });

                Ok::<_, BoxError>(ChildSet::new(vec![w1, w2]).with_cleanup(move || async move {
                    res.closed.store(true, Ordering::SeqCst);
                    Ok::<(), BoxError>(())
                }))
            }
        })
        .with_intensity(1)
        .with_period(Duration::from_secs(5))
    };

    let (spec, rec) = recorded(SupervisorSpec::new("root", vec![a.into()]).with_intensity(0));
    let handle = spec.start(CancellationToken::new()).await.unwrap();
    let err = handle.wait().await.unwrap_err();

    assert!(matches!(err, RuntimeError::ToleranceExceeded { .. }));
    assert_eq!(err.path(), "root");
    assert_eq!(err.exhausted_supervisor(), Some("root/A"));
    assert_eq!(err.origin().path(), "root/A/w1");

    // w1 restarted once, then A gave up and stopped w2
    assert_eq!(rec.count(EventKind::ProcessStarted, "root/A/w1"), 2);
    assert_eq!(rec.count(EventKind::ProcessStarted, "root/A/w2"), 1);
    assert_eq!(rec.count(EventKind::ProcessTerminated, "root/A/w2"), 1);
    assert_eq!(rec.count(EventKind::ProcessFailed, "root/A"), 1);
    assert_eq!(rec.count(EventKind::ProcessFailed, "root"), 1);

    assert_eq!(builds.load(Ordering::SeqCst), 1);
    let resources = resources.lock().unwrap();
    assert!(resources.iter().all(|r| r.is_closed()));
}

#[tokio::test]
async fn test_resources_are_rebuilt_on_every_restart_cycle() {
    let builds = Arc::new(AtomicU32::new(0));
    let seen: Arc<Mutex<Vec<u32>>> = Arc::default();
    let resources: Arc<Mutex<Vec<Arc<Resource>>>> = Arc::default();

    let pool = {
        let builds = Arc::clone(&builds);
        let seen = Arc::clone(&seen);
        let resources = Arc::clone(&resources);
        SupervisorSpec::with_resources("pool", move || {
            let builds = Arc::clone(&builds);
            let seen = Arc::clone(&seen);
            let resources = Arc::clone(&resources);
            async move {
                let version = builds.fetch_add(1, Ordering::SeqCst) + 1;
                let res = Arc::new(Resource {
                    version,
                    closed: AtomicBool::new(false),
                });
                resources.lock().unwrap().push(Arc::clone(&res));

                let user = Arc::clone(&res);
                let w = Node::worker("user", move |ctx: CancellationToken| {
                    let user = Arc::clone(&user);
                    let seen = Arc::clone(&seen);
                    async move {
                        seen.lock().unwrap().push(user.version);
                        if user.version == 1 {
                            return Err(TaskError::fail("stale connection"));
                        }
                        ctx.cancelled().await;
                        Ok::<(), TaskError>(())
                    }
                });

                Ok::<_, BoxError>(ChildSet::new(vec![w]).with_cleanup(move || async move {
                    res.closed.store(true, Ordering::SeqCst);
                    Ok::<(), BoxError>(())
                }))
            }
        })
        .with_intensity(0)
    };

    let (spec, rec) = recorded(SupervisorSpec::new("root", vec![pool.into()]).with_intensity(3));
    let handle = spec.start(CancellationToken::new()).await.unwrap();
    eventually(|| seen.lock().unwrap().len() == 2).await;
    eventually(|| rec.count(EventKind::ProcessStarted, "root/pool") == 2).await;

    assert_eq!(*seen.lock().unwrap(), vec![1, 2]);
    {
        let resources = resources.lock().unwrap();
        assert!(resources[0].is_closed(), "previous cycle's resource is released");
        assert!(!resources[1].is_closed());
    }
    let starts = rec.find(EventKind::ProcessStarted, "root/pool");
    assert_eq!(starts.len(), 2);
    assert_eq!(starts[1].restarts, Some(1));
    assert_eq!(starts[1].node, NodeTag::Supervisor);

    handle.terminate().await.unwrap();
    assert!(resources.lock().unwrap().iter().all(|r| r.is_closed()));
}

#[tokio::test]
async fn test_child_start_failure_unwinds_started_siblings() {
    let bad = SupervisorSpec::with_resources("bad", || async {
        Err::<ChildSet, BoxError>("database unreachable".into())
    });
    let (spec, rec) = recorded(SupervisorSpec::new(
        "root",
        vec![idle("first"), bad.into(), idle("third")],
    ));

    let err = spec.start(CancellationToken::new()).await.unwrap_err();
    assert_eq!(err.as_label(), "runtime_start_failed");
    assert_eq!(err.path(), "root");
    assert_eq!(err.origin().as_label(), "runtime_resource_acquisition");
    assert_eq!(err.origin().path(), "root/bad");

    assert_eq!(
        rec.sequence(),
        vec![
            (EventKind::ProcessStarted, "root/first".to_string()),
            (EventKind::ProcessFailed, "root/bad".to_string()),
            (EventKind::ProcessTerminated, "root/first".to_string()),
            (EventKind::ProcessFailed, "root".to_string()),
        ]
    );
}

#[tokio::test]
async fn test_duplicate_sibling_ids_are_rejected() {
    let (spec, rec) = recorded(SupervisorSpec::new("root", vec![idle("a"), idle("a")]));

    let err = spec.start(CancellationToken::new()).await.unwrap_err();
    assert!(matches!(err, RuntimeError::DuplicateChild { ref id, .. } if id == "a"));
    assert_eq!(rec.count(EventKind::ProcessStarted, "root/a"), 0);
    assert_eq!(rec.count(EventKind::ProcessFailed, "root"), 1);
}

#[tokio::test]
async fn test_cleanup_failure_does_not_block_shutdown() {
    let (spec, rec) = recorded(SupervisorSpec::with_resources("root", || async {
        Ok::<_, BoxError>(ChildSet::new(vec![idle("w")]).with_cleanup(|| async {
            Err::<(), BoxError>("socket already closed".into())
        }))
    }));

    let handle = spec.start(CancellationToken::new()).await.unwrap();
    handle.terminate().await.unwrap();

    let seq = rec.sequence();
    assert_eq!(
        &seq[seq.len() - 3..],
        &[
            (EventKind::ProcessTerminated, "root/w".to_string()),
            (EventKind::CleanupFailed, "root".to_string()),
            (EventKind::ProcessTerminated, "root".to_string()),
        ]
    );
    let failed = rec.find(EventKind::CleanupFailed, "root");
    assert!(failed[0].error.as_deref().unwrap().contains("socket already closed"));
}

#[tokio::test]
async fn test_cancelling_context_stops_the_tree() {
    let ctx = CancellationToken::new();
    let (spec, rec) = recorded(SupervisorSpec::new("root", vec![idle("a")]));

    let handle = spec.start(ctx.clone()).await.unwrap();
    assert_eq!(handle.path(), "root");
    ctx.cancel();
    handle.wait().await.unwrap();
    assert_eq!(rec.count(EventKind::ProcessTerminated, "root/a"), 1);
    assert_eq!(rec.count(EventKind::ProcessTerminated, "root"), 1);
}

#[tokio::test]
async fn test_panicking_worker_is_a_failure() {
    let boom = Node::worker("boom", |_ctx: CancellationToken| async {
        if true {
            panic!("worker bug");
        }
        Ok::<(), TaskError>(())
    });
    let (spec, rec) = recorded(SupervisorSpec::new(
        "root",
        vec![with_restart(boom, RestartPolicy::Temporary), idle("idle")],
    ));

    let handle = spec.start(CancellationToken::new()).await.unwrap();
    eventually(|| rec.count(EventKind::ProcessFailed, "root/boom") == 1).await;

    let failed = rec.find(EventKind::ProcessFailed, "root/boom");
    assert!(failed[0].error.as_deref().unwrap().contains("worker bug"));
    handle.terminate().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_restart_delay_applies_from_second_run() {
    let runs: Arc<Mutex<Vec<tokio::time::Instant>>> = Arc::default();
    let log = Arc::clone(&runs);
    let worker = WorkerSpec::builder("slow")
        .with_backoff(BackoffPolicy {
            first: Duration::from_secs(2),
            ..BackoffPolicy::default()
        })
        .build(move |ctx: CancellationToken| {
            let log = Arc::clone(&log);
            async move {
                let first = {
                    let mut log = log.lock().unwrap();
                    log.push(tokio::time::Instant::now());
                    log.len() == 1
                };
                if first {
                    return Err(TaskError::fail("first run fails"));
                }
                ctx.cancelled().await;
                Ok::<(), TaskError>(())
            }
        });
    let spec = SupervisorSpec::new("root", vec![worker.into()]).with_intensity(3);

    let handle = spec.start(CancellationToken::new()).await.unwrap();
    eventually(|| runs.lock().unwrap().len() == 2).await;

    let runs = runs.lock().unwrap().clone();
    assert!(runs[1] - runs[0] >= Duration::from_secs(2));
    handle.terminate().await.unwrap();
}

#[tokio::test]
async fn test_subtree_observers_only_see_their_subtree() {
    let inner = Arc::new(EventRecorder::default());
    let sub = SupervisorSpec::new("sub", vec![idle("x")]).with_shared_observer(inner.clone());
    let (spec, outer) = recorded(SupervisorSpec::new("root", vec![idle("a"), sub.into()]));

    let handle = spec.start(CancellationToken::new()).await.unwrap();
    handle.terminate().await.unwrap();

    assert!(inner.sequence().iter().all(|(_, p)| p.starts_with("root/sub")));
    assert_eq!(inner.count(EventKind::ProcessStarted, "root/sub/x"), 1);
    assert_eq!(outer.count(EventKind::ProcessStarted, "root/sub/x"), 1);
    assert_eq!(outer.count(EventKind::ProcessStarted, "root/a"), 1);
}

#[tokio::test]
async fn test_huge_intensity_is_accepted() {
    let (spec, rec) = recorded(
        SupervisorSpec::new("root", vec![fails_first("w", 3), idle("idle")])
            .with_intensity(u32::MAX),
    );

    let handle = spec.start(CancellationToken::new()).await.unwrap();
    eventually(|| rec.count(EventKind::ProcessStarted, "root/w") == 4).await;

    assert!(!handle.is_finished());
    handle.terminate().await.unwrap();
}

#[tokio::test]
async fn test_rebuilt_subtree_starts_with_a_fresh_window() {
    let sub = SupervisorSpec::new("sub", vec![fails_first("w", 3)])
        .with_intensity(1)
        .with_period(Duration::from_secs(60));
    let (spec, rec) = recorded(
        SupervisorSpec::new("root", vec![sub.into()])
            .with_intensity(5)
            .with_period(Duration::from_secs(60)),
    );

    // First incarnation: restart after run 1, gives up after run 2.
    // Second incarnation absorbs the failure of run 3; run 4 stays up.
    let handle = spec.start(CancellationToken::new()).await.unwrap();
    eventually(|| rec.count(EventKind::ProcessStarted, "root/sub/w") == 4).await;

    assert_eq!(rec.count(EventKind::ProcessFailed, "root/sub/w"), 3);
    assert_eq!(rec.count(EventKind::ProcessFailed, "root/sub"), 1);
    assert_eq!(rec.count(EventKind::ProcessStarted, "root/sub"), 2);
    assert!(!handle.is_finished());

    handle.terminate().await.unwrap();
    assert_eq!(rec.count(EventKind::ProcessFailed, "root/sub"), 1);
    assert_eq!(rec.count(EventKind::ProcessTerminated, "root/sub"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_failures_further_apart_than_period_never_trip() {
    let periodic = Node::worker("periodic", |ctx: CancellationToken| async move {
        tokio::select! {
            _ = tokio::time::sleep(Duration::from_secs(2)) => Err(TaskError::fail("timeout")),
            _ = ctx.cancelled() => Ok(()),
        }
    });
    let (spec, rec) = recorded(
        SupervisorSpec::new("root", vec![periodic])
            .with_intensity(1)
            .with_period(Duration::from_secs(1)),
    );

    let handle = spec.start(CancellationToken::new()).await.unwrap();
    // Failures land at t = 2s, 4s, 6s, 8s and 10s.
    tokio::time::sleep(Duration::from_millis(10_500)).await;

    assert_eq!(rec.count(EventKind::ProcessFailed, "root/periodic"), 5);
    assert_eq!(rec.count(EventKind::ProcessStarted, "root/periodic"), 6);
    assert!(!handle.is_finished());
    handle.terminate().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_stop_during_failing_subtree_restarts_terminates() {
    let builds = Arc::new(AtomicU32::new(0));
    let db = {
        let builds = Arc::clone(&builds);
        SupervisorSpec::with_resources("db", move || {
            let builds = Arc::clone(&builds);
            async move {
                if builds.fetch_add(1, Ordering::SeqCst) == 0 {
                    return Ok(ChildSet::new(vec![failing("conn")]));
                }
                tokio::time::sleep(Duration::from_millis(200)).await;
                Err::<ChildSet, BoxError>("database unreachable".into())
            }
        })
        .with_intensity(0)
    };
    let (spec, rec) = recorded(
        SupervisorSpec::new("root", vec![idle("api"), db.into()])
            .with_intensity(50)
            .with_period(Duration::from_secs(60)),
    );

    let handle = spec.start(CancellationToken::new()).await.unwrap();
    // Rebuilds fail at t = 200ms and 400ms; the stop lands in between.
    tokio::time::sleep(Duration::from_millis(300)).await;
    handle.terminate().await.unwrap();

    assert_eq!(builds.load(Ordering::SeqCst), 3);
    assert_eq!(rec.count(EventKind::ProcessTerminated, "root/api"), 1);
    assert_eq!(rec.count(EventKind::ProcessTerminated, "root"), 1);
    assert_eq!(rec.count(EventKind::ProcessFailed, "root"), 0);
}

#[tokio::test]
async fn test_dropped_runtime_stops_children_and_releases_resources() {
    let closed = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&closed);
    let (spec, rec) = recorded(SupervisorSpec::with_resources("root", move || {
        let flag = Arc::clone(&flag);
        async move {
            Ok::<_, BoxError>(ChildSet::new(vec![idle("a"), idle("b")]).with_cleanup(
                move || async move {
                    flag.store(true, Ordering::SeqCst);
                    Ok::<(), BoxError>(())
                },
            ))
        }
    }));

    let runtime = SupervisorRuntime::start(
        spec,
        Arc::from("root"),
        CancellationToken::new(),
        &Notifier::default(),
        0,
    )
    .await
    .unwrap();
    assert_eq!(rec.count(EventKind::ProcessStarted, "root/b"), 1);

    drop(runtime);
    eventually(|| closed.load(Ordering::SeqCst)).await;

    let seq = rec.sequence();
    let stop_b = seq
        .iter()
        .position(|e| *e == (EventKind::ProcessTerminated, "root/b".to_string()))
        .unwrap();
    let stop_a = seq
        .iter()
        .position(|e| *e == (EventKind::ProcessTerminated, "root/a".to_string()))
        .unwrap();
    assert!(stop_b < stop_a, "children are stopped in reverse order");
}
