//! # Nested supervision tree and escalation
//!
//! ```text
//! root (intensity 0)
//! ├── heartbeat          permanent worker
//! └── jobs (intensity 2 per 5s)
//!     ├── scheduler      permanent worker
//!     └── flaky          fails every 400ms
//! ```
//!
//! `flaky` is restarted twice; its third failure exhausts `jobs`, which stops
//! `scheduler` and escalates. `root` has no tolerance left, stops
//! `heartbeat` and reports the failure.
//!
//! Run with: `cargo run --example nested_tree`

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use treevisor::{AliveTracker, Event, EventKind, Node, SupervisorSpec, TaskError};

fn ticking(id: &'static str, every: Duration) -> Node {
    Node::worker(id, move |ctx: CancellationToken| async move {
        loop {
            tokio::select! {
                _ = tokio::time::sleep(every) => println!("💓 {id}: tick"),
                _ = ctx.cancelled() => return Ok::<(), TaskError>(()),
            }
        }
    })
}

fn flaky() -> Node {
    Node::worker("flaky", |ctx: CancellationToken| async move {
        tokio::select! {
            _ = tokio::time::sleep(Duration::from_millis(400)) => {
                Err(TaskError::fail("lost connection"))
            }
            _ = ctx.cancelled() => Ok(()),
        }
    })
}

fn print_event(e: &Event) {
    let icon = match e.kind {
        EventKind::ProcessStarted => "▶️ ",
        EventKind::ProcessTerminated => "⏹️ ",
        EventKind::ProcessFailed => "💥",
        EventKind::CleanupFailed => "🧹",
    };
    match &e.error {
        Some(err) => println!("{icon} [{:>3}] {:<10} {} ({err})", e.seq, e.kind.as_label(), e.path),
        None => println!("{icon} [{:>3}] {:<10} {}", e.seq, e.kind.as_label(), e.path),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    println!("🌳 Nested tree demo\n");

    let alive = Arc::new(AliveTracker::new());

    let jobs = SupervisorSpec::new(
        "jobs",
        vec![ticking("scheduler", Duration::from_millis(300)), flaky()],
    )
    .with_intensity(2)
    .with_period(Duration::from_secs(5));

    let handle = SupervisorSpec::new(
        "root",
        vec![ticking("heartbeat", Duration::from_millis(500)), jobs.into()],
    )
    .with_intensity(0)
    .with_observer(print_event)
    .with_shared_observer(alive.clone())
    .start(CancellationToken::new())
    .await?;

    println!("\n🟢 Running: {:?}\n", alive.snapshot());

    let err = match handle.wait().await {
        Ok(()) => {
            println!("\n✅ Tree stopped cleanly");
            return Ok(());
        }
        Err(e) => e,
    };

    println!("\n⚠️  Tree failed: {err}");
    println!("   exhausted supervisor: {:?}", err.exhausted_supervisor());
    println!("   root cause:           {}", err.origin());
    println!("   still running:        {:?}", alive.snapshot());
    println!("   flaky started {} times", alive.starts("root/jobs/flaky"));
    Ok(())
}
