//! # Producer / consumer pipeline
//!
//! Demonstrates resource-scoped children:
//! - The channel between producer and consumer is created by the `pipeline`
//!   supervisor for every restart cycle
//! - The consumer fails on multiples of 7 and is restarted (one-for-one)
//! - Restarts beyond the pipeline's tolerance rebuild the whole pipeline
//! - Ctrl+C stops the tree in reverse start order
//!
//! Run with: `cargo run --example producer_consumer --features logging`

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use treevisor::{BackoffPolicy, BoxError, ChildSet, LogWriter, Node, SupervisorSpec, TaskError, WorkerSpec};

/// Sends an increasing number every 300ms.
fn producer(tx: mpsc::Sender<u64>, generation: u32) -> Node {
    let counter = Arc::new(AtomicU64::new(1));

    Node::worker("producer", move |ctx: CancellationToken| {
        let tx = tx.clone();
        let counter = counter.clone();

        async move {
            loop {
                let num = counter.fetch_add(1, Ordering::Relaxed);
                if tx.send(num).await.is_err() {
                    return Err(TaskError::fail("channel closed"));
                }
                println!("📤 Producer[gen {generation}]: sent {num}");

                tokio::select! {
                    _ = tokio::time::sleep(Duration::from_millis(300)) => {},
                    _ = ctx.cancelled() => return Ok(()),
                }
            }
        }
    })
}

/// Receives numbers and fails on multiples of 7.
fn consumer(rx: Arc<Mutex<mpsc::Receiver<u64>>>, generation: u32) -> Node {
    let spec = WorkerSpec::builder("consumer")
        .with_backoff(BackoffPolicy {
            first: Duration::from_millis(500),
            max: Duration::from_secs(2),
            factor: 2.0,
            ..BackoffPolicy::default()
        })
        .build(move |ctx: CancellationToken| {
            let rx = rx.clone();

            async move {
                let mut rx = rx.lock().await;
                loop {
                    let num = tokio::select! {
                        num = rx.recv() => num,
                        _ = ctx.cancelled() => return Ok(()),
                    };
                    match num {
                        Some(num) if num % 7 == 0 => {
                            return Err(TaskError::fail(format!("cannot digest {num}")));
                        }
                        Some(num) => println!("📥 Consumer[gen {generation}]: got {num}"),
                        None => return Ok(()),
                    }
                }
            }
        });
    spec.into()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    println!("🚀 Producer / consumer demo");
    println!("   The consumer fails on multiples of 7; watch the restarts.");
    println!("   Press Ctrl+C to stop\n");

    let generations = Arc::new(AtomicU32::new(0));

    let pipeline = SupervisorSpec::with_resources("pipeline", move || {
        let generations = generations.clone();
        async move {
            let generation = generations.fetch_add(1, Ordering::SeqCst) + 1;
            let (tx, rx) = mpsc::channel::<u64>(16);
            let rx = Arc::new(Mutex::new(rx));
            println!("🔧 Pipeline: channel opened (gen {generation})");

            let children = vec![producer(tx, generation), consumer(rx.clone(), generation)];
            Ok::<_, BoxError>(ChildSet::new(children).with_cleanup(move || async move {
                rx.lock().await.close();
                println!("🧹 Pipeline: channel closed (gen {generation})");
                Ok::<(), BoxError>(())
            }))
        }
    })
    .with_intensity(2)
    .with_period(Duration::from_secs(10));

    let handle = SupervisorSpec::new("root", vec![pipeline.into()])
        .with_intensity(5)
        .with_period(Duration::from_secs(60))
        .with_observer(LogWriter::new())
        .start(CancellationToken::new())
        .await?;

    match handle.wait_or_signal().await {
        Ok(()) => println!("\n✅ Tree stopped cleanly"),
        Err(e) => println!("\n⚠️  Tree failed: {e}"),
    }
    Ok(())
}
