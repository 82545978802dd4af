//! # Run one worker attempt.
//!
//! Executes a single run of a worker's [`Task`](crate::Task) inside its own
//! tokio task, after an optional restart delay.
//!
//! ## Rules
//! - The delay is cancellable: a stop during the delay ends the attempt cleanly
//! - `TaskError::Canceled` is a clean exit
//! - A panic inside the task is caught and reported as `TaskError::Panicked`

use std::panic::AssertUnwindSafe;
use std::time::Duration;

use futures::FutureExt;
use tokio_util::sync::CancellationToken;

use crate::error::{TaskError, panic_message};
use crate::nodes::TaskRef;

/// Runs `task` once, honoring `delay` and `ctx`.
pub(crate) async fn run_worker(
    task: TaskRef,
    ctx: CancellationToken,
    delay: Option<Duration>,
) -> Result<(), TaskError> {
    if let Some(delay) = delay.filter(|d| !d.is_zero()) {
        tokio::select! {
            _ = ctx.cancelled() => return Ok(()),
            _ = tokio::time::sleep(delay) => {}
        }
    }

    let res = AssertUnwindSafe(task.run(ctx))
        .catch_unwind()
        .await
        .unwrap_or_else(|payload| {
            Err(TaskError::Panicked {
                info: panic_message(payload.as_ref()),
            })
        });

    match res {
        Err(TaskError::Canceled) => Ok(()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::TaskFn;

    #[tokio::test]
    async fn test_canceled_is_clean_exit() {
        let task: TaskRef = TaskFn::arc("w", |_ctx: CancellationToken| async {
            Err::<(), _>(TaskError::Canceled)
        });
        assert!(run_worker(task, CancellationToken::new(), None).await.is_ok());
    }

    #[tokio::test]
    async fn test_panic_becomes_error() {
        let task: TaskRef = TaskFn::arc("w", |_ctx: CancellationToken| async {
            if true {
                panic!("kaboom");
            }
            Ok::<(), TaskError>(())
        });
        let err = run_worker(task, CancellationToken::new(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, TaskError::Panicked { ref info } if info == "kaboom"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_delay_skips_run() {
        let task: TaskRef = TaskFn::arc("w", |_ctx: CancellationToken| async {
            Err::<(), _>(TaskError::fail("should not run"))
        });
        let ctx = CancellationToken::new();
        let fut = run_worker(task, ctx.clone(), Some(Duration::from_secs(60)));
        ctx.cancel();
        assert!(fut.await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_delay_precedes_run() {
        let task: TaskRef = TaskFn::arc("w", |_ctx: CancellationToken| async {
            Ok::<(), TaskError>(())
        });
        let started = tokio::time::Instant::now();
        run_worker(task, CancellationToken::new(), Some(Duration::from_millis(250)))
            .await
            .unwrap();
        assert!(started.elapsed() >= Duration::from_millis(250));
    }
}
