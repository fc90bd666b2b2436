// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Drives one worker through `startup → run_loop → shutdown`.

use futures::FutureExt;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::Instant;
use tracing::Level;

use crate::engine::context::ActorContext;
use crate::engine::report::{ExitStatus, Phase, WorkerExit};
use crate::observability::messages::worker::{HookFailed, Lifecycle};
use crate::traits::Actor;

/// Run the full lifecycle of `actor` and report how it ended.
///
/// - a failed `startup` skips the loop and goes straight to `shutdown`
/// - termination tokens go downstream after a clean loop, or after any
///   failure when `poison_on_failure` is set
/// - `shutdown` runs in every case
/// - a panicking hook counts as a failure of its phase
pub(crate) async fn run_worker<'a, T: Send + 'static>(
    mut actor: Box<dyn Actor<T> + 'a>,
    mut ctx: ActorContext<T>,
    poison_on_failure: bool,
) -> WorkerExit {
    let started = Instant::now();
    let mut status = ExitStatus::Completed;

    ctx.log(Lifecycle::StartingUp.to_string());
    match guarded(actor.startup(&mut ctx)).await {
        Ok(()) => {
            ctx.log_at(Level::DEBUG, Lifecycle::RunningLoop.to_string());
            let looped = guarded(actor.run_loop(&mut ctx)).await;
            ctx.log_at(Level::DEBUG, Lifecycle::LeavingLoop.to_string());

            if let Err(error) = looped {
                status = failed(&ctx, Phase::Loop, error);
            }
        }
        Err(error) => status = failed(&ctx, Phase::Startup, error),
    }

    if status.is_completed() || poison_on_failure {
        ctx.poison_downstream().await;
    }

    ctx.log_at(Level::DEBUG, Lifecycle::ShuttingDown.to_string());
    if let Err(error) = guarded(actor.shutdown(&mut ctx)).await {
        let shutdown = failed(&ctx, Phase::Shutdown, error);
        // the first failure wins
        if status.is_completed() {
            status = shutdown;
        }
    }
    ctx.log(Lifecycle::ShutDownComplete.to_string());

    ctx.into_exit(status, started.elapsed())
}

fn failed<T: Send + 'static>(ctx: &ActorContext<T>, phase: Phase, error: anyhow::Error) -> ExitStatus {
    let error = format!("{:#}", error);
    ctx.log_at(
        Level::ERROR,
        HookFailed {
            phase: &phase.to_string(),
            error: &error,
        }
        .to_string(),
    );
    ExitStatus::Failed { phase, error }
}

/// Await a hook, turning a panic into an error.
async fn guarded<F>(hook: F) -> anyhow::Result<()>
where
    F: Future<Output = anyhow::Result<()>>,
{
    AssertUnwindSafe(hook)
        .catch_unwind()
        .await
        .unwrap_or_else(|panic| Err(anyhow::anyhow!("panicked: {}", panic_message(panic.as_ref()))))
}

pub(crate) fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn guarded_passes_results_through() {
        assert!(guarded(async { Ok::<(), anyhow::Error>(()) }).await.is_ok());

        let error = guarded(async { Err::<(), _>(anyhow::anyhow!("nope")) }).await.unwrap_err();
        assert_eq!(error.to_string(), "nope");
    }

    async fn explode() -> anyhow::Result<()> {
        panic!("boom")
    }

    async fn explode_with(code: u32) -> anyhow::Result<()> {
        panic!("code {}", code)
    }

    #[tokio::test]
    async fn guarded_catches_panics() {
        let error = guarded(explode()).await.unwrap_err();
        assert_eq!(error.to_string(), "panicked: boom");

        let error = guarded(explode_with(7)).await.unwrap_err();
        assert_eq!(error.to_string(), "panicked: code 7");
    }
}
