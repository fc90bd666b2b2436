// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;

use crate::engine::ActorContext;

/// A unit of work wired into a relay.
///
/// The relay drives every actor through `startup`, `run_loop` and
/// `shutdown`, in that order. All three default to something sensible, so an
/// actor only overrides what it needs:
///
/// - a producer in the first stage overrides `run_loop` and calls
///   [`ActorContext::send`] per item
/// - a consumer keeps the default `run_loop`, which pulls from the inbound
///   channel until every upstream peer signalled end-of-stream, and
///   overrides `handle`
///
/// Hooks return `anyhow::Result` so any error can be propagated with `?`.
/// A failed `startup` skips `run_loop`; `shutdown` always runs.
///
/// ```rust
/// use async_trait::async_trait;
/// use the_relay::traits::{Actor, ActorContext};
///
/// struct Double;
///
/// #[async_trait]
/// impl Actor<u64> for Double {
///     async fn handle(&mut self, ctx: &mut ActorContext<u64>, msg: u64) -> anyhow::Result<()> {
///         ctx.send(msg * 2).await?;
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Actor<T: Send + 'static>: Send {
    /// Name used in the worker's identity. Defaults to the type name.
    fn name(&self) -> &str {
        let full = std::any::type_name::<Self>();
        let base = full.split('<').next().unwrap_or(full);
        base.rsplit("::").next().unwrap_or(base)
    }

    /// Called once before the loop.
    async fn startup(&mut self, _ctx: &mut ActorContext<T>) -> anyhow::Result<()> {
        Ok(())
    }

    /// Keep the actor alive.
    ///
    /// Must be overridden by actors without an inbound channel. The default
    /// hands every payload to `handle` until the inbound stream ends.
    async fn run_loop(&mut self, ctx: &mut ActorContext<T>) -> anyhow::Result<()> {
        while let Some(msg) = ctx.recv().await? {
            self.handle(ctx, msg).await?;
        }
        Ok(())
    }

    /// Per-item callback of the default loop. Drops the item by default.
    async fn handle(&mut self, _ctx: &mut ActorContext<T>, _msg: T) -> anyhow::Result<()> {
        Ok(())
    }

    /// Called once after the loop, also when startup or the loop failed.
    async fn shutdown(&mut self, _ctx: &mut ActorContext<T>) -> anyhow::Result<()> {
        Ok(())
    }
}
