// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! The relay wires actors into a pipeline of stages and runs it to
//! completion.
//!
//! # Topologies
//!
//! Any chain of stages is supported, each boundary being 1-1, 1-n, n-1 or
//! n-m:
//!
//! ```text
//!   stage:     source     prep      post      sink
//!            ┌───┐     ┌───┐     ┌───┐     ┌───┐
//!            │ N │  →  │ M │  →  │ K │  →  │ 1 │
//!            └───┘     └───┘     └───┘     └───┘
//! ```
//!
//! One queue connects each pair of adjacent stages. With `maxsize` set, a
//! fast stage blocks on a full queue until the slower stage behind it
//! catches up.
//!
//! # Execution
//!
//! Spawned workers run in their own tokio tasks. Inline workers run inside
//! the future returned by [`Relay::start`], so they may borrow state owned by
//! the caller. Actor log records are funnelled through one aggregator task.
//!
//! # Example
//!
//! ```rust
//! use async_trait::async_trait;
//! use the_relay::config::RelayConfig;
//! use the_relay::engine::{Relay, Stage, Worker};
//! use the_relay::traits::{Actor, ActorContext};
//!
//! struct Count(u32);
//!
//! #[async_trait]
//! impl Actor<u32> for Count {
//!     async fn run_loop(&mut self, ctx: &mut ActorContext<u32>) -> anyhow::Result<()> {
//!         for x in 0..self.0 {
//!             ctx.send(x).await?;
//!         }
//!         Ok(())
//!     }
//! }
//!
//! struct Collect<'a>(&'a mut Vec<u32>);
//!
//! #[async_trait]
//! impl Actor<u32> for Collect<'_> {
//!     async fn handle(&mut self, _ctx: &mut ActorContext<u32>, msg: u32) -> anyhow::Result<()> {
//!         self.0.push(msg);
//!         Ok(())
//!     }
//! }
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut results = Vec::new();
//!
//! let mut relay = Relay::new(RelayConfig::with_maxsize(8));
//! relay.connect(vec![
//!     Stage::from(Worker::spawned(Count(3))),
//!     Stage::from(Worker::inline(Collect(&mut results))),
//! ])?;
//! let report = relay.start().await?;
//! drop(relay);
//!
//! assert!(report.is_success());
//! assert_eq!(results, vec![0, 1, 2]);
//! # Ok(())
//! # }
//! ```

use futures::future::BoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};
use futures::FutureExt;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinError;
use tracing::Instrument;

use crate::config::consts::DEFAULT_STAGE_PREFIX;
use crate::config::RelayConfig;
use crate::engine::channel::{queue, Inbox, Outbox};
use crate::engine::context::ActorContext;
use crate::engine::lifecycle::{panic_message, run_worker};
use crate::engine::log_aggregator::{LogAggregator, LogSender};
use crate::engine::report::{ActorId, RunReport, WorkerExit};
use crate::engine::worker::{Placement, Stage, WorkerKind};
use crate::errors::{RelayError, TopologyError};
use crate::observability::messages::relay::{
    DeadlineExceeded, RelayFinished, RelayStarted, TopologyConnected, WaitingForWorker,
    WorkerFailed,
};
use crate::observability::messages::StructuredLog;

/// Wire actors together and run them.
///
/// A relay holds one topology at a time. [`Relay::start`] consumes it, so
/// a relay can be reused by connecting again, but never for two
/// overlapping runs.
pub struct Relay<'a, T: Send + 'static> {
    config: RelayConfig,
    stages: Vec<Stage<'a, T>>,
}

impl<'a, T: Send + 'static> Default for Relay<'a, T> {
    fn default() -> Self {
        Self::new(RelayConfig::default())
    }
}

impl<'a, T: Send + 'static> Relay<'a, T> {
    pub fn new(config: RelayConfig) -> Self {
        Self {
            config,
            stages: Vec::new(),
        }
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    /// Stages of the connected topology, empty before `connect` and after
    /// `start`.
    pub fn stages(&self) -> &[Stage<'a, T>] {
        &self.stages
    }

    /// Connect stages to form a processing pipeline.
    ///
    /// Each element is a single [`Worker`](crate::engine::Worker), a
    /// `Vec` of peers, or a [`Stage`]. Stages without a name are called
    /// `stage-0`, `stage-1`, ... in order. Replaces any previously connected
    /// topology.
    ///
    /// Fails without side effects when fewer than two stages are given, a
    /// stage is empty or two stages share a name.
    pub fn connect<I, S>(&mut self, stages: I) -> Result<(), TopologyError>
    where
        I: IntoIterator<Item = S>,
        S: Into<Stage<'a, T>>,
    {
        let mut stages: Vec<Stage<'a, T>> = stages.into_iter().map(Into::into).collect();

        for (index, stage) in stages.iter_mut().enumerate() {
            if stage.name.is_none() {
                stage.name = Some(format!("{}-{}", DEFAULT_STAGE_PREFIX, index));
            }
        }
        validate(&stages)?;

        // one queue per boundary; receivers need to know how many
        // poison pills to expect, senders how many to send
        for boundary in 1..stages.len() {
            let (upstream, downstream) = stages.split_at_mut(boundary);
            let upstream = &mut upstream[boundary - 1];
            let downstream = &mut downstream[0];

            let (tx, rx) = queue(self.config.maxsize);
            let rx = Arc::new(Mutex::new(rx));
            let upstream_count = upstream.len();
            let downstream_count = downstream.len();

            for worker in upstream.workers.iter_mut() {
                worker.outbox = Some(Outbox::new(tx.clone(), downstream_count));
            }
            for worker in downstream.workers.iter_mut() {
                worker.inbox = Some(Inbox::new(rx.clone(), upstream_count));
            }
        }

        TopologyConnected {
            stage_count: stages.len(),
            channel_count: stages.len() - 1,
            worker_count: stages.iter().map(Stage::len).sum(),
            maxsize: self.config.maxsize,
        }
        .log();

        self.stages = stages;
        Ok(())
    }

    /// Run the connected pipeline until every worker has ended.
    ///
    /// Spawned workers start first, then the log aggregator. Inline workers
    /// are driven to completion inside this future while spawned ones run,
    /// then spawned workers are joined in creation order. Worker failures do
    /// not make this fail: they are logged and recorded in the returned
    /// report.
    ///
    /// With a deadline configured, workers still running when it expires
    /// are terminated and reported as aborted. Workers that already ended
    /// keep their own exit.
    pub async fn start(&mut self) -> Result<RunReport, RelayError> {
        if self.stages.is_empty() {
            return Err(RelayError::NotConnected);
        }

        let stages = std::mem::take(&mut self.stages);
        let started = Instant::now();
        let poison_on_failure = self.config.poison_on_failure;
        let logger = self.config.logger().to_string();
        let (log_tx, log_rx) = mpsc::unbounded_channel();

        let mut ids: Vec<(ActorId, Placement)> = Vec::new();
        let mut spawned = Vec::new();
        let mut inline: FuturesUnordered<BoxFuture<'a, (usize, WorkerExit)>> = FuturesUnordered::new();

        for stage in stages {
            let stage_name = stage.name.unwrap_or_default();

            for (ordinal, worker) in stage.workers.into_iter().enumerate() {
                let index = ids.len();
                let id = ActorId {
                    stage: stage_name.clone(),
                    name: worker.name().to_string(),
                    ordinal,
                };
                let placement = worker.placement();
                let log = LogSender::new(id.to_string(), log_tx.clone());
                let ctx = ActorContext::new(id.clone(), placement, worker.inbox, worker.outbox, log);
                ids.push((id, placement));

                match worker.kind {
                    WorkerKind::Spawned(actor) => {
                        let handle = tokio::spawn(run_worker(actor, ctx, poison_on_failure));
                        spawned.push((index, handle));
                    }
                    WorkerKind::Inline(actor) => {
                        inline.push(
                            async move { (index, run_worker(actor, ctx, poison_on_failure).await) }
                                .boxed(),
                        );
                    }
                }
            }
        }

        let started_msg = RelayStarted {
            logger: &logger,
            spawned: spawned.len(),
            inline: inline.len(),
        };
        started_msg.log();
        let span = started_msg.span("relay");

        let aggregator = LogAggregator::spawn(logger.clone(), log_tx, log_rx);

        let mut exits: Vec<Option<WorkerExit>> = ids.iter().map(|_| None).collect();
        let collect = async {
            while let Some((index, exit)) = inline.next().await {
                exits[index] = Some(exit);
            }

            // join in creation order, the way the poison propagates
            for (index, handle) in spawned.iter_mut() {
                let worker = ids[*index].0.to_string();
                WaitingForWorker { worker: &worker }.log();

                let (id, placement) = &ids[*index];
                exits[*index] = joined(handle.await, id, *placement);
            }
        }
        .instrument(span);

        match self.config.deadline() {
            Some(deadline) => {
                if tokio::time::timeout(deadline, collect).await.is_err() {
                    // spawned workers not joined yet may have ended on their own
                    for (index, handle) in spawned.iter_mut() {
                        if exits[*index].is_some() {
                            continue;
                        }
                        if handle.is_finished() {
                            let (id, placement) = &ids[*index];
                            exits[*index] = joined(handle.await, id, *placement);
                        } else {
                            handle.abort();
                        }
                    }
                    DeadlineExceeded {
                        deadline,
                        outstanding: exits.iter().filter(|exit| exit.is_none()).count(),
                    }
                    .log();
                }
            }
            None => collect.await,
        }
        // unfinished inline workers are dropped here along with their channel ends
        drop(inline);

        let log_records = aggregator.stop().await;

        let exits: Vec<WorkerExit> = exits
            .into_iter()
            .zip(ids)
            .map(|(exit, (id, placement))| exit.unwrap_or_else(|| WorkerExit::aborted(id, placement)))
            .collect();

        for exit in exits.iter().filter(|exit| !exit.is_success()) {
            let worker = exit.id.to_string();
            let status = describe(exit);
            WorkerFailed {
                worker: &worker,
                status: &status,
            }
            .log();
        }

        let report = RunReport {
            exits,
            elapsed: started.elapsed(),
            log_records,
        };

        RelayFinished {
            worker_count: report.exits.len(),
            failed: report.failures().count(),
            duration: report.elapsed,
        }
        .log();

        Ok(report)
    }
}

fn validate<T: Send + 'static>(stages: &[Stage<'_, T>]) -> Result<(), TopologyError> {
    if stages.len() < 2 {
        return Err(TopologyError::TooFewStages {
            found: stages.len(),
        });
    }

    let mut seen = HashSet::new();
    for stage in stages {
        let name = stage.name().unwrap_or_default();
        if stage.is_empty() {
            return Err(TopologyError::EmptyStage {
                stage: name.to_string(),
            });
        }
        if !seen.insert(name) {
            return Err(TopologyError::DuplicateStage {
                stage: name.to_string(),
            });
        }
    }
    Ok(())
}

/// Exit of a joined spawned worker, `None` if its task was cancelled.
///
/// Hook panics are caught inside the worker; a panicking task means the
/// panic happened between hooks.
fn joined(result: Result<WorkerExit, JoinError>, id: &ActorId, placement: Placement) -> Option<WorkerExit> {
    match result {
        Ok(exit) => Some(exit),
        Err(error) if error.is_panic() => {
            let message = panic_message(error.into_panic().as_ref());
            Some(WorkerExit::crashed(id.clone(), placement, message))
        }
        Err(_) => None,
    }
}

fn describe(exit: &WorkerExit) -> String {
    if exit.status.is_completed() {
        format!(
            "inbound stream ended after {}/{} poison pills",
            exit.poison_received, exit.poison_expected
        )
    } else {
        exit.status.to_string()
    }
}
