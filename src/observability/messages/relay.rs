// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for relay lifecycle events.
//!
//! This module contains message types for logging events related to:
//! * Topology construction
//! * Spawning and joining workers
//! * Log aggregation shutdown
//! * Worker failures and deadlines

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use std::time::Duration;
use tracing::Span;

/// Stages were wired together.
///
/// # Log Level
/// `info!` - Important operational event
///
/// # Example
/// ```
/// use the_relay::observability::messages::relay::TopologyConnected;
///
/// let msg = TopologyConnected {
///     stage_count: 2,
///     channel_count: 1,
///     worker_count: 4,
///     maxsize: 0,
/// };
///
/// assert_eq!(msg.to_string(), "relay: maintaining 2 stages (4 workers, 1 channels, maxsize=0)");
/// ```
pub struct TopologyConnected {
    pub stage_count: usize,
    pub channel_count: usize,
    pub worker_count: usize,
    pub maxsize: usize,
}

impl Display for TopologyConnected {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "relay: maintaining {} stages ({} workers, {} channels, maxsize={})",
            self.stage_count, self.worker_count, self.channel_count, self.maxsize
        )
    }
}

impl StructuredLog for TopologyConnected {
    fn log(&self) {
        tracing::info!(
            stage_count = self.stage_count,
            channel_count = self.channel_count,
            worker_count = self.worker_count,
            maxsize = self.maxsize,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "topology",
            span_name = name,
            stage_count = self.stage_count,
            worker_count = self.worker_count,
        )
    }
}

/// Workers were handed their execution contexts.
///
/// # Log Level
/// `info!` - Important operational event
pub struct RelayStarted<'a> {
    pub logger: &'a str,
    pub spawned: usize,
    pub inline: usize,
}

impl Display for RelayStarted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "relay: started {} spawned and {} inline workers",
            self.spawned, self.inline
        )
    }
}

impl StructuredLog for RelayStarted<'_> {
    fn log(&self) {
        tracing::info!(
            logger = self.logger,
            spawned = self.spawned,
            inline = self.inline,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "relay",
            span_name = name,
            logger = self.logger,
            spawned = self.spawned,
            inline = self.inline,
        )
    }
}

/// The relay blocks on one worker.
///
/// # Log Level
/// `debug!` - Join order diagnostics
pub struct WaitingForWorker<'a> {
    pub worker: &'a str,
}

impl Display for WaitingForWorker<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "relay: waiting for {}", self.worker)
    }
}

impl StructuredLog for WaitingForWorker<'_> {
    fn log(&self) {
        tracing::debug!(worker = self.worker, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!("join", span_name = name, worker = self.worker)
    }
}

/// A worker ended abnormally.
///
/// # Log Level
/// `error!` - Failure requiring attention
///
/// # Example
/// ```
/// use the_relay::observability::messages::relay::WorkerFailed;
///
/// let msg = WorkerFailed {
///     worker: "stage-0/Producer-1",
///     status: "loop failed: disk full",
/// };
///
/// assert!(msg.to_string().contains("disk full"));
/// ```
pub struct WorkerFailed<'a> {
    pub worker: &'a str,
    pub status: &'a str,
}

impl Display for WorkerFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "relay: worker {} ended abnormally: {}", self.worker, self.status)
    }
}

impl StructuredLog for WorkerFailed<'_> {
    fn log(&self) {
        tracing::error!(worker = self.worker, status = self.status, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!(
            "worker_failed",
            span_name = name,
            worker = self.worker,
            status = self.status,
        )
    }
}

/// The run exceeded its deadline and outstanding workers were terminated.
///
/// # Log Level
/// `error!` - Failure requiring attention
pub struct DeadlineExceeded {
    pub deadline: Duration,
    pub outstanding: usize,
}

impl Display for DeadlineExceeded {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "relay: deadline of {:?} exceeded, terminating {} workers",
            self.deadline, self.outstanding
        )
    }
}

impl StructuredLog for DeadlineExceeded {
    fn log(&self) {
        tracing::error!(
            deadline_ms = self.deadline.as_millis() as u64,
            outstanding = self.outstanding,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!(
            "deadline_exceeded",
            span_name = name,
            outstanding = self.outstanding,
        )
    }
}

/// The log aggregator drained its channel and stopped.
///
/// # Log Level
/// `debug!` - Shutdown diagnostics
pub struct LogAggregatorStopped {
    pub records: usize,
}

impl Display for LogAggregatorStopped {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "relay: log aggregator stopped after {} records", self.records)
    }
}

impl StructuredLog for LogAggregatorStopped {
    fn log(&self) {
        tracing::debug!(records = self.records, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!("log_aggregator", span_name = name, records = self.records)
    }
}

/// Every worker context and the log aggregator have ended.
///
/// # Log Level
/// `info!` - Important operational event
pub struct RelayFinished {
    pub worker_count: usize,
    pub failed: usize,
    pub duration: Duration,
}

impl Display for RelayFinished {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "relay: finished {} workers ({} failed) in {:?}",
            self.worker_count, self.failed, self.duration
        )
    }
}

impl StructuredLog for RelayFinished {
    fn log(&self) {
        tracing::info!(
            worker_count = self.worker_count,
            failed = self.failed,
            duration_ms = self.duration.as_millis() as u64,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "relay_finished",
            span_name = name,
            worker_count = self.worker_count,
            failed = self.failed,
        )
    }
}
