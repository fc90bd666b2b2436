// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Log aggregation across worker contexts.
//!
//! Workers never write to the process-wide subscriber themselves. Each one
//! holds a [`LogSender`] that puts records on a single unbounded channel, and
//! one aggregator task forwards them to `tracing` in arrival order. A
//! worker's records therefore keep their relative order, and emitting a
//! record never blocks the data path.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::Level;

use crate::engine::message::{Control, Message};
use crate::observability::messages::{relay::LogAggregatorStopped, StructuredLog};

/// One line of actor output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    pub origin: String,
    pub level: Level,
    pub message: String,
}

/// Write end of the aggregated log channel, tagged with a worker identity.
#[derive(Debug, Clone)]
pub struct LogSender {
    origin: String,
    sender: mpsc::UnboundedSender<Message<LogRecord>>,
}

impl LogSender {
    pub(crate) fn new(origin: String, sender: mpsc::UnboundedSender<Message<LogRecord>>) -> Self {
        Self { origin, sender }
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Queue a record for the aggregator.
    ///
    /// Records emitted after the aggregator stopped are dropped.
    pub fn emit(&self, level: Level, message: impl Into<String>) {
        let record = LogRecord {
            origin: self.origin.clone(),
            level,
            message: message.into(),
        };
        let _ = self.sender.send(Message::Payload(record));
    }
}

/// Drains the shared log channel from a single task.
pub(crate) struct LogAggregator {
    sender: mpsc::UnboundedSender<Message<LogRecord>>,
    handle: JoinHandle<usize>,
}

impl LogAggregator {
    /// Spawn the drain task for `receiver`.
    ///
    /// `sender` must be the write end of the same channel; it is used to
    /// deliver the stop signal.
    pub(crate) fn spawn(
        logger: String,
        sender: mpsc::UnboundedSender<Message<LogRecord>>,
        mut receiver: mpsc::UnboundedReceiver<Message<LogRecord>>,
    ) -> Self {
        let handle = tokio::spawn(async move {
            let mut forwarded = 0;
            while let Some(message) = receiver.recv().await {
                match message {
                    Message::Payload(record) => {
                        forward(&logger, &record);
                        forwarded += 1;
                    }
                    Message::Control(Control::Eol) => break,
                    Message::Control(Control::Poison) => {}
                }
            }
            forwarded
        });

        Self { sender, handle }
    }

    /// Ask the aggregator to drain what is queued and stop.
    ///
    /// Returns the number of forwarded records.
    pub(crate) async fn stop(self) -> usize {
        let _ = self.sender.send(Message::eol());
        let records = self.handle.await.unwrap_or_default();
        LogAggregatorStopped { records }.log();
        records
    }
}

fn forward(logger: &str, record: &LogRecord) {
    let origin = record.origin.as_str();
    let message = record.message.as_str();

    match record.level {
        Level::ERROR => tracing::error!(logger, origin, "[{}] {}", origin, message),
        Level::WARN => tracing::warn!(logger, origin, "[{}] {}", origin, message),
        Level::INFO => tracing::info!(logger, origin, "[{}] {}", origin, message),
        Level::DEBUG => tracing::debug!(logger, origin, "[{}] {}", origin, message),
        _ => tracing::trace!(logger, origin, "[{}] {}", origin, message),
    }
}
