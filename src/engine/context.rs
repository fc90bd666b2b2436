// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::time::Duration;
use tracing::Level;

use crate::engine::channel::{Inbox, Outbox};
use crate::engine::log_aggregator::LogSender;
use crate::engine::report::{ActorId, ExitStatus, WorkerExit};
use crate::engine::worker::Placement;
use crate::errors::RelayError;
use crate::observability::messages::worker::PoisonSent;

/// Everything an actor can reach from inside its execution context: its
/// identity, its channel ends and the aggregated log.
///
/// The relay creates one context per worker and passes it to every
/// lifecycle hook.
pub struct ActorContext<T> {
    id: ActorId,
    placement: Placement,
    inbox: Option<Inbox<T>>,
    outbox: Option<Outbox<T>>,
    log: LogSender,
}

impl<T: Send + 'static> ActorContext<T> {
    pub(crate) fn new(
        id: ActorId,
        placement: Placement,
        inbox: Option<Inbox<T>>,
        outbox: Option<Outbox<T>>,
        log: LogSender,
    ) -> Self {
        Self {
            id,
            placement,
            inbox,
            outbox,
            log,
        }
    }

    pub fn id(&self) -> &ActorId {
        &self.id
    }

    /// Whether the actor can send messages.
    ///
    /// Actors in the last stage have no recipient.
    pub fn is_sender(&self) -> bool {
        self.outbox.is_some()
    }

    /// Whether the actor can receive messages.
    ///
    /// Actors in the first stage have no upstream and must override
    /// `run_loop`.
    pub fn is_receiver(&self) -> bool {
        self.inbox.is_some()
    }

    /// Send a message to the next stage.
    ///
    /// Exactly one of the downstream peers receives it. Waits while a
    /// bounded channel is full.
    pub async fn send(&mut self, value: T) -> Result<(), RelayError> {
        let outbox = self.outbox.as_mut().ok_or_else(|| RelayError::NoOutbox {
            actor: self.id.to_string(),
        })?;

        outbox
            .send(value)
            .await
            .map_err(|_| RelayError::ChannelClosed {
                actor: self.id.to_string(),
            })
    }

    /// Next message from the previous stage.
    ///
    /// Returns `Ok(None)` once every upstream peer signalled end-of-stream.
    /// Waits while the channel is empty.
    pub async fn recv(&mut self) -> Result<Option<T>, RelayError> {
        let Some(inbox) = self.inbox.as_mut() else {
            return Err(RelayError::NoInbox {
                actor: self.id.to_string(),
            });
        };

        Ok(inbox.next(&self.log).await)
    }

    /// Log at info level through the relay's aggregator.
    pub fn log(&self, message: impl Into<String>) {
        self.log.emit(Level::INFO, message);
    }

    pub fn log_at(&self, level: Level, message: impl Into<String>) {
        self.log.emit(level, message);
    }

    /// Send the termination tokens for every downstream peer, once.
    pub(crate) async fn poison_downstream(&mut self) {
        if let Some(outbox) = self.outbox.as_mut() {
            let count = outbox.poison().await;
            if count > 0 {
                self.log.emit(Level::DEBUG, PoisonSent { count }.to_string());
            }
        }
    }

    pub(crate) fn into_exit(self, status: ExitStatus, elapsed: Duration) -> WorkerExit {
        let (received, poison_received, poison_expected) = self
            .inbox
            .as_ref()
            .map(|inbox| (inbox.received(), inbox.received_poison(), inbox.expected_poison()))
            .unwrap_or((0, 0, 0));

        WorkerExit {
            id: self.id,
            placement: self.placement,
            status,
            received,
            sent: self.outbox.as_ref().map(Outbox::sent).unwrap_or(0),
            poison_received,
            poison_expected,
            elapsed,
        }
    }
}
