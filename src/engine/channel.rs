// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Inter-stage channels and the termination-token protocol.
//!
//! One queue connects all `U` workers of a stage to all `D` workers of the
//! next. Every producer owns an [`Outbox`] holding a clone of the write end;
//! every consumer owns an [`Inbox`] sharing the read end behind an async
//! mutex.
//!
//! Termination needs no coordinator: when a producer finishes it enqueues
//! `D` poison pills, and each consumer stops reading after it has counted
//! `U` of them. `U × D` pills go in and `D × U` come out, so every consumer
//! reaches its threshold whatever the interleaving. A consumer that reached
//! its threshold never dequeues again, so it cannot take pills meant for a
//! peer, and since a producer's pills follow its payloads in the FIFO, every
//! payload is consumed before the last pill.

use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

use crate::engine::log_aggregator::LogSender;
use crate::engine::message::{Control, Message};
use crate::observability::messages::worker::{InboxClosedEarly, PoisonReceived};

/// Write end of an inter-stage queue.
#[derive(Debug)]
pub(crate) enum QueueSender<T> {
    Bounded(mpsc::Sender<T>),
    Unbounded(mpsc::UnboundedSender<T>),
}

// derive(Clone) would require T: Clone
impl<T> Clone for QueueSender<T> {
    fn clone(&self) -> Self {
        match self {
            QueueSender::Bounded(sender) => QueueSender::Bounded(sender.clone()),
            QueueSender::Unbounded(sender) => QueueSender::Unbounded(sender.clone()),
        }
    }
}

impl<T> QueueSender<T> {
    /// Enqueue `item`, waiting for capacity on a bounded queue.
    ///
    /// Hands the item back if every receiver is gone.
    pub(crate) async fn put(&self, item: T) -> Result<(), T> {
        match self {
            QueueSender::Bounded(sender) => sender.send(item).await.map_err(|e| e.0),
            QueueSender::Unbounded(sender) => sender.send(item).map_err(|e| e.0),
        }
    }
}

/// Read end of an inter-stage queue.
#[derive(Debug)]
pub(crate) enum QueueReceiver<T> {
    Bounded(mpsc::Receiver<T>),
    Unbounded(mpsc::UnboundedReceiver<T>),
}

impl<T> QueueReceiver<T> {
    /// Dequeue the next item, `None` once every sender is gone and the
    /// queue is empty.
    pub(crate) async fn get(&mut self) -> Option<T> {
        match self {
            QueueReceiver::Bounded(receiver) => receiver.recv().await,
            QueueReceiver::Unbounded(receiver) => receiver.recv().await,
        }
    }
}

/// Create a queue holding at most `maxsize` messages, unbounded for `0`.
pub(crate) fn queue<T>(maxsize: usize) -> (QueueSender<T>, QueueReceiver<T>) {
    if maxsize == 0 {
        let (tx, rx) = mpsc::unbounded_channel();
        (QueueSender::Unbounded(tx), QueueReceiver::Unbounded(rx))
    } else {
        let (tx, rx) = mpsc::channel(maxsize);
        (QueueSender::Bounded(tx), QueueReceiver::Bounded(rx))
    }
}

/// A consumer's view of its inbound queue.
#[derive(Debug)]
pub(crate) struct Inbox<T> {
    queue: Arc<Mutex<QueueReceiver<Message<T>>>>,
    expected_poison: usize,
    received_poison: usize,
    received: u64,
    closed: bool,
}

impl<T> Inbox<T> {
    /// `upstream_count` is the number of producers feeding the queue, which
    /// is the number of poison pills this consumer waits for.
    pub(crate) fn new(queue: Arc<Mutex<QueueReceiver<Message<T>>>>, upstream_count: usize) -> Self {
        Self {
            queue,
            expected_poison: upstream_count,
            received_poison: 0,
            received: 0,
            closed: false,
        }
    }

    /// Next payload, or `None` once the stream ended.
    ///
    /// Control messages are consumed and counted here and never reach the
    /// caller.
    pub(crate) async fn next(&mut self, log: &LogSender) -> Option<T> {
        while !self.closed && self.received_poison < self.expected_poison {
            // the guard is held while waiting, peers queue up on the lock
            let message = self.queue.lock().await.get().await;

            match message {
                Some(Message::Payload(payload)) => {
                    self.received += 1;
                    return Some(payload);
                }
                Some(Message::Control(Control::Poison)) => {
                    self.received_poison += 1;
                    log.emit(
                        tracing::Level::DEBUG,
                        PoisonReceived {
                            received: self.received_poison,
                            expected: self.expected_poison,
                        }
                        .to_string(),
                    );
                }
                // only the log aggregator is ever sent Eol
                Some(Message::Control(Control::Eol)) => {}
                None => {
                    self.closed = true;
                    log.emit(
                        tracing::Level::WARN,
                        InboxClosedEarly {
                            received: self.received_poison,
                            expected: self.expected_poison,
                        }
                        .to_string(),
                    );
                }
            }
        }
        None
    }

    pub(crate) fn received(&self) -> u64 {
        self.received
    }

    pub(crate) fn received_poison(&self) -> usize {
        self.received_poison
    }

    pub(crate) fn expected_poison(&self) -> usize {
        self.expected_poison
    }
}

/// A producer's view of its outbound queue.
#[derive(Debug)]
pub(crate) struct Outbox<T> {
    queue: QueueSender<Message<T>>,
    downstream_count: usize,
    sent: u64,
    poisoned: bool,
}

impl<T> Outbox<T> {
    /// `downstream_count` is the number of consumers reading the queue, which
    /// is the number of poison pills sent at end-of-stream.
    pub(crate) fn new(queue: QueueSender<Message<T>>, downstream_count: usize) -> Self {
        Self {
            queue,
            downstream_count,
            sent: 0,
            poisoned: false,
        }
    }

    /// Enqueue a payload. Hands the payload back if every consumer is gone.
    pub(crate) async fn send(&mut self, payload: T) -> Result<(), T> {
        match self.queue.put(Message::Payload(payload)).await {
            Ok(()) => {
                self.sent += 1;
                Ok(())
            }
            Err(Message::Payload(payload)) => Err(payload),
            Err(Message::Control(_)) => unreachable!("a payload was sent"),
        }
    }

    /// Signal end-of-stream to every downstream peer, at most once.
    ///
    /// Returns the number of pills that made it into the queue.
    pub(crate) async fn poison(&mut self) -> usize {
        if self.poisoned {
            return 0;
        }
        self.poisoned = true;

        let mut delivered = 0;
        for _ in 0..self.downstream_count {
            if self.queue.put(Message::poison()).await.is_err() {
                break;
            }
            delivered += 1;
        }
        delivered
    }

    pub(crate) fn sent(&self) -> u64 {
        self.sent
    }

    pub(crate) fn downstream_count(&self) -> usize {
        self.downstream_count
    }
}
