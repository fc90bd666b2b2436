// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::engine::channel::{Inbox, Outbox};
use crate::traits::Actor;

/// Where a worker's lifecycle executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// In its own tokio task.
    Spawned,
    /// Inside the relay's own future, the main-process handler variant.
    Inline,
}

pub(crate) enum WorkerKind<'a, T: Send + 'static> {
    Spawned(Box<dyn Actor<T>>),
    Inline(Box<dyn Actor<T> + 'a>),
}

/// An actor together with the channel ends the relay bound to it.
///
/// Spawned workers must own everything they touch. Inline workers run in
/// the relay's own context and may borrow state from the caller for the
/// lifetime `'a`, which is how a sink fills a container the caller reads
/// after `start()` returns.
pub struct Worker<'a, T: Send + 'static> {
    pub(crate) kind: WorkerKind<'a, T>,
    pub(crate) inbox: Option<Inbox<T>>,
    pub(crate) outbox: Option<Outbox<T>>,
}

impl<'a, T: Send + 'static> Worker<'a, T> {
    /// A worker running in its own task.
    pub fn spawned(actor: impl Actor<T> + 'static) -> Self {
        Self::with_kind(WorkerKind::Spawned(Box::new(actor)))
    }

    /// A worker running inside the relay's own context.
    pub fn inline(actor: impl Actor<T> + 'a) -> Self {
        Self::with_kind(WorkerKind::Inline(Box::new(actor)))
    }

    fn with_kind(kind: WorkerKind<'a, T>) -> Self {
        Self {
            kind,
            inbox: None,
            outbox: None,
        }
    }

    pub fn name(&self) -> &str {
        match &self.kind {
            WorkerKind::Spawned(actor) => actor.name(),
            WorkerKind::Inline(actor) => actor.name(),
        }
    }

    pub fn placement(&self) -> Placement {
        match self.kind {
            WorkerKind::Spawned(_) => Placement::Spawned,
            WorkerKind::Inline(_) => Placement::Inline,
        }
    }

    /// Whether the worker was bound to an outbound channel.
    pub fn is_sender(&self) -> bool {
        self.outbox.is_some()
    }

    /// Whether the worker was bound to an inbound channel.
    pub fn is_receiver(&self) -> bool {
        self.inbox.is_some()
    }
}

/// One position in the pipeline: peer workers sharing the same upstream and
/// downstream channels.
pub struct Stage<'a, T: Send + 'static> {
    pub(crate) name: Option<String>,
    pub(crate) workers: Vec<Worker<'a, T>>,
}

impl<'a, T: Send + 'static> Stage<'a, T> {
    pub fn new(workers: Vec<Worker<'a, T>>) -> Self {
        Self { name: None, workers }
    }

    pub fn named(name: impl Into<String>, workers: Vec<Worker<'a, T>>) -> Self {
        Self {
            name: Some(name.into()),
            workers,
        }
    }

    /// `count` spawned peers built by `make`.
    pub fn pool<A, F>(count: usize, mut make: F) -> Self
    where
        A: Actor<T> + 'static,
        F: FnMut(usize) -> A,
    {
        Self::new((0..count).map(|i| Worker::spawned(make(i))).collect())
    }

    /// Give the stage a name, used in worker identities.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Name of the stage, assigned by `Relay::connect` if not given.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn workers(&self) -> &[Worker<'a, T>] {
        &self.workers
    }

    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }
}

impl<'a, T: Send + 'static> From<Worker<'a, T>> for Stage<'a, T> {
    fn from(worker: Worker<'a, T>) -> Self {
        Stage::new(vec![worker])
    }
}

impl<'a, T: Send + 'static> From<Vec<Worker<'a, T>>> for Stage<'a, T> {
    fn from(workers: Vec<Worker<'a, T>>) -> Self {
        Stage::new(workers)
    }
}
