// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::fmt;
use std::time::Duration;

use crate::engine::worker::Placement;

/// Identity of a worker: its stage, its actor name and its position among
/// the stage's peers.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ActorId {
    pub stage: String,
    pub name: String,
    pub ordinal: usize,
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}-{}", self.stage, self.name, self.ordinal)
    }
}

/// Lifecycle phase of a worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Startup,
    Loop,
    Shutdown,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Startup => "startup",
            Phase::Loop => "loop",
            Phase::Shutdown => "shutdown",
        };
        f.write_str(name)
    }
}

/// How a worker context ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitStatus {
    /// All three phases returned `Ok`.
    Completed,
    /// The first phase that returned an error or panicked.
    Failed { phase: Phase, error: String },
    /// Terminated by the relay after the deadline expired.
    Aborted,
}

impl ExitStatus {
    pub fn is_completed(&self) -> bool {
        matches!(self, ExitStatus::Completed)
    }
}

impl fmt::Display for ExitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitStatus::Completed => f.write_str("completed"),
            ExitStatus::Failed { phase, error } => write!(f, "{} failed: {}", phase, error),
            ExitStatus::Aborted => f.write_str("aborted"),
        }
    }
}

/// Exit record of one worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerExit {
    pub id: ActorId,
    pub placement: Placement,
    pub status: ExitStatus,
    /// Payloads taken from the inbound channel.
    pub received: u64,
    /// Payloads put on the outbound channel.
    pub sent: u64,
    pub poison_received: usize,
    /// Size of the upstream stage, `0` for first-stage workers.
    pub poison_expected: usize,
    pub elapsed: Duration,
}

impl WorkerExit {
    pub(crate) fn aborted(id: ActorId, placement: Placement) -> Self {
        Self {
            id,
            placement,
            status: ExitStatus::Aborted,
            received: 0,
            sent: 0,
            poison_received: 0,
            poison_expected: 0,
            elapsed: Duration::ZERO,
        }
    }

    /// A spawned task that panicked outside its lifecycle hooks.
    pub(crate) fn crashed(id: ActorId, placement: Placement, panic: String) -> Self {
        Self {
            status: ExitStatus::Failed {
                phase: Phase::Loop,
                error: format!("panicked outside a hook: {}", panic),
            },
            ..Self::aborted(id, placement)
        }
    }

    /// Whether every upstream peer signalled end-of-stream to this worker.
    pub fn drained(&self) -> bool {
        self.poison_received == self.poison_expected
    }

    pub fn is_success(&self) -> bool {
        self.status.is_completed() && self.drained()
    }
}

/// Outcome of one `Relay::start` call.
///
/// A returned report does not imply every worker succeeded; check
/// [`RunReport::is_success`] or inspect the individual exits.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// One entry per worker, in stage order then peer order.
    pub exits: Vec<WorkerExit>,
    pub elapsed: Duration,
    /// Records forwarded by the log aggregator.
    pub log_records: usize,
}

impl RunReport {
    pub fn is_success(&self) -> bool {
        self.exits.iter().all(WorkerExit::is_success)
    }

    pub fn failures(&self) -> impl Iterator<Item = &WorkerExit> {
        self.exits.iter().filter(|exit| !exit.is_success())
    }

    /// Exits of the workers in the named stage.
    pub fn stage<'r>(&'r self, name: &'r str) -> impl Iterator<Item = &'r WorkerExit> + 'r {
        self.exits.iter().filter(move |exit| exit.id.stage == name)
    }
}
