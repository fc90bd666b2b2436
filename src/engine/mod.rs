// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Relay engine: topology, channels, worker lifecycles and log aggregation.

mod channel;
mod context;
mod lifecycle;
mod log_aggregator;
mod message;
mod relay;
mod report;
mod worker;

#[cfg(test)]
mod integration_tests;

pub use context::ActorContext;
pub use log_aggregator::{LogRecord, LogSender};
pub use message::{Control, Message};
pub use relay::Relay;
pub use report::{ActorId, ExitStatus, Phase, RunReport, WorkerExit};
pub use worker::{Placement, Stage, Worker};
