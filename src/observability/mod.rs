// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Observability module for structured logging.
//!
//! Relay-level events are described by message types under [`messages`]
//! which implement `Display` and [`messages::StructuredLog`], so that log
//! output carries both a readable line and structured fields.
//!
//! Actor output does not go through here directly: actors emit records on
//! the relay's log channel and the aggregator forwards them to `tracing`
//! from a single task.
//!
//! # Usage
//!
//! ```rust
//! use the_relay::observability::messages::{relay::WaitingForWorker, StructuredLog};
//!
//! WaitingForWorker { worker: "stage-1/Sink-0" }.log();
//! ```

pub mod messages;

use tracing_subscriber::EnvFilter;

/// Install a global fmt subscriber.
///
/// `RUST_LOG` takes precedence over `default_filter`. Returns `false` if a
/// global subscriber was already installed.
pub fn init_tracing(default_filter: &str) -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .is_ok()
}
