// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use thiserror::Error;

use crate::errors::TopologyError;

/// Errors surfaced by the relay and by worker message I/O.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RelayError {
    #[error(transparent)]
    Topology(#[from] TopologyError),

    /// `start()` was called without a connected topology, or the topology
    /// was already consumed by a previous run.
    #[error("relay has no connected stages")]
    NotConnected,

    /// The worker sits in the last stage and cannot send.
    #[error("actor {actor} has no outbound channel")]
    NoOutbox { actor: String },

    /// The worker sits in the first stage and cannot receive.
    #[error("actor {actor} has no inbound channel")]
    NoInbox { actor: String },

    /// Every consumer of the outbound channel is gone.
    #[error("outbound channel of actor {actor} is closed")]
    ChannelClosed { actor: String },
}
