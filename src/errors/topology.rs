// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use thiserror::Error;

/// Errors raised while wiring stages together.
///
/// These are returned synchronously by `Relay::connect` before any worker
/// context exists.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TopologyError {
    /// A pipeline needs a producing and a consuming stage at minimum.
    #[error("a relay needs at least two stages, got {found}")]
    TooFewStages { found: usize },

    /// A stage was given without any workers.
    #[error("stage '{stage}' has no workers")]
    EmptyStage { stage: String },

    /// Two stages share a name, which would make worker identities ambiguous.
    #[error("stage name '{stage}' is used more than once")]
    DuplicateStage { stage: String },
}
