// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Centralized message types for structured logging.
//!
//! # Organization
//!
//! * `relay` - topology construction, run lifecycle and worker supervision
//! * `worker` - lines actors send through the aggregated log channel
//!
//! # Usage Pattern
//!
//! ```rust
//! use the_relay::observability::messages::relay::TopologyConnected;
//!
//! let msg = TopologyConnected {
//!     stage_count: 3,
//!     channel_count: 2,
//!     worker_count: 7,
//!     maxsize: 50,
//! };
//!
//! tracing::info!("{}", msg);
//! ```

pub mod relay;
pub mod worker;

use tracing::Span;

/// A message that knows how to log itself with structured fields.
pub trait StructuredLog {
    /// Emit the message at its designated level.
    fn log(&self);

    /// Create a span carrying the message fields.
    fn span(&self, name: &str) -> Span;
}
