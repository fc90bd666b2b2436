// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types actors send through the aggregated log channel.
//!
//! These only implement `Display`: the text is shipped to the relay's log
//! aggregator, which attaches the worker identity and emits the event.

use std::fmt::{Display, Formatter};

/// Lifecycle transition of a single worker.
///
/// # Example
/// ```
/// use the_relay::observability::messages::worker::Lifecycle;
///
/// assert_eq!(Lifecycle::StartingUp.to_string(), "starting up");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    StartingUp,
    RunningLoop,
    LeavingLoop,
    ShuttingDown,
    ShutDownComplete,
}

impl Display for Lifecycle {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        let text = match self {
            Lifecycle::StartingUp => "starting up",
            Lifecycle::RunningLoop => "running loop",
            Lifecycle::LeavingLoop => "leaving loop",
            Lifecycle::ShuttingDown => "shutting down",
            Lifecycle::ShutDownComplete => "shut down complete",
        };
        f.write_str(text)
    }
}

/// A termination token arrived on the inbound channel.
pub struct PoisonReceived {
    pub received: usize,
    pub expected: usize,
}

impl Display for PoisonReceived {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "received {}/{} poison pills", self.received, self.expected)
    }
}

/// Termination tokens were sent downstream.
pub struct PoisonSent {
    pub count: usize,
}

impl Display for PoisonSent {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "sent {} poison pills downstream", self.count)
    }
}

/// Every upstream context ended before delivering all termination tokens.
pub struct InboxClosedEarly {
    pub received: usize,
    pub expected: usize,
}

impl Display for InboxClosedEarly {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "inbound channel closed after {}/{} poison pills",
            self.received, self.expected
        )
    }
}

/// A lifecycle hook failed.
pub struct HookFailed<'a> {
    pub phase: &'a str,
    pub error: &'a str,
}

impl Display for HookFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "{} failed: {}", self.phase, self.error)
    }
}
