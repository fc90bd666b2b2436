// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

/// Internally used control messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    /// From upstream: one producer has no more data for one consumer.
    Poison,
    /// Stop reading immediately. Used to shut down the log aggregator.
    Eol,
}

/// What travels through relay channels.
///
/// Payloads and control messages share a channel but never a value space,
/// so any `T` is a valid payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message<T> {
    Payload(T),
    Control(Control),
}

impl<T> Message<T> {
    pub fn poison() -> Self {
        Message::Control(Control::Poison)
    }

    pub fn eol() -> Self {
        Message::Control(Control::Eol)
    }
}

