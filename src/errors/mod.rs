// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

mod config;
mod relay;
mod topology;

pub use config::ConfigError;
pub use relay::RelayError;
pub use topology::TopologyError;
