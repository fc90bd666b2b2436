// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod config;     // relay settings + yaml loading
pub mod engine;     // topology, channels, lifecycles
pub mod errors;     // error handling
pub mod observability;
pub mod traits;     // actor abstraction
