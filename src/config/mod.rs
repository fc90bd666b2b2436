// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

mod loader;
pub mod consts;

pub use loader::{deep_merge, load_config, load_merged, load_merged_config, RelayConfig};
