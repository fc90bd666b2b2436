// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::config::consts::{DEFAULT_LOGGER, UNBOUNDED};
use crate::errors::ConfigError;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_yaml::Value;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Construction-time configuration for a `Relay`.
///
/// Every field is optional in YAML and falls back to the values of
/// `RelayConfig::default()`.
///
/// # Fields
/// * `maxsize` - Capacity of every inter-stage channel, `0` means unbounded
/// * `log` - Logger label attached to aggregated actor output
/// * `deadline_ms` - Optional wall-clock limit for `Relay::start`
/// * `poison_on_failure` - Emit termination tokens even when a worker's
///   startup or loop fails
///
/// # Example
/// ```yaml
/// maxsize: 50
/// log: ingest
/// deadline_ms: 30000
/// poison_on_failure: true
/// ```
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RelayConfig {
    pub maxsize: usize,
    pub log: Option<String>,
    pub deadline_ms: Option<u64>,
    pub poison_on_failure: bool,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            maxsize: UNBOUNDED,
            log: None,
            deadline_ms: None,
            poison_on_failure: false,
        }
    }
}

impl RelayConfig {
    /// Configuration with every channel bounded to `maxsize` messages.
    pub fn with_maxsize(maxsize: usize) -> Self {
        Self {
            maxsize,
            ..Self::default()
        }
    }

    /// Label used for aggregated log output.
    pub fn logger(&self) -> &str {
        self.log.as_deref().unwrap_or(DEFAULT_LOGGER)
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.deadline_ms.map(Duration::from_millis)
    }

    pub fn is_bounded(&self) -> bool {
        self.maxsize != UNBOUNDED
    }
}

/// Load a relay config from a single YAML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<RelayConfig, ConfigError> {
    load_merged(&[path])
}

/// Load and deep-merge several YAML files into a relay config.
///
/// Files are merged in the given order, see [`deep_merge`].
pub fn load_merged_config<P: AsRef<Path>>(paths: &[P]) -> Result<RelayConfig, ConfigError> {
    load_merged(paths)
}

/// Load and deep-merge several YAML files into any deserializable type.
///
/// Applications that embed a `RelayConfig` inside a larger document use this
/// to read their own configuration shape.
pub fn load_merged<T, P>(paths: &[P]) -> Result<T, ConfigError>
where
    T: DeserializeOwned,
    P: AsRef<Path>,
{
    if paths.is_empty() {
        return Err(ConfigError::NoFiles);
    }

    let mut merged = Value::Null;
    for path in paths {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let document: Value = serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        deep_merge(&mut merged, document);
    }

    // an empty document should still yield defaults
    if merged.is_null() {
        merged = Value::Mapping(Default::default());
    }

    Ok(serde_yaml::from_value(merged)?)
}

/// Merge `overlay` into `base`.
///
/// Mappings merge key by key, recursively. Any other value in `overlay`
/// (scalars, sequences) replaces the one in `base`. A null overlay leaves
/// `base` untouched.
pub fn deep_merge(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (_, Value::Null) => {}
        (Value::Mapping(base), Value::Mapping(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => deep_merge(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}
