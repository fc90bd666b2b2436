// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while loading relay configuration files.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// No configuration file was given.
    #[error("no configuration files given")]
    NoFiles,

    /// A configuration file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A configuration file is not valid YAML.
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// The merged document does not match the expected shape.
    #[error("invalid configuration: {0}")]
    Invalid(#[from] serde_yaml::Error),
}
