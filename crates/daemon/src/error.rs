// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon-level error types: startup, the fleet cache, and the command protocol.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can abort startup before the daemon is accepting connections.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to parse log level: {0}")]
    InvalidLogLevel(#[from] autophone_core::config::InvalidLogLevel),
    #[error("failed to bind command server on {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to set up logging: {0}")]
    Logging(#[from] std::io::Error),
    #[error("failed to read test manifest {path}: {source}")]
    Manifest {
        path: PathBuf,
        #[source]
        source: autophone_adapters::TestPluginError,
    },
    #[error("failed to load fleet cache: {0}")]
    Cache(#[from] autophone_core::CacheError),
}

/// Errors parsing a single command-server request line (§4.H).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("malformed parameter {0:?}: expected key=value")]
    MalformedPair(String),
    #[error("missing required parameter {0}")]
    MissingField(&'static str),
    #[error("unknown phone_id {0}")]
    UnknownPhone(String),
}
