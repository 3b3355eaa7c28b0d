//! Error types for the zero-time cache tooling
//!
//! The cache itself never fails: producer errors are the caller's own type
//! and pass through untouched. These errors cover configuration, output and
//! the demonstration harness.

use std::io;

use thiserror::Error;

/// Result type alias for the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Zero-time cache tooling errors
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Harness run failed or observed a stale result
    #[error("Harness error: {0}")]
    Harness(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}
