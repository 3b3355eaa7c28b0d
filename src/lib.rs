//! Zero-time coalescing cache
//!
//! A single-slot cache that collapses bursts of concurrent callers into one
//! execution of an expensive, idempotent operation, without a key space and
//! without a TTL.
//!
//! # Features
//!
//! - **Zero-time validity**: a result is only reused by callers that started
//!   waiting before it was produced, so no caller sees data older than its own call
//! - **Coalescing delay**: an optional wait before each refresh lets more callers
//!   queue behind the lock and share one result
//! - **Error caching**: producer failures are cached and shared like values, never retried
//! - **Injectable clocks**: [`clock::ManualClock`] reproduces coarse or frozen clocks
//! - **Statistics**: hit/refresh counters and the coalescing ratio per cache

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cache;
pub mod cli;
pub mod clock;
pub mod config;
pub mod error;
pub mod harness;
pub mod stats;

pub use cache::ZeroTimeCache;
pub use error::{Error, Result};

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Setup tracing/logging
pub fn setup_tracing(level: &str, format: Option<&str>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::registry().with(filter);

    match format {
        Some("json") => subscriber
            .with(fmt::layer().json())
            .try_init()
            .map_err(|e| Error::Config(format!("Failed to install subscriber: {e}")))?,
        _ => subscriber
            .with(fmt::layer())
            .try_init()
            .map_err(|e| Error::Config(format!("Failed to install subscriber: {e}")))?,
    }

    Ok(())
}
