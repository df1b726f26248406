//! Log sink setup for the service binary.
//!
//! Logs go to stderr; stdout carries responses.

use tracing_subscriber::EnvFilter;

use crate::error::ServiceError;

/// Installs the global subscriber. An unparseable filter falls back to `info`.
pub fn init(filter: &str) -> Result<(), ServiceError> {
    let filter = EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|source| ServiceError::Logging(source.to_string()))
}
