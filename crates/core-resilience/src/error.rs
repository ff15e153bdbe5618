//! Error types for the resilience primitives

use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResilienceError {
    /// The endpoint tripped its breaker and is still cooling down
    #[error("circuit breaker open for {url} (retry in {}s)", retry_in.as_secs())]
    CircuitOpen { url: String, retry_in: Duration },

    /// A policy was configured with values that cannot work
    #[error("invalid resilience configuration: {0}")]
    InvalidConfig(String),
}

impl ResilienceError {
    /// Circuit-open errors clear up by themselves once the cool-down passes
    pub fn is_transient(&self) -> bool {
        matches!(self, ResilienceError::CircuitOpen { .. })
    }
}
