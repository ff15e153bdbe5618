//! Erst Core Resilience: pure-logic fault tolerance primitives
//!
//! # Overview
//!
//! Building blocks for talking to a federation of remote endpoints where no
//! single provider can be trusted for availability:
//!
//! - **Health Tracker**: per-URL failure counters with a time-bounded circuit
//!   breaker (5 failures, 60s cool-down by default)
//! - **Retry Policy**: exponential backoff with symmetric jitter and
//!   `Retry-After` header parsing
//!
//! # Key Principles
//!
//! This crate is **pure logic** with zero knowledge of:
//! - HTTP clients or wire formats
//! - The ledger network and its payloads
//! - Where or whether anything is cached
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │         Failover client                 │
//! └─────────────┬───────────────────────────┘
//!               │ pick endpoint
//!               ▼
//! ┌─────────────────────────────────────────┐
//! │       Health Tracker                    │  ← Fail-fast on known-bad hosts
//! │  (failure counts, 60s cool-down)        │
//! └─────────────┬───────────────────────────┘
//!               │ send
//!               ▼
//! ┌─────────────────────────────────────────┐
//! │       Retry Policy                      │  ← Absorb 429/503/504
//! │  (backoff, jitter, Retry-After)         │
//! └─────────────┬───────────────────────────┘
//!               ▼
//!         Remote endpoint
//! ```
//!
//! # Usage Example
//!
//! ```
//! use erst_core_resilience::{HealthTracker, RetryPolicy};
//!
//! let tracker = HealthTracker::new_default();
//! let policy = RetryPolicy::default();
//!
//! let url = "https://rpc.example";
//! if tracker.check(url).is_ok() {
//!     // dial the endpoint, sleeping policy.apply_jitter(..) between retries
//!     tracker.record_success(url);
//! }
//! assert!(policy.should_retry_status(429));
//! ```

pub mod backoff;
pub mod circuit_breaker;
pub mod error;

// Re-export main types for convenience
pub use backoff::{parse_retry_after, RetryPolicy};
pub use circuit_breaker::{CircuitBreakerConfig, CircuitState, EndpointHealth, HealthTracker};
pub use error::ResilienceError;

/// Prelude module for convenient imports
///
/// # Example
/// ```
/// use erst_core_resilience::prelude::*;
/// ```
pub mod prelude {
    pub use super::backoff::{parse_retry_after, RetryPolicy};
    pub use super::circuit_breaker::{CircuitBreakerConfig, CircuitState, HealthTracker};
    pub use super::error::ResilienceError;
}
