/*!
 * Erst - resilient Stellar data access
 *
 * A client library for Horizon and Soroban RPC providers with:
 * - Ordered endpoint failover with per-URL circuit breakers
 * - Same-endpoint retries honoring `Retry-After`
 * - Verified, cached `getLedgerEntries` with concurrent batching
 * - Paged Horizon queries and network auto-detection
 * - An LRU-managed on-disk cache shared across runs
 *
 * Version: 0.3.0
 */

pub mod cli_style;
pub mod commands;
pub mod config;
pub mod error;
pub mod logging;
pub mod rpc;

// Re-export commonly used types
pub use config::{AppConfig, LogLevel};
pub use error::{ErstError, Result};
pub use rpc::{Client, ClientBuilder, Network, NetworkConfig, RpcError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert_eq!(VERSION, env!("CARGO_PKG_VERSION"));
    }
}
