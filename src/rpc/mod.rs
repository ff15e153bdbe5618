//! Resilient access to Stellar Horizon and Soroban RPC providers
//!
//! - [`Client`]: failover façade over ordered endpoint pools
//! - [`RetryTransport`]: same-endpoint retries with backoff and `Retry-After`
//! - [`batch`]: concurrent chunked `getLedgerEntries`
//! - [`verification`]: every requested key back, nothing else
//!
//! Responses for ledger entries are cached on disk through
//! [`erst_core_cache::ResponseCache`]; endpoint health lives in
//! [`erst_core_resilience::HealthTracker`].

pub mod batch;
pub mod builder;
pub mod client;
pub mod error;
pub mod network;
pub mod pagination;
pub mod payload;
pub mod probe;
pub mod telemetry;
pub mod transport;
pub mod types;
pub mod verification;

pub use batch::{chunk_keys, BATCH_SIZE, LARGE_FOOTPRINT_THRESHOLD};
pub use builder::{validate_network_config, validate_url, ClientBuilder, TOKEN_ENV_VAR};
pub use client::{Client, EndpointPool};
pub use error::{AllNodesFailed, NodeFailure, Result, RpcError};
pub use network::{Network, NetworkConfig};
pub use pagination::{normalize_page_size, HORIZON_PAGE_MAX_LIMIT};
pub use payload::{validate_payload_size, PayloadLimits, MAX_PAYLOAD_SIZE, WARNING_THRESHOLD};
pub use probe::{resolve_network, resolve_network_with};
pub use telemetry::{MethodTelemetry, MethodTimer, NoopMethodTelemetry, TracingMethodTelemetry};
pub use transport::RetryTransport;
pub use types::{
    AccountEvent, AccountSummary, AccountsQuery, HealthResponse, LedgerHeader, SimulateTransactionResponse,
    TransactionResponse, TransactionSummary,
};
pub use verification::{verify_ledger_entries, verify_ledger_entry_key};
