//! Client construction
//!
//! ```no_run
//! use erst::rpc::{Client, Network};
//! use std::time::Duration;
//!
//! # fn main() -> Result<(), erst::rpc::RpcError> {
//! let client = Client::builder()
//!     .network(Network::Testnet)
//!     .alt_urls(["https://horizon-a.example", "https://horizon-b.example"])
//!     .call_timeout(Duration::from_secs(30))
//!     .build()?;
//! assert_eq!(client.network_name(), "testnet");
//! # Ok(())
//! # }
//! ```

use super::client::{Client, EndpointPool};
use super::error::RpcError;
use super::network::{Network, NetworkConfig};
use super::payload::PayloadLimits;
use super::telemetry::{MethodTelemetry, NoopMethodTelemetry};
use super::transport::RetryTransport;
use erst_core_cache::ResponseCache;
use erst_core_resilience::{CircuitBreakerConfig, HealthTracker, RetryPolicy};
use reqwest::Url;
use std::sync::atomic::AtomicU64;
use std::sync::Arc;
use std::time::Duration;

/// Environment variable consulted when no token is configured
pub const TOKEN_ENV_VAR: &str = "ERST_RPC_TOKEN";

pub struct ClientBuilder {
    network: Network,
    token: Option<String>,
    horizon_urls: Vec<String>,
    soroban_urls: Vec<String>,
    network_config: Option<NetworkConfig>,
    cache_enabled: bool,
    cache: Option<ResponseCache>,
    http_client: Option<reqwest::Client>,
    retry_policy: RetryPolicy,
    circuit_breaker: CircuitBreakerConfig,
    health: Option<HealthTracker>,
    payload_limits: PayloadLimits,
    telemetry: Option<Arc<dyn MethodTelemetry>>,
    call_timeout: Option<Duration>,
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self {
            network: Network::Mainnet,
            token: None,
            horizon_urls: Vec::new(),
            soroban_urls: Vec::new(),
            network_config: None,
            cache_enabled: true,
            cache: None,
            http_client: None,
            retry_policy: RetryPolicy::default(),
            circuit_breaker: CircuitBreakerConfig::default(),
            health: None,
            payload_limits: PayloadLimits::default(),
            telemetry: None,
            call_timeout: None,
        }
    }
}

impl ClientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn network(mut self, network: Network) -> Self {
        self.network = network;
        self
    }

    /// Bearer token; empty strings are treated as unset
    pub fn token(mut self, token: impl Into<String>) -> Self {
        let token = token.into();
        self.token = (!token.is_empty()).then_some(token);
        self
    }

    /// Single general endpoint, replacing any alternates
    pub fn horizon_url(mut self, url: impl Into<String>) -> Self {
        self.horizon_urls = vec![url.into()];
        self
    }

    /// Ordered general endpoints; the first one is tried first
    pub fn alt_urls<I, S>(mut self, urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let urls: Vec<String> = urls.into_iter().map(Into::into).collect();
        if !urls.is_empty() {
            self.horizon_urls = urls;
        }
        self
    }

    pub fn soroban_url(mut self, url: impl Into<String>) -> Self {
        self.soroban_urls = vec![url.into()];
        self
    }

    pub fn soroban_urls<I, S>(mut self, urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let urls: Vec<String> = urls.into_iter().map(Into::into).collect();
        if !urls.is_empty() {
            self.soroban_urls = urls;
        }
        self
    }

    /// Custom network; its URLs fill in whatever was not set explicitly
    pub fn network_config(mut self, config: NetworkConfig) -> Self {
        if let Ok(network) = config.name.parse() {
            self.network = network;
        }
        self.network_config = Some(config);
        self
    }

    pub fn cache_enabled(mut self, enabled: bool) -> Self {
        self.cache_enabled = enabled;
        self
    }

    /// Use `cache` instead of the per-user default location
    pub fn cache(mut self, cache: ResponseCache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn http_client(mut self, client: reqwest::Client) -> Self {
        self.http_client = Some(client);
        self
    }

    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    pub fn circuit_breaker(mut self, config: CircuitBreakerConfig) -> Self {
        self.circuit_breaker = config;
        self
    }

    /// Share endpoint health with other clients
    pub fn health_tracker(mut self, tracker: HealthTracker) -> Self {
        self.health = Some(tracker);
        self
    }

    pub fn payload_limits(mut self, limits: PayloadLimits) -> Self {
        self.payload_limits = limits;
        self
    }

    pub fn method_telemetry(mut self, telemetry: Arc<dyn MethodTelemetry>) -> Self {
        self.telemetry = Some(telemetry);
        self
    }

    /// Deadline applied to every public operation, retries included
    pub fn call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = Some(timeout);
        self
    }

    pub fn build(self) -> Result<Client, RpcError> {
        self.retry_policy.validate()?;

        let config = match self.network_config {
            Some(config) => {
                validate_network_config(&config)?;
                config
            }
            None => self.network.config(),
        };

        let horizon_urls = if self.horizon_urls.is_empty() {
            let fallback = if config.horizon_url.is_empty() {
                &config.soroban_rpc_url
            } else {
                &config.horizon_url
            };
            vec![fallback.clone()]
        } else {
            self.horizon_urls
        };

        let soroban_urls = if self.soroban_urls.is_empty() {
            let fallback = if config.soroban_rpc_url.is_empty() {
                &horizon_urls[0]
            } else {
                &config.soroban_rpc_url
            };
            vec![fallback.clone()]
        } else {
            self.soroban_urls
        };

        for url in horizon_urls.iter().chain(soroban_urls.iter()) {
            validate_url(url)?;
        }

        let token = self
            .token
            .or_else(|| std::env::var(TOKEN_ENV_VAR).ok().filter(|t| !t.is_empty()));

        let http = match self.http_client {
            Some(client) => client,
            None => reqwest::Client::builder()
                .build()
                .map_err(|e| RpcError::InvalidConfig(format!("failed to create HTTP client: {}", e)))?,
        };

        let cache = if !self.cache_enabled {
            None
        } else if let Some(cache) = self.cache {
            Some(Arc::new(cache))
        } else {
            match ResponseCache::open_default() {
                Ok(cache) => Some(Arc::new(cache)),
                Err(e) => {
                    tracing::warn!(error = %e, "Response cache unavailable, continuing without it");
                    None
                }
            }
        };

        let health = self
            .health
            .unwrap_or_else(|| HealthTracker::new(self.circuit_breaker));

        tracing::debug!(
            network = %config.name,
            endpoints = horizon_urls.len(),
            simulation_endpoints = soroban_urls.len(),
            authenticated = token.is_some(),
            cache = cache.is_some(),
            "RPC client configured"
        );

        Ok(Client {
            network: self.network,
            config,
            general: EndpointPool::new(horizon_urls),
            simulation: EndpointPool::new(soroban_urls),
            health,
            transport: RetryTransport::new(http, self.retry_policy, token),
            cache,
            payload_limits: self.payload_limits,
            telemetry: self.telemetry.unwrap_or_else(|| Arc::new(NoopMethodTelemetry)),
            call_timeout: self.call_timeout,
            request_id: AtomicU64::new(1),
        })
    }
}

/// Absolute http(s) URL with a host
pub fn validate_url(url: &str) -> Result<(), RpcError> {
    if url.is_empty() {
        return Err(RpcError::InvalidConfig("URL cannot be empty".to_string()));
    }
    let parsed = Url::parse(url).map_err(|e| RpcError::InvalidConfig(format!("invalid URL {:?}: {}", url, e)))?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(RpcError::InvalidConfig(format!(
            "URL scheme must be http or https, got {:?}",
            parsed.scheme()
        )));
    }
    if parsed.host_str().map_or(true, str::is_empty) {
        return Err(RpcError::InvalidConfig(format!("URL must include a host: {}", url)));
    }
    Ok(())
}

pub fn validate_network_config(config: &NetworkConfig) -> Result<(), RpcError> {
    if config.name.is_empty() {
        return Err(RpcError::InvalidConfig("network name is required".to_string()));
    }
    if config.network_passphrase.is_empty() {
        return Err(RpcError::InvalidConfig("network passphrase is required".to_string()));
    }
    if config.horizon_url.is_empty() && config.soroban_rpc_url.is_empty() {
        return Err(RpcError::InvalidConfig(
            "at least one of horizon_url or soroban_rpc_url is required".to_string(),
        ));
    }
    if !config.horizon_url.is_empty() {
        validate_url(&config.horizon_url)?;
    }
    if !config.soroban_rpc_url.is_empty() {
        validate_url(&config.soroban_rpc_url)?;
    }
    Ok(())
}
