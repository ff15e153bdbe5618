//! Failover client
//!
//! Every public operation runs against an [`EndpointPool`]: the current
//! endpoint is tried first, and retryable failures rotate through the rest
//! of the pool until one answers or each endpoint has been tried once.
//!
//! ```text
//!   caller ──► Client::op ──► with_failover(pool)
//!                                 │  health.check / rotate
//!                                 ▼
//!                           RetryTransport  (same URL, 429/503/504)
//!                                 │
//!                                 ▼
//!                           classify status ──► terminal? return
//!                                 │ retryable
//!                                 ▼
//!                      record_failure + NodeFailure, next endpoint
//! ```

use super::builder::ClientBuilder;
use super::error::{AllNodesFailed, NodeFailure, Result, RpcError};
use super::network::{Network, NetworkConfig};
use super::pagination::{normalize_page_size, PageRequest};
use super::payload::PayloadLimits;
use super::telemetry::MethodTelemetry;
use super::transport::RetryTransport;
use super::types::{
    AccountEvent, AccountSummary, AccountsQuery, GetLedgerEntriesResult, HealthResponse, HorizonTransaction,
    JsonRpcRequest, JsonRpcResponse, LedgerHeader, Page, SimulateTransactionResponse, TransactionResponse,
    TransactionSummary,
};
use super::verification::verify_ledger_entries;
use erst_core_cache::ResponseCache;
use erst_core_resilience::HealthTracker;
use reqwest::header::RETRY_AFTER;
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Ordered endpoints with a shared circular cursor
#[derive(Debug)]
pub struct EndpointPool {
    urls: Vec<String>,
    current: AtomicUsize,
}

impl EndpointPool {
    /// `urls` must not be empty; the builder guarantees it
    pub(crate) fn new(urls: Vec<String>) -> Self {
        Self {
            urls,
            current: AtomicUsize::new(0),
        }
    }

    pub fn urls(&self) -> &[String] {
        &self.urls
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }

    pub fn current_index(&self) -> usize {
        self.current.load(Ordering::Relaxed) % self.urls.len()
    }

    pub fn current_url(&self) -> &str {
        &self.urls[self.current_index()]
    }

    fn set_current(&self, index: usize) {
        self.current.store(index, Ordering::Relaxed);
    }

    /// First untried endpoint after `from` in circular order
    ///
    /// Healthy endpoints win; an unhealthy one is returned only when no
    /// untried healthy endpoint is left.
    fn next_candidate(&self, from: usize, health: &HealthTracker, tried: &[bool]) -> Option<usize> {
        let n = self.urls.len();
        let mut fallback = None;
        for step in 1..=n {
            let index = (from + step) % n;
            if tried[index] {
                continue;
            }
            if health.is_healthy(&self.urls[index]) {
                return Some(index);
            }
            fallback.get_or_insert(index);
        }
        fallback
    }

    /// First healthy endpoint starting at `from` itself
    fn first_healthy(&self, from: usize, health: &HealthTracker) -> Option<usize> {
        let n = self.urls.len();
        (0..n)
            .map(|step| (from + step) % n)
            .find(|&index| health.is_healthy(&self.urls[index]))
    }

    /// Advance the cursor one step, preferring a healthy endpoint
    ///
    /// Returns `false` for single-endpoint pools.
    pub fn rotate(&self, health: &HealthTracker) -> bool {
        if self.urls.len() < 2 {
            return false;
        }
        let current = self.current_index();
        let mut tried = vec![false; self.urls.len()];
        tried[current] = true;
        match self.next_candidate(current, health, &tried) {
            Some(next) => {
                tracing::info!(from = %self.urls[current], to = %self.urls[next], "Rotating RPC endpoint");
                self.set_current(next);
                true
            }
            None => false,
        }
    }
}

/// Resilient client for one network
///
/// Cheap to share behind an `Arc`; all methods take `&self`.
pub struct Client {
    pub(crate) network: Network,
    pub(crate) config: NetworkConfig,
    pub(crate) general: EndpointPool,
    pub(crate) simulation: EndpointPool,
    pub(crate) health: HealthTracker,
    pub(crate) transport: RetryTransport,
    pub(crate) cache: Option<Arc<ResponseCache>>,
    pub(crate) payload_limits: PayloadLimits,
    pub(crate) telemetry: Arc<dyn MethodTelemetry>,
    pub(crate) call_timeout: Option<Duration>,
    pub(crate) request_id: AtomicU64,
}

impl Client {
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    pub fn network(&self) -> Network {
        self.network
    }

    pub fn network_name(&self) -> &str {
        &self.config.name
    }

    pub fn network_passphrase(&self) -> &str {
        &self.config.network_passphrase
    }

    pub fn network_config(&self) -> &NetworkConfig {
        &self.config
    }

    pub fn alt_urls(&self) -> &[String] {
        self.general.urls()
    }

    pub fn current_url(&self) -> &str {
        self.general.current_url()
    }

    pub fn soroban_urls(&self) -> &[String] {
        self.simulation.urls()
    }

    pub fn current_soroban_url(&self) -> &str {
        self.simulation.current_url()
    }

    pub fn health(&self) -> &HealthTracker {
        &self.health
    }

    pub fn cache(&self) -> Option<&ResponseCache> {
        self.cache.as_deref()
    }

    pub fn cache_enabled(&self) -> bool {
        self.cache.is_some()
    }

    /// Move the general cursor to the next endpoint
    pub fn rotate_url(&self) -> bool {
        self.general.rotate(&self.health)
    }

    pub(crate) fn deadline(&self) -> Option<Instant> {
        self.call_timeout.map(|timeout| Instant::now() + timeout)
    }

    fn attributes(&self) -> Vec<(&'static str, String)> {
        vec![("network", self.config.name.clone())]
    }

    /// Run `fut` between one timer start and one timer stop
    pub(crate) async fn instrumented<T, Fut>(
        &self,
        method: &str,
        attributes: Vec<(&'static str, String)>,
        fut: Fut,
    ) -> Result<T>
    where
        Fut: Future<Output = Result<T>>,
    {
        let timer = self.telemetry.start_method_timer(method, &attributes);
        let result = fut.await;
        timer.stop(result.as_ref().err());
        result
    }

    // ========================================================================
    // FAILOVER
    // ========================================================================

    /// Try `attempt` against each endpoint of `pool` at most once
    ///
    /// Terminal errors return as-is. Retryable ones are recorded against the
    /// endpoint and collected; if every endpoint fails the caller gets
    /// [`AllNodesFailed`] with one entry per URL in attempt order.
    pub(crate) async fn with_failover<T, F, Fut>(&self, pool: &EndpointPool, mut attempt: F) -> Result<T>
    where
        F: FnMut(String) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut index = pool.current_index();

        // Skip a known-bad current endpoint before any network I/O. With no
        // healthy endpoint left, a multi-endpoint pool still tries each one
        // once; a single endpoint fails fast.
        if !self.health.is_healthy(&pool.urls[index]) {
            match pool.first_healthy(index, &self.health) {
                Some(healthy) => {
                    tracing::debug!(
                        skipped = %pool.urls[index],
                        url = %pool.urls[healthy],
                        "Current endpoint circuit open, switching before request"
                    );
                    index = healthy;
                    pool.set_current(healthy);
                }
                None if pool.len() > 1 => {
                    tracing::warn!(
                        endpoints = pool.len(),
                        "All endpoint circuits open, trying each endpoint anyway"
                    );
                }
                None => {
                    let failures = pool
                        .urls
                        .iter()
                        .map(|url| NodeFailure {
                            url: url.clone(),
                            error: match self.health.check(url) {
                                Err(e) => e.into(),
                                Ok(()) => RpcError::ConnectionFailed("circuit breaker open".to_string()),
                            },
                        })
                        .collect();
                    tracing::warn!(url = %pool.urls[index], "Endpoint circuit open");
                    return Err(AllNodesFailed::new(failures).into());
                }
            }
        }

        let mut tried = vec![false; pool.len()];
        let mut failures = Vec::new();

        loop {
            let url = pool.urls[index].clone();
            tried[index] = true;

            match attempt(url.clone()).await {
                Ok(value) => {
                    self.health.record_success(&url);
                    return Ok(value);
                }
                Err(e) if !e.is_retryable_by_rotation() => {
                    if e.is_timeout() {
                        self.health.record_failure(&url);
                    }
                    return Err(e);
                }
                Err(e) => {
                    self.health.record_failure(&url);
                    tracing::warn!(url = %url, error = %e, "RPC endpoint failed");
                    failures.push(NodeFailure { url, error: e });

                    match pool.next_candidate(index, &self.health, &tried) {
                        Some(next) => {
                            tracing::info!(from = %pool.urls[index], to = %pool.urls[next], "Rotating RPC endpoint");
                            index = next;
                            pool.set_current(next);
                        }
                        None => break,
                    }
                }
            }
        }

        tracing::error!(endpoints = failures.len(), "All RPC endpoints failed");
        Err(AllNodesFailed::new(failures).into())
    }

    // ========================================================================
    // HTTP HELPERS
    // ========================================================================

    async fn get_json<T: DeserializeOwned>(
        &self,
        base: String,
        request: &PageRequest,
        what: &str,
        deadline: Option<Instant>,
    ) -> Result<T> {
        let url = request.url(&base)?;
        let req = self.transport.get(url)?;
        let resp = self.transport.execute(req, deadline).await?;
        let resp = check_status(resp, &base, what)?;
        decode_body(resp, &base, deadline).await
    }

    async fn fetch_page<T: DeserializeOwned>(
        &self,
        base: String,
        request: &PageRequest,
        what: &str,
        deadline: Option<Instant>,
    ) -> Result<(Page<T>, String)> {
        let page = self.get_json(base.clone(), request, what, deadline).await?;
        Ok((page, base))
    }

    /// One JSON-RPC round-trip against `base`
    async fn call_rpc<P: Serialize, R: DeserializeOwned>(
        &self,
        base: String,
        method: &str,
        params: Option<P>,
        deadline: Option<Instant>,
    ) -> Result<R> {
        let id = self.request_id.fetch_add(1, Ordering::Relaxed);
        let body = serde_json::to_vec(&JsonRpcRequest::new(id, method, params))
            .map_err(|e| RpcError::Encode(format!("{}: {}", method, e)))?;
        self.payload_limits.validate(body.len() as u64)?;

        let req = self.transport.post_json(&base, body)?;
        let resp = self.transport.execute(req, deadline).await?;
        let resp = check_status(resp, &base, method)?;
        let envelope: JsonRpcResponse<R> = decode_body(resp, &base, deadline).await?;

        if let Some(err) = envelope.error {
            tracing::debug!(url = %base, method, code = err.code, message = %err.message, "RPC error response");
            return Err(RpcError::Rpc {
                code: err.code,
                message: err.message,
            });
        }
        envelope
            .result
            .ok_or_else(|| RpcError::Decode(format!("{} response from {} has neither result nor error", method, base)))
    }

    // ========================================================================
    // OPERATIONS
    // ========================================================================

    /// Envelope, result and meta XDR for a transaction hash
    pub async fn get_transaction(&self, hash: &str) -> Result<TransactionResponse> {
        let mut attributes = self.attributes();
        attributes.push(("hash", hash.to_string()));
        self.instrumented("getTransaction", attributes, async {
            validate_hash(hash)?;
            let deadline = self.deadline();
            let request = &PageRequest::new(format!("transactions/{}", hash));
            let what = &format!("transaction {}", hash);

            tracing::debug!(hash, network = %self.config.name, "Fetching transaction details");
            let tx: HorizonTransaction = self
                .with_failover(&self.general, |base| self.get_json(base, request, what, deadline))
                .await?;
            tracing::info!(hash, envelope_size = tx.envelope_xdr.len(), "Transaction fetched");
            Ok(tx.into())
        })
        .await
    }

    /// Ledger header for `sequence`
    pub async fn get_ledger_header(&self, sequence: u32) -> Result<LedgerHeader> {
        let mut attributes = self.attributes();
        attributes.push(("ledger.sequence", sequence.to_string()));
        self.instrumented("getLedgerHeader", attributes, async {
            let deadline = self.deadline();
            let request = &PageRequest::new(format!("ledgers/{}", sequence));
            let what = &format!("ledger {}", sequence);

            tracing::debug!(sequence, network = %self.config.name, "Fetching ledger header");
            let header: LedgerHeader = self
                .with_failover(&self.general, |base| self.get_json(base, request, what, deadline))
                .await?;
            tracing::info!(
                sequence,
                hash = %header.hash,
                protocol_version = header.protocol_version,
                close_time = %header.closed_at,
                "Ledger header fetched"
            );
            Ok(header)
        })
        .await
    }

    /// Current values for `keys`, served from the cache where possible
    ///
    /// The result is verified against every requested key, cache hits
    /// included, before it is returned.
    pub async fn get_ledger_entries(&self, keys: &[String]) -> Result<HashMap<String, String>> {
        let mut attributes = self.attributes();
        attributes.push(("keys", keys.len().to_string()));
        self.instrumented("getLedgerEntries", attributes, self.ledger_entries(keys, self.deadline()))
            .await
    }

    pub(crate) async fn ledger_entries(
        &self,
        keys: &[String],
        deadline: Option<Instant>,
    ) -> Result<HashMap<String, String>> {
        if keys.is_empty() {
            return Ok(HashMap::new());
        }

        let (mut entries, misses) = match &self.cache {
            Some(cache) => {
                let cache = Arc::clone(cache);
                let owned = keys.to_vec();
                match tokio::task::spawn_blocking(move || read_cached(&cache, &owned)).await {
                    Ok(split) => split,
                    Err(e) => {
                        tracing::warn!(error = %e, "Cache lookup task failed, fetching from network");
                        (HashMap::new(), keys.to_vec())
                    }
                }
            }
            None => (HashMap::new(), keys.to_vec()),
        };
        entries.reserve(misses.len());

        let hits = entries.len();
        let mut fetched = HashMap::new();
        if !misses.is_empty() {
            tracing::debug!(requested = keys.len(), cached = hits, fetching = misses.len(), "Fetching ledger entries");
            let misses = misses.as_slice();
            fetched = self
                .with_failover(&self.general, |base| self.fetch_ledger_entries(base, misses, deadline))
                .await?;
            entries.extend(fetched.iter().map(|(k, v)| (k.clone(), v.clone())));
        }

        verify_ledger_entries(keys, &entries)?;

        match &self.cache {
            Some(cache) if !fetched.is_empty() => {
                let cache = Arc::clone(cache);
                if let Err(e) = tokio::task::spawn_blocking(move || write_cached(&cache, &fetched)).await {
                    tracing::warn!(error = %e, "Cache write task failed");
                }
            }
            _ => {}
        }

        tracing::info!(requested = keys.len(), found = entries.len(), cached = hits, "Ledger entries fetched");
        Ok(entries)
    }

    async fn fetch_ledger_entries(
        &self,
        base: String,
        keys: &[String],
        deadline: Option<Instant>,
    ) -> Result<HashMap<String, String>> {
        let result: GetLedgerEntriesResult = self
            .call_rpc(base, "getLedgerEntries", Some([keys]), deadline)
            .await?;
        Ok(result.entries.into_iter().map(|e| (e.key, e.xdr)).collect())
    }

    /// Preflight a transaction envelope on the simulation pool
    pub async fn simulate_transaction(&self, envelope_xdr: &str) -> Result<SimulateTransactionResponse> {
        let mut attributes = self.attributes();
        attributes.push(("envelope_bytes", envelope_xdr.len().to_string()));
        self.instrumented("simulateTransaction", attributes, async {
            let deadline = self.deadline();
            let response: SimulateTransactionResponse = self
                .with_failover(&self.simulation, |base| {
                    self.call_rpc(base, "simulateTransaction", Some([envelope_xdr]), deadline)
                })
                .await?;
            tracing::info!(
                min_resource_fee = %response.min_resource_fee,
                latest_ledger = response.latest_ledger,
                failed = response.error.is_some(),
                "Transaction simulated"
            );
            Ok(response)
        })
        .await
    }

    /// `getHealth` on the simulation pool
    pub async fn get_health(&self) -> Result<HealthResponse> {
        self.instrumented("getHealth", self.attributes(), async {
            let deadline = self.deadline();
            let health: HealthResponse = self
                .with_failover(&self.simulation, |base| {
                    self.call_rpc(base, "getHealth", None::<()>, deadline)
                })
                .await?;
            tracing::debug!(status = %health.status, latest_ledger = health.latest_ledger, "RPC health");
            Ok(health)
        })
        .await
    }

    // ========================================================================
    // PAGINATED READS
    // ========================================================================

    /// Most recent transactions for `account`; `limit` 0 means all of them
    pub async fn get_account_transactions(&self, account: &str, limit: usize) -> Result<Vec<TransactionSummary>> {
        let mut attributes = self.attributes();
        attributes.push(("account", account.to_string()));
        self.instrumented("getAccountTransactions", attributes, async {
            let request = PageRequest::new(format!("accounts/{}/transactions", account))
                .with("order", "desc")
                .with("limit", normalize_page_size(limit).to_string());
            let records: Vec<HorizonTransaction> = self.collect_pages(request, limit, "account transactions").await?;
            tracing::debug!(account, count = records.len(), "Account transactions retrieved");
            Ok(records.into_iter().map(TransactionSummary::from).collect())
        })
        .await
    }

    /// Accounts matching `query`; at least one filter is required
    pub async fn get_accounts(&self, query: &AccountsQuery, limit: usize) -> Result<Vec<AccountSummary>> {
        self.instrumented("getAccounts", self.attributes(), async {
            if query.is_empty() {
                return Err(RpcError::InvalidRequest(
                    "accounts query needs a signer, asset, sponsor or liquidity pool filter".to_string(),
                ));
            }
            let mut request = PageRequest::new("accounts");
            for (name, value) in query.pairs() {
                request = request.with(name, value);
            }
            let request = request
                .with("order", "asc")
                .with("limit", normalize_page_size(limit).to_string());
            self.collect_pages(request, limit, "accounts").await
        })
        .await
    }

    /// Effects on `account`, newest first
    pub async fn get_events_for_account(&self, account: &str, limit: usize) -> Result<Vec<AccountEvent>> {
        let mut attributes = self.attributes();
        attributes.push(("account", account.to_string()));
        self.instrumented("getEventsForAccount", attributes, async {
            let request = PageRequest::new(format!("accounts/{}/effects", account))
                .with("order", "desc")
                .with("limit", normalize_page_size(limit).to_string());
            self.collect_pages(request, limit, "account effects").await
        })
        .await
    }

    /// Follow `_links.next` until `max` records (0 = no cap) or an empty page
    async fn collect_pages<T: DeserializeOwned>(&self, first: PageRequest, max: usize, what: &str) -> Result<Vec<T>> {
        let deadline = self.deadline();
        let mut request = first;
        let mut out = Vec::new();

        loop {
            let current = &request;
            let (page, base): (Page<T>, String) = self
                .with_failover(&self.general, |base| self.fetch_page(base, current, what, deadline))
                .await?;

            let records = page.embedded.records;
            if records.is_empty() {
                break;
            }
            if max > 0 {
                let remaining = max - out.len();
                out.extend(records.into_iter().take(remaining));
                if out.len() >= max {
                    break;
                }
            } else {
                out.extend(records);
            }

            let Some(next) = page.links.next else { break };
            let next = PageRequest::from_next_link(&next.href, &base)?;
            if next == request {
                break;
            }
            request = next;
        }

        Ok(out)
    }
}

/// Split `keys` into cache hits and misses; unreadable entries count as misses
fn read_cached(cache: &ResponseCache, keys: &[String]) -> (HashMap<String, String>, Vec<String>) {
    let mut hits = HashMap::with_capacity(keys.len());
    let mut misses = Vec::new();
    for key in keys {
        match cache.get(key) {
            Ok(Some(value)) => {
                hits.insert(key.clone(), value);
            }
            Ok(None) => misses.push(key.clone()),
            Err(e) => {
                tracing::warn!(error = %e, "Cache read failed, fetching from network");
                misses.push(key.clone());
            }
        }
    }
    (hits, misses)
}

fn write_cached(cache: &ResponseCache, entries: &HashMap<String, String>) {
    for (key, value) in entries {
        if let Err(e) = cache.set(key, value) {
            tracing::warn!(error = %e, "Failed to cache ledger entry");
        }
    }
}

/// Map a non-retryable HTTP status onto the error taxonomy
fn check_status(resp: Response, base: &str, what: &str) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    match status {
        StatusCode::NOT_FOUND => {
            tracing::debug!(url = %base, what, status_code = 404, "Not found");
            Err(RpcError::NotFound(format!("{} not found", what)))
        }
        StatusCode::GONE => {
            tracing::warn!(url = %base, what, status_code = 410, "Archived");
            Err(RpcError::Archived(format!(
                "{} has been archived and is no longer available",
                what
            )))
        }
        StatusCode::PAYLOAD_TOO_LARGE => {
            tracing::warn!(url = %base, what, status_code = 413, "Response too large");
            Err(RpcError::ResponseTooLarge { url: base.to_string() })
        }
        StatusCode::TOO_MANY_REQUESTS => {
            let retry_after = resp
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(erst_core_resilience::parse_retry_after);
            Err(RpcError::RateLimited { retry_after })
        }
        other => Err(RpcError::ConnectionFailed(format!(
            "{} returned HTTP {} for {}",
            base,
            other.as_u16(),
            what
        ))),
    }
}

async fn decode_body<T: DeserializeOwned>(resp: Response, base: &str, deadline: Option<Instant>) -> Result<T> {
    let body = match deadline {
        Some(at) => tokio::time::timeout_at(at, resp.bytes())
            .await
            .map_err(|_| RpcError::Timeout(format!("reading response from {} exceeded the call deadline", base)))?,
        None => resp.bytes().await,
    }
    .map_err(|e| RpcError::ConnectionFailed(format!("failed to read response from {}: {}", base, e)))?;

    serde_json::from_slice(&body).map_err(|e| RpcError::Decode(format!("invalid JSON from {}: {}", base, e)))
}

fn validate_hash(hash: &str) -> Result<()> {
    if hash.is_empty() || !hash.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(RpcError::InvalidRequest(format!("invalid transaction hash: {:?}", hash)));
    }
    Ok(())
}
