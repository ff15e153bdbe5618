//! Typed failures surfaced by the RPC client
//!
//! Every failure carries enough classification for the failover loop to
//! decide between "try the next provider" and "stop, this answer is final".

use erst_core_resilience::ResilienceError;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Result type for RPC operations
pub type Result<T> = std::result::Result<T, RpcError>;

#[derive(Error, Debug)]
pub enum RpcError {
    /// Transport failure or a non-success status after retries ran out
    #[error("RPC connection failed: {0}")]
    ConnectionFailed(String),

    /// The provider kept answering 429
    #[error("rate limit exceeded{}", retry_after.map(|d| format!(" (retry after {}s)", d.as_secs())).unwrap_or_default())]
    RateLimited { retry_after: Option<Duration> },

    /// The provider refused to serve a response this large (HTTP 413)
    #[error("response too large from {url}: the requested data exceeds the provider's limit, request fewer entries or a narrower range")]
    ResponseTooLarge { url: String },

    /// The outgoing request was rejected before it was sent
    #[error("request payload too large: {size} bytes exceeds the maximum of {max} bytes")]
    RequestTooLarge { size: u64, max: u64 },

    #[error("not found: {0}")]
    NotFound(String),

    /// Data aged out of the provider's retention window (HTTP 410)
    #[error("archived: {0}")]
    Archived(String),

    /// JSON-RPC error object returned by the provider
    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    /// The provider answered for keys other than the ones requested
    #[error("ledger entry verification failed: {0}")]
    Verification(String),

    /// The endpoint is still cooling down after repeated failures
    #[error("circuit breaker open for {url} (retry in {}s)", retry_in.as_secs())]
    CircuitOpen { url: String, retry_in: Duration },

    #[error(transparent)]
    AllNodesFailed(#[from] AllNodesFailed),

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("invalid client configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("failed to encode request: {0}")]
    Encode(String),

    #[error("failed to decode response: {0}")]
    Decode(String),

    #[error("cache error: {0}")]
    Cache(#[from] erst_core_cache::Error),
}

impl From<ResilienceError> for RpcError {
    fn from(err: ResilienceError) -> Self {
        match err {
            ResilienceError::CircuitOpen { url, retry_in } => RpcError::CircuitOpen { url, retry_in },
            ResilienceError::InvalidConfig(msg) => RpcError::InvalidConfig(msg),
        }
    }
}

impl RpcError {
    pub fn is_not_found(&self) -> bool {
        self.matches(|e| matches!(e, RpcError::NotFound(_)))
    }

    pub fn is_archived(&self) -> bool {
        self.matches(|e| matches!(e, RpcError::Archived(_)))
    }

    pub fn is_rate_limited(&self) -> bool {
        self.matches(|e| matches!(e, RpcError::RateLimited { .. }))
    }

    /// Either direction of the size limit
    pub fn is_too_large(&self) -> bool {
        self.matches(|e| {
            matches!(
                e,
                RpcError::ResponseTooLarge { .. } | RpcError::RequestTooLarge { .. }
            )
        })
    }

    pub fn is_verification_failure(&self) -> bool {
        self.matches(|e| matches!(e, RpcError::Verification(_)))
    }

    pub fn is_timeout(&self) -> bool {
        self.matches(|e| matches!(e, RpcError::Timeout(_)))
    }

    /// Whether another provider might answer where this one failed
    ///
    /// Terminal answers (not found, archived, too large, protocol errors,
    /// verification failures) are the same everywhere, so rotating would
    /// only hide them.
    pub fn is_retryable_by_rotation(&self) -> bool {
        matches!(
            self,
            RpcError::ConnectionFailed(_)
                | RpcError::RateLimited { .. }
                | RpcError::CircuitOpen { .. }
                | RpcError::Decode(_)
        )
    }

    /// Apply `pred` to this error, or to every failure of an aggregate
    fn matches(&self, pred: impl Fn(&RpcError) -> bool) -> bool {
        match self {
            RpcError::AllNodesFailed(all) => {
                !all.failures.is_empty() && all.failures.iter().all(|f| pred(&f.error))
            }
            other => pred(other),
        }
    }
}

/// One provider's failure during a failover sweep
#[derive(Debug)]
pub struct NodeFailure {
    pub url: String,
    pub error: RpcError,
}

impl fmt::Display for NodeFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.url, self.error)
    }
}

/// Every candidate provider failed; one entry per URL, in attempt order
#[derive(Debug, Default)]
pub struct AllNodesFailed {
    pub failures: Vec<NodeFailure>,
}

impl AllNodesFailed {
    pub fn new(failures: Vec<NodeFailure>) -> Self {
        Self { failures }
    }

    pub fn urls(&self) -> Vec<&str> {
        self.failures.iter().map(|f| f.url.as_str()).collect()
    }
}

impl fmt::Display for AllNodesFailed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "all RPC endpoints failed: [")?;
        for (i, failure) in self.failures.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", failure)?;
        }
        write!(f, "]")
    }
}

impl std::error::Error for AllNodesFailed {}

#[cfg(test)]
mod tests {
    use super::*;

    fn failure(url: &str, error: RpcError) -> NodeFailure {
        NodeFailure {
            url: url.to_string(),
            error,
        }
    }

    #[test]
    fn test_all_nodes_failed_lists_every_url() {
        let err = RpcError::from(AllNodesFailed::new(vec![
            failure("http://a", RpcError::ConnectionFailed("refused".into())),
            failure("http://b", RpcError::RateLimited { retry_after: None }),
        ]));

        let msg = err.to_string();
        assert!(msg.contains("http://a: RPC connection failed: refused"), "{}", msg);
        assert!(msg.contains("http://b: rate limit exceeded"), "{}", msg);
        assert!(msg.starts_with("all RPC endpoints failed"));
    }

    #[test]
    fn test_predicates_see_through_uniform_aggregate() {
        let err = RpcError::from(AllNodesFailed::new(vec![
            failure("http://a", RpcError::RateLimited { retry_after: None }),
            failure("http://b", RpcError::RateLimited { retry_after: Some(Duration::from_secs(2)) }),
        ]));
        assert!(err.is_rate_limited());

        let mixed = RpcError::from(AllNodesFailed::new(vec![
            failure("http://a", RpcError::RateLimited { retry_after: None }),
            failure("http://b", RpcError::ConnectionFailed("reset".into())),
        ]));
        assert!(!mixed.is_rate_limited());
        assert!(!RpcError::from(AllNodesFailed::default()).is_rate_limited());
    }

    #[test]
    fn test_rotation_classification() {
        assert!(RpcError::ConnectionFailed("x".into()).is_retryable_by_rotation());
        assert!(RpcError::RateLimited { retry_after: None }.is_retryable_by_rotation());
        assert!(!RpcError::NotFound("tx".into()).is_retryable_by_rotation());
        assert!(!RpcError::Archived("ledger".into()).is_retryable_by_rotation());
        assert!(!RpcError::ResponseTooLarge { url: "u".into() }.is_retryable_by_rotation());
        assert!(!RpcError::Verification("x".into()).is_retryable_by_rotation());
        assert!(!RpcError::Rpc {
            code: -32601,
            message: "Method not found".into()
        }
        .is_retryable_by_rotation());
        assert!(!RpcError::Timeout("deadline".into()).is_retryable_by_rotation());
    }

    #[test]
    fn test_size_errors() {
        assert!(RpcError::RequestTooLarge { size: 11, max: 10 }.is_too_large());
        assert!(RpcError::ResponseTooLarge { url: "u".into() }.is_too_large());
        let msg = RpcError::RequestTooLarge { size: 11, max: 10 }.to_string();
        assert!(msg.contains("11 bytes exceeds the maximum of 10 bytes"));
    }

    #[test]
    fn test_circuit_open_conversion() {
        let err: RpcError = ResilienceError::CircuitOpen {
            url: "http://a".into(),
            retry_in: Duration::from_secs(30),
        }
        .into();
        assert!(err.is_retryable_by_rotation());
        assert!(err.to_string().contains("http://a"));
    }
}
