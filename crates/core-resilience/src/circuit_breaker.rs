//! Per-endpoint circuit breaker
//!
//! Every configured endpoint URL gets a failure counter and the time of its
//! most recent failure. An endpoint is considered unhealthy (circuit open)
//! while it has failed at least `failure_threshold` times and the last
//! failure happened less than `cooldown` ago. There is no half-open probing:
//!
//! - Closed: fewer failures than the threshold, or the cool-down elapsed
//! - Open: threshold reached and still inside the cool-down window
//!
//! A single success resets the counter and closes the circuit immediately.
//! Open circuits heal on their own once the cool-down passes; nothing has to
//! call `reset`.
//!
//! The whole map sits behind one reader/writer lock. Health checks take the
//! read side, recording failures or successes takes the write side.

use super::error::ResilienceError;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// State of one endpoint's circuit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Endpoint is usable
    Closed,
    /// Endpoint failed repeatedly; heals at `until`
    Open { until: Instant },
}

/// Configuration for circuit breaker behavior
#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Number of failures before the circuit opens
    pub failure_threshold: u32,
    /// How long an open circuit stays open after the last failure
    pub cooldown: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            cooldown: Duration::from_secs(60),
        }
    }
}

/// Failure bookkeeping for a single endpoint
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EndpointHealth {
    pub failure_count: u32,
    pub last_failure_at: Option<Instant>,
}

impl EndpointHealth {
    fn state(&self, config: &CircuitBreakerConfig, now: Instant) -> CircuitState {
        match self.last_failure_at {
            Some(at) if self.failure_count >= config.failure_threshold => {
                let until = at + config.cooldown;
                if now < until {
                    CircuitState::Open { until }
                } else {
                    CircuitState::Closed
                }
            }
            _ => CircuitState::Closed,
        }
    }
}

/// Shared health map for a set of endpoints
///
/// Cloning is cheap and clones observe the same state, so one tracker can be
/// handed to every task fanning out from a client.
///
/// # Example
/// ```
/// use erst_core_resilience::HealthTracker;
///
/// let tracker = HealthTracker::new_default();
/// for _ in 0..5 {
///     tracker.record_failure("https://rpc-a.example");
/// }
/// assert!(!tracker.is_healthy("https://rpc-a.example"));
///
/// tracker.record_success("https://rpc-a.example");
/// assert!(tracker.is_healthy("https://rpc-a.example"));
/// ```
#[derive(Debug, Clone)]
pub struct HealthTracker {
    config: Arc<CircuitBreakerConfig>,
    endpoints: Arc<RwLock<HashMap<String, EndpointHealth>>>,
}

impl HealthTracker {
    /// Create a tracker with the given configuration
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config: Arc::new(config),
            endpoints: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Create a tracker with the default 5 failures / 60s cool-down policy
    pub fn new_default() -> Self {
        Self::new(CircuitBreakerConfig::default())
    }

    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    /// Current circuit state for `url`. Unknown URLs are closed.
    pub fn state(&self, url: &str) -> CircuitState {
        let endpoints = self.endpoints.read();
        endpoints
            .get(url)
            .map(|health| health.state(&self.config, Instant::now()))
            .unwrap_or(CircuitState::Closed)
    }

    /// Whether `url` may be used optimistically
    pub fn is_healthy(&self, url: &str) -> bool {
        matches!(self.state(url), CircuitState::Closed)
    }

    /// Fast-fail check performed before dialing an endpoint
    pub fn check(&self, url: &str) -> Result<(), ResilienceError> {
        match self.state(url) {
            CircuitState::Closed => Ok(()),
            CircuitState::Open { until } => Err(ResilienceError::CircuitOpen {
                url: url.to_string(),
                retry_in: until.saturating_duration_since(Instant::now()),
            }),
        }
    }

    /// Record a failed call against `url` and return the resulting state
    pub fn record_failure(&self, url: &str) -> CircuitState {
        self.record_failure_at(url, Instant::now())
    }

    /// Record a failure that happened at `at`
    pub fn record_failure_at(&self, url: &str, at: Instant) -> CircuitState {
        let mut endpoints = self.endpoints.write();
        let health = endpoints.entry(url.to_string()).or_default();
        let was_open = matches!(health.state(&self.config, at), CircuitState::Open { .. });

        health.failure_count = health.failure_count.saturating_add(1);
        health.last_failure_at = Some(at);

        let state = health.state(&self.config, at);
        if !was_open && matches!(state, CircuitState::Open { .. }) {
            tracing::warn!(
                url = %url,
                failures = health.failure_count,
                cooldown_secs = self.config.cooldown.as_secs(),
                "Endpoint circuit opened"
            );
        }
        state
    }

    /// Record a successful call; closes the circuit unconditionally
    pub fn record_success(&self, url: &str) {
        let mut endpoints = self.endpoints.write();
        if let Some(health) = endpoints.get_mut(url) {
            if health.failure_count > 0 {
                tracing::debug!(url = %url, previous_failures = health.failure_count, "Endpoint recovered");
            }
            health.failure_count = 0;
            health.last_failure_at = None;
        }
    }

    /// Current failure count for `url`
    pub fn failure_count(&self, url: &str) -> u32 {
        self.endpoints
            .read()
            .get(url)
            .map(|health| health.failure_count)
            .unwrap_or(0)
    }

    /// Copy of the health record for `url`, if it ever failed
    pub fn get(&self, url: &str) -> Option<EndpointHealth> {
        self.endpoints.read().get(url).cloned()
    }

    /// Forget all recorded failures
    pub fn reset(&self) {
        self.endpoints.write().clear();
    }
}

impl Default for HealthTracker {
    fn default() -> Self {
        Self::new_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const URL: &str = "https://rpc.example";

    #[tokio::test(start_paused = true)]
    async fn test_opens_after_threshold() {
        let tracker = HealthTracker::new_default();

        for _ in 0..4 {
            assert_eq!(tracker.record_failure(URL), CircuitState::Closed);
        }
        assert!(tracker.is_healthy(URL));

        match tracker.record_failure(URL) {
            CircuitState::Open { .. } => (),
            state => panic!("Expected Open state, got {:?}", state),
        }
        assert!(!tracker.is_healthy(URL));
        assert_eq!(tracker.failure_count(URL), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_heals_after_cooldown() {
        let tracker = HealthTracker::new_default();
        for _ in 0..5 {
            tracker.record_failure(URL);
        }
        assert!(!tracker.is_healthy(URL));

        tokio::time::advance(Duration::from_secs(59)).await;
        assert!(!tracker.is_healthy(URL));

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(tracker.is_healthy(URL));
        // Healing does not erase the counter
        assert_eq!(tracker.failure_count(URL), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_old_failure_timestamp_is_healthy() {
        let tracker = HealthTracker::new_default();
        let long_ago = Instant::now();
        tokio::time::advance(Duration::from_secs(120)).await;

        for _ in 0..5 {
            tracker.record_failure_at(URL, long_ago);
        }
        assert!(tracker.is_healthy(URL));
    }

    #[tokio::test]
    async fn test_success_resets() {
        let tracker = HealthTracker::new_default();
        for _ in 0..7 {
            tracker.record_failure(URL);
        }
        assert!(tracker.check(URL).is_err());

        tracker.record_success(URL);
        assert!(tracker.check(URL).is_ok());
        assert_eq!(tracker.failure_count(URL), 0);
    }

    #[tokio::test]
    async fn test_check_reports_remaining_cooldown() {
        let tracker = HealthTracker::new(CircuitBreakerConfig {
            failure_threshold: 1,
            cooldown: Duration::from_secs(30),
        });
        tracker.record_failure(URL);

        match tracker.check(URL) {
            Err(ResilienceError::CircuitOpen { url, retry_in }) => {
                assert_eq!(url, URL);
                assert!(retry_in <= Duration::from_secs(30));
            }
            other => panic!("expected CircuitOpen, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_endpoint_is_closed() {
        let tracker = HealthTracker::new_default();
        assert_eq!(tracker.state("https://never-seen.example"), CircuitState::Closed);
        assert!(tracker.get("https://never-seen.example").is_none());
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let tracker = HealthTracker::new_default();
        let clone = tracker.clone();
        for _ in 0..5 {
            clone.record_failure(URL);
        }
        assert!(!tracker.is_healthy(URL));

        tracker.reset();
        assert!(clone.is_healthy(URL));
    }
}
