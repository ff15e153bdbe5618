//! Retry policy: exponential backoff with symmetric jitter
//!
//! The policy only computes delays. Whoever owns the request loop decides
//! when to sleep and what counts as a failure.
//!
//! # Example
//!
//! ```
//! use erst_core_resilience::backoff::RetryPolicy;
//! use std::time::Duration;
//!
//! let policy = RetryPolicy {
//!     jitter_fraction: 0.0,
//!     ..Default::default()
//! };
//!
//! assert_eq!(policy.first_backoff(), Duration::from_secs(1));
//! assert_eq!(policy.next_backoff(Duration::from_secs(1)), Duration::from_secs(2));
//! assert_eq!(policy.next_backoff(Duration::from_secs(8)), Duration::from_secs(10));
//! ```

use super::error::ResilienceError;
use chrono::{DateTime, Utc};
use rand::Rng;
use std::time::Duration;

/// Retry policy configuration
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,

    /// Delay before the first retry
    pub initial_backoff: Duration,

    /// Upper bound for computed delays
    pub max_backoff: Duration,

    /// Symmetric jitter as a fraction of the delay (0.1 = ±10%)
    pub jitter_fraction: f64,

    /// HTTP status codes worth retrying against the same endpoint
    pub retry_status_codes: Vec<u16>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(10),
            jitter_fraction: 0.1,
            retry_status_codes: vec![429, 503, 504],
        }
    }
}

impl RetryPolicy {
    /// Policy that never retries
    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            ..Default::default()
        }
    }

    /// Reject configurations the request loop cannot honor
    pub fn validate(&self) -> Result<(), ResilienceError> {
        if !(0.0..1.0).contains(&self.jitter_fraction) {
            return Err(ResilienceError::InvalidConfig(format!(
                "jitter_fraction must be in [0, 1), got {}",
                self.jitter_fraction
            )));
        }
        if self.max_backoff < self.initial_backoff {
            return Err(ResilienceError::InvalidConfig(format!(
                "max_backoff ({:?}) is smaller than initial_backoff ({:?})",
                self.max_backoff, self.initial_backoff
            )));
        }
        Ok(())
    }

    /// Whether a response with this status should be retried
    pub fn should_retry_status(&self, status: u16) -> bool {
        self.retry_status_codes.contains(&status)
    }

    /// Base delay for the first retry, before jitter
    pub fn first_backoff(&self) -> Duration {
        self.initial_backoff.min(self.max_backoff)
    }

    /// Double `current` and clamp it to `max_backoff`, before jitter
    pub fn next_backoff(&self, current: Duration) -> Duration {
        current.saturating_mul(2).min(self.max_backoff)
    }

    /// Spread `delay` by ±`jitter_fraction`
    pub fn apply_jitter(&self, delay: Duration) -> Duration {
        if self.jitter_fraction <= 0.0 || delay.is_zero() {
            return delay;
        }
        let range = delay.as_secs_f64() * self.jitter_fraction;
        let offset = rand::rng().random_range(-range..=range);
        Duration::from_secs_f64((delay.as_secs_f64() + offset).max(0.0))
    }
}

/// Parse a `Retry-After` header value
///
/// Accepts integer seconds or an HTTP-date (RFC 1123). Values that are not
/// positive, lie in the past, or do not parse yield `None` so the caller
/// falls back to its computed backoff.
pub fn parse_retry_after(value: &str) -> Option<Duration> {
    parse_retry_after_at(value, Utc::now())
}

/// [`parse_retry_after`] against an explicit "now"
pub fn parse_retry_after_at(value: &str, now: DateTime<Utc>) -> Option<Duration> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(seconds) = value.parse::<i64>() {
        return (seconds > 0).then(|| Duration::from_secs(seconds as u64));
    }

    let at = DateTime::parse_from_rfc2822(value).ok()?.with_timezone(&Utc);
    (at - now).to_std().ok().filter(|wait| !wait.is_zero())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn no_jitter() -> RetryPolicy {
        RetryPolicy {
            jitter_fraction: 0.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_defaults() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_retries, 3);
        assert_eq!(policy.initial_backoff, Duration::from_secs(1));
        assert_eq!(policy.max_backoff, Duration::from_secs(10));
        assert!(policy.should_retry_status(429));
        assert!(policy.should_retry_status(503));
        assert!(policy.should_retry_status(504));
        assert!(!policy.should_retry_status(500));
        assert!(!policy.should_retry_status(413));
        assert!(policy.validate().is_ok());
    }

    #[test]
    fn test_backoff_doubles_and_clamps() {
        let policy = no_jitter();
        let mut delay = policy.first_backoff();
        let mut seen = vec![delay];
        for _ in 0..5 {
            delay = policy.next_backoff(delay);
            seen.push(delay);
        }
        let secs: Vec<u64> = seen.iter().map(|d| d.as_secs()).collect();
        assert_eq!(secs, vec![1, 2, 4, 8, 10, 10]);
    }

    #[test]
    fn test_jitter_stays_within_band() {
        let policy = RetryPolicy::default();
        let base = Duration::from_secs(4);
        for _ in 0..200 {
            let jittered = policy.apply_jitter(base);
            assert!(jittered >= Duration::from_millis(3600), "{:?}", jittered);
            assert!(jittered <= Duration::from_millis(4400), "{:?}", jittered);
        }
    }

    #[test]
    fn test_zero_jitter_is_exact() {
        let policy = no_jitter();
        assert_eq!(policy.apply_jitter(Duration::from_millis(750)), Duration::from_millis(750));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let policy = RetryPolicy {
            jitter_fraction: 1.5,
            ..Default::default()
        };
        assert!(policy.validate().is_err());

        let policy = RetryPolicy {
            initial_backoff: Duration::from_secs(20),
            max_backoff: Duration::from_secs(5),
            ..Default::default()
        };
        assert!(matches!(policy.validate(), Err(ResilienceError::InvalidConfig(_))));
    }

    #[test]
    fn test_retry_after_seconds() {
        assert_eq!(parse_retry_after("1"), Some(Duration::from_secs(1)));
        assert_eq!(parse_retry_after(" 30 "), Some(Duration::from_secs(30)));
        assert_eq!(parse_retry_after("0"), None);
        assert_eq!(parse_retry_after("-5"), None);
        assert_eq!(parse_retry_after(""), None);
        assert_eq!(parse_retry_after("soon"), None);
    }

    #[test]
    fn test_retry_after_http_date() {
        let now = Utc.with_ymd_and_hms(2015, 10, 21, 7, 28, 0).unwrap();

        let wait = parse_retry_after_at("Wed, 21 Oct 2015 07:28:10 GMT", now);
        assert_eq!(wait, Some(Duration::from_secs(10)));

        // Dates in the past never produce a wait
        let wait = parse_retry_after_at("Wed, 21 Oct 2015 07:27:00 GMT", now);
        assert_eq!(wait, None);
    }
}
