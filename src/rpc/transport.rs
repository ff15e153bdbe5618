//! HTTP transport with per-endpoint retries
//!
//! Retries here stay on the same URL. They absorb transient overload
//! (429/503/504 by default) and connection errors; anything else is handed
//! back to the caller untouched for classification. Moving to another
//! provider is the failover loop's job, not this one's.

use super::error::RpcError;
use erst_core_resilience::{parse_retry_after, RetryPolicy};
use reqwest::header::{ACCEPT, CONTENT_TYPE, RETRY_AFTER};
use reqwest::{Request, Response, StatusCode};
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone)]
pub struct RetryTransport {
    http: reqwest::Client,
    policy: RetryPolicy,
    token: Option<String>,
}

impl RetryTransport {
    pub fn new(http: reqwest::Client, policy: RetryPolicy, token: Option<String>) -> Self {
        Self { http, policy, token }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// JSON POST with the bearer token attached when one is configured
    pub fn post_json(&self, url: &str, body: Vec<u8>) -> Result<Request, RpcError> {
        let builder = self
            .http
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json")
            .body(body);
        self.authorize(builder)
            .build()
            .map_err(|e| RpcError::InvalidRequest(format!("failed to build request for {}: {}", url, e)))
    }

    pub fn get(&self, url: reqwest::Url) -> Result<Request, RpcError> {
        let builder = self.http.get(url.clone()).header(ACCEPT, "application/json");
        self.authorize(builder)
            .build()
            .map_err(|e| RpcError::InvalidRequest(format!("failed to build request for {}: {}", url, e)))
    }

    fn authorize(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Send `request`, retrying transport errors and retryable statuses
    ///
    /// A `Retry-After` header sets the next wait exactly and becomes the new
    /// backoff base. When retries run out the error is `RateLimited` if the
    /// last answer was 429 and `ConnectionFailed` otherwise. Exhausted 429s
    /// are not folded into `ConnectionFailed`: callers keep the rate-limit
    /// kind and the last `retry_after` hint.
    pub async fn execute(&self, request: Request, deadline: Option<Instant>) -> Result<Response, RpcError> {
        let url = request.url().to_string();
        let attempts = self.policy.max_retries + 1;

        let mut base: Option<Duration> = None;
        let mut wait = Duration::ZERO;
        let mut last_error = String::new();
        let mut rate_limited: Option<Option<Duration>> = None;

        for attempt in 0..attempts {
            if attempt > 0 {
                tracing::debug!(url = %url, attempt, wait_ms = wait.as_millis() as u64, "Retrying request");
                sleep_within(wait, deadline).await?;
            }

            let req = request
                .try_clone()
                .ok_or_else(|| RpcError::InvalidRequest("request body cannot be replayed".to_string()))?;

            let result = match deadline {
                Some(at) => tokio::time::timeout_at(at, self.http.execute(req))
                    .await
                    .map_err(|_| RpcError::Timeout(format!("request to {} exceeded the call deadline", url)))?,
                None => self.http.execute(req).await,
            };

            let next_base = match base {
                None => self.policy.first_backoff(),
                Some(current) => self.policy.next_backoff(current),
            };

            match result {
                Err(e) => {
                    tracing::debug!(url = %url, attempt, error = %e, "Request failed");
                    last_error = e.to_string();
                    rate_limited = None;
                    base = Some(next_base);
                    wait = self.policy.apply_jitter(next_base);
                }
                Ok(resp) if self.policy.should_retry_status(resp.status().as_u16()) => {
                    let status = resp.status();
                    let retry_after = resp
                        .headers()
                        .get(RETRY_AFTER)
                        .and_then(|v| v.to_str().ok())
                        .and_then(parse_retry_after);
                    tracing::warn!(
                        url = %url,
                        attempt,
                        status_code = status.as_u16(),
                        retry_after_ms = retry_after.map(|d| d.as_millis() as u64),
                        "Retryable status from endpoint"
                    );

                    last_error = format!("status code {}", status.as_u16());
                    rate_limited = (status == StatusCode::TOO_MANY_REQUESTS).then_some(retry_after);
                    match retry_after {
                        Some(exact) => {
                            base = Some(exact);
                            wait = exact;
                        }
                        None => {
                            base = Some(next_base);
                            wait = self.policy.apply_jitter(next_base);
                        }
                    }
                }
                Ok(resp) => return Ok(resp),
            }
        }

        if let Some(retry_after) = rate_limited {
            return Err(RpcError::RateLimited { retry_after });
        }
        Err(RpcError::ConnectionFailed(format!(
            "{} ({} after {} attempt{})",
            url,
            last_error,
            attempts,
            if attempts == 1 { "" } else { "s" }
        )))
    }
}

/// Sleep for `wait` unless that would run past `deadline`
async fn sleep_within(wait: Duration, deadline: Option<Instant>) -> Result<(), RpcError> {
    if let Some(at) = deadline {
        if Instant::now() + wait > at {
            return Err(RpcError::Timeout(format!(
                "backoff of {}ms would exceed the call deadline",
                wait.as_millis()
            )));
        }
    }
    tokio::time::sleep(wait).await;
    Ok(())
}
