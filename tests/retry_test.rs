mod common;

use axum::http::{header::RETRY_AFTER, StatusCode};
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use common::{builder, echo_entries, requested_keys, serve, Hits};
use erst_core_resilience::RetryPolicy;
use serde_json::Value;
use std::time::{Duration, Instant};

/// Answers `status` (with optional Retry-After) `failures` times, then honestly
fn flaky(status: StatusCode, retry_after: Option<&'static str>, failures: usize, hits: Hits) -> Router {
    Router::new().route(
        "/",
        post(move |Json(body): Json<Value>| {
            let hits = hits.clone();
            async move {
                if hits.bump() <= failures {
                    return match retry_after {
                        Some(wait) => (status, [(RETRY_AFTER, wait)], "slow down").into_response(),
                        None => (status, "unavailable").into_response(),
                    };
                }
                echo_entries(&requested_keys(&body))
            }
        }),
    )
}

#[tokio::test]
async fn test_retry_after_header_overrides_backoff() {
    let hits = Hits::default();
    let url = serve(flaky(StatusCode::TOO_MANY_REQUESTS, Some("1"), 1, hits.clone())).await;
    let client = builder(&[url]).build().unwrap();

    let started = Instant::now();
    let entries = client.get_ledger_entries(&["AAA".to_string()]).await.unwrap();

    assert!(started.elapsed() >= Duration::from_millis(950), "{:?}", started.elapsed());
    assert_eq!(entries["AAA"], "xdr-AAA");
    assert_eq!(hits.get(), 2);
}

#[tokio::test]
async fn test_unavailable_is_retried_on_same_endpoint() {
    let hits = Hits::default();
    let url = serve(flaky(StatusCode::SERVICE_UNAVAILABLE, None, 2, hits.clone())).await;
    let client = builder(&[url.clone()])
        .retry_policy(RetryPolicy {
            max_retries: 3,
            initial_backoff: Duration::from_millis(5),
            max_backoff: Duration::from_millis(20),
            jitter_fraction: 0.0,
            ..Default::default()
        })
        .build()
        .unwrap();

    client.get_ledger_entries(&["AAA".to_string()]).await.unwrap();
    assert_eq!(hits.get(), 3);
    assert_eq!(client.health().failure_count(&url), 0);
}

#[tokio::test]
async fn test_exhausted_rate_limit_rotates_to_next_endpoint() {
    let limited = Hits::default();
    let healthy = Hits::default();
    let urls = vec![
        serve(flaky(StatusCode::TOO_MANY_REQUESTS, None, usize::MAX, limited.clone())).await,
        serve(flaky(StatusCode::OK, None, 0, healthy.clone())).await,
    ];
    let client = builder(&urls).build().unwrap();

    let entries = client.get_ledger_entries(&["AAA".to_string()]).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(limited.get(), 2, "one attempt plus one retry");
    assert_eq!(healthy.get(), 1);
}

#[tokio::test]
async fn test_rate_limit_on_every_endpoint_is_reported() {
    let hits = Hits::default();
    let url = serve(flaky(StatusCode::TOO_MANY_REQUESTS, None, usize::MAX, hits.clone())).await;
    let client = builder(&[url]).retry_policy(RetryPolicy {
        max_retries: 0,
        ..common::fast_policy()
    });
    let client = client.build().unwrap();

    let err = client.get_ledger_entries(&["AAA".to_string()]).await.unwrap_err();
    assert!(err.is_rate_limited(), "{:?}", err);
}
