//! In-process Horizon / Soroban stand-ins for integration tests

#![allow(dead_code)]

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use erst::rpc::ClientBuilder;
use erst_core_resilience::RetryPolicy;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Serve `router` on an ephemeral port and return its base URL
pub async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

/// A URL nothing listens on
pub async fn dead_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

/// Request counter shared with a handler
#[derive(Clone, Default)]
pub struct Hits(Arc<AtomicUsize>);

impl Hits {
    pub fn bump(&self) -> usize {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

/// Short delays, no jitter, one retry
pub fn fast_policy() -> RetryPolicy {
    RetryPolicy {
        max_retries: 1,
        initial_backoff: Duration::from_millis(10),
        max_backoff: Duration::from_millis(50),
        jitter_fraction: 0.0,
        ..Default::default()
    }
}

/// Client builder over `urls` with the cache off and fast retries
pub fn builder(urls: &[String]) -> ClientBuilder {
    ClientBuilder::new()
        .alt_urls(urls.iter().cloned())
        .soroban_urls(urls.iter().cloned())
        .cache_enabled(false)
        .retry_policy(fast_policy())
}

/// Keys requested by a `getLedgerEntries` body
pub fn requested_keys(body: &Value) -> Vec<String> {
    body["params"][0]
        .as_array()
        .map(|keys| keys.iter().filter_map(|k| k.as_str().map(str::to_string)).collect())
        .unwrap_or_default()
}

pub fn rpc_result(result: Value) -> Response {
    Json(json!({"jsonrpc": "2.0", "id": 1, "result": result})).into_response()
}

/// `getLedgerEntries` result echoing every key with `xdr-<key>`
pub fn echo_entries(keys: &[String]) -> Response {
    let entries: Vec<Value> = keys
        .iter()
        .map(|k| json!({"key": k, "xdr": format!("xdr-{}", k), "lastModifiedLedgerSeq": 7}))
        .collect();
    rpc_result(json!({"entries": entries, "latestLedger": 100}))
}

/// Soroban endpoint that answers every `getLedgerEntries` call honestly
pub fn echo_rpc(hits: Hits) -> Router {
    Router::new().route(
        "/",
        post(move |Json(body): Json<Value>| {
            let hits = hits.clone();
            async move {
                hits.bump();
                echo_entries(&requested_keys(&body))
            }
        }),
    )
}

/// Endpoint that always answers with `status`
pub fn status_router(status: StatusCode, hits: Hits) -> Router {
    Router::new().fallback(move || {
        let hits = hits.clone();
        async move {
            hits.bump();
            (status, "error").into_response()
        }
    })
}

pub fn keys(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("key-{:04}", i)).collect()
}
