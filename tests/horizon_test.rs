mod common;

use axum::extract::{Path, Query};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use common::{builder, serve, status_router, Hits};
use erst::rpc::{AccountsQuery, RpcError};
use serde_json::{json, Value};
use std::collections::HashMap;

fn tx_record(n: u32) -> Value {
    json!({
        "hash": format!("h{}", n),
        "successful": n % 2 == 1,
        "created_at": "2024-01-01T00:00:00Z",
        "envelope_xdr": "AAAA",
        "result_xdr": "AAAA"
    })
}

/// Three transactions served as pages of two via relative `next` links
fn paged_transactions(hits: Hits) -> Router {
    Router::new().route(
        "/accounts/:account/transactions",
        get(move |Path(account): Path<String>, Query(query): Query<HashMap<String, String>>| {
            let hits = hits.clone();
            async move {
                hits.bump();
                assert_eq!(query.get("order").map(String::as_str), Some("desc"));
                let records = match query.get("cursor").map(String::as_str) {
                    None => vec![tx_record(1), tx_record(2)],
                    Some("2") => vec![tx_record(3)],
                    Some(_) => vec![],
                };
                let next_cursor = match query.get("cursor").map(String::as_str) {
                    None => "2",
                    _ => "3",
                };
                Json(json!({
                    "_embedded": {"records": records},
                    "_links": {"next": {"href": format!(
                        "/accounts/{}/transactions?cursor={}&limit=200&order=desc",
                        account, next_cursor
                    )}}
                }))
            }
        }),
    )
}

#[tokio::test]
async fn test_pagination_follows_next_links_until_empty() {
    let hits = Hits::default();
    let url = serve(paged_transactions(hits.clone())).await;
    let client = builder(&[url]).build().unwrap();

    let txs = client.get_account_transactions("GABC", 0).await.unwrap();
    let hashes: Vec<&str> = txs.iter().map(|t| t.hash.as_str()).collect();
    assert_eq!(hashes, vec!["h1", "h2", "h3"]);
    assert_eq!(txs[0].status, "success");
    assert_eq!(txs[1].status, "failed");
    assert_eq!(hits.get(), 3);
}

#[tokio::test]
async fn test_pagination_stops_at_limit() {
    let hits = Hits::default();
    let url = serve(paged_transactions(hits.clone())).await;
    let client = builder(&[url]).build().unwrap();

    let txs = client.get_account_transactions("GABC", 1).await.unwrap();
    assert_eq!(txs.len(), 1);
    assert_eq!(hits.get(), 1);
}

#[tokio::test]
async fn test_accounts_query_requires_filter() {
    let hits = Hits::default();
    let url = serve(status_router(StatusCode::OK, hits.clone())).await;
    let client = builder(&[url]).build().unwrap();

    let err = client.get_accounts(&AccountsQuery::default(), 10).await.unwrap_err();
    assert!(matches!(err, RpcError::InvalidRequest(_)));
    assert_eq!(hits.get(), 0);
}

#[tokio::test]
async fn test_accounts_query_forwards_filter() {
    let url = serve(Router::new().route(
        "/accounts",
        get(|Query(query): Query<HashMap<String, String>>| async move {
            assert_eq!(query.get("signer").map(String::as_str), Some("GSIGNER"));
            Json(json!({
                "_embedded": {"records": [
                    {"id": "GA1", "sequence": "12", "subentry_count": 0, "last_modified_ledger": 9}
                ]}
            }))
        }),
    ))
    .await;
    let client = builder(&[url]).build().unwrap();

    let query = AccountsQuery {
        signer: Some("GSIGNER".to_string()),
        ..Default::default()
    };
    let accounts = client.get_accounts(&query, 0).await.unwrap();
    assert_eq!(accounts.len(), 1);
    assert_eq!(accounts[0].account_id, "GA1");
}

#[tokio::test]
async fn test_account_effects_are_events() {
    let url = serve(Router::new().route(
        "/accounts/:account/effects",
        get(|| async {
            Json(json!({
                "_embedded": {"records": [
                    {"id": "e1", "type": "account_credited", "account": "GABC", "created_at": "2024-01-01T00:00:00Z"}
                ]}
            }))
        }),
    ))
    .await;
    let client = builder(&[url]).build().unwrap();

    let events = client.get_events_for_account("GABC", 0).await.unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, "account_credited");
}

#[tokio::test]
async fn test_ledger_header() {
    let url = serve(Router::new().route(
        "/ledgers/:sequence",
        get(|Path(sequence): Path<u32>| async move {
            match sequence {
                1000 => Json(json!({
                    "sequence": 1000,
                    "hash": "abc",
                    "prev_hash": "abb",
                    "closed_at": "2024-01-01T00:00:00Z",
                    "protocol_version": 21,
                    "base_fee_in_stroops": 100
                }))
                .into_response(),
                1 => (StatusCode::GONE, "archived").into_response(),
                _ => (StatusCode::NOT_FOUND, "missing").into_response(),
            }
        }),
    ))
    .await;
    let client = builder(&[url]).build().unwrap();

    let header = client.get_ledger_header(1000).await.unwrap();
    assert_eq!(header.hash, "abc");
    assert_eq!(header.protocol_version, 21);

    let err = client.get_ledger_header(1).await.unwrap_err();
    assert!(err.is_archived(), "{:?}", err);

    let err = client.get_ledger_header(5).await.unwrap_err();
    assert!(err.is_not_found(), "{:?}", err);
    assert!(err.to_string().contains("ledger 5"));
}

#[tokio::test]
async fn test_base_path_prefix_is_kept() {
    let url = serve(Router::new().route(
        "/horizon/ledgers/:sequence",
        get(|Path(sequence): Path<u32>| async move { Json(json!({"sequence": sequence, "hash": "h"})) }),
    ))
    .await;
    let client = builder(&[format!("{}/horizon/", url)]).build().unwrap();

    let header = client.get_ledger_header(7).await.unwrap();
    assert_eq!(header.sequence, 7);
}

#[tokio::test]
async fn test_resolve_network_picks_the_network_that_knows_the_hash() {
    use erst::rpc::{resolve_network_with, Network};

    let missing = serve(status_router(StatusCode::NOT_FOUND, Hits::default())).await;
    let found = serve(Router::new().route(
        "/transactions/:hash",
        get(|Path(hash): Path<String>| async move {
            Json(json!({"hash": hash, "envelope_xdr": "AAAA", "result_xdr": "AAAA"}))
        }),
    ))
    .await;

    let overrides = HashMap::from([
        (Network::Mainnet, missing.clone()),
        (Network::Testnet, found),
        (Network::Futurenet, missing.clone()),
    ]);
    let network = resolve_network_with("abc123", None, &overrides).await.unwrap();
    assert_eq!(network, Network::Testnet);

    let overrides = HashMap::from([
        (Network::Mainnet, missing.clone()),
        (Network::Testnet, missing.clone()),
        (Network::Futurenet, missing),
    ]);
    let err = resolve_network_with("abc123", None, &overrides).await.unwrap_err();
    assert!(err.is_not_found());
}
