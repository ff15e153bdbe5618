/*!
 * Remote data commands: `tx`, `entries`, `health`
 */

use crate::cli_style::{section_header, stats_table, Theme};
use crate::rpc::{Client, HealthResponse, Result, TransactionResponse};
use serde::Serialize;
use std::collections::BTreeMap;

/// Fetch one transaction and print its XDR fields as JSON
pub async fn tx(client: &Client, hash: &str) -> Result<TransactionResponse> {
    let tx = client.get_transaction(hash).await?;
    print_json(&tx);
    Ok(tx)
}

/// Fetch ledger entries, batching large footprints, and print them as JSON
pub async fn entries(client: &Client, keys: &[String]) -> Result<BTreeMap<String, String>> {
    let entries: BTreeMap<String, String> = client.batch_get_ledger_entries(keys).await?.into_iter().collect();
    print_json(&entries);
    Ok(entries)
}

/// Query the simulation endpoint's health
pub async fn health(client: &Client) -> Result<HealthResponse> {
    let health = client.get_health().await?;

    section_header(&format!("{} health", client.network_name()));
    println!(
        "{}",
        stats_table(&[
            ("Endpoint", client.current_soroban_url().to_string()),
            ("Status", health.status.clone()),
            ("Latest ledger", health.latest_ledger.to_string()),
            ("Oldest ledger", health.oldest_ledger.to_string()),
            ("Retention window", health.ledger_retention_window.to_string()),
        ])
    );
    Ok(health)
}

fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("{}", Theme::error(format!("Failed to render output: {}", e))),
    }
}
