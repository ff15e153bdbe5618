//! Network auto-detection for a transaction hash

use super::client::Client;
use super::error::{Result, RpcError};
use super::network::Network;
use futures::stream::{FuturesUnordered, StreamExt};
use std::collections::HashMap;

/// Find which public network knows `hash`
///
/// Mainnet, testnet and futurenet are probed concurrently; the first hit
/// wins and the remaining probes are dropped.
pub async fn resolve_network(hash: &str, token: Option<&str>) -> Result<Network> {
    resolve_network_with(hash, token, &HashMap::new()).await
}

/// [`resolve_network`] with per-network Horizon URL overrides
pub async fn resolve_network_with(
    hash: &str,
    token: Option<&str>,
    overrides: &HashMap<Network, String>,
) -> Result<Network> {
    let mut probes = FuturesUnordered::new();

    for network in Network::ALL {
        let mut builder = Client::builder().network(network).cache_enabled(false);
        if let Some(token) = token {
            builder = builder.token(token);
        }
        if let Some(url) = overrides.get(&network) {
            builder = builder.horizon_url(url.clone());
        }
        let client = builder.build()?;

        probes.push(async move {
            let result = client.get_transaction(hash).await;
            (network, result)
        });
    }

    while let Some((network, result)) = probes.next().await {
        match result {
            Ok(_) => {
                tracing::info!(hash, network = %network, "Transaction network resolved");
                return Ok(network);
            }
            Err(e) => tracing::debug!(hash, network = %network, error = %e, "Probe missed"),
        }
    }

    let names: Vec<&str> = Network::ALL.iter().map(Network::as_str).collect();
    Err(RpcError::NotFound(format!("transaction {} not found on {}", hash, names.join(", "))))
}
