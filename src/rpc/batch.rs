//! Concurrent fetching of large ledger-key sets
//!
//! Footprints above [`LARGE_FOOTPRINT_THRESHOLD`] keys are split into
//! chunks of [`BATCH_SIZE`] and every chunk is fetched at the same time.
//! The batch succeeds only if every chunk does; partial results are never
//! returned.

use super::client::Client;
use super::error::Result;
use futures::future::join_all;
use std::collections::HashMap;

/// Maximum keys per `getLedgerEntries` request
pub const BATCH_SIZE: usize = 100;

/// Key counts above this go through the batched path
pub const LARGE_FOOTPRINT_THRESHOLD: usize = 100;

/// Split `keys` into consecutive chunks of at most `size` (0 = [`BATCH_SIZE`])
pub fn chunk_keys(keys: &[String], size: usize) -> Vec<&[String]> {
    let size = if size == 0 { BATCH_SIZE } else { size };
    keys.chunks(size).collect()
}

impl Client {
    /// Fetch any number of ledger entries, fanning out above the threshold
    pub async fn batch_get_ledger_entries(&self, keys: &[String]) -> Result<HashMap<String, String>> {
        if keys.len() <= LARGE_FOOTPRINT_THRESHOLD {
            return self.get_ledger_entries(keys).await;
        }

        let attributes = vec![
            ("network", self.network_name().to_string()),
            ("keys", keys.len().to_string()),
        ];
        self.instrumented("batchGetLedgerEntries", attributes, async {
            let chunks = chunk_keys(keys, BATCH_SIZE);
            tracing::info!(total_keys = keys.len(), batches = chunks.len(), "Fetching ledger entries in batches");

            let deadline = self.deadline();
            let results = join_all(chunks.iter().map(|chunk| self.ledger_entries(chunk, deadline))).await;

            let mut merged = HashMap::with_capacity(keys.len());
            for (index, result) in results.into_iter().enumerate() {
                match result {
                    Ok(entries) => merged.extend(entries),
                    Err(e) => {
                        tracing::error!(batch_index = index, error = %e, "Batch fetch failed");
                        return Err(e);
                    }
                }
            }

            tracing::info!(total_entries = merged.len(), "Batch ledger entry fetch complete");
            Ok(merged)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("key-{}", i)).collect()
    }

    #[test]
    fn test_chunking_preserves_order_and_totality() {
        for (n, size) in [(0, 100), (1, 100), (100, 100), (101, 100), (250, 100), (7, 3)] {
            let keys = keys(n);
            let chunks = chunk_keys(&keys, size);
            assert_eq!(chunks.len(), n.div_ceil(size), "n={} size={}", n, size);
            assert!(chunks.iter().all(|c| c.len() <= size));

            let rejoined: Vec<String> = chunks.concat();
            assert_eq!(rejoined, keys);
        }
    }

    #[test]
    fn test_zero_size_uses_default() {
        let keys = keys(250);
        let chunks = chunk_keys(&keys, 0);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[2].len(), 50);
    }
}
