//! Integrity checks on ledger entries returned by a provider
//!
//! A provider is trusted to be available, not to be honest. Every key the
//! caller asked for must come back under exactly that key, and nothing else
//! may come back with it.

use super::error::RpcError;
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};

/// Compare a requested key with the key the provider echoed back
pub fn verify_ledger_entry_key(requested: &str, returned: &str) -> Result<(), RpcError> {
    if requested.as_bytes() != returned.as_bytes() {
        return Err(RpcError::Verification(format!(
            "ledger entry key mismatch: requested {} but received {}",
            requested, returned
        )));
    }

    let hash = hex::encode(Sha256::digest(requested.as_bytes()));
    tracing::trace!(key_hash = %hash, "Ledger entry key verified");
    Ok(())
}

/// Check `returned` against the full list of `requested` keys
///
/// Fails on the first requested key that is missing and on any returned key
/// that was never requested. An empty request always verifies.
pub fn verify_ledger_entries(requested: &[String], returned: &HashMap<String, String>) -> Result<(), RpcError> {
    if requested.is_empty() {
        return Ok(());
    }

    for key in requested {
        match returned.get_key_value(key) {
            Some((returned_key, _)) => verify_ledger_entry_key(key, returned_key)?,
            None => {
                return Err(RpcError::Verification(format!(
                    "requested ledger entry not found in response: {}",
                    key
                )))
            }
        }
    }

    let wanted: HashSet<&str> = requested.iter().map(String::as_str).collect();
    if let Some(extra) = returned.keys().find(|k| !wanted.contains(k.as_str())) {
        return Err(RpcError::Verification(format!(
            "response contains ledger entry that was not requested: {}",
            extra
        )));
    }

    tracing::debug!(count = requested.len(), "All ledger entries verified");
    Ok(())
}
