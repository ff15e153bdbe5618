//! Wire types for Soroban JSON-RPC and Horizon REST
//!
//! Only the fields the client reads are modelled; everything else in the
//! provider payloads is ignored during deserialization.

use serde::{Deserialize, Serialize};

pub const JSONRPC_VERSION: &str = "2.0";

#[derive(Debug, Serialize)]
pub struct JsonRpcRequest<'a, P> {
    pub jsonrpc: &'static str,
    pub id: u64,
    pub method: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<P>,
}

impl<'a, P: Serialize> JsonRpcRequest<'a, P> {
    pub fn new(id: u64, method: &'a str, params: Option<P>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            method,
            params,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct JsonRpcResponse<R> {
    pub result: Option<R>,
    #[serde(default)]
    pub error: Option<JsonRpcErrorObject>,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct JsonRpcErrorObject {
    pub code: i64,
    pub message: String,
}

// ============================================================================
// SOROBAN RPC
// ============================================================================

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntryResult {
    pub key: String,
    pub xdr: String,
    #[serde(default)]
    pub last_modified_ledger_seq: u32,
    #[serde(default)]
    pub live_until_ledger_seq: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetLedgerEntriesResult {
    #[serde(default)]
    pub entries: Vec<LedgerEntryResult>,
    #[serde(default)]
    pub latest_ledger: u32,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SimulationCost {
    #[serde(default)]
    pub cpu_insns: String,
    #[serde(default)]
    pub mem_bytes: String,
}

/// Result of `simulateTransaction`
///
/// A failed simulation is still a successful RPC call: the host error is
/// reported in `error` and the caller decides what to do with it.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SimulateTransactionResponse {
    #[serde(default)]
    pub min_resource_fee: String,
    #[serde(default)]
    pub transaction_data: String,
    #[serde(default)]
    pub cost: SimulationCost,
    #[serde(default)]
    pub latest_ledger: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    #[serde(default)]
    pub latest_ledger: u32,
    #[serde(default)]
    pub oldest_ledger: u32,
    #[serde(default)]
    pub ledger_retention_window: u32,
}

// ============================================================================
// HORIZON
// ============================================================================

/// The three XDR blobs needed to replay a transaction
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct TransactionResponse {
    pub envelope_xdr: String,
    pub result_xdr: String,
    #[serde(default)]
    pub result_meta_xdr: String,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct HorizonTransaction {
    pub hash: String,
    #[serde(default)]
    pub successful: bool,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub envelope_xdr: String,
    #[serde(default)]
    pub result_xdr: String,
    #[serde(default)]
    pub result_meta_xdr: String,
}

impl From<HorizonTransaction> for TransactionResponse {
    fn from(tx: HorizonTransaction) -> Self {
        Self {
            envelope_xdr: tx.envelope_xdr,
            result_xdr: tx.result_xdr,
            result_meta_xdr: tx.result_meta_xdr,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransactionSummary {
    pub hash: String,
    pub status: String,
    pub created_at: String,
}

impl From<HorizonTransaction> for TransactionSummary {
    fn from(tx: HorizonTransaction) -> Self {
        Self {
            status: if tx.successful { "success" } else { "failed" }.to_string(),
            hash: tx.hash,
            created_at: tx.created_at,
        }
    }
}

/// Ledger header as served by Horizon `/ledgers/{sequence}`
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct LedgerHeader {
    pub sequence: u32,
    pub hash: String,
    #[serde(default)]
    pub prev_hash: String,
    #[serde(default)]
    pub closed_at: String,
    #[serde(default)]
    pub protocol_version: u32,
    #[serde(default)]
    pub base_fee_in_stroops: u64,
    #[serde(default)]
    pub base_reserve_in_stroops: u64,
    #[serde(default)]
    pub successful_transaction_count: u32,
    #[serde(default)]
    pub failed_transaction_count: u32,
    #[serde(default)]
    pub header_xdr: String,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct AccountSummary {
    #[serde(alias = "id")]
    pub account_id: String,
    #[serde(default)]
    pub sequence: String,
    #[serde(default)]
    pub subentry_count: u32,
    #[serde(default)]
    pub last_modified_ledger: u32,
}

/// An account effect (Horizon `/accounts/{id}/effects`)
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct AccountEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub account: String,
    #[serde(default)]
    pub created_at: String,
}

/// Filters for Horizon `/accounts`; at least one must be set
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountsQuery {
    pub signer: Option<String>,
    pub asset: Option<String>,
    pub sponsor: Option<String>,
    pub liquidity_pool: Option<String>,
}

impl AccountsQuery {
    pub fn is_empty(&self) -> bool {
        self.pairs().is_empty()
    }

    pub(crate) fn pairs(&self) -> Vec<(&'static str, String)> {
        [
            ("signer", &self.signer),
            ("asset", &self.asset),
            ("sponsor", &self.sponsor),
            ("liquidity_pool", &self.liquidity_pool),
        ]
        .into_iter()
        .filter_map(|(name, value)| value.clone().map(|v| (name, v)))
        .collect()
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct Page<T> {
    #[serde(rename = "_embedded")]
    pub embedded: Embedded<T>,
    #[serde(rename = "_links", default)]
    pub links: PageLinks,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Embedded<T> {
    #[serde(default = "Vec::new")]
    pub records: Vec<T>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct PageLinks {
    #[serde(default)]
    pub next: Option<Link>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Link {
    pub href: String,
}
