//! Activity history value objects
//!
//! Read-only projections of the external indexer's history feed. Records are
//! kept only when they touch a token the registry knows about.

use serde::{Deserialize, Serialize};

/// Direction of a token movement relative to the queried address
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ActionDirection {
    In,
    Out,
}

/// One token movement inside an activity record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TokenAction {
    pub contract_address: String,
    pub raw_amount: String,
    pub direction: ActionDirection,
}

/// One indexed transaction touching the address
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ActivityRecord {
    pub tx_hash: String,
    pub chain_id: u64,
    pub timestamp_ms: u64,
    #[serde(default)]
    pub token_actions: Vec<TokenAction>,
}
