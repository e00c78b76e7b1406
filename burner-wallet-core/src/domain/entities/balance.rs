//! Balance value object

use ethers::types::{Address, U256};
use serde::{Deserialize, Serialize};

/// One (address, chain, token) balance slice from the last successful fetch.
/// Superseded, never merged, by each refresh.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Balance {
    pub address: Address,
    pub chain_id: u64,
    pub symbol: String,
    pub raw: U256,
    /// Decimal rendering of `raw` using the registry's declared decimals
    pub amount: String,
}

impl Balance {
    pub fn is_zero(&self) -> bool {
        self.raw.is_zero()
    }
}
