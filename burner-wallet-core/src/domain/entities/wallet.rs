//! Wallet entity and related value objects
//!
//! A burner wallet is a disposable smart account. The entity carries no
//! signing material; key material lives behind the Wallet Store boundary and
//! is only reachable through the validator resolver seam.

use crate::shared::error::WalletError;
use crate::shared::types::{AccountVendor, WalletKind};
use crate::shared::{constants, utils};
use ethers::types::Address;
use serde::{Deserialize, Serialize};

/// Core wallet entity. `address` is the primary key, derived
/// deterministically from the wallet's validator at creation time and
/// immutable afterwards; only `label` may change.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Wallet {
    pub address: Address,
    pub label: String,
    pub username: String,
    pub kind: WalletKind,
    pub vendor: AccountVendor,
}

impl Wallet {
    pub fn new(
        address: Address,
        label: impl Into<String>,
        kind: WalletKind,
        vendor: AccountVendor,
    ) -> Result<Self, WalletError> {
        let label = label.into();
        validate_label(&label)?;
        let username = utils::slugify_label(&label);
        Ok(Self {
            address,
            label,
            username,
            kind,
            vendor,
        })
    }
}

/// Validate a wallet label
pub fn validate_label(label: &str) -> Result<(), WalletError> {
    if label.len() < constants::WALLET_LABEL_MIN_LENGTH {
        return Err(WalletError::validation("Wallet label cannot be empty"));
    }
    if label.len() > constants::WALLET_LABEL_MAX_LENGTH {
        return Err(WalletError::validation(format!(
            "Wallet label must be at most {} characters",
            constants::WALLET_LABEL_MAX_LENGTH
        )));
    }
    Ok(())
}
