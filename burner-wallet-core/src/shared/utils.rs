//! Utility functions for the wallet core

use crate::shared::error::WalletError;
use ethers::types::{Address, U256};
use std::time::{SystemTime, UNIX_EPOCH};

/// Get current timestamp in seconds
pub fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_else(|_| std::time::Duration::from_secs(0))
        .as_secs()
}

/// Parse a decimal amount string into raw token units.
///
/// The amount must be strictly positive and representable within `decimals`
/// fractional digits.
pub fn parse_token_amount(amount: &str, decimals: u8) -> Result<U256, WalletError> {
    if amount.trim().is_empty() {
        return Err(WalletError::validation("Amount cannot be empty"));
    }
    if amount.trim_start().starts_with('-') {
        return Err(WalletError::validation("Amount must be positive"));
    }

    let raw: U256 = ethers::utils::parse_units(amount, decimals as u32)
        .map_err(|e| WalletError::validation(format!("Invalid amount {}: {}", amount, e)))?
        .into();

    if raw.is_zero() {
        return Err(WalletError::validation("Amount must be greater than zero"));
    }
    Ok(raw)
}

/// Format raw token units back into a decimal string
pub fn format_token_amount(raw: U256, decimals: u8) -> String {
    ethers::utils::format_units(raw, decimals as u32).unwrap_or_else(|_| raw.to_string())
}

/// Parse a 0x-prefixed Ethereum address
pub fn parse_address(address: &str) -> Result<Address, WalletError> {
    address
        .parse::<Address>()
        .map_err(|e| WalletError::validation(format!("Invalid address {}: {}", address, e)))
}

/// Render an address as a lowercase 0x-prefixed string
pub fn address_to_string(address: &Address) -> String {
    format!("{:#x}", address)
}

/// Reduce a wallet label to the name registered for it: lowercase, runs of
/// non-alphanumerics collapsed to single dashes
pub fn slugify_label(label: &str) -> String {
    let mut slug = String::with_capacity(label.len());
    let mut last_dash = true;
    for c in label.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            last_dash = false;
        } else if !last_dash {
            slug.push('-');
            last_dash = true;
        }
    }
    slug.trim_end_matches('-').to_string()
}
