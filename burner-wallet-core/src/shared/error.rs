//! Error handling for the wallet core
//!
//! This module defines the error taxonomy used throughout the wallet core.
//! Configuration errors fail before any network call; signing and submission
//! errors surface immediately to the caller; aggregation errors are swallowed
//! per slice and only reported in aggregate.

use thiserror::Error;

/// Wallet error type
#[derive(Error, Debug, Clone)]
pub enum WalletError {
    #[error("Unsupported chain: {0}")]
    UnsupportedChain(u64),

    #[error("Unsupported token {symbol} on chain {chain_id}")]
    UnsupportedToken { symbol: String, chain_id: u64 },

    #[error("Missing key material for wallet {0}")]
    MissingKeyMaterial(String),

    #[error("Passkey ceremony failed: {0}")]
    PasskeyCeremonyFailed(String),

    #[error("Sponsorship denied: {0}")]
    SponsorshipDenied(String),

    #[error("Submission rejected: {0}")]
    SubmissionRejected(String),

    #[error("No receipt after {0} seconds; the operation may still land on-chain")]
    ConfirmationTimeout(u64),

    #[error("Amount {amount} too small for bridge fee {fee} of {symbol}")]
    AmountTooSmallForBridge {
        symbol: String,
        amount: String,
        fee: String,
    },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Wallet not found: {0}")]
    WalletNotFound(String),

    #[error("Wallet {0} still holds a balance and cannot be burned")]
    WalletNotEmpty(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl WalletError {
    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a storage error
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage(message.into())
    }

    /// Create a network error
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network(message.into())
    }

    /// Create a wallet not found error
    pub fn wallet_not_found(message: impl Into<String>) -> Self {
        Self::WalletNotFound(message.into())
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    pub fn unsupported_token(symbol: impl Into<String>, chain_id: u64) -> Self {
        Self::UnsupportedToken {
            symbol: symbol.into(),
            chain_id,
        }
    }

    /// True for errors raised before any network call was made
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedChain(_) | Self::UnsupportedToken { .. }
        )
    }
}

// Standard library error conversions
impl From<std::io::Error> for WalletError {
    fn from(err: std::io::Error) -> Self {
        Self::storage(format!("IO error: {}", err))
    }
}

impl From<hex::FromHexError> for WalletError {
    fn from(err: hex::FromHexError) -> Self {
        Self::validation(format!("Hex decoding error: {}", err))
    }
}

impl From<serde_json::Error> for WalletError {
    fn from(err: serde_json::Error) -> Self {
        Self::storage(format!("JSON error: {}", err))
    }
}

impl From<reqwest::Error> for WalletError {
    fn from(err: reqwest::Error) -> Self {
        Self::network(format!("HTTP error: {}", err))
    }
}

impl From<tokio::task::JoinError> for WalletError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::internal(format!("Task join error: {}", err))
    }
}

// Cryptographic error conversions
impl From<argon2::password_hash::Error> for WalletError {
    fn from(err: argon2::password_hash::Error) -> Self {
        Self::storage(format!("Password hash error: {}", err))
    }
}

impl From<argon2::Error> for WalletError {
    fn from(err: argon2::Error) -> Self {
        Self::storage(format!("Argon2 error: {}", err))
    }
}

impl From<aes_gcm::Error> for WalletError {
    fn from(err: aes_gcm::Error) -> Self {
        Self::storage(format!("AES-GCM error: {}", err))
    }
}
