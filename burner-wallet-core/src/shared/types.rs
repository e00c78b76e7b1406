//! Common types for wallet operations

use ethers::types::{Address, Bytes, U256};
use serde::{Deserialize, Serialize};

/// Decimal token amount, e.g. "10" or "0.05"
pub type Amount = String;

/// Result alias used throughout the crate
pub type WalletResult<T> = Result<T, crate::shared::error::WalletError>;

/// How a wallet proves ownership of its smart account
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum WalletKind {
    LocalKey,
    Passkey,
}

/// Smart-account implementation the wallet was created with
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum AccountVendor {
    Kernel,
    Biconomy,
}

/// Forward transitions of the transfer state machine surfaced to the UI.
/// The callback never fires for a failed transfer; failure travels on the
/// error channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferStep {
    Preparing,
    Confirming,
}

/// Same-chain token transfer request
#[derive(Debug, Clone)]
pub struct TransferRequest {
    pub from: Address,
    pub to: Address,
    pub symbol: String,
    pub amount: Amount,
    pub source_chain_id: u64,
}

/// Cross-chain bridge transfer request
#[derive(Debug, Clone)]
pub struct BridgeRequest {
    pub from: Address,
    pub to: Address,
    pub symbol: String,
    pub amount: Amount,
    pub source_chain_id: u64,
    pub destination_chain_id: u64,
}

/// One inner call of a smart-account operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub target: Address,
    pub value: U256,
    pub data: Bytes,
}

/// Account-abstraction operation before sponsorship
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserOperation {
    pub sender: Address,
    pub chain_id: u64,
    pub call_data: Bytes,
}

/// Operation carrying the paymaster's sponsorship stamp
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SponsoredOperation {
    #[serde(flatten)]
    pub operation: UserOperation,
    pub paymaster_and_data: Bytes,
}

/// Handle to an operation accepted by a bundler. Once this exists the
/// operation is on its way on-chain and cannot be cancelled; abandoning the
/// receipt wait does not revoke it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationHandle {
    pub user_op_hash: String,
    pub chain_id: u64,
}

/// Receipt observed for a submitted operation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationReceipt {
    pub user_op_hash: String,
    pub transaction_hash: String,
    pub success: bool,
}
