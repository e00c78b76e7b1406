//! Constants for the wallet core
//!
//! This module contains the policy constants used throughout the wallet core.

// Chain ids
pub const MAINNET_CHAIN_ID: u64 = 1;
pub const BASE_CHAIN_ID: u64 = 8453;
pub const OPTIMISM_CHAIN_ID: u64 = 10;
pub const ARBITRUM_CHAIN_ID: u64 = 42161;

/// Chain used for account derivation and as the transfer default
pub const DEFAULT_CHAIN_ID: u64 = BASE_CHAIN_ID;

/// Shared v0.7 entry point deployed at the same address on every
/// supported chain
pub const ENTRY_POINT_V07: &str = "0x0000000071727De22E5E9d8BAf0edAc6f37da032";

// Aggregator throttling. The indexer rate-limits aggressively and the
// aggregators have no retry policy, so fan-out is strictly sequential with
// this fixed gap between calls.
pub const INDEXER_CALL_INTERVAL_MS: u64 = 1100;

/// Coarse consumer-side safety refresh; the broadcast channel is the primary
/// invalidation path
pub const BALANCE_SAFETY_REFRESH_SECS: u64 = 300;

/// Capacity of each aggregator's broadcast channel
pub const BROADCAST_CAPACITY: usize = 64;

// Submission and confirmation
pub const CONFIRMATION_TIMEOUT_SECS: u64 = 60;
pub const RECEIPT_POLL_INTERVAL_MS: u64 = 3000;

/// Seconds the bridge relayer has to fill on the destination chain before
/// its refund path applies
pub const BRIDGE_FILL_DEADLINE_SECS: u64 = 120;

// Wallet constants
pub const WALLET_LABEL_MAX_LENGTH: usize = 50;
pub const WALLET_LABEL_MIN_LENGTH: usize = 1;

// Persisted state layout
pub const WALLETS_KEY: &str = "wallets";
pub const PIN_GATE_KEY: &str = "pin_gate";
pub const WALLET_LABELS_KEY: &str = "wallet_labels";

// Environment variables
pub const ENV_INDEXER_URL: &str = "BURNER_INDEXER_URL";
pub const ENV_PASSKEY_SERVICE_URL: &str = "BURNER_PASSKEY_SERVICE_URL";
pub const ENV_REGISTRAR_URL: &str = "BURNER_REGISTRAR_URL";
pub const ENV_WALLET_PASSWORD: &str = "BURNER_WALLET_PASSWORD";
