//! Burner Wallet Core
//!
//! Transaction orchestration core for disposable "burner" smart accounts.
//! Each wallet is independently fundable and can move stablecoin balances
//! same-chain or cross-chain without ever exposing a seed phrase to a
//! backend.
//!
//! ## Architecture
//!
//! - **Core**: registry, validator resolution, smart-account sessions,
//!   transfer/bridge engines, balance and history aggregation, wallet store
//! - **Domain**: entities and business rules
//! - **Shared**: common types, constants, and utilities
//! - **Infrastructure**: storage backends and the HTTP collaborators
//!   (bundler, paymaster, indexer, passkey service, registrar)
//!
//! ## Usage
//!
//! ```rust,no_run
//! use burner_wallet_core::{init_burner_core, WalletKind};
//!
//! # async fn demo() -> Result<(), burner_wallet_core::WalletError> {
//! let core = init_burner_core()?;
//!
//! // Create a burner and read its aggregated balances
//! let wallet = core.create_wallet("ETH Global Prize", WalletKind::LocalKey).await?;
//! core.refresh_balances(&[wallet.address]).await;
//! let balances = core.balances.get_last(&wallet.address).await;
//! # let _ = balances;
//! # Ok(())
//! # }
//! ```

use dotenv::dotenv;
use std::env;
use std::sync::Arc;

pub mod core;
pub mod domain;
pub mod infrastructure;
pub mod shared;

use crate::core::balances::BalanceAggregator;
use crate::core::bridge::BridgeEngine;
use crate::core::history::HistoryAggregator;
use crate::core::registry::Registry;
use crate::core::session::SessionBuilder;
use crate::core::store::WalletStore;
use crate::core::transfer::{StepCallback, TransferEngine};
use crate::core::validator::ValidatorResolver;
use crate::infrastructure::platform::EncryptedFileStore;
use crate::infrastructure::rpc::{
    HttpBundler, HttpIndexer, HttpPasskeyService, HttpPaymaster, HttpRegistrar,
};
use crate::shared::constants::{ENV_INDEXER_URL, ENV_PASSKEY_SERVICE_URL, ENV_REGISTRAR_URL};

// Re-export the main components
pub use crate::core::balances::BalancesUpdated;
pub use crate::core::history::HistoryUpdated;
pub use crate::domain::entities::{ActivityRecord, Balance, Wallet};
pub use crate::shared::error::WalletError;
pub use crate::shared::types::{
    AccountVendor, BridgeRequest, OperationReceipt, TransferRequest, TransferStep, WalletKind,
    WalletResult,
};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Initialize logging from the environment
pub fn init_logging() {
    let _ = env_logger::Builder::from_default_env().try_init();
}

/// Initialize the core with configuration from .env or safe defaults
pub fn init_burner_core() -> WalletResult<BurnerCore> {
    dotenv().ok(); // Load .env if present

    let registry = Arc::new(Registry::builtin()?);
    let client = reqwest::Client::new();

    // Endpoints without a safe default stay empty to force configuration
    let indexer_url = env::var(ENV_INDEXER_URL).unwrap_or_default();
    let passkey_url = env::var(ENV_PASSKEY_SERVICE_URL).unwrap_or_default();
    let registrar_url = env::var(ENV_REGISTRAR_URL).unwrap_or_default();

    let bundler = Arc::new(HttpBundler::new(client.clone()));
    let paymaster = Arc::new(HttpPaymaster::new(client.clone()));
    let indexer = Arc::new(HttpIndexer::new(client.clone(), indexer_url));
    let passkeys = Arc::new(HttpPasskeyService::new(client.clone(), passkey_url));
    let registrar = Arc::new(HttpRegistrar::new(client, registrar_url));

    let sessions = Arc::new(SessionBuilder::new(registry.clone(), bundler, paymaster));
    let storage = Arc::new(EncryptedFileStore::new()?);
    let store = Arc::new(WalletStore::open(
        storage,
        sessions.clone(),
        passkeys.clone(),
        registrar,
    )?);
    let resolver = Arc::new(ValidatorResolver::new(store.clone(), passkeys));
    let balances = Arc::new(BalanceAggregator::new(registry.clone(), indexer.clone()));
    let history = Arc::new(HistoryAggregator::new(registry.clone(), indexer));

    let transfers = TransferEngine::new(
        registry.clone(),
        store.clone(),
        resolver.clone(),
        sessions.clone(),
        balances.clone(),
    );
    let bridge = BridgeEngine::new(
        registry.clone(),
        store.clone(),
        resolver,
        sessions,
        balances.clone(),
    );

    Ok(BurnerCore {
        registry,
        store,
        transfers,
        bridge,
        balances,
        history,
    })
}

/// Main core struct that provides access to all functionality
pub struct BurnerCore {
    pub registry: Arc<Registry>,
    pub store: Arc<WalletStore>,
    pub transfers: TransferEngine,
    pub bridge: BridgeEngine,
    pub balances: Arc<BalanceAggregator>,
    pub history: Arc<HistoryAggregator>,
}

impl BurnerCore {
    /// Create a new burner wallet with the default account vendor
    pub async fn create_wallet(&self, label: &str, kind: WalletKind) -> WalletResult<Wallet> {
        self.store.create(label, kind, AccountVendor::Kernel).await
    }

    /// All known wallets
    pub fn wallets(&self) -> Vec<Wallet> {
        self.store.list()
    }

    /// Rename a wallet
    pub fn rename_wallet(
        &self,
        address: &ethers::types::Address,
        label: &str,
    ) -> WalletResult<()> {
        self.store.rename(address, label)
    }

    /// Burn a wallet; refused while any known balance is non-zero
    pub async fn burn_wallet(&self, address: &ethers::types::Address) -> WalletResult<()> {
        let known = self.balances.get_last(address).await;
        self.store.burn(address, &known)
    }

    /// Execute a same-chain transfer
    pub async fn transfer(
        &self,
        request: &TransferRequest,
        on_step: Option<StepCallback<'_>>,
    ) -> WalletResult<OperationReceipt> {
        self.transfers.transfer(request, on_step).await
    }

    /// Execute a cross-chain bridge transfer
    pub async fn bridge_transfer(
        &self,
        request: &BridgeRequest,
        on_step: Option<StepCallback<'_>>,
    ) -> WalletResult<OperationReceipt> {
        self.bridge.bridge(request, on_step).await
    }

    /// Refresh balances for the given addresses (dropped if a cycle is
    /// already running)
    pub async fn refresh_balances(&self, addresses: &[ethers::types::Address]) {
        self.balances.refresh(addresses).await
    }

    /// Refresh history for the given addresses
    pub async fn refresh_history(&self, addresses: &[ethers::types::Address]) {
        self.history.refresh(addresses).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_registry_wires_up() {
        let registry = Registry::builtin().expect("Failed to build registry");
        assert!(registry.chains().count() >= 4);
        assert!(registry.token("USDC").is_some());
    }
}
