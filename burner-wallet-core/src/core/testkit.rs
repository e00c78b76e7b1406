//! Mock collaborators shared by the module tests

use crate::domain::entities::ActivityRecord;
use crate::infrastructure::rpc::{
    BundlerApi, IndexerApi, PasskeyApi, PasskeyCredential, PaymasterApi, RegistrarApi,
    TokenHolding,
};
use crate::shared::error::WalletError;
use crate::shared::types::{OperationReceipt, SponsoredOperation, UserOperation};
use async_trait::async_trait;
use ethers::types::{Address, Bytes};
use ethers::utils::keccak256;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

enum BundlerMode {
    Confirm,
    NeverConfirm,
    Reject,
    Revert,
}

pub(crate) struct MockBundler {
    mode: BundlerMode,
    send: AtomicUsize,
    receipt: AtomicUsize,
}

impl MockBundler {
    pub fn new() -> Self {
        Self::with_mode(BundlerMode::Confirm)
    }

    pub fn never_confirming() -> Self {
        Self::with_mode(BundlerMode::NeverConfirm)
    }

    pub fn rejecting() -> Self {
        Self::with_mode(BundlerMode::Reject)
    }

    pub fn reverting() -> Self {
        Self::with_mode(BundlerMode::Revert)
    }

    fn with_mode(mode: BundlerMode) -> Self {
        Self {
            mode,
            send: AtomicUsize::new(0),
            receipt: AtomicUsize::new(0),
        }
    }

    pub fn send_calls(&self) -> usize {
        self.send.load(Ordering::SeqCst)
    }

    pub fn receipt_calls(&self) -> usize {
        self.receipt.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BundlerApi for MockBundler {
    async fn send_user_operation(
        &self,
        _endpoint: &str,
        _entry_point: &Address,
        _operation: &SponsoredOperation,
        _signature: &[u8],
    ) -> Result<String, WalletError> {
        self.send.fetch_add(1, Ordering::SeqCst);
        if matches!(self.mode, BundlerMode::Reject) {
            return Err(WalletError::SubmissionRejected("simulated rejection".into()));
        }
        Ok("0xophash".to_string())
    }

    async fn get_receipt(
        &self,
        _endpoint: &str,
        user_op_hash: &str,
    ) -> Result<Option<OperationReceipt>, WalletError> {
        self.receipt.fetch_add(1, Ordering::SeqCst);
        match self.mode {
            BundlerMode::NeverConfirm => Ok(None),
            BundlerMode::Revert => Ok(Some(OperationReceipt {
                user_op_hash: user_op_hash.to_string(),
                transaction_hash: "0xtx".to_string(),
                success: false,
            })),
            _ => Ok(Some(OperationReceipt {
                user_op_hash: user_op_hash.to_string(),
                transaction_hash: "0xtx".to_string(),
                success: true,
            })),
        }
    }
}

pub(crate) struct MockPaymaster {
    deny: bool,
    calls: AtomicUsize,
}

impl MockPaymaster {
    pub fn new() -> Self {
        Self {
            deny: false,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn denying() -> Self {
        Self {
            deny: true,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn sponsor_calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PaymasterApi for MockPaymaster {
    async fn sponsor_user_operation(
        &self,
        _endpoint: &str,
        _entry_point: &Address,
        _operation: &UserOperation,
    ) -> Result<Bytes, WalletError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.deny {
            return Err(WalletError::SponsorshipDenied("simulated denial".into()));
        }
        Ok(Bytes::from(vec![0xaa; 20]))
    }
}

pub(crate) struct MockIndexer {
    balances: Mutex<HashMap<(Address, u64), Vec<TokenHolding>>>,
    history: Mutex<HashMap<Address, Vec<ActivityRecord>>>,
    failing_chains: Mutex<HashSet<u64>>,
    failing_history: AtomicBool,
    balance_calls: AtomicUsize,
    history_calls: AtomicUsize,
}

impl MockIndexer {
    pub fn new() -> Self {
        Self {
            balances: Mutex::new(HashMap::new()),
            history: Mutex::new(HashMap::new()),
            failing_chains: Mutex::new(HashSet::new()),
            failing_history: AtomicBool::new(false),
            balance_calls: AtomicUsize::new(0),
            history_calls: AtomicUsize::new(0),
        }
    }

    pub fn fail_history(&self, fail: bool) {
        self.failing_history.store(fail, Ordering::SeqCst);
    }

    pub fn set_balances(&self, address: Address, chain_id: u64, holdings: Vec<TokenHolding>) {
        self.balances
            .lock()
            .expect("Lock poisoned")
            .insert((address, chain_id), holdings);
    }

    pub fn set_history(&self, address: Address, records: Vec<ActivityRecord>) {
        self.history
            .lock()
            .expect("Lock poisoned")
            .insert(address, records);
    }

    pub fn fail_chain(&self, chain_id: u64) {
        self.failing_chains
            .lock()
            .expect("Lock poisoned")
            .insert(chain_id);
    }

    pub fn balance_calls(&self) -> usize {
        self.balance_calls.load(Ordering::SeqCst)
    }

    pub fn history_calls(&self) -> usize {
        self.history_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IndexerApi for MockIndexer {
    async fn fetch_balances(
        &self,
        address: &Address,
        chain_id: u64,
    ) -> Result<Vec<TokenHolding>, WalletError> {
        self.balance_calls.fetch_add(1, Ordering::SeqCst);
        if self
            .failing_chains
            .lock()
            .expect("Lock poisoned")
            .contains(&chain_id)
        {
            return Err(WalletError::network(format!(
                "simulated outage on chain {}",
                chain_id
            )));
        }
        Ok(self
            .balances
            .lock()
            .expect("Lock poisoned")
            .get(&(*address, chain_id))
            .cloned()
            .unwrap_or_default())
    }

    async fn fetch_history(&self, address: &Address) -> Result<Vec<ActivityRecord>, WalletError> {
        self.history_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_history.load(Ordering::SeqCst) {
            return Err(WalletError::network("simulated history outage"));
        }
        Ok(self
            .history
            .lock()
            .expect("Lock poisoned")
            .get(address)
            .cloned()
            .unwrap_or_default())
    }
}

pub(crate) struct MockPasskeyService {
    fail: bool,
    register: AtomicUsize,
    login: AtomicUsize,
}

impl MockPasskeyService {
    pub fn new() -> Self {
        Self {
            fail: false,
            register: AtomicUsize::new(0),
            login: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            register: AtomicUsize::new(0),
            login: AtomicUsize::new(0),
        }
    }

    pub fn register_calls(&self) -> usize {
        self.register.load(Ordering::SeqCst)
    }

    pub fn login_calls(&self) -> usize {
        self.login.load(Ordering::SeqCst)
    }

    fn credential(ceremony_id: &str) -> PasskeyCredential {
        PasskeyCredential {
            credential_id: format!("cred-{}", ceremony_id),
            public_key: keccak256(ceremony_id.as_bytes()).to_vec(),
        }
    }
}

#[async_trait]
impl PasskeyApi for MockPasskeyService {
    async fn register(&self, ceremony_id: &str) -> Result<PasskeyCredential, WalletError> {
        self.register.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(WalletError::PasskeyCeremonyFailed("user cancelled".into()));
        }
        Ok(Self::credential(ceremony_id))
    }

    async fn login(&self, ceremony_id: &str) -> Result<PasskeyCredential, WalletError> {
        self.login.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(WalletError::PasskeyCeremonyFailed("user cancelled".into()));
        }
        Ok(Self::credential(ceremony_id))
    }

    async fn sign(
        &self,
        credential: &PasskeyCredential,
        challenge: &[u8; 32],
    ) -> Result<Vec<u8>, WalletError> {
        if self.fail {
            return Err(WalletError::PasskeyCeremonyFailed("device error".into()));
        }
        let mut assertion = credential.public_key.clone();
        assertion.extend_from_slice(challenge);
        Ok(assertion)
    }
}

pub(crate) struct MockRegistrar {
    fail: bool,
    calls: AtomicUsize,
}

impl MockRegistrar {
    pub fn new() -> Self {
        Self {
            fail: false,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn register_calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RegistrarApi for MockRegistrar {
    async fn register_name(&self, _name: &str, _address: &Address) -> Result<String, WalletError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(WalletError::network("registrar unavailable"));
        }
        Ok("0xregistration".to_string())
    }
}

/// Balance fetch row for a registered token
pub(crate) fn holding(contract: &str, balance: &str, decimals: u8, symbol: &str) -> TokenHolding {
    TokenHolding {
        address: contract.to_string(),
        balance: balance.to_string(),
        decimals,
        symbol: symbol.to_string(),
    }
}

/// Fully wired core over mock collaborators, shared by the engine tests
pub(crate) struct EngineFixture {
    pub bundler: Arc<MockBundler>,
    pub paymaster: Arc<MockPaymaster>,
    pub indexer: Arc<MockIndexer>,
    pub passkeys: Arc<MockPasskeyService>,
    pub store: Arc<crate::core::store::WalletStore>,
    pub registry: Arc<crate::core::registry::Registry>,
    pub resolver: Arc<crate::core::validator::ValidatorResolver>,
    pub sessions: Arc<crate::core::session::SessionBuilder>,
    pub balances: Arc<crate::core::balances::BalanceAggregator>,
}

impl EngineFixture {
    pub fn new() -> Self {
        Self::with_transports(Arc::new(MockBundler::new()), Arc::new(MockPaymaster::new()))
    }

    pub fn with_transports(bundler: Arc<MockBundler>, paymaster: Arc<MockPaymaster>) -> Self {
        use crate::core::balances::BalanceAggregator;
        use crate::core::registry::Registry;
        use crate::core::session::SessionBuilder;
        use crate::core::store::WalletStore;
        use crate::core::validator::ValidatorResolver;
        use crate::infrastructure::platform::MemoryStore;

        let registry = Arc::new(Registry::builtin().expect("Failed to build registry"));
        let indexer = Arc::new(MockIndexer::new());
        let passkeys = Arc::new(MockPasskeyService::new());
        let sessions = Arc::new(
            SessionBuilder::new(registry.clone(), bundler.clone(), paymaster.clone())
                .with_timeouts(Duration::from_millis(100), Duration::from_millis(5)),
        );
        let store = Arc::new(
            WalletStore::open(
                Arc::new(MemoryStore::new()),
                sessions.clone(),
                passkeys.clone(),
                Arc::new(MockRegistrar::new()),
            )
            .expect("Failed to open store"),
        );
        let resolver = Arc::new(ValidatorResolver::new(store.clone(), passkeys.clone()));
        let balances = Arc::new(BalanceAggregator::with_interval(
            registry.clone(),
            indexer.clone(),
            Duration::from_millis(0),
        ));
        Self {
            bundler,
            paymaster,
            indexer,
            passkeys,
            store,
            registry,
            resolver,
            sessions,
            balances,
        }
    }

    pub fn transfer_engine(&self) -> crate::core::transfer::TransferEngine {
        crate::core::transfer::TransferEngine::new(
            self.registry.clone(),
            self.store.clone(),
            self.resolver.clone(),
            self.sessions.clone(),
            self.balances.clone(),
        )
    }

    pub fn bridge_engine(&self) -> crate::core::bridge::BridgeEngine {
        crate::core::bridge::BridgeEngine::new(
            self.registry.clone(),
            self.store.clone(),
            self.resolver.clone(),
            self.sessions.clone(),
            self.balances.clone(),
        )
    }

    /// Create a local-key wallet ready to send from
    pub async fn wallet(&self) -> crate::domain::entities::Wallet {
        use crate::shared::types::{AccountVendor, WalletKind};
        self.store
            .create("Sender", WalletKind::LocalKey, AccountVendor::Kernel)
            .await
            .expect("Failed to create wallet")
    }
}
