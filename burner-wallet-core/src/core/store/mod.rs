//! Wallet store
//!
//! CRUD over the set of known burner wallets, persisted through the
//! key-value collaborator as one ordered record list plus a separate
//! PIN-gate value and a separate label-override map. Signing material lives
//! only inside the persisted records; the rest of the system reaches it
//! exclusively through the `KeyMaterialSource` seam, and nothing but store
//! operations ever writes to the backing storage.

use crate::core::session::SessionBuilder;
use crate::core::validator::{KeyMaterialSource, LocalKeyProver, PasskeyProver};
use crate::domain::entities::{validate_label, Balance, Wallet};
use crate::infrastructure::platform::KeyValueStore;
use crate::infrastructure::rpc::{PasskeyApi, RegistrarApi};
use crate::shared::constants::{DEFAULT_CHAIN_ID, PIN_GATE_KEY, WALLETS_KEY, WALLET_LABELS_KEY};
use crate::shared::error::WalletError;
use crate::shared::types::{AccountVendor, WalletKind, WalletResult};
use ethers::types::Address;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use zeroize::Zeroizing;

/// Persisted wallet record. Never leaves this module; the public surface is
/// the `Wallet` entity, which carries no signing material.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WalletRecord {
    address: Address,
    label: String,
    username: String,
    kind: WalletKind,
    vendor: AccountVendor,
    #[serde(skip_serializing_if = "Option::is_none")]
    signing_material: Option<String>,
}

impl WalletRecord {
    fn to_wallet(&self) -> Wallet {
        Wallet {
            address: self.address,
            label: self.label.clone(),
            username: self.username.clone(),
            kind: self.kind,
            vendor: self.vendor,
        }
    }
}

pub struct WalletStore {
    storage: Arc<dyn KeyValueStore>,
    sessions: Arc<SessionBuilder>,
    passkeys: Arc<dyn PasskeyApi>,
    registrar: Arc<dyn RegistrarApi>,
    records: RwLock<Vec<WalletRecord>>,
}

impl WalletStore {
    /// Load the store from the backing storage
    pub fn open(
        storage: Arc<dyn KeyValueStore>,
        sessions: Arc<SessionBuilder>,
        passkeys: Arc<dyn PasskeyApi>,
        registrar: Arc<dyn RegistrarApi>,
    ) -> WalletResult<Self> {
        let mut records: Vec<WalletRecord> = match storage.get(WALLETS_KEY)? {
            Some(raw) => serde_json::from_slice(&raw)?,
            None => Vec::new(),
        };

        // Label overrides win over whatever the record list carries
        let overrides: HashMap<String, String> = match storage.get(WALLET_LABELS_KEY)? {
            Some(raw) => serde_json::from_slice(&raw)?,
            None => HashMap::new(),
        };
        for record in &mut records {
            if let Some(label) = overrides.get(&format!("{:#x}", record.address)) {
                record.label = label.clone();
            }
        }

        Ok(Self {
            storage,
            sessions,
            passkeys,
            registrar,
            records: RwLock::new(records),
        })
    }

    /// All known wallets, in creation order
    pub fn list(&self) -> Vec<Wallet> {
        self.records
            .read()
            .map(|records| records.iter().map(WalletRecord::to_wallet).collect())
            .unwrap_or_default()
    }

    /// Look up a wallet by address
    pub fn get(&self, address: &Address) -> WalletResult<Wallet> {
        let records = self
            .records
            .read()
            .map_err(|_| WalletError::internal("Record lock poisoned"))?;
        records
            .iter()
            .find(|r| r.address == *address)
            .map(WalletRecord::to_wallet)
            .ok_or_else(|| WalletError::wallet_not_found(format!("{:#x}", address)))
    }

    /// Create a new burner wallet.
    ///
    /// Local-key wallets get a freshly generated signer persisted with the
    /// record; passkey wallets run the registration ceremony exactly once,
    /// here. The address comes from the deterministic account derivation on
    /// the default chain, after which the name registration side-channel is
    /// fired and forgotten - its failure never rolls back creation.
    pub async fn create(
        &self,
        label: &str,
        kind: WalletKind,
        vendor: AccountVendor,
    ) -> WalletResult<Wallet> {
        validate_label(label)?;

        let (prover, signing_material): (Arc<dyn crate::core::validator::OwnershipProver>, _) =
            match kind {
                WalletKind::LocalKey => {
                    let (prover, material) = LocalKeyProver::generate();
                    (Arc::new(prover), Some(material.to_string()))
                }
                WalletKind::Passkey => {
                    let prover = PasskeyProver::register(self.passkeys.clone(), label).await?;
                    (Arc::new(prover), None)
                }
            };

        let session = self.sessions.build(prover, vendor, DEFAULT_CHAIN_ID)?;
        let address = session.account();

        {
            let mut records = self
                .records
                .write()
                .map_err(|_| WalletError::internal("Record lock poisoned"))?;
            if records.iter().any(|r| r.address == address) {
                return Err(WalletError::validation(format!(
                    "Wallet {:#x} already exists",
                    address
                )));
            }
            let wallet = Wallet::new(address, label, kind, vendor)?;
            records.push(WalletRecord {
                address,
                label: wallet.label.clone(),
                username: wallet.username.clone(),
                kind,
                vendor,
                signing_material,
            });
            self.persist_records(&records)?;
        }

        let wallet = self.get(&address)?;
        log::info!("Created {:?} wallet {:#x}", kind, address);

        // Fire-and-forget name registration; failure is logged, never fatal
        let registrar = self.registrar.clone();
        let username = wallet.username.clone();
        tokio::spawn(async move {
            match registrar.register_name(&username, &address).await {
                Ok(hash) => log::debug!("Registered name {} in {}", username, hash),
                Err(e) => log::warn!("Name registration for {} failed: {}", username, e),
            }
        });

        Ok(wallet)
    }

    /// Rename a wallet. The label is the only mutable field.
    pub fn rename(&self, address: &Address, new_label: &str) -> WalletResult<()> {
        validate_label(new_label)?;
        let mut records = self
            .records
            .write()
            .map_err(|_| WalletError::internal("Record lock poisoned"))?;
        let record = records
            .iter_mut()
            .find(|r| r.address == *address)
            .ok_or_else(|| WalletError::wallet_not_found(format!("{:#x}", address)))?;
        record.label = new_label.to_string();
        self.persist_records(&records)?;

        let mut overrides = self.read_label_overrides()?;
        overrides.insert(format!("{:#x}", address), new_label.to_string());
        self.storage
            .put(WALLET_LABELS_KEY, &serde_json::to_vec(&overrides)?)
    }

    /// Irreversibly remove a wallet. Permitted only when every known balance
    /// for the address is exactly zero.
    pub fn burn(&self, address: &Address, known_balances: &[Balance]) -> WalletResult<()> {
        if known_balances
            .iter()
            .any(|b| b.address == *address && !b.is_zero())
        {
            return Err(WalletError::WalletNotEmpty(format!("{:#x}", address)));
        }

        let mut records = self
            .records
            .write()
            .map_err(|_| WalletError::internal("Record lock poisoned"))?;
        let before = records.len();
        records.retain(|r| r.address != *address);
        if records.len() == before {
            return Err(WalletError::wallet_not_found(format!("{:#x}", address)));
        }
        self.persist_records(&records)?;
        drop(records);

        let mut overrides = self.read_label_overrides()?;
        if overrides.remove(&format!("{:#x}", address)).is_some() {
            self.storage
                .put(WALLET_LABELS_KEY, &serde_json::to_vec(&overrides)?)?;
        }
        log::info!("Burned wallet {:#x}", address);
        Ok(())
    }

    /// Store the opaque PIN-gate value
    pub fn set_pin_gate(&self, value: &str) -> WalletResult<()> {
        self.storage.put(PIN_GATE_KEY, value.as_bytes())
    }

    /// Read the opaque PIN-gate value
    pub fn pin_gate(&self) -> WalletResult<Option<String>> {
        Ok(self
            .storage
            .get(PIN_GATE_KEY)?
            .map(|raw| String::from_utf8_lossy(&raw).into_owned()))
    }

    fn persist_records(&self, records: &[WalletRecord]) -> WalletResult<()> {
        self.storage.put(WALLETS_KEY, &serde_json::to_vec(records)?)
    }

    fn read_label_overrides(&self) -> WalletResult<HashMap<String, String>> {
        Ok(match self.storage.get(WALLET_LABELS_KEY)? {
            Some(raw) => serde_json::from_slice(&raw)?,
            None => HashMap::new(),
        })
    }
}

impl KeyMaterialSource for WalletStore {
    fn signing_material(&self, address: &Address) -> WalletResult<Option<Zeroizing<String>>> {
        let records = self
            .records
            .read()
            .map_err(|_| WalletError::internal("Record lock poisoned"))?;
        Ok(records
            .iter()
            .find(|r| r.address == *address)
            .and_then(|r| r.signing_material.clone())
            .map(Zeroizing::new))
    }
}
