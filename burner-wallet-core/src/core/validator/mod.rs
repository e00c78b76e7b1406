//! Validator resolution
//!
//! Maps a wallet record to the signing capability appropriate to its kind.
//! The `OwnershipProver` handle is opaque to the rest of the system: it
//! produces an ownership proof for arbitrary call data and exposes a stable
//! signer id for account derivation, nothing more. New wallet kinds register
//! a new resolver branch; the transfer and bridge engines never change.

use crate::domain::entities::Wallet;
use crate::infrastructure::rpc::{PasskeyApi, PasskeyCredential};
use crate::shared::error::WalletError;
use crate::shared::types::{WalletKind, WalletResult};
use async_trait::async_trait;
use ethers::signers::{LocalWallet, Signer};
use ethers::types::{Address, H256};
use ethers::utils::keccak256;
use std::sync::Arc;
use zeroize::Zeroizing;

/// Signing capability bound to one wallet
#[async_trait]
pub trait OwnershipProver: Send + Sync + std::fmt::Debug {
    fn kind(&self) -> WalletKind;

    /// Stable identifier of the underlying signer; drives deterministic
    /// account derivation
    fn signer_id(&self) -> [u8; 32];

    /// Produce an ownership proof over arbitrary call data
    async fn prove(&self, payload: &[u8]) -> WalletResult<Vec<u8>>;
}

/// Read-only seam through which signing material is reachable. Implemented
/// by the wallet store; engines never touch the backing storage directly.
pub trait KeyMaterialSource: Send + Sync {
    fn signing_material(&self, address: &Address) -> WalletResult<Option<Zeroizing<String>>>;
}

/// Prover backed by a locally held secp256k1 key
pub struct LocalKeyProver {
    signer: LocalWallet,
}

impl std::fmt::Debug for LocalKeyProver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalKeyProver")
            .field("address", &self.signer.address())
            .finish_non_exhaustive()
    }
}

impl LocalKeyProver {
    /// Rehydrate from stored hex key material
    pub fn from_material(material: &Zeroizing<String>) -> WalletResult<Self> {
        let signer = material
            .trim_start_matches("0x")
            .parse::<LocalWallet>()
            .map_err(|e| WalletError::validation(format!("Invalid key material: {}", e)))?;
        Ok(Self { signer })
    }

    /// Generate a fresh key; returns the prover and the hex material to
    /// persist. Only the wallet store calls this, at creation time.
    pub fn generate() -> (Self, Zeroizing<String>) {
        let signer = LocalWallet::new(&mut rand::thread_rng());
        let material = Zeroizing::new(format!(
            "0x{}",
            hex::encode(signer.signer().to_bytes())
        ));
        (Self { signer }, material)
    }
}

#[async_trait]
impl OwnershipProver for LocalKeyProver {
    fn kind(&self) -> WalletKind {
        WalletKind::LocalKey
    }

    fn signer_id(&self) -> [u8; 32] {
        keccak256(self.signer.address().as_bytes())
    }

    async fn prove(&self, payload: &[u8]) -> WalletResult<Vec<u8>> {
        let digest = H256::from(keccak256(payload));
        let signature = self
            .signer
            .sign_hash(digest)
            .map_err(|e| WalletError::internal(format!("Signing failed: {}", e)))?;
        Ok(signature.to_vec())
    }
}

/// Prover backed by a device-bound passkey credential
pub struct PasskeyProver {
    credential: PasskeyCredential,
    service: Arc<dyn PasskeyApi>,
}

impl std::fmt::Debug for PasskeyProver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasskeyProver").finish_non_exhaustive()
    }
}

impl PasskeyProver {
    /// Run the one-time registration ceremony; used at wallet creation only
    pub async fn register(
        service: Arc<dyn PasskeyApi>,
        ceremony_id: &str,
    ) -> WalletResult<Self> {
        let credential = service.register(ceremony_id).await?;
        Ok(Self {
            credential,
            service,
        })
    }

    /// Run the login ceremony against an existing credential
    pub async fn login(service: Arc<dyn PasskeyApi>, ceremony_id: &str) -> WalletResult<Self> {
        let credential = service.login(ceremony_id).await?;
        Ok(Self {
            credential,
            service,
        })
    }
}

#[async_trait]
impl OwnershipProver for PasskeyProver {
    fn kind(&self) -> WalletKind {
        WalletKind::Passkey
    }

    fn signer_id(&self) -> [u8; 32] {
        keccak256(&self.credential.public_key)
    }

    async fn prove(&self, payload: &[u8]) -> WalletResult<Vec<u8>> {
        let challenge = keccak256(payload);
        self.service.sign(&self.credential, &challenge).await
    }
}

/// Resolves wallets to provers, keyed on wallet kind
pub struct ValidatorResolver {
    keys: Arc<dyn KeyMaterialSource>,
    passkeys: Arc<dyn PasskeyApi>,
}

impl ValidatorResolver {
    pub fn new(keys: Arc<dyn KeyMaterialSource>, passkeys: Arc<dyn PasskeyApi>) -> Self {
        Self { keys, passkeys }
    }

    /// Produce the ownership-proof capability for `wallet`.
    ///
    /// Passkey wallets always run a login-mode ceremony here, keyed by the
    /// wallet label; registration happened once at creation.
    pub async fn resolve(&self, wallet: &Wallet) -> WalletResult<Arc<dyn OwnershipProver>> {
        match wallet.kind {
            WalletKind::LocalKey => {
                let material = self
                    .keys
                    .signing_material(&wallet.address)?
                    .ok_or_else(|| {
                        WalletError::MissingKeyMaterial(format!("{:#x}", wallet.address))
                    })?;
                let prover = LocalKeyProver::from_material(&material)?;
                Ok(Arc::new(prover))
            }
            WalletKind::Passkey => {
                log::debug!("Starting passkey login ceremony for {}", wallet.label);
                let prover = PasskeyProver::login(self.passkeys.clone(), &wallet.label).await?;
                Ok(Arc::new(prover))
            }
        }
    }
}
