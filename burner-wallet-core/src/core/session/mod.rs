//! Smart-account sessions
//!
//! Builds a session binding a validator as the sole authority over a
//! deterministic smart-account address on one chain, wired to that chain's
//! entry point, bundler, and paymaster. Vendor differences (call packing,
//! address derivation, sponsorship) live behind the `AccountScheme` trait so
//! adding a vendor means registering a scheme, not editing the engines.

use crate::core::registry::{ChainDescriptor, Registry};
use crate::core::validator::OwnershipProver;
use crate::shared::constants::{CONFIRMATION_TIMEOUT_SECS, RECEIPT_POLL_INTERVAL_MS};
use crate::shared::error::WalletError;
use crate::shared::types::{
    AccountVendor, Call, OperationHandle, OperationReceipt, SponsoredOperation, UserOperation,
    WalletResult,
};
use crate::infrastructure::rpc::{BundlerApi, PaymasterApi};
use ethers::abi::Token;
use ethers::types::{Address, Bytes, U256};
use ethers::utils::keccak256;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, Instant};

fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

/// ERC-20 `transfer(address,uint256)` call data
pub fn encode_erc20_transfer(to: Address, amount: U256) -> Bytes {
    let mut data = selector("transfer(address,uint256)").to_vec();
    data.extend_from_slice(&ethers::abi::encode(&[
        Token::Address(to),
        Token::Uint(amount),
    ]));
    Bytes::from(data)
}

/// ERC-20 `approve(address,uint256)` call data
pub fn encode_erc20_approve(spender: Address, amount: U256) -> Bytes {
    let mut data = selector("approve(address,uint256)").to_vec();
    data.extend_from_slice(&ethers::abi::encode(&[
        Token::Address(spender),
        Token::Uint(amount),
    ]));
    Bytes::from(data)
}

/// Vendor-specific smart-account behavior
pub trait AccountScheme: Send + Sync {
    fn vendor(&self) -> AccountVendor;

    /// Deterministic account address for a validator under this scheme.
    /// The entry point is the same on every supported chain, so the same
    /// validator always maps to the same address.
    fn derive_account(&self, signer_id: &[u8; 32], entry_point: &Address) -> Address;

    /// Pack inner calls into the account's execution call data
    fn pack_calls(&self, calls: &[Call]) -> Bytes;

    /// Whether operations go through the chain's paymaster
    fn requires_sponsorship(&self) -> bool;
}

fn derive_with_salt(salt: &[u8], signer_id: &[u8; 32], entry_point: &Address) -> Address {
    let mut preimage = Vec::with_capacity(salt.len() + 20 + 32);
    preimage.extend_from_slice(salt);
    preimage.extend_from_slice(entry_point.as_bytes());
    preimage.extend_from_slice(signer_id);
    Address::from_slice(&keccak256(&preimage)[12..])
}

fn call_tuple(call: &Call) -> Token {
    Token::Tuple(vec![
        Token::Address(call.target),
        Token::Uint(call.value),
        Token::Bytes(call.data.to_vec()),
    ])
}

/// Kernel-style account: sponsored operations, tuple-batch execution
pub struct KernelScheme;

impl AccountScheme for KernelScheme {
    fn vendor(&self) -> AccountVendor {
        AccountVendor::Kernel
    }

    fn derive_account(&self, signer_id: &[u8; 32], entry_point: &Address) -> Address {
        derive_with_salt(b"kernel.v3.1.sudo", signer_id, entry_point)
    }

    fn pack_calls(&self, calls: &[Call]) -> Bytes {
        if let [call] = calls {
            let mut data = selector("execute(address,uint256,bytes)").to_vec();
            data.extend_from_slice(&ethers::abi::encode(&[
                Token::Address(call.target),
                Token::Uint(call.value),
                Token::Bytes(call.data.to_vec()),
            ]));
            return Bytes::from(data);
        }
        let mut data = selector("executeBatch((address,uint256,bytes)[])").to_vec();
        data.extend_from_slice(&ethers::abi::encode(&[Token::Array(
            calls.iter().map(call_tuple).collect(),
        )]));
        Bytes::from(data)
    }

    fn requires_sponsorship(&self) -> bool {
        true
    }
}

/// Biconomy-style account: unsponsored, parallel-array batch execution
pub struct BiconomyScheme;

impl AccountScheme for BiconomyScheme {
    fn vendor(&self) -> AccountVendor {
        AccountVendor::Biconomy
    }

    fn derive_account(&self, signer_id: &[u8; 32], entry_point: &Address) -> Address {
        derive_with_salt(b"biconomy.v2.sudo", signer_id, entry_point)
    }

    fn pack_calls(&self, calls: &[Call]) -> Bytes {
        if let [call] = calls {
            let mut data = selector("execute_ncC(address,uint256,bytes)").to_vec();
            data.extend_from_slice(&ethers::abi::encode(&[
                Token::Address(call.target),
                Token::Uint(call.value),
                Token::Bytes(call.data.to_vec()),
            ]));
            return Bytes::from(data);
        }
        let mut data = selector("executeBatch_y6U(address[],uint256[],bytes[])").to_vec();
        data.extend_from_slice(&ethers::abi::encode(&[
            Token::Array(calls.iter().map(|c| Token::Address(c.target)).collect()),
            Token::Array(calls.iter().map(|c| Token::Uint(c.value)).collect()),
            Token::Array(
                calls
                    .iter()
                    .map(|c| Token::Bytes(c.data.to_vec()))
                    .collect(),
            ),
        ]));
        Bytes::from(data)
    }

    fn requires_sponsorship(&self) -> bool {
        false
    }
}

/// Scheme factory keyed on vendor. New vendors are added here, never inside
/// the engines.
pub fn scheme_for(vendor: AccountVendor) -> Arc<dyn AccountScheme> {
    match vendor {
        AccountVendor::Kernel => Arc::new(KernelScheme),
        AccountVendor::Biconomy => Arc::new(BiconomyScheme),
    }
}

/// Builds chain-bound sessions
pub struct SessionBuilder {
    registry: Arc<Registry>,
    bundler: Arc<dyn BundlerApi>,
    paymaster: Arc<dyn PaymasterApi>,
    confirmation_timeout: Duration,
    poll_interval: Duration,
}

impl SessionBuilder {
    pub fn new(
        registry: Arc<Registry>,
        bundler: Arc<dyn BundlerApi>,
        paymaster: Arc<dyn PaymasterApi>,
    ) -> Self {
        Self {
            registry,
            bundler,
            paymaster,
            confirmation_timeout: Duration::from_secs(CONFIRMATION_TIMEOUT_SECS),
            poll_interval: Duration::from_millis(RECEIPT_POLL_INTERVAL_MS),
        }
    }

    /// Override the receipt wait bounds (tests, embedders)
    pub fn with_timeouts(mut self, confirmation_timeout: Duration, poll_interval: Duration) -> Self {
        self.confirmation_timeout = confirmation_timeout;
        self.poll_interval = poll_interval;
        self
    }

    /// Bind `validator` as sole authority over its deterministic account on
    /// `chain_id`
    pub fn build(
        &self,
        validator: Arc<dyn OwnershipProver>,
        vendor: AccountVendor,
        chain_id: u64,
    ) -> WalletResult<Session> {
        let chain = self.registry.chain(chain_id)?.clone();
        let scheme = scheme_for(vendor);
        let account = scheme.derive_account(&validator.signer_id(), &chain.entry_point);
        Ok(Session {
            chain,
            scheme,
            validator,
            account,
            bundler: self.bundler.clone(),
            paymaster: self.paymaster.clone(),
            confirmation_timeout: self.confirmation_timeout,
            poll_interval: self.poll_interval,
        })
    }
}

/// A smart-account session on one chain
pub struct Session {
    chain: ChainDescriptor,
    scheme: Arc<dyn AccountScheme>,
    validator: Arc<dyn OwnershipProver>,
    account: Address,
    bundler: Arc<dyn BundlerApi>,
    paymaster: Arc<dyn PaymasterApi>,
    confirmation_timeout: Duration,
    poll_interval: Duration,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("chain_id", &self.chain.chain_id)
            .field("account", &self.account)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// The session's smart-account address
    pub fn account(&self) -> Address {
        self.account
    }

    pub fn chain_id(&self) -> u64 {
        self.chain.chain_id
    }

    pub fn encode_call(&self, target: Address, data: Bytes, value: U256) -> Call {
        Call {
            target,
            value,
            data,
        }
    }

    /// Pack calls into a single account operation
    pub fn build_operation(&self, calls: &[Call]) -> WalletResult<UserOperation> {
        if calls.is_empty() {
            return Err(WalletError::validation("Operation requires at least one call"));
        }
        Ok(UserOperation {
            sender: self.account,
            chain_id: self.chain.chain_id,
            call_data: self.scheme.pack_calls(calls),
        })
    }

    /// Request gas sponsorship from the chain's paymaster. Schemes that pay
    /// their own gas get an empty stamp without a network call.
    pub async fn sponsor(&self, operation: &UserOperation) -> WalletResult<SponsoredOperation> {
        let paymaster_and_data = if self.scheme.requires_sponsorship() {
            self.paymaster
                .sponsor_user_operation(
                    &self.chain.paymaster_url,
                    &self.chain.entry_point,
                    operation,
                )
                .await?
        } else {
            Bytes::new()
        };
        Ok(SponsoredOperation {
            operation: operation.clone(),
            paymaster_and_data,
        })
    }

    /// Sign and hand the sponsored operation to the bundler. Once accepted
    /// the operation is irrevocable.
    pub async fn submit(&self, sponsored: &SponsoredOperation) -> WalletResult<OperationHandle> {
        let digest_payload = ethers::abi::encode(&[
            Token::Address(sponsored.operation.sender),
            Token::Uint(U256::from(sponsored.operation.chain_id)),
            Token::Bytes(sponsored.operation.call_data.to_vec()),
            Token::Bytes(sponsored.paymaster_and_data.to_vec()),
        ]);
        let signature = self.validator.prove(&digest_payload).await?;

        let user_op_hash = self
            .bundler
            .send_user_operation(
                &self.chain.bundler_url,
                &self.chain.entry_point,
                sponsored,
                &signature,
            )
            .await?;
        log::info!(
            "Submitted operation {} on chain {}",
            user_op_hash,
            self.chain.chain_id
        );
        Ok(OperationHandle {
            user_op_hash,
            chain_id: self.chain.chain_id,
        })
    }

    /// Wait for the operation's receipt, bounded by the configured
    /// confirmation timeout. A timeout does not mean failure; the operation
    /// may still land, and a later balance refresh is the source of truth.
    pub async fn await_receipt(&self, handle: &OperationHandle) -> WalletResult<OperationReceipt> {
        let deadline = Instant::now() + self.confirmation_timeout;
        loop {
            match self
                .bundler
                .get_receipt(&self.chain.bundler_url, &handle.user_op_hash)
                .await
            {
                Ok(Some(receipt)) => {
                    if receipt.success {
                        return Ok(receipt);
                    }
                    return Err(WalletError::SubmissionRejected(format!(
                        "Operation {} reverted on-chain",
                        handle.user_op_hash
                    )));
                }
                Ok(None) => {}
                Err(e) => {
                    // Transient poll failures don't end the bounded wait
                    log::warn!("Receipt poll failed for {}: {}", handle.user_op_hash, e);
                }
            }
            if Instant::now() + self.poll_interval > deadline {
                return Err(WalletError::ConfirmationTimeout(
                    self.confirmation_timeout.as_secs(),
                ));
            }
            sleep(self.poll_interval).await;
        }
    }
}
