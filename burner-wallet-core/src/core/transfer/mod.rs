//! Same-chain token transfers
//!
//! Drives a transfer through input -> preparing -> confirming -> done,
//! surfacing each forward transition through the step callback. Any failure
//! moves to failed and travels on the error channel instead; the callback
//! never fires for it. The operation is atomic from the caller's point of
//! view: balances are only refreshed after a successful receipt.

use crate::core::balances::BalanceAggregator;
use crate::core::registry::Registry;
use crate::core::session::{encode_erc20_transfer, SessionBuilder};
use crate::core::store::WalletStore;
use crate::core::validator::ValidatorResolver;
use crate::shared::error::WalletError;
use crate::shared::types::{OperationReceipt, TransferRequest, TransferStep, WalletResult};
use crate::shared::utils::parse_token_amount;
use ethers::types::U256;
use std::sync::Arc;

/// UI progress callback; fired once per forward transition
pub type StepCallback<'a> = &'a (dyn Fn(TransferStep) + Send + Sync);

pub struct TransferEngine {
    registry: Arc<Registry>,
    store: Arc<WalletStore>,
    resolver: Arc<ValidatorResolver>,
    sessions: Arc<SessionBuilder>,
    balances: Arc<BalanceAggregator>,
}

impl TransferEngine {
    pub fn new(
        registry: Arc<Registry>,
        store: Arc<WalletStore>,
        resolver: Arc<ValidatorResolver>,
        sessions: Arc<SessionBuilder>,
        balances: Arc<BalanceAggregator>,
    ) -> Self {
        Self {
            registry,
            store,
            resolver,
            sessions,
            balances,
        }
    }

    /// Execute a same-chain ERC-20 transfer as one sponsored operation
    pub async fn transfer(
        &self,
        request: &TransferRequest,
        on_step: Option<StepCallback<'_>>,
    ) -> WalletResult<OperationReceipt> {
        if let Some(step) = on_step {
            step(TransferStep::Preparing);
        }

        // Configuration and input validation, before any network call
        let resolved = self
            .registry
            .resolve(request.source_chain_id, &request.symbol)?;
        let raw_amount = parse_token_amount(&request.amount, resolved.token.decimals)?;

        let wallet = self.store.get(&request.from)?;
        let validator = self.resolver.resolve(&wallet).await?;
        let session = self
            .sessions
            .build(validator, wallet.vendor, request.source_chain_id)?;
        if session.account() != request.from {
            return Err(WalletError::validation(format!(
                "Wallet {:#x} does not control account {:#x}",
                request.from,
                session.account()
            )));
        }

        let call = session.encode_call(
            resolved.contract,
            encode_erc20_transfer(request.to, raw_amount),
            U256::zero(),
        );
        let operation = session.build_operation(std::slice::from_ref(&call))?;

        if let Some(step) = on_step {
            step(TransferStep::Confirming);
        }
        let sponsored = session.sponsor(&operation).await?;
        let handle = session.submit(&sponsored).await?;
        let receipt = session.await_receipt(&handle).await?;

        log::info!(
            "Transfer of {} {} complete in {}",
            request.amount,
            request.symbol,
            receipt.transaction_hash
        );

        // Both sides of the transfer need fresh balances
        self.balances.refresh(&[request.from, request.to]).await;

        Ok(receipt)
    }
}
