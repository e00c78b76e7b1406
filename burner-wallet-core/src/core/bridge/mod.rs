//! Cross-chain bridge transfers
//!
//! Extends the transfer machinery with bridge economics: the recipient gets
//! the input amount minus the configured flat bridge fee, and the source
//! chain sees one atomic sponsored operation batching the token approval
//! with the bridge deposit. The core's responsibility ends at successful
//! source-chain submission; the destination fill (bounded by the fill
//! deadline) is the external relayer's business, so only the source address
//! gets a balance refresh here.

use crate::core::balances::BalanceAggregator;
use crate::core::registry::Registry;
use crate::core::session::{encode_erc20_approve, SessionBuilder};
use crate::core::store::WalletStore;
use crate::core::transfer::StepCallback;
use crate::core::validator::ValidatorResolver;
use crate::shared::constants::BRIDGE_FILL_DEADLINE_SECS;
use crate::shared::error::WalletError;
use crate::shared::types::{BridgeRequest, OperationReceipt, TransferStep, WalletResult};
use crate::shared::utils::{format_token_amount, parse_token_amount};
use ethers::abi::Token;
use ethers::types::{Address, Bytes, U256};
use ethers::utils::keccak256;
use std::sync::Arc;

/// `depositV3` call data for the bridge deposit pool
#[allow(clippy::too_many_arguments)]
fn encode_deposit(
    depositor: Address,
    recipient: Address,
    input_token: Address,
    input_amount: U256,
    output_amount: U256,
    destination_chain_id: u64,
    quote_timestamp: u32,
) -> Bytes {
    let signature = "depositV3(address,address,address,address,uint256,uint256,uint256,address,uint32,uint32,uint32,bytes)";
    let mut data = keccak256(signature.as_bytes())[..4].to_vec();
    data.extend_from_slice(&ethers::abi::encode(&[
        Token::Address(depositor),
        Token::Address(recipient),
        Token::Address(input_token),
        // Zero output token asks the bridge to auto-resolve the
        // destination-chain contract
        Token::Address(Address::zero()),
        Token::Uint(input_amount),
        Token::Uint(output_amount),
        Token::Uint(U256::from(destination_chain_id)),
        // No exclusive relayer, no exclusivity window
        Token::Address(Address::zero()),
        Token::Uint(U256::from(quote_timestamp)),
        Token::Uint(U256::from(
            quote_timestamp as u64 + BRIDGE_FILL_DEADLINE_SECS,
        )),
        Token::Uint(U256::zero()),
        Token::Bytes(Vec::new()),
    ]));
    Bytes::from(data)
}

pub struct BridgeEngine {
    registry: Arc<Registry>,
    store: Arc<WalletStore>,
    resolver: Arc<ValidatorResolver>,
    sessions: Arc<SessionBuilder>,
    balances: Arc<BalanceAggregator>,
}

impl BridgeEngine {
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

    /// Net destination amount after the bridge fee
    pub fn compute_output(
        symbol: &str,
        decimals: u8,
        input: U256,
        fee: U256,
    ) -> WalletResult<U256> {
        if input <= fee {
            return Err(WalletError::AmountTooSmallForBridge {
                symbol: symbol.to_string(),
                amount: format_token_amount(input, decimals),
                fee: format_token_amount(fee, decimals),
            });
        }
        Ok(input - fee)
    }

    /// Execute a cross-chain transfer: approve + deposit as one sponsored
    /// batch on the source chain
    pub async fn bridge(
        &self,
        request: &BridgeRequest,
        on_step: Option<StepCallback<'_>>,
    ) -> WalletResult<OperationReceipt> {
        if let Some(step) = on_step {
            step(TransferStep::Preparing);
        }

        // All configuration and economics are settled before any network
        // call
        let source = self
            .registry
            .resolve(request.source_chain_id, &request.symbol)?;
        self.registry
            .resolve(request.destination_chain_id, &request.symbol)?;
        let pool = self.registry.bridge_pool(request.source_chain_id)?;
        let fee = self
            .registry
            .bridge_fee(&request.symbol, request.source_chain_id)?;

        let input_amount = parse_token_amount(&request.amount, source.token.decimals)?;
        let output_amount =
            Self::compute_output(&request.symbol, source.token.decimals, input_amount, fee)?;

        let wallet = self.store.get(&request.from)?;
        let validator = self.resolver.resolve(&wallet).await?;
        let session = self
            .sessions
            .build(validator, wallet.vendor, request.source_chain_id)?;

        let quote_timestamp = chrono::Utc::now().timestamp() as u32;
        let approve = session.encode_call(
            source.contract,
            encode_erc20_approve(pool, input_amount),
            U256::zero(),
        );
        let deposit = session.encode_call(
            pool,
            encode_deposit(
                request.from,
                request.to,
                source.contract,
                input_amount,
                output_amount,
                request.destination_chain_id,
                quote_timestamp,
            ),
            U256::zero(),
        );
        // Approval and deposit share one sponsored operation
        let operation = session.build_operation(&[approve, deposit])?;

        if let Some(step) = on_step {
            step(TransferStep::Confirming);
        }
        let sponsored = session.sponsor(&operation).await?;
        let handle = session.submit(&sponsored).await?;
        let receipt = session.await_receipt(&handle).await?;

        log::info!(
            "Bridge deposit of {} {} to chain {} submitted in {}",
            request.amount,
            request.symbol,
            request.destination_chain_id,
            receipt.transaction_hash
        );

        // Destination balance only moves once the relayer fills; refresh the
        // source side alone
        self.balances.refresh(&[request.from]).await;

        Ok(receipt)
    }
}
