//! Balance aggregation
//!
//! Fans out across every configured chain for each requested address,
//! strictly sequentially: the indexer rate-limits hard and there is no retry
//! policy, so calls are spaced by a fixed delay and never issued in
//! parallel. A process-wide guard drops (not queues) refreshes that arrive
//! while a cycle is running. Consumers read the cache through `get_last` and
//! are notified through the broadcast channel; failed slices degrade to the
//! previous (stale) data instead of failing the cycle.

use crate::core::registry::Registry;
use crate::domain::entities::Balance;
use crate::infrastructure::rpc::IndexerApi;
use crate::shared::constants::{BROADCAST_CAPACITY, INDEXER_CALL_INTERVAL_MS};
use crate::shared::utils::format_token_amount;
use ethers::types::{Address, U256};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, RwLock};
use tokio::time::sleep;

/// Notification sent after a refresh cycle completes
#[derive(Debug, Clone)]
pub struct BalancesUpdated {
    /// Addresses whose cache entries changed this cycle
    pub addresses: Vec<Address>,
    /// Number of (address, chain) slices that failed and were left stale
    pub failed_slices: usize,
}

pub struct BalanceAggregator {
    registry: Arc<Registry>,
    indexer: Arc<dyn IndexerApi>,
    in_flight: AtomicBool,
    cache: RwLock<HashMap<Address, Vec<Balance>>>,
    events: broadcast::Sender<BalancesUpdated>,
    call_interval: Duration,
}

impl BalanceAggregator {
    pub fn new(registry: Arc<Registry>, indexer: Arc<dyn IndexerApi>) -> Self {
        Self::with_interval(
            registry,
            indexer,
            Duration::from_millis(INDEXER_CALL_INTERVAL_MS),
        )
    }

    /// Override the inter-call delay (tests)
    pub fn with_interval(
        registry: Arc<Registry>,
        indexer: Arc<dyn IndexerApi>,
        call_interval: Duration,
    ) -> Self {
        let (events, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self {
            registry,
            indexer,
            in_flight: AtomicBool::new(false),
            cache: RwLock::new(HashMap::new()),
            events,
            call_interval,
        }
    }

    /// Subscribe to refresh notifications
    pub fn subscribe(&self) -> broadcast::Receiver<BalancesUpdated> {
        self.events.subscribe()
    }

    /// Last successfully fetched balances for `address`
    pub async fn get_last(&self, address: &Address) -> Vec<Balance> {
        self.cache
            .read()
            .await
            .get(address)
            .cloned()
            .unwrap_or_default()
    }

    /// Refresh balances for `addresses` across every configured chain.
    ///
    /// At most one cycle runs at a time; a call arriving while one is in
    /// flight is dropped. Per-slice failures are swallowed and logged, and
    /// the cycle notifies subscribers for whatever succeeded.
    pub async fn refresh(&self, addresses: &[Address]) {
        if addresses.is_empty() {
            return;
        }
        if self.in_flight.swap(true, Ordering::SeqCst) {
            log::debug!("Balance refresh already in flight; dropping request");
            return;
        }

        let mut updated = Vec::new();
        let mut failed_slices = 0usize;
        let mut first_call = true;

        for address in addresses {
            let mut fresh: Vec<Balance> = Vec::new();
            let mut failed_chains: Vec<u64> = Vec::new();

            for chain in self.registry.chains() {
                if !first_call {
                    sleep(self.call_interval).await;
                }
                first_call = false;

                match self.indexer.fetch_balances(address, chain.chain_id).await {
                    Ok(holdings) => {
                        fresh.extend(self.convert(address, chain.chain_id, holdings));
                    }
                    Err(e) => {
                        failed_slices += 1;
                        failed_chains.push(chain.chain_id);
                        log::warn!(
                            "Balance fetch failed for {:#x} on chain {}: {}",
                            address,
                            chain.chain_id,
                            e
                        );
                    }
                }
            }

            let mut cache = self.cache.write().await;
            // Failed chains keep their previous slices; everything else is
            // superseded, not merged
            if let Some(previous) = cache.get(address) {
                for balance in previous {
                    if failed_chains.contains(&balance.chain_id) {
                        fresh.push(balance.clone());
                    }
                }
            }
            cache.insert(*address, fresh);
            updated.push(*address);
        }

        self.in_flight.store(false, Ordering::SeqCst);

        let notice = BalancesUpdated {
            addresses: updated,
            failed_slices,
        };
        log::info!(
            "Balance refresh complete for {} address(es), {} failed slice(s)",
            notice.addresses.len(),
            notice.failed_slices
        );
        // No subscribers is fine
        let _ = self.events.send(notice);
    }

    /// Keep only registry tokens and convert raw units with the registry's
    /// declared decimals
    fn convert(
        &self,
        address: &Address,
        chain_id: u64,
        holdings: Vec<crate::infrastructure::rpc::TokenHolding>,
    ) -> Vec<Balance> {
        let mut balances = Vec::new();
        for holding in holdings {
            let token = match self.registry.token_for_contract(chain_id, &holding.address) {
                Some(t) => t,
                None => continue,
            };
            let raw = match U256::from_dec_str(&holding.balance) {
                Ok(r) => r,
                Err(e) => {
                    log::debug!(
                        "Skipping unparseable balance {} for {}: {}",
                        holding.balance,
                        token.symbol,
                        e
                    );
                    continue;
                }
            };
            balances.push(Balance {
                address: *address,
                chain_id,
                symbol: token.symbol.clone(),
                raw,
                amount: format_token_amount(raw, token.decimals),
            });
        }
        balances
    }
}
