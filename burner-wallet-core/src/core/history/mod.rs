//! Activity history aggregation
//!
//! Fetches per-address activity from the indexer with the same serialized,
//! throttled discipline as the balance aggregator, keeps only records that
//! touch a registered token contract (a relevance filter, not a correctness
//! filter), and serves them sorted newest-first.

use crate::core::registry::Registry;
use crate::domain::entities::ActivityRecord;
use crate::infrastructure::rpc::IndexerApi;
use crate::shared::constants::{BROADCAST_CAPACITY, INDEXER_CALL_INTERVAL_MS};
use ethers::types::Address;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, RwLock};
use tokio::time::sleep;

/// Notification sent after a history refresh completes
#[derive(Debug, Clone)]
pub struct HistoryUpdated {
    pub addresses: Vec<Address>,
    pub failed_slices: usize,
}

pub struct HistoryAggregator {
    registry: Arc<Registry>,
    indexer: Arc<dyn IndexerApi>,
    in_flight: AtomicBool,
    cache: RwLock<HashMap<Address, Vec<ActivityRecord>>>,
    events: broadcast::Sender<HistoryUpdated>,
    call_interval: Duration,
}

impl HistoryAggregator {
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
    pub fn subscribe(&self) -> broadcast::Receiver<HistoryUpdated> {
        self.events.subscribe()
    }

    /// Last fetched activity for `address`, newest first
    pub async fn get_last(&self, address: &Address) -> Vec<ActivityRecord> {
        self.cache
            .read()
            .await
            .get(address)
            .cloned()
            .unwrap_or_default()
    }

    /// Refresh history for `addresses`, one serialized fetch per address.
    /// Failed fetches leave the previous data in place.
    pub async fn refresh(&self, addresses: &[Address]) {
        if addresses.is_empty() {
            return;
        }
        if self.in_flight.swap(true, Ordering::SeqCst) {
            log::debug!("History refresh already in flight; dropping request");
            return;
        }

        let mut updated = Vec::new();
        let mut failed_slices = 0usize;

        for (i, address) in addresses.iter().enumerate() {
            if i > 0 {
                sleep(self.call_interval).await;
            }
            match self.indexer.fetch_history(address).await {
                Ok(records) => {
                    let relevant = self.filter_and_sort(records);
                    self.cache.write().await.insert(*address, relevant);
                    updated.push(*address);
                }
                Err(e) => {
                    failed_slices += 1;
                    log::warn!("History fetch failed for {:#x}: {}", address, e);
                }
            }
        }

        self.in_flight.store(false, Ordering::SeqCst);

        let _ = self.events.send(HistoryUpdated {
            addresses: updated,
            failed_slices,
        });
    }

    /// Keep records referencing at least one registered contract
    /// (case-insensitive) and sort newest first; ties keep indexer order.
    fn filter_and_sort(&self, mut records: Vec<ActivityRecord>) -> Vec<ActivityRecord> {
        records.retain(|record| {
            record
                .token_actions
                .iter()
                .any(|action| self.registry.is_registered_contract(&action.contract_address))
        });
        // Vec::sort_by is stable
        records.sort_by(|a, b| b.timestamp_ms.cmp(&a.timestamp_ms));
        records
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::testkit::MockIndexer;
    use crate::domain::entities::{ActionDirection, TokenAction};

    const USDC_BASE: &str = "0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913";

    fn record(tx_hash: &str, timestamp_ms: u64, contract: &str) -> ActivityRecord {
        ActivityRecord {
            tx_hash: tx_hash.to_string(),
            chain_id: 8453,
            timestamp_ms,
            token_actions: vec![TokenAction {
                contract_address: contract.to_string(),
                raw_amount: "1000000".to_string(),
                direction: ActionDirection::In,
            }],
        }
    }

    fn aggregator(indexer: Arc<MockIndexer>) -> HistoryAggregator {
        let registry = Arc::new(Registry::builtin().expect("Failed to build registry"));
        HistoryAggregator::with_interval(registry, indexer, Duration::from_millis(0))
    }

    #[tokio::test]
    async fn test_records_sorted_descending() {
        let indexer = Arc::new(MockIndexer::new());
        let address = Address::repeat_byte(1);
        indexer.set_history(
            address,
            vec![
                record("0xa", 100, USDC_BASE),
                record("0xb", 300, USDC_BASE),
                record("0xc", 200, USDC_BASE),
            ],
        );

        let aggregator = aggregator(indexer);
        aggregator.refresh(&[address]).await;

        let timestamps: Vec<u64> = aggregator
            .get_last(&address)
            .await
            .iter()
            .map(|r| r.timestamp_ms)
            .collect();
        assert_eq!(timestamps, vec![300, 200, 100]);
    }

    #[tokio::test]
    async fn test_ties_keep_indexer_order() {
        let indexer = Arc::new(MockIndexer::new());
        let address = Address::repeat_byte(2);
        indexer.set_history(
            address,
            vec![
                record("0xfirst", 500, USDC_BASE),
                record("0xsecond", 500, USDC_BASE),
            ],
        );

        let aggregator = aggregator(indexer);
        aggregator.refresh(&[address]).await;

        let hashes: Vec<String> = aggregator
            .get_last(&address)
            .await
            .iter()
            .map(|r| r.tx_hash.clone())
            .collect();
        assert_eq!(hashes, vec!["0xfirst", "0xsecond"]);
    }

    #[tokio::test]
    async fn test_unregistered_contracts_are_dropped() {
        let indexer = Arc::new(MockIndexer::new());
        let address = Address::repeat_byte(3);
        indexer.set_history(
            address,
            vec![
                record("0xkeep", 100, &USDC_BASE.to_uppercase().replace("0X", "0x")),
                record(
                    "0xdrop",
                    200,
                    "0x0000000000000000000000000000000000000042",
                ),
            ],
        );

        let aggregator = aggregator(indexer);
        aggregator.refresh(&[address]).await;

        let records = aggregator.get_last(&address).await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].tx_hash, "0xkeep");
    }

    #[tokio::test]
    async fn test_failed_fetch_keeps_previous_records() {
        let indexer = Arc::new(MockIndexer::new());
        let address = Address::repeat_byte(4);
        indexer.set_history(address, vec![record("0xa", 100, USDC_BASE)]);

        let aggregator = aggregator(indexer.clone());
        aggregator.refresh(&[address]).await;
        assert_eq!(aggregator.get_last(&address).await.len(), 1);

        indexer.fail_history(true);
        let mut events = aggregator.subscribe();
        aggregator.refresh(&[address]).await;

        // Stale data survives and the failure is surfaced in aggregate
        assert_eq!(aggregator.get_last(&address).await.len(), 1);
        let notice = events.recv().await.expect("No notification received");
        assert!(notice.addresses.is_empty());
        assert_eq!(notice.failed_slices, 1);
    }

    #[tokio::test]
    async fn test_per_address_fetches_serialize_in_one_batch() {
        let indexer = Arc::new(MockIndexer::new());
        let a = Address::repeat_byte(6);
        let b = Address::repeat_byte(7);

        let aggregator = aggregator(indexer.clone());
        aggregator.refresh(&[a, b]).await;
        assert_eq!(indexer.history_calls(), 2);
    }
}
