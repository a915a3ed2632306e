use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use aangan_core::EngineResult;
use aangan_inventory::{BucketKey, InventoryLedger};

use crate::donation::DonationQueue;

/// One bucket's credit total from a processed batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketCredit {
    pub key: BucketKey,
    pub amount: i64,
}

/// Outcome of one `process_pending` run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessedBatch {
    pub processed_count: u64,
    pub credits: Vec<BucketCredit>,
}

/// Folds unprocessed donations into the inventory ledger.
///
/// Batch semantics: group by bucket, credit once per group, flag every
/// consumed donation processed — all under the queue lock, so a concurrent
/// run cannot consume the same donation twice. Idempotent: processed rows
/// are never revisited, so a re-run with no new donations is a no-op.
#[derive(Debug)]
pub struct DonationIngestor {
    queue: Arc<DonationQueue>,
    ledger: Arc<InventoryLedger>,
}

impl DonationIngestor {
    pub fn new(queue: Arc<DonationQueue>, ledger: Arc<InventoryLedger>) -> Self {
        Self { queue, ledger }
    }

    pub fn process_pending(&self) -> EngineResult<ProcessedBatch> {
        self.queue.with_records(|donations| {
            let mut groups: HashMap<BucketKey, i64> = HashMap::new();
            for donation in donations.iter().filter(|d| !d.is_processed()) {
                *groups.entry(donation.bucket_key()).or_insert(0) += donation.quantity();
            }

            for (key, amount) in &groups {
                self.ledger.credit(key, *amount)?;
            }

            let mut processed_count = 0u64;
            for donation in donations.iter_mut().filter(|d| !d.is_processed()) {
                donation.mark_processed()?;
                processed_count += 1;
            }

            let mut credits: Vec<BucketCredit> = groups
                .into_iter()
                .map(|(key, amount)| BucketCredit { key, amount })
                .collect();
            credits.sort_by(|a, b| a.key.to_string().cmp(&b.key.to_string()));

            if processed_count > 0 {
                info!(processed_count, buckets = credits.len(), "donation batch folded into inventory");
            }

            Ok(ProcessedBatch {
                processed_count,
                credits,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    use aangan_core::{DonationId, ItemType};
    use crate::donation::Donation;

    fn donation(item_type: ItemType, condition: &str, quantity: i64) -> Donation {
        Donation::new(DonationId::new(), None, item_type, condition, quantity, Utc::now()).unwrap()
    }

    fn setup() -> (Arc<DonationQueue>, Arc<InventoryLedger>, DonationIngestor) {
        let queue = Arc::new(DonationQueue::new());
        let ledger = Arc::new(InventoryLedger::new());
        let ingestor = DonationIngestor::new(Arc::clone(&queue), Arc::clone(&ledger));
        (queue, ledger, ingestor)
    }

    #[test]
    fn groups_donations_into_one_credit_per_bucket() {
        let (queue, ledger, ingestor) = setup();
        queue.push(donation(ItemType::Books, "good", 10)).unwrap();
        queue.push(donation(ItemType::Books, "good", 15)).unwrap();

        let batch = ingestor.process_pending().unwrap();
        assert_eq!(batch.processed_count, 2);
        assert_eq!(batch.credits.len(), 1);
        assert_eq!(batch.credits[0].amount, 25);

        let key = BucketKey::new(ItemType::Books, "good");
        assert_eq!(ledger.available(&key), 25);
        assert_eq!(ledger.snapshot().len(), 1);
    }

    #[test]
    fn second_run_with_no_new_donations_is_a_no_op() {
        let (queue, ledger, ingestor) = setup();
        queue.push(donation(ItemType::Books, "good", 10)).unwrap();
        queue.push(donation(ItemType::Books, "good", 15)).unwrap();
        ingestor.process_pending().unwrap();

        let batch = ingestor.process_pending().unwrap();
        assert_eq!(batch.processed_count, 0);
        assert!(batch.credits.is_empty());

        // Ledger unchanged.
        assert_eq!(ledger.available(&BucketKey::new(ItemType::Books, "good")), 25);
    }

    #[test]
    fn only_unprocessed_donations_are_consumed() {
        let (queue, ledger, ingestor) = setup();
        queue.push(donation(ItemType::Toys, "new", 4)).unwrap();
        ingestor.process_pending().unwrap();

        queue.push(donation(ItemType::Toys, "new", 6)).unwrap();
        let batch = ingestor.process_pending().unwrap();

        assert_eq!(batch.processed_count, 1);
        assert_eq!(ledger.available(&BucketKey::new(ItemType::Toys, "new")), 10);
        assert_eq!(queue.unprocessed_count(), 0);
    }

    #[test]
    fn distinct_conditions_land_in_distinct_buckets() {
        let (queue, ledger, ingestor) = setup();
        queue.push(donation(ItemType::Clothes, "new", 5)).unwrap();
        queue.push(donation(ItemType::Clothes, "used", 7)).unwrap();

        let batch = ingestor.process_pending().unwrap();
        assert_eq!(batch.processed_count, 2);
        assert_eq!(batch.credits.len(), 2);
        assert_eq!(ledger.available(&BucketKey::new(ItemType::Clothes, "new")), 5);
        assert_eq!(ledger.available(&BucketKey::new(ItemType::Clothes, "used")), 7);
    }

    #[test]
    fn money_donations_pool_regardless_of_condition() {
        let (queue, ledger, ingestor) = setup();
        queue.push(donation(ItemType::Money, "cash", 50_000)).unwrap();
        queue
            .push(donation(ItemType::Money, "bank transfer", 30_000))
            .unwrap();

        let batch = ingestor.process_pending().unwrap();
        assert_eq!(batch.processed_count, 2);
        assert_eq!(batch.credits.len(), 1);
        assert_eq!(ledger.available(&BucketKey::new(ItemType::Money, "")), 80_000);
    }
}
