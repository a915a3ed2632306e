use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use aangan_core::{DonationId, EngineError, EngineResult, Entity, ItemType, UserId};
use aangan_inventory::BucketKey;

/// A raw pledge of resources awaiting consolidation into inventory.
///
/// Created by the external donor-intake flow; mutated exactly once, from
/// unprocessed to processed, by the ingestor; immutable afterward.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Donation {
    id: DonationId,
    donor: Option<UserId>,
    item_type: ItemType,
    condition: String,
    /// Goods: unit count; money: smallest currency unit.
    quantity: i64,
    processed: bool,
    received_at: DateTime<Utc>,
}

impl Donation {
    pub fn new(
        id: DonationId,
        donor: Option<UserId>,
        item_type: ItemType,
        condition: impl Into<String>,
        quantity: i64,
        received_at: DateTime<Utc>,
    ) -> EngineResult<Self> {
        if quantity <= 0 {
            return Err(EngineError::validation(
                "donation quantity must be positive",
            ));
        }
        Ok(Self {
            id,
            donor,
            item_type,
            condition: condition.into(),
            quantity,
            processed: false,
            received_at,
        })
    }

    pub fn donor(&self) -> Option<UserId> {
        self.donor
    }

    pub fn item_type(&self) -> ItemType {
        self.item_type
    }

    pub fn condition(&self) -> &str {
        &self.condition
    }

    pub fn quantity(&self) -> i64 {
        self.quantity
    }

    pub fn is_processed(&self) -> bool {
        self.processed
    }

    pub fn received_at(&self) -> DateTime<Utc> {
        self.received_at
    }

    /// The inventory bucket this donation contributes to.
    pub fn bucket_key(&self) -> BucketKey {
        BucketKey::new(self.item_type, &self.condition)
    }

    /// Flip the one-way processed flag.
    ///
    /// The ingestor only visits unprocessed rows, so the duplicate branch is
    /// unreachable through `process_pending`; it is guarded here explicitly
    /// all the same.
    pub fn mark_processed(&mut self) -> EngineResult<()> {
        if self.processed {
            return Err(EngineError::DuplicateDonationProcessing(self.id));
        }
        self.processed = true;
        Ok(())
    }
}

impl Entity for Donation {
    type Id = DonationId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Intake store for donation records.
///
/// Insertion point for the external donor flow; the ingestor holds the lock
/// across an entire batch so crediting and flagging land as one logical step.
#[derive(Debug, Default)]
pub struct DonationQueue {
    donations: Mutex<Vec<Donation>>,
}

impl DonationQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a received donation. Duplicate ids are rejected.
    pub fn push(&self, donation: Donation) -> EngineResult<()> {
        let mut donations = self
            .donations
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if donations.iter().any(|d| d.id() == donation.id()) {
            return Err(EngineError::validation(format!(
                "donation {} already recorded",
                donation.id()
            )));
        }
        donations.push(donation);
        Ok(())
    }

    pub fn unprocessed_count(&self) -> usize {
        self.donations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|d| !d.is_processed())
            .count()
    }

    /// Run `f` with exclusive access to the backing records.
    pub(crate) fn with_records<T>(&self, f: impl FnOnce(&mut Vec<Donation>) -> T) -> T {
        let mut donations = self
            .donations
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        f(&mut donations)
    }
}
