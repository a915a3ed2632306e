use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use serde::{Deserialize, Serialize};

use aangan_core::{EngineError, EngineResult, ItemType, Shortfall, ValueObject};

/// Key of an inventory bucket: (item type, normalized specification).
///
/// This is the single owner of the normalization rule: specifications are
/// trimmed and lowercased, and money is always pooled under the empty
/// specification — the monetary pool is fungible, so a donation's condition
/// text must not split it and a request's purpose stays informational.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BucketKey {
    item_type: ItemType,
    specification: String,
}

impl BucketKey {
    pub fn new(item_type: ItemType, specification: &str) -> Self {
        let specification = if item_type.is_money() {
            String::new()
        } else {
            specification.trim().to_lowercase()
        };
        Self {
            item_type,
            specification,
        }
    }

    pub fn item_type(&self) -> ItemType {
        self.item_type
    }

    pub fn specification(&self) -> &str {
        &self.specification
    }
}

impl ValueObject for BucketKey {}

impl core::fmt::Display for BucketKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        if self.specification.is_empty() {
            write!(f, "{}", self.item_type)
        } else {
            write!(f, "{}/{}", self.item_type, self.specification)
        }
    }
}

/// Stock counters for one bucket.
///
/// Invariant: `0 <= allocated <= total` at all times. `available` is always
/// derived, never stored.
#[derive(Debug, Default)]
struct Bucket {
    total: i64,
    allocated: i64,
}

impl Bucket {
    fn available(&self) -> i64 {
        self.total - self.allocated
    }
}

/// Read-only view of one bucket for display surfaces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketSnapshot {
    pub item_type: ItemType,
    pub specification: String,
    pub total: i64,
    pub allocated: i64,
    /// Derived: `total - allocated`.
    pub available: i64,
}

/// The shared pool of donated stock, keyed by (item type, specification).
///
/// The single source of truth for "how much is free to promise". Buckets are
/// created on first credit and never deleted — a zero-stock bucket is
/// history, not garbage.
///
/// Concurrency: the outer map is read-locked on the hot paths; each bucket
/// carries its own mutex, so two reservations against the same bucket are
/// serialized and the check-then-increment in `reserve` is atomic. Credits
/// take the map write lock only because they may create the bucket.
#[derive(Debug, Default)]
pub struct InventoryLedger {
    buckets: RwLock<HashMap<BucketKey, Arc<Mutex<Bucket>>>>,
}

impl InventoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Units currently free to promise for `key`; 0 if the bucket is absent.
    pub fn available(&self, key: &BucketKey) -> i64 {
        let buckets = self
            .buckets
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        match buckets.get(key) {
            Some(bucket) => bucket
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .available(),
            None => 0,
        }
    }

    /// Atomically check-and-allocate `amount` units from `key`.
    ///
    /// On success the bucket's `allocated` counter grows by `amount`; on
    /// shortfall nothing changes and the gap is reported.
    pub fn reserve(&self, key: &BucketKey, amount: i64) -> EngineResult<()> {
        Self::ensure_positive(amount)?;

        let buckets = self
            .buckets
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        let Some(bucket) = buckets.get(key) else {
            return Err(EngineError::insufficient(vec![Shortfall {
                item_type: key.item_type(),
                specification: key.specification().to_string(),
                requested: amount,
                available: 0,
            }]));
        };

        let mut bucket = bucket.lock().unwrap_or_else(PoisonError::into_inner);
        if bucket.available() < amount {
            return Err(EngineError::insufficient(vec![Shortfall {
                item_type: key.item_type(),
                specification: key.specification().to_string(),
                requested: amount,
                available: bucket.available(),
            }]));
        }

        bucket.allocated += amount;
        Ok(())
    }

    /// Undo a reservation: decrement `allocated` by `amount`, clamped at 0.
    ///
    /// Releasing against an absent bucket is a no-op — there is nothing to
    /// undo.
    pub fn release(&self, key: &BucketKey, amount: i64) -> EngineResult<()> {
        Self::ensure_positive(amount)?;

        let buckets = self
            .buckets
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(bucket) = buckets.get(key) {
            let mut bucket = bucket.lock().unwrap_or_else(PoisonError::into_inner);
            bucket.allocated = (bucket.allocated - amount).max(0);
        }
        Ok(())
    }

    /// Add `amount` donated units to `key`, creating the bucket on first
    /// credit with nothing allocated.
    pub fn credit(&self, key: &BucketKey, amount: i64) -> EngineResult<()> {
        Self::ensure_positive(amount)?;

        let mut buckets = self
            .buckets
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let bucket = buckets.entry(key.clone()).or_default();
        let mut bucket = bucket.lock().unwrap_or_else(PoisonError::into_inner);
        bucket.total += amount;
        Ok(())
    }

    /// Read-only listing of all buckets, ordered for stable display.
    pub fn snapshot(&self) -> Vec<BucketSnapshot> {
        let buckets = self
            .buckets
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        let mut rows: Vec<BucketSnapshot> = buckets
            .iter()
            .map(|(key, bucket)| {
                let bucket = bucket.lock().unwrap_or_else(PoisonError::into_inner);
                BucketSnapshot {
                    item_type: key.item_type(),
                    specification: key.specification().to_string(),
                    total: bucket.total,
                    allocated: bucket.allocated,
                    available: bucket.available(),
                }
            })
            .collect();
        rows.sort_by(|a, b| {
            (a.item_type.as_str(), a.specification.as_str())
                .cmp(&(b.item_type.as_str(), b.specification.as_str()))
        });
        rows
    }

    fn ensure_positive(amount: i64) -> EngineResult<()> {
        if amount <= 0 {
            return Err(EngineError::validation("amount must be positive"));
        }
        Ok(())
    }
}
