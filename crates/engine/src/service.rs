use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use chrono::Utc;
use tracing::{info, warn};

use aangan_appeals::{
    Appeal, AppealCommand, ApproveAppeal, FulfillAppeal, RejectAppeal, StartReview, SubmitAppeal,
};
use aangan_core::{
    Aggregate, AppealId, CenterId, EngineError, EngineResult, ItemType, Shortfall, UserId,
};
use aangan_donations::{Donation, DonationIngestor, DonationQueue, ProcessedBatch};
use aangan_events::{EventBus, Notification};
use aangan_inventory::{BucketKey, BucketSnapshot, InventoryLedger};

/// The allocation engine.
///
/// Owns the only mutable state in the system: the appeal repository, the
/// inventory ledger and the donation queue. All mutation flows through the
/// operations below; callers get clones of appeal state, never references
/// into the repository.
///
/// Notifications are fire-and-forget: a publish failure is logged and the
/// already-committed state change stands.
#[derive(Debug)]
pub struct AppealEngine<B> {
    ledger: Arc<InventoryLedger>,
    queue: Arc<DonationQueue>,
    ingestor: DonationIngestor,
    appeals: RwLock<HashMap<AppealId, Appeal>>,
    bus: B,
}

impl<B> AppealEngine<B>
where
    B: EventBus<Notification>,
{
    pub fn new(bus: B) -> Self {
        let ledger = Arc::new(InventoryLedger::new());
        let queue = Arc::new(DonationQueue::new());
        let ingestor = DonationIngestor::new(Arc::clone(&queue), Arc::clone(&ledger));
        Self {
            ledger,
            queue,
            ingestor,
            appeals: RwLock::new(HashMap::new()),
            bus,
        }
    }

    /// The shared ledger (read access for display; mutation stays internal
    /// to reserve/release/credit flows).
    pub fn ledger(&self) -> &InventoryLedger {
        &self.ledger
    }

    // ---- appeal lifecycle -------------------------------------------------

    /// Record a center's appeal. Submission is intent only: the ledger is
    /// never consulted, so a request exceeding current stock is still
    /// accepted for a reviewer to judge.
    pub fn submit(&self, cmd: SubmitAppeal) -> EngineResult<Appeal> {
        let mut appeals = self.appeals.write().unwrap_or_else(PoisonError::into_inner);
        if appeals.contains_key(&cmd.appeal_id) {
            return Err(EngineError::validation("appeal id already in use"));
        }

        let appeal_id = cmd.appeal_id;
        let center_id = cmd.center_id;
        let mut appeal = Appeal::empty(appeal_id);
        let events = appeal.handle(&AppealCommand::SubmitAppeal(cmd))?;
        for event in &events {
            appeal.apply(event);
        }
        appeals.insert(appeal_id, appeal.clone());

        info!(%appeal_id, %center_id, items = appeal.items().len(), "appeal submitted");
        Ok(appeal)
    }

    /// Move a pending appeal into review.
    pub fn mark_under_review(&self, appeal_id: AppealId, reviewer: UserId) -> EngineResult<Appeal> {
        let appeal = self.transition(
            appeal_id,
            AppealCommand::StartReview(StartReview {
                appeal_id,
                reviewer,
                occurred_at: Utc::now(),
            }),
        )?;
        info!(%appeal_id, %reviewer, "appeal moved under review");
        Ok(appeal)
    }

    /// Approve an appeal under review, reserving stock for every requested
    /// item.
    ///
    /// All-or-nothing: if any single reservation fails, every reservation
    /// taken by this call is released, the appeal stays `under_review`, and
    /// the shortfall is reported per item so the reviewer can trim the
    /// request or reject.
    pub fn approve(
        &self,
        appeal_id: AppealId,
        reviewer: UserId,
        comment: impl Into<String>,
    ) -> EngineResult<Appeal> {
        let cmd = AppealCommand::ApproveAppeal(ApproveAppeal {
            appeal_id,
            reviewer,
            comment: comment.into(),
            occurred_at: Utc::now(),
        });

        // Check the transition and capture demands before touching the
        // ledger; an appeal that is not under review never reserves anything.
        let demands: Vec<(BucketKey, i64)> = {
            let appeals = self.appeals.read().unwrap_or_else(PoisonError::into_inner);
            let appeal = appeals
                .get(&appeal_id)
                .ok_or_else(EngineError::appeal_not_found)?;
            appeal.handle(&cmd)?;
            appeal.items().iter().map(|item| item.demand()).collect()
        };

        // Reserve item by item; unwind on the first shortfall.
        let mut reserved: Vec<(BucketKey, i64)> = Vec::with_capacity(demands.len());
        for (key, amount) in &demands {
            match self.ledger.reserve(key, *amount) {
                Ok(()) => reserved.push((key.clone(), *amount)),
                Err(err) => {
                    self.release_all(&reserved);
                    let err = self.shortfall_report(&demands, err);
                    warn!(%appeal_id, %reviewer, %err, "approval failed, reservations rolled back");
                    return Err(err);
                }
            }
        }

        // Commit the transition, re-validating under the write lock in case
        // the appeal changed state while reservations were taken.
        let committed = {
            let mut appeals = self.appeals.write().unwrap_or_else(PoisonError::into_inner);
            let appeal = appeals
                .get_mut(&appeal_id)
                .ok_or_else(EngineError::appeal_not_found)?;
            appeal.handle(&cmd).map(|events| {
                for event in &events {
                    appeal.apply(event);
                }
                appeal.clone()
            })
        };

        match committed {
            Ok(appeal) => {
                if let Some(center_id) = appeal.center_id() {
                    self.notify(Notification::AppealApproved {
                        appeal_id,
                        center_id,
                        occurred_at: Utc::now(),
                    });
                }
                info!(%appeal_id, %reviewer, "appeal approved, stock reserved");
                Ok(appeal)
            }
            Err(err) => {
                // Lost a race with a concurrent transition; undo our
                // reservations.
                self.release_all(&reserved);
                warn!(%appeal_id, %err, "approval lost transition race, reservations rolled back");
                Err(err)
            }
        }
    }

    /// Reject an appeal from `pending` or `under_review`. Terminal; no
    /// inventory interaction.
    pub fn reject(
        &self,
        appeal_id: AppealId,
        reviewer: UserId,
        comment: impl Into<String>,
    ) -> EngineResult<Appeal> {
        let appeal = self.transition(
            appeal_id,
            AppealCommand::RejectAppeal(RejectAppeal {
                appeal_id,
                reviewer,
                comment: comment.into(),
                occurred_at: Utc::now(),
            }),
        )?;
        if let Some(center_id) = appeal.center_id() {
            self.notify(Notification::AppealRejected {
                appeal_id,
                center_id,
                occurred_at: Utc::now(),
            });
        }
        info!(%appeal_id, %reviewer, "appeal rejected");
        Ok(appeal)
    }

    /// Mark the physical/financial handover of an approved appeal complete.
    /// Terminal; allocation already happened at approval.
    pub fn fulfill(&self, appeal_id: AppealId, actor: UserId) -> EngineResult<Appeal> {
        let appeal = self.transition(
            appeal_id,
            AppealCommand::FulfillAppeal(FulfillAppeal {
                appeal_id,
                actor,
                occurred_at: Utc::now(),
            }),
        )?;
        info!(%appeal_id, "appeal fulfilled");
        Ok(appeal)
    }

    // ---- donations --------------------------------------------------------

    /// Record a raw donation from the donor-intake flow.
    pub fn receive_donation(&self, donation: Donation) -> EngineResult<()> {
        self.queue.push(donation)
    }

    /// Fold all unprocessed donations into the ledger. Operator/cron
    /// triggered; idempotent.
    pub fn process_pending(&self) -> EngineResult<ProcessedBatch> {
        let batch = self.ingestor.process_pending()?;
        if batch.processed_count > 0 {
            self.notify(Notification::DonationBatchProcessed {
                processed_count: batch.processed_count,
                occurred_at: Utc::now(),
            });
        }
        Ok(batch)
    }

    // ---- read-only queries ------------------------------------------------

    pub fn get_appeal(&self, appeal_id: AppealId) -> EngineResult<Appeal> {
        let appeals = self.appeals.read().unwrap_or_else(PoisonError::into_inner);
        appeals
            .get(&appeal_id)
            .cloned()
            .ok_or_else(EngineError::appeal_not_found)
    }

    /// List appeals, optionally restricted to one center, newest first.
    pub fn list_appeals(&self, center: Option<CenterId>) -> Vec<Appeal> {
        let appeals = self.appeals.read().unwrap_or_else(PoisonError::into_inner);
        let mut rows: Vec<Appeal> = appeals
            .values()
            .filter(|a| center.is_none() || a.center_id() == center)
            .cloned()
            .collect();
        rows.sort_by_key(|a| std::cmp::Reverse(*a.id_typed().as_uuid()));
        rows
    }

    /// Units free to promise for (item type, specification); 0 if absent.
    pub fn available(&self, item_type: ItemType, specification: &str) -> i64 {
        self.ledger.available(&BucketKey::new(item_type, specification))
    }

    pub fn inventory_snapshot(&self) -> Vec<BucketSnapshot> {
        self.ledger.snapshot()
    }

    // ---- internals --------------------------------------------------------

    /// Apply a single pure transition command under the write lock.
    fn transition(&self, appeal_id: AppealId, cmd: AppealCommand) -> EngineResult<Appeal> {
        let mut appeals = self.appeals.write().unwrap_or_else(PoisonError::into_inner);
        let appeal = appeals
            .get_mut(&appeal_id)
            .ok_or_else(EngineError::appeal_not_found)?;
        let events = appeal.handle(&cmd)?;
        for event in &events {
            appeal.apply(event);
        }
        Ok(appeal.clone())
    }

    fn release_all(&self, reserved: &[(BucketKey, i64)]) {
        for (key, amount) in reserved.iter().rev() {
            // Release cannot fail for positive amounts; clamped at zero.
            let _ = self.ledger.release(key, *amount);
        }
    }

    /// After a rollback, report the gap for every demand the ledger cannot
    /// currently satisfy. Falls back to the triggering error if a concurrent
    /// release already closed the gap.
    fn shortfall_report(&self, demands: &[(BucketKey, i64)], fallback: EngineError) -> EngineError {
        let shortfalls: Vec<Shortfall> = demands
            .iter()
            .filter_map(|(key, requested)| {
                let available = self.ledger.available(key);
                (available < *requested).then(|| Shortfall {
                    item_type: key.item_type(),
                    specification: key.specification().to_string(),
                    requested: *requested,
                    available,
                })
            })
            .collect();
        if shortfalls.is_empty() {
            fallback
        } else {
            EngineError::insufficient(shortfalls)
        }
    }

    fn notify(&self, notification: Notification) {
        if let Err(err) = self.bus.publish(notification) {
            // Delivery is external; engine state is already committed.
            warn!(?err, "notification publish failed");
        }
    }
}
