//! Outbound notification events for the external dispatcher.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use aangan_core::{AppealId, CenterId};

use crate::event::Event;

/// Fire-and-forget notifications surfaced to the push-notification
/// dispatcher. The engine publishes these after the corresponding state
/// change has already been committed; delivery failure never undoes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notification {
    AppealApproved {
        appeal_id: AppealId,
        center_id: CenterId,
        occurred_at: DateTime<Utc>,
    },
    AppealRejected {
        appeal_id: AppealId,
        center_id: CenterId,
        occurred_at: DateTime<Utc>,
    },
    DonationBatchProcessed {
        processed_count: u64,
        occurred_at: DateTime<Utc>,
    },
}

impl Event for Notification {
    fn event_type(&self) -> &'static str {
        match self {
            Notification::AppealApproved { .. } => "appeal.approved",
            Notification::AppealRejected { .. } => "appeal.rejected",
            Notification::DonationBatchProcessed { .. } => "donation.batch_processed",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            Notification::AppealApproved { occurred_at, .. }
            | Notification::AppealRejected { occurred_at, .. }
            | Notification::DonationBatchProcessed { occurred_at, .. } => *occurred_at,
        }
    }
}
