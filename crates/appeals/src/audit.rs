//! Append-only audit trail of appeal status transitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use aangan_core::UserId;

/// One recorded status transition or reviewer comment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusUpdate {
    pub message: String,
    pub actor: UserId,
    pub timestamp: DateTime<Utc>,
}

/// Per-appeal log of status updates.
///
/// Write path is `append` only — existing entries are never mutated or
/// removed. External consumers (UI, notification dispatcher) read the slice.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditTrail {
    entries: Vec<StatusUpdate>,
}

impl AuditTrail {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, message: impl Into<String>, actor: UserId, timestamp: DateTime<Utc>) {
        self.entries.push(StatusUpdate {
            message: message.into(),
            actor,
            timestamp,
        });
    }

    pub fn entries(&self) -> &[StatusUpdate] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_preserves_existing_entries() {
        let mut trail = AuditTrail::new();
        let actor = UserId::new();
        let now = Utc::now();

        trail.append("appeal submitted", actor, now);
        let first = trail.entries()[0].clone();

        trail.append("review started", actor, now);

        assert_eq!(trail.len(), 2);
        assert_eq!(trail.entries()[0], first);
        assert_eq!(trail.entries()[1].message, "review started");
    }
}
