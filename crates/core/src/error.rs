//! Engine error model.

use thiserror::Error;

use crate::id::DonationId;
use crate::item_type::ItemType;

/// Result type used across the engine.
pub type EngineResult<T> = Result<T, EngineError>;

/// Per-item gap between what an appeal requests and what the ledger can
/// currently promise. Carried by [`EngineError::InsufficientInventory`].
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Shortfall {
    pub item_type: ItemType,
    pub specification: String,
    pub requested: i64,
    pub available: i64,
}

impl Shortfall {
    /// Units missing for this item.
    pub fn missing(&self) -> i64 {
        self.requested - self.available
    }
}

/// Engine-level error.
///
/// Every variant represents a decision the submitter or reviewer must act on;
/// none of them is retried or swallowed inside the engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// Malformed or missing input (e.g. a money item without a purpose).
    #[error("validation failed: {0}")]
    Validation(String),

    /// A status change outside the appeal lifecycle graph.
    #[error("invalid status transition: {from} -> {attempted}")]
    InvalidStatusTransition { from: String, attempted: String },

    /// A reservation cannot be satisfied; carries the shortfall per item.
    /// Any reservations already taken by the failing call have been rolled
    /// back before this surfaces.
    #[error("insufficient inventory for {} requested item(s)", .0.len())]
    InsufficientInventory(Vec<Shortfall>),

    /// The referenced appeal does not exist.
    #[error("appeal not found")]
    AppealNotFound,

    /// A donation was offered for processing twice. Unreachable through
    /// `process_pending`, which only visits unprocessed rows, but guarded
    /// explicitly at the entity level.
    #[error("donation already processed: {0}")]
    DuplicateDonationProcessing(DonationId),
}

impl EngineError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invalid_transition(from: impl Into<String>, attempted: impl Into<String>) -> Self {
        Self::InvalidStatusTransition {
            from: from.into(),
            attempted: attempted.into(),
        }
    }

    pub fn insufficient(shortfalls: Vec<Shortfall>) -> Self {
        Self::InsufficientInventory(shortfalls)
    }

    pub fn appeal_not_found() -> Self {
        Self::AppealNotFound
    }
}
