//! Appeal domain module.
//!
//! Business rules for the appeal lifecycle, implemented purely as
//! deterministic domain logic (no IO, no storage). The all-or-nothing
//! reservation against the inventory ledger is coordinated by the service
//! layer; this crate only decides which transitions are legal and records
//! them in the audit trail.

pub mod appeal;
pub mod audit;

pub use appeal::{
    Appeal, AppealCommand, AppealEvent, AppealStatus, ApproveAppeal, FulfillAppeal, Priority,
    RejectAppeal, RequestKind, RequestedItem, StartReview, SubmitAppeal, Urgency,
};
pub use audit::{AuditTrail, StatusUpdate};
