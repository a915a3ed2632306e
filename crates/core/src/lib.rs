//! `aangan-core` — domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! typed identifiers, the shared item-type vocabulary, and the engine error
//! model used across the allocation workflow.

pub mod aggregate;
pub mod entity;
pub mod error;
pub mod id;
pub mod item_type;
pub mod value_object;

pub use aggregate::{Aggregate, AggregateRoot};
pub use entity::Entity;
pub use error::{EngineError, EngineResult, Shortfall};
pub use id::{AppealId, CenterId, DonationId, UserId};
pub use item_type::ItemType;
pub use value_object::ValueObject;
