//! Inventory domain module.
//!
//! The shared pool of donated resources that appeals are fulfilled from.
//! This crate owns the only mutable stock counters in the system; every
//! mutation goes through `reserve` / `release` / `credit` on the ledger.

pub mod ledger;

pub use ledger::{BucketKey, BucketSnapshot, InventoryLedger};
