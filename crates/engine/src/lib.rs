//! `aangan-engine` — the allocation engine facade.
//!
//! Wires the inventory ledger, appeal repository, donation queue and
//! notification bus together and exposes the callable operations external
//! layers (HTTP, schedulers) drive: submit / review / approve / reject /
//! fulfill, batch donation ingestion, and read-only snapshot queries.

pub mod service;

pub use service::AppealEngine;
