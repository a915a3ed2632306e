//! Donation intake and batch ingestion.
//!
//! Raw donations arrive from the donor-facing flow as unprocessed records;
//! the ingestor folds them into the inventory ledger in idempotent batches.

pub mod donation;
pub mod ingestor;

pub use donation::{Donation, DonationQueue};
pub use ingestor::{BucketCredit, DonationIngestor, ProcessedBatch};
