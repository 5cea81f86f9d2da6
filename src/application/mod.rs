//! Application layer: the ledger engine and notification dispatch.
//!
//! [`engine::LedgerEngine`] is the single entry point for every financial
//! operation. Each operation is a read-validate-compute-commit cycle against
//! the storage port; transient commit conflicts are retried with backoff.

pub mod engine;
pub mod notify;
