//! Storage adapters implementing the [`crate::domain::ports::LedgerStore`]
//! port.

pub mod in_memory;
#[cfg(feature = "storage-rocksdb")]
pub mod rocksdb;
