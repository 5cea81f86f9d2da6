//! Domain layer: entities, value objects and the storage port.
//!
//! Balances are never mutated field-by-field from the outside; every change
//! goes through [`balance::BalanceAccount::apply`] and is persisted through a
//! single [`ports::LedgerCommit`].

pub mod actor;
pub mod auction;
pub mod balance;
pub mod billing;
pub mod movement;
pub mod ports;
pub mod refund;

pub type UserId = u32;
pub type AuctionId = u32;
pub type MovementId = u32;
pub type RefundId = u32;
