//! Balance ledger engine for a vehicle-auction guarantee brokerage.
//!
//! Auction winners post a refundable cash guarantee (8% of the winning
//! offer). Depending on the outcome of the competition and on billing, the
//! guarantee is applied, penalized, released or refunded. This crate owns the
//! per-user balance figures (`total`, `retenido`, `aplicado` and the derived
//! `disponible`) and guarantees that every financial event mutates them
//! through a single atomic adjustment.

pub mod application;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod interfaces;
