#![allow(dead_code)]

use almoneda::application::engine::LedgerEngine;
use almoneda::domain::actor::Actor;
use almoneda::domain::{AuctionId, UserId};
use almoneda::infrastructure::in_memory::InMemoryLedgerStore;
use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;

pub const ADMIN: Actor = Actor::admin(900);

pub fn engine() -> LedgerEngine {
    LedgerEngine::with_store(Box::new(InMemoryLedgerStore::new()))
}

pub fn fecha_inicio() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap()
}

pub fn fecha_limite() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2099, 3, 15, 0, 0, 0).unwrap()
}

pub fn fecha_pago() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, 10, 0, 0).unwrap()
}

/// Registers the auction, submits one movement (same id as the auction) and
/// approves it, leaving the guarantee held.
pub async fn paid_auction(
    engine: &LedgerEngine,
    auction: AuctionId,
    winner: UserId,
    oferta: Decimal,
    monto: Decimal,
) {
    engine
        .register_auction(ADMIN, auction, winner, oferta, fecha_inicio(), fecha_limite())
        .await
        .unwrap();
    engine
        .submit_payment(Actor::client(winner), auction, auction, monto, fecha_pago(), None)
        .await
        .unwrap();
    engine.approve_payment(ADMIN, auction).await.unwrap();
}
