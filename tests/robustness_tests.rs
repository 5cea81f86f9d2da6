//! A randomized storm of valid and invalid operations must never corrupt the
//! balance invariant, whatever order the business rules reject them in.

mod common;

use almoneda::application::engine::LedgerEngine;
use almoneda::domain::actor::Actor;
use almoneda::domain::auction::CompetitionOutcome;
use almoneda::domain::billing::{DocumentInfo, DocumentType};
use almoneda::domain::refund::{RefundDecision, RefundMode};
use common::{ADMIN, engine, fecha_inicio, fecha_limite, fecha_pago};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

const USERS: u32 = 5;
const AUCTIONS: u32 = 8;
const OPS: usize = 400;

async fn assert_invariant(engine: &LedgerEngine) {
    for snapshot in engine.balances().await.unwrap() {
        assert!(snapshot.total >= Decimal::ZERO);
        assert!(snapshot.retenido >= Decimal::ZERO);
        assert!(snapshot.aplicado >= Decimal::ZERO);
        assert!(
            snapshot.retenido + snapshot.aplicado <= snapshot.total + dec!(0.01),
            "hold+applied exceeds total for user {}: {snapshot:?}",
            snapshot.user
        );
        let expected =
            (snapshot.total - snapshot.retenido - snapshot.aplicado).max(Decimal::ZERO);
        assert_eq!(snapshot.disponible, expected, "user {}", snapshot.user);
    }
}

#[tokio::test]
async fn test_random_operation_storm_preserves_invariant() {
    let engine = engine();
    let mut rng = StdRng::seed_from_u64(0x5eed);

    for auction in 1..=AUCTIONS {
        let winner = 1 + (auction % USERS);
        let oferta = Decimal::from(rng.gen_range(500..20_000));
        engine
            .register_auction(ADMIN, auction, winner, oferta, fecha_inicio(), fecha_limite())
            .await
            .unwrap();
    }

    let mut next_movement: u32 = 1;
    let mut next_refund: u32 = 1;

    for step in 0..OPS {
        let auction = rng.gen_range(1..=AUCTIONS);
        let winner = 1 + (auction % USERS);
        let user = if rng.gen_bool(0.8) {
            winner
        } else {
            rng.gen_range(1..=USERS)
        };
        let monto = Decimal::from(rng.gen_range(1..2_000));

        // every outcome is acceptable except a broken invariant
        let _ = match rng.gen_range(0..7) {
            0 => {
                let movement = next_movement;
                next_movement += 1;
                engine
                    .submit_payment(Actor::client(user), movement, auction, monto, fecha_pago(), None)
                    .await
            }
            1 => {
                let movement = rng.gen_range(1..next_movement.max(2));
                engine.approve_payment(ADMIN, movement).await
            }
            2 => {
                let movement = rng.gen_range(1..next_movement.max(2));
                engine
                    .reject_payment(
                        ADMIN,
                        movement,
                        vec![almoneda::domain::movement::RejectReason::Otro],
                    )
                    .await
            }
            3 => {
                let outcome = match rng.gen_range(0..3) {
                    0 => CompetitionOutcome::Ganada,
                    1 => CompetitionOutcome::Perdida,
                    _ => CompetitionOutcome::Penalizada,
                };
                engine.set_competition_result(ADMIN, auction, outcome).await
            }
            4 => {
                let document = DocumentInfo {
                    tipo: DocumentType::Dni,
                    numero: format!("{:08}", rng.gen_range(10_000_000u32..99_999_999)),
                    nombre: format!("Cliente {user}"),
                };
                engine
                    .complete_billing(Actor::client(user), auction, document)
                    .await
            }
            5 => {
                let refund = next_refund;
                next_refund += 1;
                let modo = if rng.gen_bool(0.5) {
                    RefundMode::MantenerSaldo
                } else {
                    RefundMode::DevolverDinero
                };
                engine
                    .request_refund(Actor::client(user), refund, auction, monto, modo)
                    .await
            }
            _ => {
                let refund = rng.gen_range(1..next_refund.max(2));
                let decision = match rng.gen_range(0..3) {
                    0 => RefundDecision::Confirmar,
                    1 => RefundDecision::Rechazar,
                    _ => RefundDecision::Cancelar,
                };
                match engine.manage_refund(ADMIN, refund, decision).await {
                    Ok(_) => engine.process_refund(ADMIN, refund, None).await,
                    Err(e) => Err(e),
                }
            }
        };

        if step % 50 == 0 {
            assert_invariant(&engine).await;
        }
    }

    assert_invariant(&engine).await;
}

#[tokio::test]
async fn test_storm_with_valid_lifecycles_balances_out() {
    let engine = engine();
    let mut rng = StdRng::seed_from_u64(42);

    for auction in 1..=AUCTIONS {
        let winner = 1 + (auction % USERS);
        let oferta = Decimal::from(rng.gen_range(1_000..10_000));
        engine
            .register_auction(ADMIN, auction, winner, oferta, fecha_inicio(), fecha_limite())
            .await
            .unwrap();
        engine
            .submit_payment(
                Actor::client(winner),
                auction,
                auction,
                dec!(50.00),
                fecha_pago(),
                None,
            )
            .await
            .unwrap();
        engine.approve_payment(ADMIN, auction).await.unwrap();

        match rng.gen_range(0..3) {
            0 => {
                engine
                    .set_competition_result(ADMIN, auction, CompetitionOutcome::Ganada)
                    .await
                    .unwrap();
                let document = DocumentInfo {
                    tipo: DocumentType::Ruc,
                    numero: format!("20{auction:09}"),
                    nombre: format!("Cliente {winner}"),
                };
                engine
                    .complete_billing(Actor::client(winner), auction, document)
                    .await
                    .unwrap();
            }
            1 => {
                engine
                    .set_competition_result(ADMIN, auction, CompetitionOutcome::Perdida)
                    .await
                    .unwrap();
                engine
                    .request_refund(
                        Actor::client(winner),
                        auction,
                        auction,
                        dec!(10.00),
                        RefundMode::MantenerSaldo,
                    )
                    .await
                    .unwrap();
                engine
                    .manage_refund(ADMIN, auction, RefundDecision::Confirmar)
                    .await
                    .unwrap();
                engine.process_refund(ADMIN, auction, None).await.unwrap();
            }
            _ => {
                engine
                    .set_competition_result(ADMIN, auction, CompetitionOutcome::Penalizada)
                    .await
                    .unwrap();
            }
        }

        assert_invariant(&engine).await;
    }
}
