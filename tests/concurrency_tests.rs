//! Races the engine guards against: the same terminal transition must never
//! win twice, and operations on different users must not disturb each other.

mod common;

use almoneda::application::engine::LedgerEngine;
use almoneda::domain::actor::Actor;
use almoneda::domain::auction::CompetitionOutcome;
use almoneda::domain::refund::{RefundDecision, RefundMode};
use common::{ADMIN, engine, fecha_inicio, fecha_limite, fecha_pago, paid_auction};
use rust_decimal_macros::dec;
use std::sync::Arc;

#[tokio::test]
async fn test_concurrent_approvals_of_same_auction_admit_one() {
    let engine = Arc::new(engine());
    engine
        .register_auction(ADMIN, 1, 10, dec!(1250.00), fecha_inicio(), fecha_limite())
        .await
        .unwrap();
    engine
        .submit_payment(Actor::client(10), 1, 1, dec!(100.00), fecha_pago(), None)
        .await
        .unwrap();
    engine
        .reject_payment(ADMIN, 1, vec![almoneda::domain::movement::RejectReason::Otro])
        .await
        .unwrap();
    engine
        .submit_payment(Actor::client(10), 2, 1, dec!(100.00), fecha_pago(), None)
        .await
        .unwrap();
    engine
        .submit_payment(Actor::client(10), 3, 1, dec!(100.00), fecha_pago(), None)
        .await
        .unwrap();

    // two pending movements, two concurrent approvals
    let first = tokio::spawn({
        let engine = Arc::clone(&engine);
        async move { engine.approve_payment(Actor::admin(900), 2).await }
    });
    let second = tokio::spawn({
        let engine = Arc::clone(&engine);
        async move { engine.approve_payment(Actor::admin(901), 3).await }
    });

    let outcomes = [first.await.unwrap(), second.await.unwrap()];
    let successes = outcomes.iter().filter(|outcome| outcome.is_ok()).count();
    assert_eq!(successes, 1, "exactly one approval must win");
    assert!(
        outcomes
            .iter()
            .any(|outcome| matches!(outcome, Err(e) if e.status_code() == 409)),
        "the loser must surface a conflict"
    );

    // exactly one +garantia/+garantia adjustment
    let balances = engine.balances().await.unwrap();
    assert_eq!(balances.len(), 1);
    assert_eq!(balances[0].total, dec!(100.00));
    assert_eq!(balances[0].retenido, dec!(100.00));
}

#[tokio::test]
async fn test_concurrent_refund_processing_admits_one() {
    let engine = Arc::new(engine());
    paid_auction(&engine, 1, 10, dec!(1250.00), dec!(100.00)).await;
    engine
        .set_competition_result(ADMIN, 1, CompetitionOutcome::Perdida)
        .await
        .unwrap();
    engine
        .request_refund(Actor::client(10), 1, 1, dec!(100.00), RefundMode::DevolverDinero)
        .await
        .unwrap();
    engine
        .manage_refund(ADMIN, 1, RefundDecision::Confirmar)
        .await
        .unwrap();

    let first = tokio::spawn({
        let engine = Arc::clone(&engine);
        async move { engine.process_refund(Actor::admin(900), 1, None).await }
    });
    let second = tokio::spawn({
        let engine = Arc::clone(&engine);
        async move { engine.process_refund(Actor::admin(901), 1, None).await }
    });

    let outcomes = [first.await.unwrap(), second.await.unwrap()];
    let successes = outcomes.iter().filter(|outcome| outcome.is_ok()).count();
    assert_eq!(successes, 1, "a refund is processed at most once");

    let balances = engine.balances().await.unwrap();
    assert_eq!(balances[0].total, dec!(0.00));
    assert_eq!(balances[0].retenido, dec!(0.00));
}

#[tokio::test]
async fn test_cross_user_operations_proceed_in_parallel() {
    let engine = Arc::new(engine());
    for user in 1..=20u32 {
        engine
            .register_auction(ADMIN, user, user, dec!(1250.00), fecha_inicio(), fecha_limite())
            .await
            .unwrap();
        engine
            .submit_payment(Actor::client(user), user, user, dec!(100.00), fecha_pago(), None)
            .await
            .unwrap();
    }

    let mut handles = Vec::new();
    for user in 1..=20u32 {
        let engine: Arc<LedgerEngine> = Arc::clone(&engine);
        handles.push(tokio::spawn(async move {
            engine.approve_payment(Actor::admin(900), user).await
        }));
    }
    for handle in handles {
        assert!(handle.await.unwrap().is_ok());
    }

    let balances = engine.balances().await.unwrap();
    assert_eq!(balances.len(), 20);
    for snapshot in balances {
        assert_eq!(snapshot.total, dec!(100.00));
        assert_eq!(snapshot.retenido, dec!(100.00));
    }
}
