use crate::domain::auction::CompetitionOutcome;
use crate::domain::refund::{RefundMode, RefundStatus};
use crate::domain::{AuctionId, MovementId, RefundId, UserId};
use crate::error::Result;
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Serialize;

/// Emitted after every successfully committed ledger transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LedgerEvent {
    PaymentSubmitted {
        movement: MovementId,
        auction: AuctionId,
        user: UserId,
    },
    PaymentApproved {
        movement: MovementId,
        auction: AuctionId,
        user: UserId,
        garantia: Decimal,
    },
    PaymentRejected {
        movement: MovementId,
        auction: AuctionId,
        user: UserId,
    },
    ResultRecorded {
        auction: AuctionId,
        user: UserId,
        outcome: CompetitionOutcome,
    },
    BillingCompleted {
        auction: AuctionId,
        user: UserId,
    },
    RefundRequested {
        refund: RefundId,
        auction: AuctionId,
        user: UserId,
        monto: Decimal,
    },
    RefundManaged {
        refund: RefundId,
        user: UserId,
        estado: RefundStatus,
    },
    RefundProcessed {
        refund: RefundId,
        auction: AuctionId,
        user: UserId,
        monto: Decimal,
        modo: RefundMode,
    },
}

/// Outbound notification port. Delivery is best-effort: the engine logs and
/// drops a failed notification, it never rolls back the committed transition.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, event: &LedgerEvent) -> Result<()>;
}

pub type NotifierBox = Box<dyn Notifier>;

/// Default notifier: emits the event on the log stream.
pub struct LoggingNotifier;

#[async_trait]
impl Notifier for LoggingNotifier {
    async fn notify(&self, event: &LedgerEvent) -> Result<()> {
        tracing::info!(?event, "ledger event");
        Ok(())
    }
}
