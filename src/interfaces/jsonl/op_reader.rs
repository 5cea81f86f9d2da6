use crate::domain::auction::CompetitionOutcome;
use crate::domain::billing::DocumentInfo;
use crate::domain::movement::RejectReason;
use crate::domain::refund::{RefundDecision, RefundMode};
use crate::domain::{AuctionId, MovementId, RefundId, UserId};
use crate::error::Result;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::io::BufRead;

/// One ledger operation on the wire, tagged by `op`.
///
/// Operations carried out by auction management or back-office staff name
/// the acting `admin`; client operations name the acting `user`. Entity ids
/// are caller-assigned, which keeps a feed replayable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum LedgerOp {
    RegisterAuction {
        auction: AuctionId,
        winner: UserId,
        admin: UserId,
        monto_oferta: Decimal,
        fecha_inicio: DateTime<Utc>,
        fecha_limite_pago: DateTime<Utc>,
    },
    SubmitPayment {
        movement: MovementId,
        auction: AuctionId,
        user: UserId,
        monto: Decimal,
        fecha_pago: DateTime<Utc>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        voucher: Option<String>,
    },
    ApprovePayment {
        movement: MovementId,
        admin: UserId,
    },
    RejectPayment {
        movement: MovementId,
        admin: UserId,
        reasons: Vec<RejectReason>,
    },
    SetCompetitionResult {
        auction: AuctionId,
        admin: UserId,
        outcome: CompetitionOutcome,
    },
    CompleteBilling {
        auction: AuctionId,
        user: UserId,
        document: DocumentInfo,
    },
    RequestRefund {
        refund: RefundId,
        auction: AuctionId,
        user: UserId,
        monto: Decimal,
        modo: RefundMode,
    },
    ManageRefund {
        refund: RefundId,
        admin: UserId,
        decision: RefundDecision,
    },
    ProcessRefund {
        refund: RefundId,
        admin: UserId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        referencia: Option<String>,
    },
}

/// Streams operations from a JSON-lines source, one object per line.
///
/// Blank lines are skipped; a malformed line yields an `Err` item without
/// ending the stream, so a replay can report and continue.
pub struct OpReader<R: BufRead> {
    source: R,
}

impl<R: BufRead> OpReader<R> {
    pub fn new(source: R) -> Self {
        Self { source }
    }

    pub fn ops(self) -> impl Iterator<Item = Result<LedgerOp>> {
        self.source
            .lines()
            .filter(|line| {
                line.as_ref()
                    .map(|content| !content.trim().is_empty())
                    .unwrap_or(true)
            })
            .map(|line| {
                let line = line?;
                Ok(serde_json::from_str(&line)?)
            })
    }
}
