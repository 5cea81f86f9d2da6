use crate::domain::balance::{round2, Amount, GUARANTEE_RATE, PENALTY_RATE};
use crate::domain::{AuctionId, UserId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Auction lifecycle states.
///
/// Scheduling states (`programada`, `activa`) and the administrative
/// terminations (`vencida`, `cancelada`) are owned by external auction
/// management; the ledger only drives the financial transitions
/// `pendiente_pago → pagada → {ganada, perdida, penalizada}` and
/// `ganada → facturada`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuctionStatus {
    Programada,
    Activa,
    PendientePago,
    Pagada,
    Ganada,
    Perdida,
    Penalizada,
    Facturada,
    Vencida,
    Cancelada,
}

impl AuctionStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Programada => "programada",
            Self::Activa => "activa",
            Self::PendientePago => "pendiente_pago",
            Self::Pagada => "pagada",
            Self::Ganada => "ganada",
            Self::Perdida => "perdida",
            Self::Penalizada => "penalizada",
            Self::Facturada => "facturada",
            Self::Vencida => "vencida",
            Self::Cancelada => "cancelada",
        }
    }
}

impl std::fmt::Display for AuctionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of the external competition process, recorded once per auction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompetitionOutcome {
    Ganada,
    Perdida,
    Penalizada,
}

impl CompetitionOutcome {
    pub const fn target_status(&self) -> AuctionStatus {
        match self {
            Self::Ganada => AuctionStatus::Ganada,
            Self::Perdida => AuctionStatus::Perdida,
            Self::Penalizada => AuctionStatus::Penalizada,
        }
    }
}

impl std::fmt::Display for CompetitionOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.target_status().as_str())
    }
}

/// An auction as the ledger sees it: winner, offer, guarantee and the
/// auction's current contribution to its winner's `retenido`.
///
/// `garantia` is fixed at registration time from the winning offer.
/// `monto_retenido` starts at zero, becomes `garantia` when the guarantee
/// payment is approved, and is drained by penalty, billing application and
/// refund processing. Refund classification (held vs. already available) is
/// recomputed from this field at process time, never from request-time state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Auction {
    pub id: AuctionId,
    pub winner: Option<UserId>,
    pub monto_oferta: Decimal,
    pub garantia: Decimal,
    pub fecha_inicio: DateTime<Utc>,
    pub fecha_limite_pago: DateTime<Utc>,
    pub estado: AuctionStatus,
    pub monto_retenido: Decimal,
}

impl Auction {
    /// Builds the record auction management hands over once a winner is
    /// assigned. The guarantee is fixed here and never recomputed.
    pub fn register(
        id: AuctionId,
        winner: UserId,
        monto_oferta: Amount,
        fecha_inicio: DateTime<Utc>,
        fecha_limite_pago: DateTime<Utc>,
    ) -> Self {
        let monto_oferta = monto_oferta.value();
        Self {
            id,
            winner: Some(winner),
            monto_oferta,
            garantia: round2(monto_oferta * GUARANTEE_RATE),
            fecha_inicio,
            fecha_limite_pago,
            estado: AuctionStatus::PendientePago,
            monto_retenido: Decimal::ZERO,
        }
    }

    /// Amount forfeited when the competition outcome is `penalizada`.
    pub fn penalty(&self) -> Decimal {
        round2(self.garantia * PENALTY_RATE)
    }
}
