use crate::domain::balance::Amount;
use crate::domain::{AuctionId, RefundId, UserId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Refund workflow states: `solicitado → {confirmado, rechazado}`,
/// `confirmado → {procesado, cancelado}`. Only `procesado` moves money.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefundStatus {
    Solicitado,
    Confirmado,
    Rechazado,
    Procesado,
    Cancelado,
}

impl RefundStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Solicitado => "solicitado",
            Self::Confirmado => "confirmado",
            Self::Rechazado => "rechazado",
            Self::Procesado => "procesado",
            Self::Cancelado => "cancelado",
        }
    }

    /// Non-terminal states; at most one such refund may exist per auction
    /// per user.
    pub const fn is_active(&self) -> bool {
        matches!(self, Self::Solicitado | Self::Confirmado)
    }
}

impl std::fmt::Display for RefundStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Settlement mode chosen by the client at request time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefundMode {
    /// Release into `disponible`; money stays in the system.
    MantenerSaldo,
    /// Remit out of the system; `total` shrinks.
    DevolverDinero,
}

/// Admin decision over a pending refund. None of these move money; they are
/// the authorization gate before processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefundDecision {
    Confirmar,
    Rechazar,
    Cancelar,
}

impl RefundDecision {
    /// The `(from, to)` transition this decision performs.
    pub const fn transition(&self) -> (RefundStatus, RefundStatus) {
        match self {
            Self::Confirmar => (RefundStatus::Solicitado, RefundStatus::Confirmado),
            Self::Rechazar => (RefundStatus::Solicitado, RefundStatus::Rechazado),
            Self::Cancelar => (RefundStatus::Confirmado, RefundStatus::Cancelado),
        }
    }
}

/// A client request to release or remit part of their balance tied to one
/// auction. `referencia` records the settlement detail (e.g. a bank transfer
/// id) filled in at processing time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Refund {
    pub id: RefundId,
    pub auction: AuctionId,
    pub user: UserId,
    pub monto: Decimal,
    pub modo: RefundMode,
    pub estado: RefundStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referencia: Option<String>,
}

impl Refund {
    pub fn requested(
        id: RefundId,
        auction: AuctionId,
        user: UserId,
        monto: Amount,
        modo: RefundMode,
    ) -> Self {
        Self {
            id,
            auction,
            user,
            monto: monto.value(),
            modo,
            estado: RefundStatus::Solicitado,
            referencia: None,
        }
    }
}
