use crate::domain::balance::Amount;
use crate::domain::{AuctionId, MovementId, UserId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Guarantee payment submission states. `aprobado` and `rechazado` are both
/// terminal; a rejected submission is superseded by a fresh `pendiente`
/// Movement, never reopened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementStatus {
    Pendiente,
    Aprobado,
    Rechazado,
}

impl MovementStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pendiente => "pendiente",
            Self::Aprobado => "aprobado",
            Self::Rechazado => "rechazado",
        }
    }
}

impl std::fmt::Display for MovementStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reason codes an admin attaches when rejecting a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    MontoIncorrecto,
    ComprobanteIlegible,
    FechaInvalida,
    CuentaEquivocada,
    Otro,
}

/// One guarantee payment submission.
///
/// Several movements may exist per auction (retries after rejection); only
/// the single approved one ever touches the ledger. The `voucher` field is an
/// opaque reference into external file storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Movement {
    pub id: MovementId,
    pub auction: AuctionId,
    pub user: UserId,
    pub monto: Decimal,
    pub fecha_pago: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voucher: Option<String>,
    pub estado: MovementStatus,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub motivos_rechazo: Vec<RejectReason>,
}

impl Movement {
    pub fn submitted(
        id: MovementId,
        auction: AuctionId,
        user: UserId,
        monto: Amount,
        fecha_pago: DateTime<Utc>,
        voucher: Option<String>,
    ) -> Self {
        Self {
            id,
            auction,
            user,
            monto: monto.value(),
            fecha_pago,
            voucher,
            estado: MovementStatus::Pendiente,
            motivos_rechazo: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    #[test]
    fn test_submission_starts_pending() {
        let fecha = Utc.with_ymd_and_hms(2026, 3, 2, 12, 0, 0).unwrap();
        let movement = Movement::submitted(
            1,
            7,
            10,
            Amount::new(dec!(100.00)).unwrap(),
            fecha,
            Some("voucher-001.jpg".into()),
        );
        assert_eq!(movement.estado, MovementStatus::Pendiente);
        assert!(movement.motivos_rechazo.is_empty());
    }

    #[test]
    fn test_wire_roundtrip_skips_empty_reasons() {
        let fecha = Utc.with_ymd_and_hms(2026, 3, 2, 12, 0, 0).unwrap();
        let movement =
            Movement::submitted(1, 7, 10, Amount::new(dec!(100.00)).unwrap(), fecha, None);
        let json = serde_json::to_string(&movement).unwrap();
        assert!(!json.contains("motivos_rechazo"));
        assert!(!json.contains("voucher"));

        let back: Movement = serde_json::from_str(&json).unwrap();
        assert_eq!(back, movement);
    }
}
