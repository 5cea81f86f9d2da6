use chrono::{DateTime, Utc};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, LedgerError>;

/// Failures surfaced by the ledger.
///
/// Every variant maps to an HTTP-equivalent status and a stable
/// machine-readable code, so callers embedding the engine behind an API can
/// translate without string matching. `Transient` is the only variant that is
/// safe to retry; the engine already retries it internally a bounded number
/// of times before letting it escape.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("validation error: {0}")]
    Validation(#[from] ValidationReason),

    #[error("conflict: {0}")]
    Conflict(#[from] ConflictReason),

    #[error("{0} {1} not found")]
    NotFound(&'static str, u32),

    #[error("forbidden: {0}")]
    Forbidden(#[from] ForbiddenReason),

    #[error("transient storage conflict: {0}")]
    Transient(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[cfg(feature = "storage-rocksdb")]
    #[error("storage error: {0}")]
    Storage(#[from] rocksdb::Error),
}

impl LedgerError {
    /// HTTP-equivalent status for this failure.
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::Validation(_) => 422,
            Self::Conflict(_) => 409,
            Self::NotFound(..) => 404,
            Self::Forbidden(_) => 403,
            Self::Transient(_) => 503,
            Self::Io(_) | Self::Serde(_) | Self::Csv(_) => 500,
            #[cfg(feature = "storage-rocksdb")]
            Self::Storage(_) => 500,
        }
    }

    /// Stable machine-readable code for this failure.
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Validation(reason) => reason.code(),
            Self::Conflict(reason) => reason.code(),
            Self::Forbidden(reason) => reason.code(),
            Self::NotFound(..) => "NOT_FOUND",
            Self::Transient(_) => "TRANSIENT",
            Self::Io(_) | Self::Serde(_) | Self::Csv(_) => "INTERNAL",
            #[cfg(feature = "storage-rocksdb")]
            Self::Storage(_) => "INTERNAL",
        }
    }

    /// Whether retrying the same call can succeed without a state change.
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

/// Malformed input, detected before any state is read. Never retried.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationReason {
    #[error("amount must be positive")]
    NonPositiveAmount,

    #[error("amount must have at most 2 decimal places")]
    ExcessPrecision,

    #[error("payment date {fecha_pago} is outside [{fecha_inicio}, now]")]
    InvalidPaymentDate {
        fecha_pago: DateTime<Utc>,
        fecha_inicio: DateTime<Utc>,
    },

    #[error("at least one rejection reason is required")]
    NoRejectReasons,

    #[error("auction start date is after the payment deadline")]
    InvalidAuctionWindow,

    #[error("billing document number and name must not be empty")]
    EmptyDocumentField,
}

impl ValidationReason {
    pub const fn code(&self) -> &'static str {
        match self {
            Self::NonPositiveAmount => "NON_POSITIVE_AMOUNT",
            Self::ExcessPrecision => "EXCESS_PRECISION",
            Self::InvalidPaymentDate { .. } => "INVALID_PAYMENT_DATE",
            Self::NoRejectReasons => "NO_REJECT_REASONS",
            Self::InvalidAuctionWindow => "INVALID_AUCTION_WINDOW",
            Self::EmptyDocumentField => "EMPTY_DOCUMENT_FIELD",
        }
    }
}

/// Business-rule violation given the current state. Not retried: the caller
/// must observe the new state before deciding what to do next.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConflictReason {
    #[error("adjustment would drive a balance figure below zero")]
    NegativeBalance,

    #[error("auction {0} already has an approved payment")]
    DuplicateApprovedPayment(u32),

    #[error("auction {0} is already registered")]
    DuplicateAuction(u32),

    #[error("movement {0} already exists")]
    DuplicateMovement(u32),

    #[error("refund {0} already exists")]
    DuplicateRefund(u32),

    #[error("{entity} {id} is {actual}, expected {expected}")]
    InvalidState {
        entity: &'static str,
        id: u32,
        expected: &'static str,
        actual: String,
    },

    #[error("billing for auction {0} is already completed")]
    BillingAlreadyCompleted(u32),

    #[error("billing document is already registered for this user")]
    DuplicateBillingDocument,

    #[error("requested amount exceeds the refundable balance")]
    InsufficientAvailableBalance,

    #[error("auction {0} already has a refund in progress")]
    DuplicateRefundRequest(u32),

    #[error("auction {0} has no approved guarantee to refund")]
    RefundNotBacked(u32),

    #[error("requested amount straddles the held portion of auction {0}")]
    RefundSplitsHold(u32),
}

impl ConflictReason {
    pub const fn code(&self) -> &'static str {
        match self {
            Self::NegativeBalance => "NEGATIVE_BALANCE",
            Self::DuplicateApprovedPayment(_) => "DUPLICATE_APPROVED_PAYMENT",
            Self::DuplicateAuction(_) => "DUPLICATE_AUCTION",
            Self::DuplicateMovement(_) => "DUPLICATE_MOVEMENT",
            Self::DuplicateRefund(_) => "DUPLICATE_REFUND",
            Self::InvalidState { .. } => "INVALID_STATE",
            Self::BillingAlreadyCompleted(_) => "BILLING_ALREADY_COMPLETED",
            Self::DuplicateBillingDocument => "DUPLICATE_BILLING_DOCUMENT",
            Self::InsufficientAvailableBalance => "INSUFFICIENT_AVAILABLE_BALANCE",
            Self::DuplicateRefundRequest(_) => "DUPLICATE_REFUND_REQUEST",
            Self::RefundNotBacked(_) => "REFUND_NOT_BACKED",
            Self::RefundSplitsHold(_) => "REFUND_SPLITS_HOLD",
        }
    }
}

/// Wrong role, or acting on a resource the caller does not own. The ledger
/// trusts the identity resolved by the outer auth layer; it only gates.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ForbiddenReason {
    #[error("operation requires the admin role")]
    AdminRequired,

    #[error("user {user} is not the current winner of auction {auction}")]
    NotCurrentWinner { user: u32, auction: u32 },

    #[error("user {user} does not own {entity} {id}")]
    NotOwner {
        user: u32,
        entity: &'static str,
        id: u32,
    },
}

impl ForbiddenReason {
    pub const fn code(&self) -> &'static str {
        match self {
            Self::AdminRequired => "ADMIN_REQUIRED",
            Self::NotCurrentWinner { .. } => "NOT_CURRENT_WINNER",
            Self::NotOwner { .. } => "NOT_OWNER",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            LedgerError::from(ValidationReason::NonPositiveAmount).status_code(),
            422
        );
        assert_eq!(
            LedgerError::from(ConflictReason::NegativeBalance).status_code(),
            409
        );
        assert_eq!(LedgerError::NotFound("auction", 7).status_code(), 404);
        assert_eq!(
            LedgerError::from(ForbiddenReason::AdminRequired).status_code(),
            403
        );
        assert_eq!(LedgerError::Transient("busy".into()).status_code(), 503);
    }

    #[test]
    fn test_codes_are_stable() {
        assert_eq!(
            LedgerError::from(ConflictReason::DuplicateApprovedPayment(1)).code(),
            "DUPLICATE_APPROVED_PAYMENT"
        );
        assert_eq!(
            LedgerError::from(ConflictReason::InsufficientAvailableBalance).code(),
            "INSUFFICIENT_AVAILABLE_BALANCE"
        );
        assert_eq!(
            LedgerError::from(ForbiddenReason::NotCurrentWinner { user: 1, auction: 2 }).code(),
            "NOT_CURRENT_WINNER"
        );
        assert_eq!(
            LedgerError::from(ValidationReason::NoRejectReasons).code(),
            "NO_REJECT_REASONS"
        );
    }

    #[test]
    fn test_only_transient_is_retryable() {
        assert!(LedgerError::Transient("version moved".into()).is_retryable());
        assert!(!LedgerError::from(ConflictReason::NegativeBalance).is_retryable());
        assert!(!LedgerError::NotFound("refund", 3).is_retryable());
    }

    #[test]
    fn test_display_names_the_entity() {
        let err = LedgerError::NotFound("movement", 42);
        assert_eq!(err.to_string(), "movement 42 not found");

        let err = LedgerError::from(ConflictReason::InvalidState {
            entity: "refund",
            id: 9,
            expected: "confirmado",
            actual: "procesado".into(),
        });
        assert_eq!(
            err.to_string(),
            "conflict: refund 9 is procesado, expected confirmado"
        );
    }
}
