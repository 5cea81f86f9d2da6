use crate::domain::UserId;
use crate::error::{ConflictReason, LedgerError, Result, ValidationReason};
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Guarantee rate applied to a winning offer.
pub const GUARANTEE_RATE: Decimal = dec!(0.08);

/// Share of a held guarantee forfeited when the winner walks away.
pub const PENALTY_RATE: Decimal = dec!(0.30);

/// Rounding slack admitted by the balance invariant.
pub const BALANCE_TOLERANCE: Decimal = dec!(0.01);

/// Rounds to 2 decimal places, midpoints away from zero.
pub fn round2(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Pins the display scale to 2 decimal places. Stored figures are always
/// whole cents, so this never rounds.
fn two_dp(mut value: Decimal) -> Decimal {
    value.rescale(2);
    value
}

/// A positive monetary amount with at most 2 decimal places.
///
/// The single gate through which caller-supplied amounts enter the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd)]
pub struct Amount(Decimal);

impl Amount {
    pub fn new(value: Decimal) -> Result<Self> {
        if value <= Decimal::ZERO {
            return Err(ValidationReason::NonPositiveAmount.into());
        }
        if value.round_dp(2) != value {
            return Err(ValidationReason::ExcessPrecision.into());
        }
        Ok(Self(value))
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = LedgerError;

    fn try_from(value: Decimal) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

/// Signed deltas over the three stored balance figures.
///
/// Compound adjustments (penalty, billing application) are expressed as one
/// value so they can never be applied half-way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Adjustment {
    pub d_total: Decimal,
    pub d_retenido: Decimal,
    pub d_aplicado: Decimal,
}

impl Adjustment {
    pub const fn new(d_total: Decimal, d_retenido: Decimal, d_aplicado: Decimal) -> Self {
        Self {
            d_total,
            d_retenido,
            d_aplicado,
        }
    }

    pub fn is_noop(&self) -> bool {
        self.d_total.is_zero() && self.d_retenido.is_zero() && self.d_aplicado.is_zero()
    }
}

/// Per-user balance record, the only durably stored figures.
///
/// `disponible` is never stored; it is derived on demand. The `version`
/// counter backs the optimistic commit: the store refuses a write whose
/// expected version no longer matches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceAccount {
    pub user: UserId,
    pub total: Decimal,
    pub retenido: Decimal,
    pub aplicado: Decimal,
    pub version: u64,
}

impl BalanceAccount {
    pub fn new(user: UserId) -> Self {
        Self {
            user,
            total: Decimal::ZERO,
            retenido: Decimal::ZERO,
            aplicado: Decimal::ZERO,
            version: 0,
        }
    }

    /// Unencumbered balance usable for new guarantees or refundable.
    pub fn disponible(&self) -> Decimal {
        (self.total - self.retenido - self.aplicado).max(Decimal::ZERO)
    }

    /// Applies the deltas as one read-modify-write.
    ///
    /// Fails with `NEGATIVE_BALANCE` if any figure would drop below zero or
    /// the held-plus-applied sum would exceed the total beyond tolerance.
    /// On failure the account is left untouched.
    pub fn apply(&mut self, adjustment: Adjustment) -> Result<BalanceSnapshot> {
        let total = self.total + adjustment.d_total;
        let retenido = self.retenido + adjustment.d_retenido;
        let aplicado = self.aplicado + adjustment.d_aplicado;

        if total < Decimal::ZERO || retenido < Decimal::ZERO || aplicado < Decimal::ZERO {
            return Err(ConflictReason::NegativeBalance.into());
        }
        if retenido + aplicado > total + BALANCE_TOLERANCE {
            return Err(ConflictReason::NegativeBalance.into());
        }

        self.total = total;
        self.retenido = retenido;
        self.aplicado = aplicado;
        Ok(self.snapshot())
    }

    pub fn snapshot(&self) -> BalanceSnapshot {
        BalanceSnapshot {
            user: self.user,
            total: two_dp(self.total),
            retenido: two_dp(self.retenido),
            aplicado: two_dp(self.aplicado),
            disponible: two_dp(self.disponible()),
        }
    }
}

/// Point-in-time view of an account, including the derived figure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceSnapshot {
    pub user: UserId,
    pub total: Decimal,
    pub retenido: Decimal,
    pub aplicado: Decimal,
    pub disponible: Decimal,
}
