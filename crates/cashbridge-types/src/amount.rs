//! Money as integer cents
//!
//! CashBridge stores every balance, fee, and limit as whole cents in an i64
//! so that arithmetic is exact and overflow-checked. Percentage rates are
//! `rust_decimal::Decimal` fractions and are applied through [`Amount::apply_rate`],
//! which rounds half-up to whole cents. That is the single rounding rule for
//! the entire engine.

use crate::{BridgeError, Result};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;

/// A monetary amount in whole cents
///
/// Supports negative values only transiently (ledger math); persisted
/// contract fields are kept non-negative by the engine's invariants.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct Amount {
    /// Raw value in cents
    pub cents: i64,
}

impl Amount {
    /// Create an amount from raw cents
    pub const fn from_cents(cents: i64) -> Self {
        Self { cents }
    }

    /// Create an amount from whole currency units (e.g. dollars)
    pub const fn from_major(units: i64) -> Self {
        Self { cents: units * 100 }
    }

    /// The zero amount
    pub const fn zero() -> Self {
        Self { cents: 0 }
    }

    /// Check if the amount is zero
    pub fn is_zero(&self) -> bool {
        self.cents == 0
    }

    /// Check if the amount is strictly positive
    pub fn is_positive(&self) -> bool {
        self.cents > 0
    }

    /// Check if the amount is negative
    pub fn is_negative(&self) -> bool {
        self.cents < 0
    }

    /// Checked addition
    pub fn checked_add(self, other: Self) -> Result<Self> {
        let cents = self
            .cents
            .checked_add(other.cents)
            .ok_or(BridgeError::AmountOverflow)?;
        Ok(Self { cents })
    }

    /// Checked subtraction
    pub fn checked_sub(self, other: Self) -> Result<Self> {
        let cents = self
            .cents
            .checked_sub(other.cents)
            .ok_or(BridgeError::AmountUnderflow)?;
        Ok(Self { cents })
    }

    /// Subtraction clamped at zero (loss and headroom math)
    pub fn saturating_sub(self, other: Self) -> Self {
        Self {
            cents: (self.cents - other.cents).max(0),
        }
    }

    /// The smaller of two amounts
    pub fn min(self, other: Self) -> Self {
        if self.cents <= other.cents {
            self
        } else {
            other
        }
    }

    /// Apply a decimal rate (e.g. `dec!(0.035)` for 3.5%), rounding half-up
    /// to whole cents
    pub fn apply_rate(self, rate: Decimal) -> Result<Self> {
        let cents = (Decimal::from(self.cents) * rate)
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
            .to_i64()
            .ok_or(BridgeError::AmountOverflow)?;
        Ok(Self { cents })
    }

    /// The amount as a `Decimal` in cents (for utilization ratios and display)
    pub fn to_decimal(&self) -> Decimal {
        Decimal::from(self.cents)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.cents < 0 { "-" } else { "" };
        let abs = self.cents.unsigned_abs();
        write!(f, "{}{}.{:02}", sign, abs / 100, abs % 100)
    }
}

impl Sum for Amount {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::zero(), |acc, a| Self {
            cents: acc.cents + a.cents,
        })
    }
}
