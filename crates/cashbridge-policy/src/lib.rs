//! CashBridge Policy - Tier-indexed advance terms
//!
//! Two separate policy tables hang off the risk tier. They look alike but
//! answer different questions and intentionally carry different numbers:
//!
//! # Advance fee structure (origination cost, per order)
//!
//! | Tier | Max advance | Farmer fee | Buyer fee | Minimum advance |
//! |------|-------------|------------|-----------|-----------------|
//! | A    | 80%         | 2.5%       | 1.5%      | $250            |
//! | B    | 70%         | 3.5%       | 2.0%      | $500            |
//! | C    | 50%         | 5.0%       | 3.0%      | $1,000          |
//!
//! # Credit limits (borrowing capacity, per producer)
//!
//! | Tier | Max advance | Absolute cap |
//! |------|-------------|--------------|
//! | A    | 85%         | $75,000      |
//! | B    | 65%         | $30,000      |
//! | C    | 40%         | $10,000      |
//!
//! Whether these tables should converge is a product/finance question; they
//! are kept as distinct types so merging them is a deliberate decision.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use cashbridge_types::{Amount, RiskTier};

/// Per-tier origination terms from the advance fee table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierFees {
    /// Maximum advance share of the order value, as a decimal fraction
    pub max_advance_rate: Decimal,
    /// Fee charged to the farmer on the advance amount
    pub farmer_fee_rate: Decimal,
    /// Fee charged to the buyer on the advance amount
    pub buyer_fee_rate: Decimal,
    /// Advances below this amount are ineligible
    pub minimum_advance: Amount,
}

/// The advance fee table: what an advance costs to originate
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct AdvanceFeePolicy;

impl AdvanceFeePolicy {
    /// Look up origination terms for a tier
    pub fn fees_for(&self, tier: RiskTier) -> TierFees {
        match tier {
            RiskTier::A => TierFees {
                max_advance_rate: dec!(0.80),
                farmer_fee_rate: dec!(0.025),
                buyer_fee_rate: dec!(0.015),
                minimum_advance: Amount::from_major(250),
            },
            RiskTier::B => TierFees {
                max_advance_rate: dec!(0.70),
                farmer_fee_rate: dec!(0.035),
                buyer_fee_rate: dec!(0.020),
                minimum_advance: Amount::from_major(500),
            },
            RiskTier::C => TierFees {
                max_advance_rate: dec!(0.50),
                farmer_fee_rate: dec!(0.050),
                buyer_fee_rate: dec!(0.030),
                minimum_advance: Amount::from_major(1_000),
            },
        }
    }
}

/// Per-tier borrowing capacity from the credit limit table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierCreditLimit {
    /// Maximum advance share of an order's value, as a decimal fraction
    pub max_advance_percentage: Decimal,
    /// Absolute cap on total outstanding advances
    pub max_advance_amount: Amount,
}

/// The credit limit table: how much a producer may have outstanding
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct CreditLimitPolicy;

impl CreditLimitPolicy {
    /// Look up borrowing capacity for a tier
    pub fn limits_for(&self, tier: RiskTier) -> TierCreditLimit {
        match tier {
            RiskTier::A => TierCreditLimit {
                max_advance_percentage: dec!(0.85),
                max_advance_amount: Amount::from_major(75_000),
            },
            RiskTier::B => TierCreditLimit {
                max_advance_percentage: dec!(0.65),
                max_advance_amount: Amount::from_major(30_000),
            },
            RiskTier::C => TierCreditLimit {
                max_advance_percentage: dec!(0.40),
                max_advance_amount: Amount::from_major(10_000),
            },
        }
    }
}

/// Engine knobs that are policy, not code
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct EnginePolicy {
    /// Overall score at or above which an advance is approved automatically
    pub auto_approval_threshold: f64,
    /// Days past the order's expected delivery date before repayment is due
    pub grace_period_days: i64,
}

impl Default for EnginePolicy {
    fn default() -> Self {
        Self {
            auto_approval_threshold: 85.0,
            grace_period_days: 7,
        }
    }
}
