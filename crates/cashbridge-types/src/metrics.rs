//! Behavioral metric snapshots
//!
//! One explicit record per metrics category, validated at the gateway
//! boundary. A snapshot is immutable for the duration of a score calculation;
//! the calculator never fetches data itself.

use crate::{Amount, BridgeError, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Direction of a producer's inspection-score history
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum QualityTrend {
    Improving,
    #[default]
    Stable,
    Declining,
}

/// Order fulfillment history
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeliveryMetrics {
    pub completed_orders: u32,
    pub defaulted_orders: u32,
    pub cancelled_orders: u32,
    /// Share of orders completed successfully, in [0, 1]
    pub success_rate: f64,
    /// Share of completed orders delivered on time, in [0, 1]
    pub on_time_rate: f64,
    /// Mean delay of late deliveries, in days
    pub average_delay_days: f64,
    /// Total delivered volume, in product units
    pub total_volume: f64,
    /// Total delivered value
    pub total_value: Amount,
}

impl DeliveryMetrics {
    /// Whether the producer has any delivery history at all
    pub fn has_history(&self) -> bool {
        self.completed_orders + self.defaulted_orders + self.cancelled_orders > 0
    }
}

/// Inspection quality history
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QualityMetrics {
    /// Mean inspection score, 0-100
    pub average_score: f64,
    pub score_std_dev: f64,
    pub trend: QualityTrend,
    pub inspection_count: u32,
    /// Inspections per grade label (e.g. "A" -> 12)
    pub grade_distribution: HashMap<String, u32>,
}

/// Advance repayment history
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PaymentMetrics {
    pub advances_completed: u32,
    pub advances_defaulted: u32,
    pub advances_active: u32,
    /// Share of closed advances that defaulted, in [0, 1]
    pub default_rate: f64,
    /// Mean repayment delay in days; negative means early repayment
    pub average_repayment_delay_days: f64,
    pub total_borrowed: Amount,
    pub total_repaid: Amount,
    pub outstanding_balance: Amount,
}

impl PaymentMetrics {
    /// Whether the producer has ever taken an advance
    pub fn has_history(&self) -> bool {
        self.advances_completed + self.advances_defaulted + self.advances_active > 0
    }
}

/// Account activity history
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActivityMetrics {
    pub account_age_days: u32,
    pub active_days: u32,
    pub orders_per_month: f64,
    pub first_order_date: Option<NaiveDate>,
    pub last_order_date: Option<NaiveDate>,
}

/// Blockchain verification history
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BlockchainMetrics {
    pub verified_transactions: u32,
    pub total_transactions: u32,
    /// Verified share of anchored transactions, in [0, 1]
    pub verification_rate: f64,
    pub verification_hashes: Vec<String>,
    pub last_sync: Option<DateTime<Utc>>,
}

/// The complete metric bundle consumed by one score calculation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProducerMetrics {
    pub delivery: DeliveryMetrics,
    pub quality: QualityMetrics,
    pub payment: PaymentMetrics,
    pub activity: ActivityMetrics,
    pub blockchain: BlockchainMetrics,
}

impl ProducerMetrics {
    /// Validate rate fields at the gateway boundary
    ///
    /// Rejects NaN and out-of-range rates so the scoring curves only ever see
    /// well-formed inputs.
    pub fn validate(&self) -> Result<()> {
        let rates = [
            ("delivery.success_rate", self.delivery.success_rate),
            ("delivery.on_time_rate", self.delivery.on_time_rate),
            ("payment.default_rate", self.payment.default_rate),
            ("blockchain.verification_rate", self.blockchain.verification_rate),
        ];
        for (field, rate) in rates {
            if !(0.0..=1.0).contains(&rate) {
                return Err(BridgeError::invariant(format!(
                    "metric {field} out of range: {rate}"
                )));
            }
        }
        for (field, value) in [
            ("delivery.average_delay_days", self.delivery.average_delay_days),
            ("quality.average_score", self.quality.average_score),
            ("quality.score_std_dev", self.quality.score_std_dev),
            (
                "payment.average_repayment_delay_days",
                self.payment.average_repayment_delay_days,
            ),
            ("activity.orders_per_month", self.activity.orders_per_month),
        ] {
            if value.is_nan() {
                return Err(BridgeError::invariant(format!("metric {field} is NaN")));
            }
        }
        Ok(())
    }
}
