//! Credit score results and simulation records
//!
//! A [`CreditScoreResult`] is a point-in-time snapshot: it is computed on
//! demand, persisted alongside earlier snapshots for trend comparison, and
//! never mutated in place.

use crate::{Amount, ProducerId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Discrete credit-risk bucket driving advance percentages and fees
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RiskTier {
    A,
    B,
    C,
}

impl RiskTier {
    /// Classify an overall score into a tier
    ///
    /// A for 90 and above, B for 70 to below 90, C below 70.
    pub fn from_score(score: f64) -> Self {
        if score >= 90.0 {
            RiskTier::A
        } else if score >= 70.0 {
            RiskTier::B
        } else {
            RiskTier::C
        }
    }
}

impl std::fmt::Display for RiskTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RiskTier::A => write!(f, "A"),
            RiskTier::B => write!(f, "B"),
            RiskTier::C => write!(f, "C"),
        }
    }
}

/// Direction of score movement across the retained snapshots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ScoreTrend {
    Improving,
    #[default]
    Stable,
    Declining,
}

/// The five sub-scores, each in [0, 100]
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ComponentScores {
    pub delivery: f64,
    pub quality: f64,
    pub payment: f64,
    pub activity: f64,
    pub verification: f64,
}

/// Score deltas against earlier snapshots
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ScoreChanges {
    pub last_7_days: f64,
    pub last_30_days: f64,
    pub last_90_days: f64,
}

/// Overall scores from snapshots taken 7/30/90 days ago, where available
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct PreviousScores {
    pub days_7: Option<f64>,
    pub days_30: Option<f64>,
    pub days_90: Option<f64>,
}

/// Whether a scoring factor pushed the score up or down
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FactorCategory {
    Positive,
    Negative,
}

/// One explainability entry: which input moved the score, and by how much
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringFactor {
    pub category: FactorCategory,
    pub description: String,
    /// Contribution weight in score points
    pub weight: f64,
}

/// Urgency of a recommendation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Priority {
    High,
    Medium,
    Low,
}

/// An actionable suggestion for improving the score
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    pub id: String,
    pub priority: Priority,
    pub action: String,
    /// Estimated score-point gain, always positive
    pub expected_impact: f64,
}

/// Borrowing capacity derived from the tier policy and current utilization
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreditLimits {
    /// Maximum advance share of an order's value, as a decimal fraction
    pub max_advance_percentage: Decimal,
    pub max_advance_amount: Amount,
    /// Outstanding advance balance counted against the limit
    pub current_utilization: Amount,
    pub available_credit: Amount,
}

/// Calculation metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreMetadata {
    pub model_version: String,
    /// Confidence in the score given data volume and age, 0-100
    pub confidence_level: f64,
    pub calculation_duration_ms: u64,
}

/// A complete point-in-time credit score
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreditScoreResult {
    pub producer_id: ProducerId,
    /// Weighted overall score, clamped to [0, 100]
    pub overall_score: f64,
    pub risk_tier: RiskTier,
    pub component_scores: ComponentScores,
    /// Present only when prior snapshots were supplied
    pub score_changes: Option<ScoreChanges>,
    pub trend: ScoreTrend,
    pub scoring_factors: Vec<ScoringFactor>,
    pub recommendations: Vec<Recommendation>,
    pub credit_limits: CreditLimits,
    pub metadata: ScoreMetadata,
    pub calculated_at: DateTime<Utc>,
}

/// Hypothetical metric deltas for a what-if preview
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ScoreSimulation {
    /// Additional successfully completed deliveries
    pub additional_completed_deliveries: u32,
    /// How many of those hypothetical deliveries arrive on time
    pub additional_on_time_deliveries: u32,
    /// Shift in the average inspection score, in points
    pub quality_score_delta: f64,
    /// Additional advances repaid in full
    pub additional_repaid_advances: u32,
    /// Additional blockchain-verified transactions
    pub additional_verified_transactions: u32,
}

/// Outcome of a what-if simulation; nothing is persisted
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ScoreProjection {
    pub current_score: f64,
    pub projected_score: f64,
    pub score_difference: f64,
    pub tier_change: bool,
}
