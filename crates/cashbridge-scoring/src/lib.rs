//! CashBridge Scoring - Multi-factor producer credit scoring
//!
//! Five behavioral inputs (delivery, quality, payment, activity, blockchain
//! verification) become five 0-100 sub-scores, combined with fixed weights
//! into an overall score, a risk tier, and a trend. Every calculation also
//! produces explainability factors, ranked recommendations, tier-derived
//! credit limits, and a confidence level.
//!
//! # Invariants
//!
//! 1. Every sub-score and the overall score is clamped to [0, 100]
//! 2. The five component weights sum to exactly 100
//! 3. A producer with zero history lands below 70 (tier C), never NaN
//! 4. Results are point-in-time snapshots; nothing here mutates state

pub mod components;
pub mod calculator;

pub use calculator::{CreditScoreCalculator, ScoreWeights, MODEL_VERSION};
pub use components::{
    activity_score, delivery_score, payment_score, quality_score, verification_score,
};
