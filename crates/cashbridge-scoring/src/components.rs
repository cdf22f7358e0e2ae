//! Component scoring curves
//!
//! Pure functions from one metrics category to a sub-score in [0, 100].
//! All curves are monotonic in their inputs: higher success, punctuality,
//! quality, and verification raise the score; defaults and delays lower it.
//! Categories with no history resolve to a neutral-to-low baseline rather
//! than an undefined value, so new entrants are never silently scored high.

use cashbridge_types::{
    ActivityMetrics, BlockchainMetrics, DeliveryMetrics, PaymentMetrics, QualityMetrics,
    QualityTrend,
};

/// Baseline for categories where the producer has no track record yet
const NO_HISTORY_BASELINE: f64 = 30.0;

/// Baseline for a producer who has simply never borrowed
const NO_BORROWING_BASELINE: f64 = 40.0;

fn clamp(score: f64) -> f64 {
    score.clamp(0.0, 100.0)
}

/// Order fulfillment sub-score
///
/// Success and punctuality dominate; a small bonus rewards track-record
/// depth and late deliveries cost up to 15 points.
pub fn delivery_score(m: &DeliveryMetrics) -> f64 {
    if !m.has_history() {
        return NO_HISTORY_BASELINE;
    }
    let base = 55.0 * m.success_rate + 35.0 * m.on_time_rate;
    let depth_bonus = (f64::from(m.completed_orders) / 50.0).min(1.0) * 10.0;
    let delay_penalty = (m.average_delay_days.max(0.0) * 1.5).min(15.0);
    clamp(base + depth_bonus - delay_penalty)
}

/// Inspection quality sub-score
///
/// The average inspection score carries directly, adjusted for trend and
/// penalized for inconsistency.
pub fn quality_score(m: &QualityMetrics) -> f64 {
    if m.inspection_count == 0 {
        return NO_HISTORY_BASELINE;
    }
    let trend_adjustment = match m.trend {
        QualityTrend::Improving => 5.0,
        QualityTrend::Stable => 0.0,
        QualityTrend::Declining => -5.0,
    };
    let consistency_penalty = (m.score_std_dev.max(0.0) * 0.8).min(10.0);
    clamp(m.average_score + trend_adjustment - consistency_penalty)
}

/// Repayment behavior sub-score
///
/// Defaults are weighted harder than anything else; repaying early earns a
/// small bonus, chronic delay costs up to 20 points.
pub fn payment_score(m: &PaymentMetrics) -> f64 {
    if !m.has_history() {
        return NO_BORROWING_BASELINE;
    }
    let base = 95.0 - 120.0 * m.default_rate;
    let depth_bonus = (f64::from(m.advances_completed) / 10.0).min(1.0) * 5.0;
    let delay = m.average_repayment_delay_days;
    let delay_adjustment = if delay > 0.0 {
        -(delay * 2.0).min(20.0)
    } else {
        (-delay).min(5.0)
    };
    clamp(base + depth_bonus + delay_adjustment)
}

/// Account activity sub-score
///
/// Grows with account age, recent engagement, and order cadence. A brand-new
/// account scores zero here by design of the curve.
pub fn activity_score(m: &ActivityMetrics) -> f64 {
    let age = (f64::from(m.account_age_days) / 365.0).min(1.0) * 40.0;
    let engagement = (f64::from(m.active_days) / 180.0).min(1.0) * 20.0;
    let cadence = (m.orders_per_month.max(0.0) / 4.0).min(1.0) * 40.0;
    clamp(age + engagement + cadence)
}

/// Blockchain verification sub-score
pub fn verification_score(m: &BlockchainMetrics) -> f64 {
    if m.total_transactions == 0 {
        return NO_HISTORY_BASELINE;
    }
    clamp(100.0 * m.verification_rate)
}
