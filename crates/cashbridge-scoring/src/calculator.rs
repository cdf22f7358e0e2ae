//! The credit score calculator
//!
//! Combines the component curves into a [`CreditScoreResult`]: weighted
//! overall score, risk tier, trend against prior snapshots, explainability
//! factors, ranked recommendations, tier-derived credit limits, and a
//! confidence level. Also hosts the pure what-if simulation.

use std::time::Instant;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::debug;

use cashbridge_policy::CreditLimitPolicy;
use cashbridge_types::{
    ComponentScores, CreditLimits, CreditScoreResult, FactorCategory, PreviousScores, Priority,
    ProducerId, ProducerMetrics, QualityTrend, Recommendation, Result, RiskTier, ScoreChanges,
    ScoreMetadata, ScoreProjection, ScoreSimulation, ScoreTrend, ScoringFactor,
};

use crate::components::{
    activity_score, delivery_score, payment_score, quality_score, verification_score,
};

/// Scoring model version recorded on every result
pub const MODEL_VERSION: &str = "1.4.2";

/// Deltas this close to zero count as no movement when classifying the trend
const STABILITY_EPSILON: f64 = 1.0;

/// Fixed component weights
///
/// The five weights must sum to exactly 100; this is a configuration
/// invariant, not a runtime input.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ScoreWeights {
    pub delivery: f64,
    pub quality: f64,
    pub payment: f64,
    pub activity: f64,
    pub verification: f64,
}

impl ScoreWeights {
    pub const fn standard() -> Self {
        Self {
            delivery: 30.0,
            quality: 20.0,
            payment: 25.0,
            activity: 10.0,
            verification: 15.0,
        }
    }

    pub fn total(&self) -> f64 {
        self.delivery + self.quality + self.payment + self.activity + self.verification
    }
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self::standard()
    }
}

/// Classify score movement over the ordered deltas (90d, 30d, 7d)
///
/// Deltas within the stability epsilon are treated as zero. All
/// non-negative with at least one positive is Improving; all non-positive
/// with at least one negative is Declining; anything mixed is Stable.
pub fn classify_trend(changes: &ScoreChanges) -> ScoreTrend {
    let deltas = [changes.last_90_days, changes.last_30_days, changes.last_7_days];
    let normalized = deltas.map(|d| if d.abs() <= STABILITY_EPSILON { 0.0 } else { d });

    let any_positive = normalized.iter().any(|d| *d > 0.0);
    let any_negative = normalized.iter().any(|d| *d < 0.0);

    match (any_positive, any_negative) {
        (true, false) => ScoreTrend::Improving,
        (false, true) => ScoreTrend::Declining,
        _ => ScoreTrend::Stable,
    }
}

/// The scoring engine
///
/// Stateless apart from configuration; gateways fetch all inputs before a
/// calculation starts, so a call is pure arithmetic.
#[derive(Debug, Clone, Default)]
pub struct CreditScoreCalculator {
    weights: ScoreWeights,
    limit_policy: CreditLimitPolicy,
}

impl CreditScoreCalculator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compute a complete point-in-time credit score
    pub fn calculate(
        &self,
        producer_id: &ProducerId,
        metrics: &ProducerMetrics,
        previous: Option<&PreviousScores>,
    ) -> Result<CreditScoreResult> {
        metrics.validate()?;
        debug_assert!((self.weights.total() - 100.0).abs() < f64::EPSILON);
        let started = Instant::now();

        let component_scores = ComponentScores {
            delivery: delivery_score(&metrics.delivery),
            quality: quality_score(&metrics.quality),
            payment: payment_score(&metrics.payment),
            activity: activity_score(&metrics.activity),
            verification: verification_score(&metrics.blockchain),
        };

        let w = &self.weights;
        let overall_score = ((component_scores.delivery * w.delivery
            + component_scores.quality * w.quality
            + component_scores.payment * w.payment
            + component_scores.activity * w.activity
            + component_scores.verification * w.verification)
            / w.total())
        .clamp(0.0, 100.0);

        let risk_tier = RiskTier::from_score(overall_score);

        let score_changes = previous.map(|p| ScoreChanges {
            last_7_days: p.days_7.map(|s| overall_score - s).unwrap_or(0.0),
            last_30_days: p.days_30.map(|s| overall_score - s).unwrap_or(0.0),
            last_90_days: p.days_90.map(|s| overall_score - s).unwrap_or(0.0),
        });
        let trend = score_changes
            .as_ref()
            .map(classify_trend)
            .unwrap_or_default();

        let limits = self.limit_policy.limits_for(risk_tier);
        let current_utilization = metrics.payment.outstanding_balance;
        let credit_limits = CreditLimits {
            max_advance_percentage: limits.max_advance_percentage,
            max_advance_amount: limits.max_advance_amount,
            current_utilization,
            available_credit: limits.max_advance_amount.saturating_sub(current_utilization),
        };

        let result = CreditScoreResult {
            producer_id: producer_id.clone(),
            overall_score,
            risk_tier,
            component_scores,
            score_changes,
            trend,
            scoring_factors: build_factors(metrics),
            recommendations: build_recommendations(metrics),
            credit_limits,
            metadata: ScoreMetadata {
                model_version: MODEL_VERSION.to_string(),
                confidence_level: confidence_level(metrics),
                calculation_duration_ms: started.elapsed().as_millis() as u64,
            },
            calculated_at: Utc::now(),
        };

        debug!(
            producer = %producer_id,
            score = result.overall_score,
            tier = %result.risk_tier,
            "credit score calculated"
        );
        Ok(result)
    }

    /// What-if preview: re-run the calculation with hypothetical deltas
    ///
    /// Pure: nothing is persisted and the input metrics are untouched.
    pub fn simulate(
        &self,
        producer_id: &ProducerId,
        metrics: &ProducerMetrics,
        simulation: &ScoreSimulation,
    ) -> Result<ScoreProjection> {
        let current = self.calculate(producer_id, metrics, None)?;
        let adjusted = apply_simulation(metrics, simulation);
        let projected = self.calculate(producer_id, &adjusted, None)?;

        Ok(ScoreProjection {
            current_score: current.overall_score,
            projected_score: projected.overall_score,
            score_difference: projected.overall_score - current.overall_score,
            tier_change: current.risk_tier != projected.risk_tier,
        })
    }
}

/// Fold hypothetical deltas into a copy of the metrics
fn apply_simulation(metrics: &ProducerMetrics, sim: &ScoreSimulation) -> ProducerMetrics {
    let mut m = metrics.clone();

    if sim.additional_completed_deliveries > 0 {
        let d = &mut m.delivery;
        let closed = f64::from(d.completed_orders + d.defaulted_orders + d.cancelled_orders);
        let successes = d.success_rate * closed;
        let on_time = d.on_time_rate * f64::from(d.completed_orders);
        let added = f64::from(sim.additional_completed_deliveries);
        let added_on_time =
            f64::from(sim.additional_on_time_deliveries.min(sim.additional_completed_deliveries));

        d.completed_orders += sim.additional_completed_deliveries;
        d.success_rate = ((successes + added) / (closed + added)).clamp(0.0, 1.0);
        d.on_time_rate =
            ((on_time + added_on_time) / f64::from(d.completed_orders)).clamp(0.0, 1.0);
    }

    if sim.quality_score_delta != 0.0 && m.quality.inspection_count > 0 {
        m.quality.average_score =
            (m.quality.average_score + sim.quality_score_delta).clamp(0.0, 100.0);
    }

    if sim.additional_repaid_advances > 0 {
        let p = &mut m.payment;
        let closed = f64::from(p.advances_completed + p.advances_defaulted);
        let defaulted = f64::from(p.advances_defaulted);
        let added = f64::from(sim.additional_repaid_advances);
        p.advances_completed += sim.additional_repaid_advances;
        p.default_rate = (defaulted / (closed + added)).clamp(0.0, 1.0);
    }

    if sim.additional_verified_transactions > 0 {
        let b = &mut m.blockchain;
        b.verified_transactions += sim.additional_verified_transactions;
        b.total_transactions += sim.additional_verified_transactions;
        b.verification_rate =
            f64::from(b.verified_transactions) / f64::from(b.total_transactions);
    }

    m
}

/// Confidence grows with data volume and account age; a brand-new account
/// sits near zero
fn confidence_level(m: &ProducerMetrics) -> f64 {
    let orders = (f64::from(m.delivery.completed_orders) / 50.0).min(1.0) * 30.0;
    let inspections = (f64::from(m.quality.inspection_count) / 20.0).min(1.0) * 25.0;
    let age = (f64::from(m.activity.account_age_days) / 730.0).min(1.0) * 25.0;
    let verified = (f64::from(m.blockchain.verified_transactions) / 100.0).min(1.0) * 20.0;
    (orders + inspections + age + verified).clamp(0.0, 100.0)
}

fn positive(description: String, weight: f64) -> ScoringFactor {
    ScoringFactor {
        category: FactorCategory::Positive,
        description,
        weight,
    }
}

fn negative(description: String, weight: f64) -> ScoringFactor {
    ScoringFactor {
        category: FactorCategory::Negative,
        description,
        weight,
    }
}

/// Explainability: which inputs pushed the score, and which way
///
/// Non-empty for any producer with real history.
fn build_factors(m: &ProducerMetrics) -> Vec<ScoringFactor> {
    let mut factors = Vec::new();

    let d = &m.delivery;
    if d.has_history() {
        if d.success_rate >= 0.85 {
            factors.push(positive(
                format!("{:.0}% of orders completed successfully", d.success_rate * 100.0),
                9.0,
            ));
        } else if d.success_rate < 0.60 {
            factors.push(negative(
                format!("Only {:.0}% of orders completed successfully", d.success_rate * 100.0),
                9.0,
            ));
        }
        if d.on_time_rate >= 0.85 {
            factors.push(positive(
                format!("{:.0}% of deliveries arrived on time", d.on_time_rate * 100.0),
                6.0,
            ));
        } else if d.on_time_rate < 0.60 {
            factors.push(negative(
                format!("Only {:.0}% of deliveries arrived on time", d.on_time_rate * 100.0),
                6.0,
            ));
        }
        if d.defaulted_orders > 0 {
            factors.push(negative(
                format!("{} defaulted order(s) on record", d.defaulted_orders),
                7.0,
            ));
        }
    }

    let q = &m.quality;
    if q.inspection_count > 0 {
        if q.average_score >= 85.0 {
            factors.push(positive(
                format!("Average inspection score of {:.0}", q.average_score),
                7.0,
            ));
        } else if q.average_score < 60.0 {
            factors.push(negative(
                format!("Low average inspection score of {:.0}", q.average_score),
                7.0,
            ));
        }
        match q.trend {
            QualityTrend::Improving => {
                factors.push(positive("Inspection scores trending upward".to_string(), 4.0))
            }
            QualityTrend::Declining => {
                factors.push(negative("Inspection scores trending downward".to_string(), 4.0))
            }
            QualityTrend::Stable => {}
        }
    }

    let p = &m.payment;
    if p.has_history() {
        if p.default_rate == 0.0 && p.advances_completed > 0 {
            factors.push(positive(
                format!("All {} past advance(s) repaid in full", p.advances_completed),
                10.0,
            ));
        } else if p.default_rate > 0.10 {
            factors.push(negative(
                format!("{:.0}% of past advances defaulted", p.default_rate * 100.0),
                12.0,
            ));
        }
        if p.advances_completed > 0 && p.average_repayment_delay_days <= 0.0 {
            factors.push(positive("Advances repaid on or ahead of schedule".to_string(), 5.0));
        } else if p.average_repayment_delay_days > 5.0 {
            factors.push(negative(
                format!(
                    "Repayments average {:.0} days late",
                    p.average_repayment_delay_days
                ),
                5.0,
            ));
        }
    }

    let b = &m.blockchain;
    if b.total_transactions > 0 {
        if b.verification_rate >= 0.80 {
            factors.push(positive(
                format!("{:.0}% of transactions blockchain-verified", b.verification_rate * 100.0),
                6.0,
            ));
        } else if b.verification_rate < 0.30 {
            factors.push(negative(
                format!(
                    "Only {:.0}% of transactions blockchain-verified",
                    b.verification_rate * 100.0
                ),
                4.0,
            ));
        }
    }

    let a = &m.activity;
    if a.account_age_days >= 365 {
        factors.push(positive(
            format!("Account active for {} days", a.account_age_days),
            4.0,
        ));
    }
    if a.orders_per_month >= 2.0 {
        factors.push(positive(
            format!("Steady cadence of {:.1} orders per month", a.orders_per_month),
            3.0,
        ));
    }

    if factors.is_empty() && (d.has_history() || p.has_history()) {
        factors.push(positive(
            "Active trading history with no major risk signals".to_string(),
            2.0,
        ));
    }

    factors
}

/// Actionable suggestions, ranked by expected score impact
fn build_recommendations(m: &ProducerMetrics) -> Vec<Recommendation> {
    let mut recs = Vec::new();

    let d = &m.delivery;
    if !d.has_history() {
        recs.push(Recommendation {
            id: "complete-first-orders".to_string(),
            priority: Priority::High,
            action: "Complete your first orders to establish a delivery track record".to_string(),
            expected_impact: 15.0,
        });
    } else {
        if d.on_time_rate < 0.85 {
            recs.push(Recommendation {
                id: "improve-delivery-punctuality".to_string(),
                priority: if d.on_time_rate < 0.60 {
                    Priority::High
                } else {
                    Priority::Medium
                },
                action: "Deliver on schedule to raise your on-time rate".to_string(),
                expected_impact: ((0.85 - d.on_time_rate) * 25.0).max(1.0),
            });
        }
        if d.success_rate < 0.90 {
            recs.push(Recommendation {
                id: "reduce-order-defaults".to_string(),
                priority: if d.success_rate < 0.70 {
                    Priority::High
                } else {
                    Priority::Medium
                },
                action: "Avoid cancelling or defaulting on accepted orders".to_string(),
                expected_impact: ((0.90 - d.success_rate) * 30.0).max(1.0),
            });
        }
    }

    let q = &m.quality;
    if q.inspection_count == 0 {
        recs.push(Recommendation {
            id: "schedule-quality-inspections".to_string(),
            priority: Priority::Medium,
            action: "Schedule quality inspections to build a quality record".to_string(),
            expected_impact: 8.0,
        });
    } else if q.average_score < 85.0 {
        recs.push(Recommendation {
            id: "raise-inspection-scores".to_string(),
            priority: if q.average_score < 60.0 {
                Priority::High
            } else {
                Priority::Medium
            },
            action: "Improve product handling to raise inspection scores".to_string(),
            expected_impact: ((85.0 - q.average_score) * 0.2).max(1.0),
        });
    }

    let p = &m.payment;
    if p.default_rate > 0.0 {
        recs.push(Recommendation {
            id: "restore-repayment-record".to_string(),
            priority: Priority::High,
            action: "Repay active advances in full to rebuild repayment history".to_string(),
            expected_impact: (p.default_rate * 30.0).max(1.0),
        });
    } else if p.average_repayment_delay_days > 0.0 {
        recs.push(Recommendation {
            id: "repay-on-schedule".to_string(),
            priority: Priority::Medium,
            action: "Settle advance balances by their due date".to_string(),
            expected_impact: (p.average_repayment_delay_days * 0.8).clamp(1.0, 8.0),
        });
    }

    let b = &m.blockchain;
    if b.verification_rate < 0.80 {
        recs.push(Recommendation {
            id: "verify-supply-chain-records".to_string(),
            priority: Priority::Low,
            action: "Anchor more of your transactions for blockchain verification".to_string(),
            expected_impact: ((0.80 - b.verification_rate) * 12.0).max(1.0),
        });
    }

    if m.activity.orders_per_month < 2.0 {
        recs.push(Recommendation {
            id: "increase-order-cadence".to_string(),
            priority: Priority::Low,
            action: "Take on orders more regularly to demonstrate steady activity".to_string(),
            expected_impact: ((2.0 - m.activity.orders_per_month) * 2.0).max(1.0),
        });
    }

    recs.sort_by(|a, b| {
        b.expected_impact
            .partial_cmp(&a.expected_impact)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    recs
}

#[cfg(test)]
mod tests {
    use super::*;
    use cashbridge_types::{
        ActivityMetrics, Amount, BlockchainMetrics, DeliveryMetrics, PaymentMetrics,
        QualityMetrics,
    };

    fn established_metrics() -> ProducerMetrics {
        ProducerMetrics {
            delivery: DeliveryMetrics {
                completed_orders: 48,
                defaulted_orders: 1,
                cancelled_orders: 1,
                success_rate: 0.96,
                on_time_rate: 0.92,
                average_delay_days: 0.8,
                total_volume: 12_500.0,
                total_value: Amount::from_major(240_000),
            },
            quality: QualityMetrics {
                average_score: 88.0,
                score_std_dev: 3.0,
                trend: QualityTrend::Stable,
                inspection_count: 22,
                grade_distribution: Default::default(),
            },
            payment: PaymentMetrics {
                advances_completed: 12,
                advances_defaulted: 0,
                advances_active: 1,
                default_rate: 0.0,
                average_repayment_delay_days: -1.0,
                total_borrowed: Amount::from_major(95_000),
                total_repaid: Amount::from_major(90_000),
                outstanding_balance: Amount::from_major(5_000),
            },
            activity: ActivityMetrics {
                account_age_days: 800,
                active_days: 210,
                orders_per_month: 3.5,
                first_order_date: None,
                last_order_date: None,
            },
            blockchain: BlockchainMetrics {
                verified_transactions: 60,
                total_transactions: 75,
                verification_rate: 0.8,
                verification_hashes: vec![],
                last_sync: None,
            },
        }
    }

    #[test]
    fn test_weights_sum_to_exactly_100() {
        assert_eq!(ScoreWeights::standard().total(), 100.0);
    }

    #[test]
    fn test_zero_history_scores_low_tier_c() {
        let calc = CreditScoreCalculator::new();
        let result = calc
            .calculate(&ProducerId::new(), &ProducerMetrics::default(), None)
            .unwrap();

        assert!(result.overall_score < 70.0);
        assert_eq!(result.risk_tier, RiskTier::C);
        assert!(result.overall_score.is_finite());
        assert!(result.score_changes.is_none());
        assert_eq!(result.trend, ScoreTrend::Stable);
        assert!(result.metadata.confidence_level < 10.0);
        // A new entrant still gets guidance
        assert!(!result.recommendations.is_empty());
    }

    #[test]
    fn test_established_producer_scores_high_with_confidence() {
        let calc = CreditScoreCalculator::new();
        let result = calc
            .calculate(&ProducerId::new(), &established_metrics(), None)
            .unwrap();

        assert!(result.overall_score >= 85.0, "got {}", result.overall_score);
        assert!(result.overall_score <= 100.0);
        assert!(result.metadata.confidence_level > 60.0);
        assert!(!result.scoring_factors.is_empty());
        assert_eq!(result.metadata.model_version, MODEL_VERSION);
        // Pure arithmetic over pre-fetched inputs; nowhere near the 500ms budget
        assert!(result.metadata.calculation_duration_ms < 500);
    }

    #[test]
    fn test_component_scores_all_in_range() {
        let calc = CreditScoreCalculator::new();
        for metrics in [ProducerMetrics::default(), established_metrics()] {
            let c = calc
                .calculate(&ProducerId::new(), &metrics, None)
                .unwrap()
                .component_scores;
            for score in [c.delivery, c.quality, c.payment, c.activity, c.verification] {
                assert!((0.0..=100.0).contains(&score));
            }
        }
    }

    #[test]
    fn test_credit_limits_subtract_utilization() {
        let calc = CreditScoreCalculator::new();
        let result = calc
            .calculate(&ProducerId::new(), &established_metrics(), None)
            .unwrap();

        let limits = &result.credit_limits;
        assert_eq!(limits.current_utilization, Amount::from_major(5_000));
        assert_eq!(
            limits.available_credit,
            limits.max_advance_amount.saturating_sub(limits.current_utilization)
        );
    }

    #[test]
    fn test_score_changes_computed_from_snapshots() {
        let calc = CreditScoreCalculator::new();
        let previous = PreviousScores {
            days_7: Some(80.0),
            days_30: Some(75.0),
            days_90: Some(70.0),
        };
        let result = calc
            .calculate(&ProducerId::new(), &established_metrics(), Some(&previous))
            .unwrap();

        let changes = result.score_changes.expect("changes present");
        assert!(changes.last_90_days > changes.last_7_days);
        assert_eq!(result.trend, ScoreTrend::Improving);
    }

    #[test]
    fn test_trend_classification() {
        let improving = ScoreChanges {
            last_7_days: 1.5,
            last_30_days: 4.0,
            last_90_days: 9.0,
        };
        assert_eq!(classify_trend(&improving), ScoreTrend::Improving);

        let declining = ScoreChanges {
            last_7_days: -2.0,
            last_30_days: -3.5,
            last_90_days: -8.0,
        };
        assert_eq!(classify_trend(&declining), ScoreTrend::Declining);

        let near_zero = ScoreChanges {
            last_7_days: 0.4,
            last_30_days: -0.8,
            last_90_days: 0.9,
        };
        assert_eq!(classify_trend(&near_zero), ScoreTrend::Stable);

        let mixed = ScoreChanges {
            last_7_days: 3.0,
            last_30_days: -4.0,
            last_90_days: 2.0,
        };
        assert_eq!(classify_trend(&mixed), ScoreTrend::Stable);
    }

    #[test]
    fn test_recommendations_ranked_by_impact() {
        let calc = CreditScoreCalculator::new();
        let mut metrics = established_metrics();
        metrics.delivery.on_time_rate = 0.55;
        metrics.quality.average_score = 62.0;
        metrics.blockchain.verification_rate = 0.4;

        let recs = calc
            .calculate(&ProducerId::new(), &metrics, None)
            .unwrap()
            .recommendations;

        assert!(recs.len() >= 2);
        for pair in recs.windows(2) {
            assert!(pair[0].expected_impact >= pair[1].expected_impact);
        }
        for rec in &recs {
            assert!(rec.expected_impact > 0.0);
        }
    }

    #[test]
    fn test_simulation_projects_improvement_without_mutation() {
        let calc = CreditScoreCalculator::new();
        let metrics = ProducerMetrics {
            delivery: DeliveryMetrics {
                completed_orders: 6,
                defaulted_orders: 2,
                cancelled_orders: 1,
                success_rate: 0.67,
                on_time_rate: 0.67,
                average_delay_days: 3.0,
                ..Default::default()
            },
            ..Default::default()
        };
        let before = metrics.clone();

        let simulation = ScoreSimulation {
            additional_completed_deliveries: 10,
            additional_on_time_deliveries: 10,
            additional_repaid_advances: 2,
            ..Default::default()
        };
        let projection = calc
            .simulate(&ProducerId::new(), &metrics, &simulation)
            .unwrap();

        assert!(projection.projected_score > projection.current_score);
        assert!(
            (projection.score_difference
                - (projection.projected_score - projection.current_score))
                .abs()
                < 1e-9
        );
        // Inputs untouched
        assert_eq!(metrics.delivery.completed_orders, before.delivery.completed_orders);
        assert_eq!(metrics.delivery.success_rate, before.delivery.success_rate);
    }

    #[test]
    fn test_simulation_detects_tier_change() {
        let calc = CreditScoreCalculator::new();
        let mut metrics = established_metrics();
        // Drag the producer just below tier A
        metrics.quality.average_score = 70.0;
        metrics.blockchain.verification_rate = 0.55;

        let current = calc.calculate(&ProducerId::new(), &metrics, None).unwrap();
        assert_eq!(current.risk_tier, RiskTier::B);

        let simulation = ScoreSimulation {
            quality_score_delta: 25.0,
            additional_verified_transactions: 300,
            ..Default::default()
        };
        let projection = calc
            .simulate(&ProducerId::new(), &metrics, &simulation)
            .unwrap();
        assert!(projection.tier_change);
    }

    #[test]
    fn test_invalid_metrics_rejected() {
        let calc = CreditScoreCalculator::new();
        let mut metrics = ProducerMetrics::default();
        metrics.payment.default_rate = 2.0;
        assert!(calc.calculate(&ProducerId::new(), &metrics, None).is_err());
    }
}
