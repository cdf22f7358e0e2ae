//! The advance contract engine
//!
//! Orchestrates the full advance lifecycle: term calculation, idempotent
//! creation, capital allocation, disbursement, repayment application, and
//! default handling. The allowed-transition table lives on
//! [`AdvanceStatus`]; the engine enforces it and records every transition in
//! the append-only status history.
//!
//! All state-mutating operations are serialized through a write gate, the
//! in-process stand-in for the storage transaction: contract update, ledger
//! row, audit row, and pool call commit or fail together, and the balance
//! invariant holds under interleaved repayments.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;
use tracing::{info, warn};

use cashbridge_policy::{AdvanceFeePolicy, EnginePolicy};
use cashbridge_scoring::CreditScoreCalculator;
use cashbridge_types::{
    AdvanceContract, AdvanceId, AdvanceRequest, AdvanceStatus, AdvanceStatusHistory,
    AdvanceTerms, AdvanceTransaction, Amount, ApprovalMethod, BridgeError, CreditScoreResult,
    DefaultOutcome, Disbursement, HistoryId, OrderId, ProducerId, ReleaseType, RepaymentReceipt,
    RepaymentRequest, Result, StatusTransition, TransactionId, TransactionKind,
};

use crate::gateway::{LiquidityPoolGateway, OrderDataGateway, ScoringDataGateway};
use crate::store::{AdvanceStore, CreateOutcome};

/// Actor recorded for engine-initiated transitions
const SYSTEM_ACTOR: &str = "system";

/// The advance lifecycle engine
///
/// Gateways and the store are injected; the engine holds no global state.
pub struct AdvanceContractEngine {
    store: Arc<dyn AdvanceStore>,
    orders: Arc<dyn OrderDataGateway>,
    scoring: Arc<dyn ScoringDataGateway>,
    pools: Arc<dyn LiquidityPoolGateway>,
    calculator: CreditScoreCalculator,
    fee_policy: AdvanceFeePolicy,
    policy: EnginePolicy,
    /// Serializes state-mutating operations (the storage-transaction stand-in)
    write_gate: Mutex<()>,
}

impl AdvanceContractEngine {
    pub fn new(
        store: Arc<dyn AdvanceStore>,
        orders: Arc<dyn OrderDataGateway>,
        scoring: Arc<dyn ScoringDataGateway>,
        pools: Arc<dyn LiquidityPoolGateway>,
    ) -> Self {
        Self {
            store,
            orders,
            scoring,
            pools,
            calculator: CreditScoreCalculator::new(),
            fee_policy: AdvanceFeePolicy,
            policy: EnginePolicy::default(),
            write_gate: Mutex::new(()),
        }
    }

    pub fn with_engine_policy(mut self, policy: EnginePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Compute terms for a prospective advance
    ///
    /// Ineligibility is reported as a structured result; errors are reserved
    /// for missing orders, ownership mismatches, existing contracts, and a
    /// failing scoring collaborator.
    pub async fn calculate_advance_terms(
        &self,
        farmer_id: &ProducerId,
        order_id: &OrderId,
        requested_amount: Option<Amount>,
    ) -> Result<AdvanceTerms> {
        let order = self
            .orders
            .order(order_id)
            .await?
            .ok_or_else(|| BridgeError::OrderNotFound {
                order_id: order_id.to_string(),
            })?;

        if order.producer_id != *farmer_id {
            return Err(BridgeError::OrderOwnershipMismatch {
                order_id: order_id.to_string(),
                farmer_id: farmer_id.to_string(),
            });
        }

        if let Some(existing) = self.store.fetch_by_order(order_id).await? {
            if !existing.is_deleted() {
                return Err(BridgeError::DuplicateAdvance {
                    order_id: order_id.to_string(),
                });
            }
        }

        let score = self.current_score(farmer_id).await?;
        let fees = self.fee_policy.fees_for(score.risk_tier);

        let policy_cap = order.total_amount.apply_rate(fees.max_advance_rate)?;
        let advance_amount = requested_amount
            .map(|requested| requested.min(policy_cap))
            .unwrap_or(policy_cap);

        let mut reasons = Vec::new();
        if !order.advance_eligible {
            reasons.push("order is not marked advance-eligible".to_string());
        }
        if advance_amount < fees.minimum_advance {
            reasons.push(format!(
                "advance of {} is below the tier minimum of {}",
                advance_amount, fees.minimum_advance
            ));
        }

        let farmer_fee_amount = advance_amount.apply_rate(fees.farmer_fee_rate)?;
        let buyer_fee_amount = advance_amount.apply_rate(fees.buyer_fee_rate)?;
        let platform_fee_total = farmer_fee_amount.checked_add(buyer_fee_amount)?;
        let net_to_farmer = advance_amount.checked_sub(farmer_fee_amount)?;

        Ok(AdvanceTerms {
            order_id: order.order_id,
            farmer_id: order.producer_id,
            buyer_id: order.buyer_id,
            eligible: reasons.is_empty(),
            ineligibility_reasons: reasons,
            credit_score: score.overall_score,
            risk_tier: score.risk_tier,
            order_amount: order.total_amount,
            advance_percentage: fees.max_advance_rate,
            advance_amount,
            farmer_fee_percentage: fees.farmer_fee_rate,
            farmer_fee_amount,
            buyer_fee_percentage: fees.buyer_fee_rate,
            buyer_fee_amount,
            platform_fee_total,
            net_to_farmer,
            expected_delivery_date: order.expected_delivery_date,
            due_date: order.expected_delivery_date + Duration::days(self.policy.grace_period_days),
        })
    }

    /// Create an advance contract, idempotently per order
    ///
    /// A retried or concurrent duplicate request returns the existing
    /// contract; callers never end up with two contracts for one order.
    pub async fn request_advance(&self, request: AdvanceRequest) -> Result<AdvanceContract> {
        let _gate = self.write_gate.lock().await;

        let terms = match self
            .calculate_advance_terms(
                &request.farmer_id,
                &request.order_id,
                request.requested_amount,
            )
            .await
        {
            Ok(terms) => terms,
            // A contract already holds this order: resolve to it
            Err(BridgeError::DuplicateAdvance { .. }) => {
                return self
                    .store
                    .fetch_by_order(&request.order_id)
                    .await?
                    .ok_or_else(|| {
                        BridgeError::invariant("duplicate reported but no contract holds the order")
                    });
            }
            Err(err) => return Err(err),
        };

        if !terms.eligible {
            return Err(BridgeError::OrderIneligible {
                order_id: request.order_id.to_string(),
                reasons: terms.ineligibility_reasons,
            });
        }

        let pool = self
            .pools
            .find_available_pool(terms.advance_amount)
            .await?
            .ok_or_else(|| BridgeError::NoPoolAvailable {
                required: terms.advance_amount.to_string(),
            })?;

        let now = Utc::now();
        let auto_approved = terms.credit_score >= self.policy.auto_approval_threshold;
        let contract_number = self.store.next_contract_number().await?;
        let candidate = build_contract(&terms, contract_number, auto_approved, now);

        let mut contract = match self.store.insert_or_fetch(candidate).await? {
            CreateOutcome::AlreadyExists(existing) => {
                info!(order = %request.order_id, advance = %existing.id,
                    "concurrent duplicate resolved to existing advance");
                return Ok(existing);
            }
            CreateOutcome::Created(contract) => contract,
        };

        self.append_history(
            &contract.id,
            None,
            contract.status,
            &request.actor,
            Some("advance requested".to_string()),
        )
        .await?;

        match self
            .pools
            .allocate_capital(&pool.pool_id, &contract.id, contract.advance_amount)
            .await
        {
            Ok(allocation) => {
                contract.pool_id = Some(allocation.pool_id);
                contract.updated_at = Utc::now();
                self.store.persist(&contract).await?;
            }
            Err(err) => {
                warn!(advance = %contract.id, %err, "capital allocation failed; cancelling advance");
                let previous = contract.status;
                contract.status = AdvanceStatus::Cancelled;
                contract.updated_at = Utc::now();
                self.store.persist(&contract).await?;
                self.append_history(
                    &contract.id,
                    Some(previous),
                    AdvanceStatus::Cancelled,
                    SYSTEM_ACTOR,
                    Some(format!("capital allocation failed: {err}")),
                )
                .await?;
                return Err(err);
            }
        }

        if let Err(err) = self.orders.mark_advance_requested(&request.order_id).await {
            warn!(order = %request.order_id, %err, "failed to flag order as advance-requested");
        }

        info!(
            contract = %contract.contract_number,
            advance = %contract.id,
            amount = %contract.advance_amount,
            auto_approved,
            "advance created"
        );
        Ok(contract)
    }

    /// Apply a lifecycle transition from the allowed table
    pub async fn transition_status(
        &self,
        advance_id: &AdvanceId,
        new_status: AdvanceStatus,
        actor: &str,
        reason: Option<String>,
    ) -> Result<StatusTransition> {
        let _gate = self.write_gate.lock().await;

        let mut contract = self.store.fetch(advance_id).await?;
        let previous = contract.status;
        if !previous.can_transition_to(new_status) {
            return Err(BridgeError::InvalidTransition {
                from: previous.to_string(),
                to: new_status.to_string(),
            });
        }

        contract.status = new_status;
        if new_status == AdvanceStatus::Approved && contract.approved_at.is_none() {
            contract.approval_method = Some(ApprovalMethod::Manual);
            contract.approved_at = Some(Utc::now());
        }
        contract.updated_at = Utc::now();
        self.store.persist(&contract).await?;
        self.append_history(advance_id, Some(previous), new_status, actor, reason)
            .await?;

        info!(advance = %advance_id, %previous, %new_status, "advance transitioned");
        Ok(StatusTransition {
            previous_status: previous,
            new_status,
        })
    }

    /// Pay out the net advance amount to the farmer
    pub async fn disburse_advance(
        &self,
        advance_id: &AdvanceId,
        reference: &str,
        fee_amount: Option<Amount>,
    ) -> Result<Disbursement> {
        let _gate = self.write_gate.lock().await;

        let mut contract = self.store.fetch(advance_id).await?;
        if contract.status != AdvanceStatus::Approved {
            return Err(BridgeError::InvalidState {
                operation: "disbursement".to_string(),
                expected: AdvanceStatus::Approved.to_string(),
                actual: contract.status.to_string(),
            });
        }

        // Optional cross-check against caller bookkeeping
        if let Some(fee) = fee_amount {
            if fee != contract.platform_fee_total {
                return Err(BridgeError::DisbursementFeeMismatch {
                    expected: contract.platform_fee_total.to_string(),
                    provided: fee.to_string(),
                });
            }
        }

        let disbursed_at = Utc::now();
        self.store
            .append_transaction(AdvanceTransaction {
                id: TransactionId::new(),
                advance_id: advance_id.clone(),
                kind: TransactionKind::Disbursement,
                amount: contract.net_to_farmer,
                method: "payout".to_string(),
                reference: reference.to_string(),
                occurred_at: disbursed_at,
            })
            .await?;

        let previous = contract.status;
        contract.status = AdvanceStatus::Disbursed;
        contract.disbursed_at = Some(disbursed_at);
        contract.updated_at = disbursed_at;
        self.store.persist(&contract).await?;
        self.append_history(
            advance_id,
            Some(previous),
            AdvanceStatus::Disbursed,
            SYSTEM_ACTOR,
            Some(format!("disbursed, reference {reference}")),
        )
        .await?;

        info!(advance = %advance_id, amount = %contract.net_to_farmer, reference, "advance disbursed");
        Ok(Disbursement {
            reference: reference.to_string(),
            disbursed_at,
        })
    }

    /// Apply a repayment against the remaining balance
    ///
    /// Repayments never overpay: at most the remaining balance is applied and
    /// any excess comes back to the caller on the receipt. Full repayment
    /// completes the contract, releases the rest of the pool allocation, and
    /// fires a non-blocking score recalculation.
    pub async fn process_repayment(&self, request: RepaymentRequest) -> Result<RepaymentReceipt> {
        let _gate = self.write_gate.lock().await;

        let mut contract = self.store.fetch(&request.advance_id).await?;
        if !contract.status.accepts_repayment() {
            return Err(BridgeError::InvalidState {
                operation: "repayment".to_string(),
                expected: "ACTIVE, PARTIALLY_REPAID or OVERDUE".to_string(),
                actual: contract.status.to_string(),
            });
        }
        if !request.amount.is_positive() {
            return Err(BridgeError::NegativeAmount {
                context: "repayment amount".to_string(),
            });
        }

        let amount_applied = request.amount.min(contract.remaining_balance);
        let overpayment = request.amount.saturating_sub(contract.remaining_balance);
        let remaining_balance = contract.remaining_balance.checked_sub(amount_applied)?;
        let is_fully_repaid = remaining_balance.is_zero();

        let pool_id = contract
            .pool_id
            .clone()
            .ok_or_else(|| BridgeError::invariant("repayment on an advance with no pool allocation"))?;
        let release_type = if is_fully_repaid {
            ReleaseType::FullRepayment
        } else {
            ReleaseType::PartialRepayment
        };

        // Pool release comes first: if the gateway refuses, nothing is written
        self.pools
            .release_capital(&pool_id, &contract.id, amount_applied, release_type)
            .await?;

        let now = Utc::now();
        self.store
            .append_transaction(AdvanceTransaction {
                id: TransactionId::new(),
                advance_id: contract.id.clone(),
                kind: TransactionKind::Repayment,
                amount: amount_applied,
                method: request.method.clone(),
                reference: request.reference.clone(),
                occurred_at: now,
            })
            .await?;

        let previous = contract.status;
        contract.amount_repaid = contract.amount_repaid.checked_add(amount_applied)?;
        contract.remaining_balance = remaining_balance;
        let new_status = if is_fully_repaid {
            contract.repaid_at = Some(now);
            AdvanceStatus::Completed
        } else {
            AdvanceStatus::PartiallyRepaid
        };
        contract.status = new_status;
        contract.updated_at = now;

        if !contract.balance_invariant_holds() {
            return Err(BridgeError::invariant(format!(
                "balance mismatch on advance {}: {} repaid + {} remaining != {} advanced",
                contract.id, contract.amount_repaid, contract.remaining_balance,
                contract.advance_amount
            )));
        }
        self.store.persist(&contract).await?;
        self.append_history(
            &contract.id,
            Some(previous),
            new_status,
            SYSTEM_ACTOR,
            Some(format!(
                "repayment of {} via {:?}, reference {}",
                amount_applied, request.source, request.reference
            )),
        )
        .await?;

        if is_fully_repaid {
            // Fire-and-forget: the repayment never waits on rescoring
            let scoring = Arc::clone(&self.scoring);
            let producer = contract.farmer_id.clone();
            tokio::spawn(async move {
                if let Err(err) = scoring.request_recalculation(&producer).await {
                    warn!(producer = %producer, %err, "score recalculation trigger failed");
                }
            });
        }

        info!(
            advance = %contract.id,
            applied = %amount_applied,
            remaining = %remaining_balance,
            fully_repaid = is_fully_repaid,
            "repayment applied"
        );
        Ok(RepaymentReceipt {
            amount_applied,
            overpayment,
            remaining_balance,
            is_fully_repaid,
        })
    }

    /// Recognize a default, releasing recovered capital and writing off the loss
    pub async fn mark_as_defaulted(
        &self,
        advance_id: &AdvanceId,
        reason: &str,
        recovered_amount: Amount,
    ) -> Result<DefaultOutcome> {
        let _gate = self.write_gate.lock().await;

        let mut contract = self.store.fetch(advance_id).await?;
        if !contract.status.accepts_default() {
            return Err(BridgeError::InvalidState {
                operation: "default".to_string(),
                expected: "OVERDUE or DEFAULT_WARNING".to_string(),
                actual: contract.status.to_string(),
            });
        }
        if recovered_amount.is_negative() {
            return Err(BridgeError::NegativeAmount {
                context: "recovered amount".to_string(),
            });
        }

        let recovered = recovered_amount.min(contract.remaining_balance);
        let loss_amount = contract.remaining_balance.saturating_sub(recovered);

        // Return what was recovered; the pool writes off the rest
        if let Some(pool_id) = contract.pool_id.clone() {
            self.pools
                .release_capital(&pool_id, &contract.id, recovered, ReleaseType::DefaultRecovery)
                .await?;
        }

        let previous = contract.status;
        contract.status = AdvanceStatus::Defaulted;
        contract.updated_at = Utc::now();
        self.store.persist(&contract).await?;
        self.append_history(
            advance_id,
            Some(previous),
            AdvanceStatus::Defaulted,
            SYSTEM_ACTOR,
            Some(reason.to_string()),
        )
        .await?;

        warn!(
            advance = %advance_id,
            loss = %loss_amount,
            recovered = %recovered,
            reason,
            "advance defaulted"
        );
        Ok(DefaultOutcome {
            loss_amount,
            recovered_amount: recovered,
        })
    }

    /// Fetch the producer's current score from pre-fetched gateway inputs
    async fn current_score(&self, producer_id: &ProducerId) -> Result<CreditScoreResult> {
        let metrics = self.scoring.metrics(producer_id).await.map_err(|err| {
            BridgeError::ScoreUnavailable {
                producer_id: producer_id.to_string(),
                reason: err.to_string(),
            }
        })?;
        let previous = self.scoring.previous_scores(producer_id).await.ok();
        self.calculator
            .calculate(producer_id, &metrics, previous.as_ref())
    }

    async fn append_history(
        &self,
        advance_id: &AdvanceId,
        previous_status: Option<AdvanceStatus>,
        new_status: AdvanceStatus,
        actor: &str,
        reason: Option<String>,
    ) -> Result<()> {
        self.store
            .append_history(AdvanceStatusHistory {
                id: HistoryId::new(),
                advance_id: advance_id.clone(),
                previous_status,
                new_status,
                actor: actor.to_string(),
                reason,
                occurred_at: Utc::now(),
            })
            .await
    }
}

/// Materialize a contract from computed terms
fn build_contract(
    terms: &AdvanceTerms,
    contract_number: String,
    auto_approved: bool,
    now: DateTime<Utc>,
) -> AdvanceContract {
    AdvanceContract {
        id: AdvanceId::new(),
        contract_number,
        order_id: terms.order_id.clone(),
        farmer_id: terms.farmer_id.clone(),
        buyer_id: terms.buyer_id.clone(),
        pool_id: None,
        order_amount: terms.order_amount,
        advance_percentage: terms.advance_percentage,
        advance_amount: terms.advance_amount,
        farmer_fee_percentage: terms.farmer_fee_percentage,
        farmer_fee_amount: terms.farmer_fee_amount,
        buyer_fee_percentage: terms.buyer_fee_percentage,
        buyer_fee_amount: terms.buyer_fee_amount,
        platform_fee_total: terms.platform_fee_total,
        net_to_farmer: terms.net_to_farmer,
        amount_repaid: Amount::zero(),
        remaining_balance: terms.advance_amount,
        credit_score_value: terms.credit_score,
        risk_tier: terms.risk_tier,
        risk_assessment_score: terms.credit_score,
        status: if auto_approved {
            AdvanceStatus::Approved
        } else {
            AdvanceStatus::PendingApproval
        },
        approval_method: auto_approved.then_some(ApprovalMethod::Automatic),
        approved_at: auto_approved.then_some(now),
        requested_at: now,
        disbursed_at: None,
        due_date: terms.due_date,
        repaid_at: None,
        created_at: now,
        updated_at: now,
        deleted_at: None,
    }
}
