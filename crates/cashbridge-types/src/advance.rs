//! Advance contracts, lifecycle states, ledger rows, and audit rows
//!
//! An advance moves through a strict lifecycle. Any transition not in the
//! table encoded by [`AdvanceStatus::can_transition_to`] is invalid, and
//! terminal states have no outgoing transitions. Ledger and status-history
//! rows are append-only.

use crate::{
    AdvanceId, Amount, BuyerId, HistoryId, OrderId, PoolId, ProducerId, RiskTier, TransactionId,
};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Lifecycle state of an advance contract
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AdvanceStatus {
    PendingApproval,
    Approved,
    Disbursed,
    Active,
    PartiallyRepaid,
    Overdue,
    DefaultWarning,
    Defaulted,
    Completed,
    Cancelled,
}

impl AdvanceStatus {
    /// Terminal states have no outgoing transitions
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Defaulted | Self::Cancelled)
    }

    /// The allowed-transition table
    ///
    /// `PartiallyRepaid -> PartiallyRepaid` is a real edge: every partial
    /// repayment appends its own history row.
    pub fn can_transition_to(&self, next: AdvanceStatus) -> bool {
        use AdvanceStatus::*;
        match self {
            PendingApproval => matches!(next, Approved | Cancelled),
            Approved => matches!(next, Disbursed | Cancelled),
            Disbursed => matches!(next, Active),
            Active => matches!(next, PartiallyRepaid | Completed | Overdue),
            PartiallyRepaid => matches!(next, PartiallyRepaid | Completed | Overdue),
            Overdue => matches!(next, PartiallyRepaid | Completed | DefaultWarning | Defaulted),
            DefaultWarning => matches!(next, Defaulted),
            Completed | Defaulted | Cancelled => false,
        }
    }

    /// States in which a repayment may be applied
    pub fn accepts_repayment(&self) -> bool {
        matches!(self, Self::Active | Self::PartiallyRepaid | Self::Overdue)
    }

    /// States from which the contract may be marked defaulted
    pub fn accepts_default(&self) -> bool {
        matches!(self, Self::Overdue | Self::DefaultWarning)
    }
}

impl std::fmt::Display for AdvanceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::PendingApproval => "PENDING_APPROVAL",
            Self::Approved => "APPROVED",
            Self::Disbursed => "DISBURSED",
            Self::Active => "ACTIVE",
            Self::PartiallyRepaid => "PARTIALLY_REPAID",
            Self::Overdue => "OVERDUE",
            Self::DefaultWarning => "DEFAULT_WARNING",
            Self::Defaulted => "DEFAULTED",
            Self::Completed => "COMPLETED",
            Self::Cancelled => "CANCELLED",
        };
        write!(f, "{s}")
    }
}

/// How an advance was approved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApprovalMethod {
    Manual,
    Automatic,
}

/// Ledger row kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionKind {
    Disbursement,
    Repayment,
}

/// How released capital returns to the pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReleaseType {
    PartialRepayment,
    FullRepayment,
    DefaultRecovery,
}

/// Where a repayment originated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RepaymentSource {
    /// The buyer settled the underlying order
    OrderSettlement,
    /// The farmer repaid directly
    DirectPayment,
    /// Operations adjustment
    ManualAdjustment,
}

/// The core mutable entity: one advance against one order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvanceContract {
    pub id: AdvanceId,
    /// Human-readable sequential number, immutable once assigned
    pub contract_number: String,

    // References
    pub order_id: OrderId,
    pub farmer_id: ProducerId,
    pub buyer_id: BuyerId,
    /// Set once capital has been allocated
    pub pool_id: Option<PoolId>,

    // Economics (integer cents)
    pub order_amount: Amount,
    pub advance_percentage: Decimal,
    pub advance_amount: Amount,
    pub farmer_fee_percentage: Decimal,
    pub farmer_fee_amount: Amount,
    pub buyer_fee_percentage: Decimal,
    pub buyer_fee_amount: Amount,
    pub platform_fee_total: Amount,
    pub net_to_farmer: Amount,
    pub amount_repaid: Amount,
    pub remaining_balance: Amount,

    // Risk snapshot at origination; later score changes never alter it
    pub credit_score_value: f64,
    pub risk_tier: RiskTier,
    pub risk_assessment_score: f64,

    pub status: AdvanceStatus,
    pub approval_method: Option<ApprovalMethod>,
    pub approved_at: Option<DateTime<Utc>>,

    // Timeline
    pub requested_at: DateTime<Utc>,
    pub disbursed_at: Option<DateTime<Utc>>,
    pub due_date: NaiveDate,
    pub repaid_at: Option<DateTime<Utc>>,

    // Soft lifecycle
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl AdvanceContract {
    /// The balance invariant that must hold at all times
    pub fn balance_invariant_holds(&self) -> bool {
        self.amount_repaid
            .checked_add(self.remaining_balance)
            .map(|total| total == self.advance_amount)
            .unwrap_or(false)
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// Append-only ledger row; the sum of Repayment rows equals the parent
/// contract's `amount_repaid`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvanceTransaction {
    pub id: TransactionId,
    pub advance_id: AdvanceId,
    pub kind: TransactionKind,
    pub amount: Amount,
    pub method: String,
    pub reference: String,
    pub occurred_at: DateTime<Utc>,
}

/// Append-only audit row; one per lifecycle transition
///
/// `previous_status` is `None` on the creation row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvanceStatusHistory {
    pub id: HistoryId,
    pub advance_id: AdvanceId,
    pub previous_status: Option<AdvanceStatus>,
    pub new_status: AdvanceStatus,
    pub actor: String,
    pub reason: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Computed terms for a prospective advance
///
/// Ineligibility is a structured result, not an error: `eligible` is false
/// and `ineligibility_reasons` says why.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvanceTerms {
    pub order_id: OrderId,
    pub farmer_id: ProducerId,
    pub buyer_id: BuyerId,
    pub eligible: bool,
    pub ineligibility_reasons: Vec<String>,

    pub credit_score: f64,
    pub risk_tier: RiskTier,

    pub order_amount: Amount,
    pub advance_percentage: Decimal,
    pub advance_amount: Amount,
    pub farmer_fee_percentage: Decimal,
    pub farmer_fee_amount: Amount,
    pub buyer_fee_percentage: Decimal,
    pub buyer_fee_amount: Amount,
    pub platform_fee_total: Amount,
    pub net_to_farmer: Amount,

    pub expected_delivery_date: NaiveDate,
    pub due_date: NaiveDate,
}

/// Request to open an advance against an order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvanceRequest {
    pub farmer_id: ProducerId,
    pub order_id: OrderId,
    /// Cap requested by the farmer; the policy cap still applies
    pub requested_amount: Option<Amount>,
    pub actor: String,
}

/// Request to apply a repayment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepaymentRequest {
    pub advance_id: AdvanceId,
    pub amount: Amount,
    pub method: String,
    pub reference: String,
    pub source: RepaymentSource,
}

/// Outcome of a repayment
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RepaymentReceipt {
    /// The portion of the submitted amount actually applied
    pub amount_applied: Amount,
    /// Excess over the remaining balance; returned to the caller, never applied
    pub overpayment: Amount,
    pub remaining_balance: Amount,
    pub is_fully_repaid: bool,
}

/// Outcome of a successful status transition
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StatusTransition {
    pub previous_status: AdvanceStatus,
    pub new_status: AdvanceStatus,
}

/// Outcome of a disbursement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Disbursement {
    pub reference: String,
    pub disbursed_at: DateTime<Utc>,
}

/// Outcome of marking an advance defaulted
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DefaultOutcome {
    pub loss_amount: Amount,
    pub recovered_amount: Amount,
}
