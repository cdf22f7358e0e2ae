//! Error types for CashBridge
//!
//! Every failure is explicit and classified: not-found and validation errors
//! are terminal for the caller, conflicts are resolved transparently by the
//! engine, dependency failures are retryable with backoff, and invariant
//! violations indicate a bug and abort the operation.

use thiserror::Error;

/// Result type for CashBridge operations
pub type Result<T> = std::result::Result<T, BridgeError>;

/// Failure classification, used by callers to pick a recovery strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Referenced entity does not exist - terminal, not retried
    NotFound,
    /// Request is well-formed but not permitted - terminal, surfaced with a reason
    Validation,
    /// Concurrent duplicate - resolved by returning the existing record
    Conflict,
    /// A collaborator (scoring, pool, store) failed - retryable with backoff
    Dependency,
    /// Internal invariant broken - fatal, indicates a bug
    Invariant,
}

/// CashBridge error types
#[derive(Debug, Clone, Error)]
pub enum BridgeError {
    // ========================================================================
    // Amount Errors
    // ========================================================================

    /// Amount overflow during arithmetic
    #[error("Amount overflow during arithmetic operation")]
    AmountOverflow,

    /// Amount underflow during arithmetic
    #[error("Amount underflow during arithmetic operation")]
    AmountUnderflow,

    /// A money field that must be non-negative went negative
    #[error("Negative amount in {context}")]
    NegativeAmount { context: String },

    // ========================================================================
    // Order Errors
    // ========================================================================

    /// Order not found
    #[error("Order {order_id} not found")]
    OrderNotFound { order_id: String },

    /// Order does not belong to the requesting farmer
    #[error("Order {order_id} does not belong to farmer {farmer_id}")]
    OrderOwnershipMismatch { order_id: String, farmer_id: String },

    /// Order fails the eligibility policy
    #[error("Order {order_id} is not eligible for an advance: {reasons:?}")]
    OrderIneligible {
        order_id: String,
        reasons: Vec<String>,
    },

    // ========================================================================
    // Scoring Errors
    // ========================================================================

    /// Credit score could not be obtained
    #[error("Credit score unavailable for producer {producer_id}: {reason}")]
    ScoreUnavailable { producer_id: String, reason: String },

    // ========================================================================
    // Advance Errors
    // ========================================================================

    /// Advance contract not found
    #[error("Advance {advance_id} not found")]
    AdvanceNotFound { advance_id: String },

    /// A non-deleted advance already exists for the order
    #[error("An advance already exists for order {order_id}")]
    DuplicateAdvance { order_id: String },

    /// Requested lifecycle transition is not in the allowed table
    #[error("Invalid advance transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    /// Operation requires a different lifecycle state
    #[error("Advance must be {expected} for {operation}, but is {actual}")]
    InvalidState {
        operation: String,
        expected: String,
        actual: String,
    },

    /// Caller-supplied disbursement fee disagrees with the contract
    #[error("Disbursement fee mismatch: contract carries {expected}, caller sent {provided}")]
    DisbursementFeeMismatch { expected: String, provided: String },

    // ========================================================================
    // Liquidity Pool Errors
    // ========================================================================

    /// No pool has sufficient capital for the advance
    #[error("No liquidity pool available with capital of at least {required}")]
    NoPoolAvailable { required: String },

    /// Pool rejected the allocation
    #[error("Capital allocation failed on pool {pool_id}: {reason}")]
    AllocationFailed { pool_id: String, reason: String },

    /// Pool does not hold enough free capital
    #[error("Pool {pool_id} has insufficient capital: requested {requested}, available {available}")]
    InsufficientPoolCapital {
        pool_id: String,
        requested: String,
        available: String,
    },

    // ========================================================================
    // Storage & Gateway Errors
    // ========================================================================

    /// Persistence layer failed
    #[error("Store unavailable: {message}")]
    StoreUnavailable { message: String },

    /// A gateway call exceeded its caller-imposed timeout
    #[error("Gateway {gateway} timed out")]
    GatewayTimeout { gateway: String },

    // ========================================================================
    // Invariant Errors
    // ========================================================================

    /// A financial invariant does not hold
    #[error("Invariant violation: {message}")]
    InvariantViolation { message: String },
}

impl BridgeError {
    /// Create an invariant-violation error
    pub fn invariant(message: impl Into<String>) -> Self {
        Self::InvariantViolation {
            message: message.into(),
        }
    }

    /// Classify this error per the engine's failure taxonomy
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::OrderNotFound { .. } | Self::AdvanceNotFound { .. } => ErrorClass::NotFound,

            Self::OrderOwnershipMismatch { .. }
            | Self::OrderIneligible { .. }
            | Self::InvalidTransition { .. }
            | Self::InvalidState { .. }
            | Self::DisbursementFeeMismatch { .. }
            | Self::NegativeAmount { .. } => ErrorClass::Validation,

            Self::DuplicateAdvance { .. } => ErrorClass::Conflict,

            Self::ScoreUnavailable { .. }
            | Self::NoPoolAvailable { .. }
            | Self::AllocationFailed { .. }
            | Self::InsufficientPoolCapital { .. }
            | Self::StoreUnavailable { .. }
            | Self::GatewayTimeout { .. } => ErrorClass::Dependency,

            Self::AmountOverflow | Self::AmountUnderflow | Self::InvariantViolation { .. } => {
                ErrorClass::Invariant
            }
        }
    }

    /// Check if the caller may retry this operation with backoff
    pub fn is_retriable(&self) -> bool {
        self.class() == ErrorClass::Dependency
    }

    /// Get an error code for API responses
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::AmountOverflow => "AMOUNT_OVERFLOW",
            Self::AmountUnderflow => "AMOUNT_UNDERFLOW",
            Self::NegativeAmount { .. } => "NEGATIVE_AMOUNT",
            Self::OrderNotFound { .. } => "ORDER_NOT_FOUND",
            Self::OrderOwnershipMismatch { .. } => "ORDER_OWNERSHIP_MISMATCH",
            Self::OrderIneligible { .. } => "ORDER_INELIGIBLE",
            Self::ScoreUnavailable { .. } => "SCORE_UNAVAILABLE",
            Self::AdvanceNotFound { .. } => "ADVANCE_NOT_FOUND",
            Self::DuplicateAdvance { .. } => "DUPLICATE_ADVANCE",
            Self::InvalidTransition { .. } => "INVALID_TRANSITION",
            Self::InvalidState { .. } => "INVALID_STATE",
            Self::DisbursementFeeMismatch { .. } => "DISBURSEMENT_FEE_MISMATCH",
            Self::NoPoolAvailable { .. } => "NO_POOL_AVAILABLE",
            Self::AllocationFailed { .. } => "ALLOCATION_FAILED",
            Self::InsufficientPoolCapital { .. } => "INSUFFICIENT_POOL_CAPITAL",
            Self::StoreUnavailable { .. } => "STORE_UNAVAILABLE",
            Self::GatewayTimeout { .. } => "GATEWAY_TIMEOUT",
            Self::InvariantViolation { .. } => "INVARIANT_VIOLATION",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err = BridgeError::DuplicateAdvance {
            order_id: "order_x".to_string(),
        };
        assert_eq!(err.error_code(), "DUPLICATE_ADVANCE");
    }

    #[test]
    fn test_dependency_errors_are_retriable() {
        let timeout = BridgeError::GatewayTimeout {
            gateway: "liquidity-pool".to_string(),
        };
        assert!(timeout.is_retriable());
        assert_eq!(timeout.class(), ErrorClass::Dependency);

        let not_found = BridgeError::AdvanceNotFound {
            advance_id: "adv_x".to_string(),
        };
        assert!(!not_found.is_retriable());
        assert_eq!(not_found.class(), ErrorClass::NotFound);
    }

    #[test]
    fn test_invariant_class() {
        assert_eq!(BridgeError::AmountOverflow.class(), ErrorClass::Invariant);
        assert_eq!(
            BridgeError::invariant("balance mismatch").class(),
            ErrorClass::Invariant
        );
    }
}
