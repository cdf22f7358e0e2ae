//! CashBridge Advance - Cash-advance lifecycle engine
//!
//! The engine decides whether a producer can draw an early cash advance
//! against a pending order, how much, at what cost, and tracks the advance
//! from request through repayment or default:
//!
//! - Term calculation from the producer's live credit score and tier policy
//! - Idempotent creation keyed by the order's uniqueness constraint
//! - Capital allocation against a pooled-liquidity collaborator
//! - A strict lifecycle state machine with an append-only audit trail
//! - Money-correct repayment application under concurrent attempts
//!
//! # Key Principle
//!
//! Every state-mutating operation runs as one serialized read-modify-write:
//! the contract update, the ledger row, the audit row, and the pool call
//! succeed or fail together. The balance invariant
//! `amount_repaid + remaining_balance == advance_amount` holds at all times.

pub mod gateway;
pub mod store;
pub mod engine;

pub use engine::AdvanceContractEngine;
pub use gateway::{
    CapitalAllocation, InMemoryLiquidityPool, InMemoryOrderDirectory, InMemoryScoringData,
    LiquidityPoolGateway, OrderDataGateway, OrderFacts, PoolSummary, ScoringDataGateway,
};
pub use store::{AdvanceStore, CreateOutcome, InMemoryAdvanceStore};
