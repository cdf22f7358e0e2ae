//! CashBridge Types - Canonical domain types for producer cash-advance financing
//!
//! This crate contains all foundational types for CashBridge with zero
//! dependencies on other cashbridge crates. It defines the complete type
//! system for:
//!
//! - Identity types (ProducerId, OrderId, AdvanceId, PoolId, etc.)
//! - Integer-cents money with checked arithmetic and decimal rate application
//! - Behavioral metric snapshots (delivery, quality, payment, activity,
//!   blockchain verification)
//! - Credit score results, risk tiers, and score simulation records
//! - Advance contracts, their lifecycle states, ledger rows, and audit rows
//!
//! # Architectural Invariants
//!
//! These types support the core CashBridge financial invariants:
//!
//! 1. Money is integer cents — binary floating point never touches a balance
//! 2. `amount_repaid + remaining_balance == advance_amount` at all times
//! 3. Ledger and status-history rows are append-only
//! 4. At most one non-deleted advance contract per order

pub mod identity;
pub mod amount;
pub mod metrics;
pub mod score;
pub mod advance;
pub mod error;

pub use identity::*;
pub use amount::*;
pub use metrics::*;
pub use score::*;
pub use advance::*;
pub use error::*;

/// Version of the CashBridge types schema
pub const TYPES_VERSION: &str = "0.1.0";
