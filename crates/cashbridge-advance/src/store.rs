//! The advance repository contract
//!
//! The store owns the uniqueness constraint on `order_id` — the sole
//! idempotency mechanism for creation. `insert_or_fetch` returns a tagged
//! outcome instead of surfacing a duplicate-key failure, so the engine never
//! treats a concurrent duplicate as an error. Transaction and history tables
//! are append-only.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use cashbridge_types::{
    AdvanceContract, AdvanceId, AdvanceStatusHistory, AdvanceTransaction, BridgeError, OrderId,
    Result,
};

/// Outcome of an insert-or-fetch create
#[derive(Debug, Clone)]
pub enum CreateOutcome {
    /// The contract was inserted
    Created(AdvanceContract),
    /// A non-deleted contract already holds this order; here it is
    AlreadyExists(AdvanceContract),
}

/// Transactional persistence consumed by the engine
///
/// Every method is atomic on its own. A SQL-backed implementation maps
/// `insert_or_fetch` onto an insert guarded by the unique order-id index,
/// fetching the existing row on conflict.
#[async_trait]
pub trait AdvanceStore: Send + Sync {
    /// Insert a contract, respecting the unique non-deleted order constraint
    async fn insert_or_fetch(&self, contract: AdvanceContract) -> Result<CreateOutcome>;

    async fn fetch(&self, advance_id: &AdvanceId) -> Result<AdvanceContract>;

    async fn fetch_by_order(&self, order_id: &OrderId) -> Result<Option<AdvanceContract>>;

    /// Persist a full-row update of an existing contract
    async fn persist(&self, contract: &AdvanceContract) -> Result<()>;

    /// Append a ledger row; rows are never updated or deleted
    async fn append_transaction(&self, row: AdvanceTransaction) -> Result<()>;

    /// Append an audit row; rows are never updated or deleted
    async fn append_history(&self, row: AdvanceStatusHistory) -> Result<()>;

    async fn transactions_for(&self, advance_id: &AdvanceId) -> Result<Vec<AdvanceTransaction>>;

    async fn history_for(&self, advance_id: &AdvanceId) -> Result<Vec<AdvanceStatusHistory>>;

    /// Allocate the next sequential, immutable contract number
    async fn next_contract_number(&self) -> Result<String>;
}

#[derive(Default)]
struct StoreState {
    contracts: HashMap<AdvanceId, AdvanceContract>,
    by_order: HashMap<OrderId, AdvanceId>,
    transactions: Vec<AdvanceTransaction>,
    history: Vec<AdvanceStatusHistory>,
}

/// In-memory store
///
/// All state sits behind one lock, so each method is a small atomic
/// transaction, matching what a database gives a SQL-backed store.
#[derive(Default)]
pub struct InMemoryAdvanceStore {
    state: Arc<tokio::sync::RwLock<StoreState>>,
    sequence: AtomicU64,
}

impl InMemoryAdvanceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of persisted contracts (test support)
    pub async fn contract_count(&self) -> usize {
        self.state.read().await.contracts.len()
    }
}

#[async_trait]
impl AdvanceStore for InMemoryAdvanceStore {
    async fn insert_or_fetch(&self, contract: AdvanceContract) -> Result<CreateOutcome> {
        let mut state = self.state.write().await;

        if let Some(existing_id) = state.by_order.get(&contract.order_id) {
            let existing = state
                .contracts
                .get(existing_id)
                .cloned()
                .ok_or_else(|| BridgeError::invariant("order index points at missing contract"))?;
            if !existing.is_deleted() {
                return Ok(CreateOutcome::AlreadyExists(existing));
            }
        }

        state
            .by_order
            .insert(contract.order_id.clone(), contract.id.clone());
        state
            .contracts
            .insert(contract.id.clone(), contract.clone());
        Ok(CreateOutcome::Created(contract))
    }

    async fn fetch(&self, advance_id: &AdvanceId) -> Result<AdvanceContract> {
        self.state
            .read()
            .await
            .contracts
            .get(advance_id)
            .cloned()
            .ok_or_else(|| BridgeError::AdvanceNotFound {
                advance_id: advance_id.to_string(),
            })
    }

    async fn fetch_by_order(&self, order_id: &OrderId) -> Result<Option<AdvanceContract>> {
        let state = self.state.read().await;
        Ok(state
            .by_order
            .get(order_id)
            .and_then(|id| state.contracts.get(id))
            .cloned())
    }

    async fn persist(&self, contract: &AdvanceContract) -> Result<()> {
        let mut state = self.state.write().await;
        if !state.contracts.contains_key(&contract.id) {
            return Err(BridgeError::AdvanceNotFound {
                advance_id: contract.id.to_string(),
            });
        }
        state
            .contracts
            .insert(contract.id.clone(), contract.clone());
        Ok(())
    }

    async fn append_transaction(&self, row: AdvanceTransaction) -> Result<()> {
        self.state.write().await.transactions.push(row);
        Ok(())
    }

    async fn append_history(&self, row: AdvanceStatusHistory) -> Result<()> {
        self.state.write().await.history.push(row);
        Ok(())
    }

    async fn transactions_for(&self, advance_id: &AdvanceId) -> Result<Vec<AdvanceTransaction>> {
        Ok(self
            .state
            .read()
            .await
            .transactions
            .iter()
            .filter(|t| &t.advance_id == advance_id)
            .cloned()
            .collect())
    }

    async fn history_for(&self, advance_id: &AdvanceId) -> Result<Vec<AdvanceStatusHistory>> {
        Ok(self
            .state
            .read()
            .await
            .history
            .iter()
            .filter(|h| &h.advance_id == advance_id)
            .cloned()
            .collect())
    }

    async fn next_contract_number(&self) -> Result<String> {
        let n = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!("ADV-{n:06}"))
    }
}
