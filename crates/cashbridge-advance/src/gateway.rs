//! External collaborator seams
//!
//! The engine never imports shared service instances; it is handed these
//! gateway traits at construction. In-memory implementations live here for
//! tests and embedding callers.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use cashbridge_types::{
    AdvanceId, AllocationId, Amount, BridgeError, BuyerId, OrderId, PoolId, PreviousScores,
    ProducerId, ProducerMetrics, ReleaseType, Result,
};

/// Facts about an order needed for advance term calculation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderFacts {
    pub order_id: OrderId,
    pub producer_id: ProducerId,
    pub buyer_id: BuyerId,
    pub total_amount: Amount,
    /// Orders can be excluded from advance financing at creation
    pub advance_eligible: bool,
    pub expected_delivery_date: NaiveDate,
}

/// A liquidity pool able to back an advance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolSummary {
    pub pool_id: PoolId,
    pub available_capital: Amount,
}

/// Receipt for capital allocated to an advance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapitalAllocation {
    pub allocation_id: AllocationId,
    pub pool_id: PoolId,
    pub advance_id: AdvanceId,
    pub amount: Amount,
    pub allocated_at: DateTime<Utc>,
}

/// Supplies producer metrics and score snapshots
#[async_trait]
pub trait ScoringDataGateway: Send + Sync {
    /// Fetch the current metric bundle for a producer
    async fn metrics(&self, producer_id: &ProducerId) -> Result<ProducerMetrics>;

    /// Fetch overall scores from snapshots taken 7/30/90 days ago
    async fn previous_scores(&self, producer_id: &ProducerId) -> Result<PreviousScores>;

    /// Ask the scoring system to refresh this producer's score soon
    async fn request_recalculation(&self, producer_id: &ProducerId) -> Result<()>;
}

/// Supplies order facts and records that an advance was requested
#[async_trait]
pub trait OrderDataGateway: Send + Sync {
    async fn order(&self, order_id: &OrderId) -> Result<Option<OrderFacts>>;

    async fn mark_advance_requested(&self, order_id: &OrderId) -> Result<()>;
}

/// Allocates and releases pooled capital; called by the engine only
#[async_trait]
pub trait LiquidityPoolGateway: Send + Sync {
    /// Find a pool holding at least `min_capital` of free capital
    async fn find_available_pool(&self, min_capital: Amount) -> Result<Option<PoolSummary>>;

    async fn allocate_capital(
        &self,
        pool_id: &PoolId,
        advance_id: &AdvanceId,
        amount: Amount,
    ) -> Result<CapitalAllocation>;

    async fn release_capital(
        &self,
        pool_id: &PoolId,
        advance_id: &AdvanceId,
        amount: Amount,
        release_type: ReleaseType,
    ) -> Result<()>;
}

// ============================================================================
// In-memory implementations
// ============================================================================

/// In-memory scoring data source
#[derive(Default)]
pub struct InMemoryScoringData {
    metrics: parking_lot::RwLock<HashMap<ProducerId, ProducerMetrics>>,
    previous: parking_lot::RwLock<HashMap<ProducerId, PreviousScores>>,
    recalculations: parking_lot::RwLock<Vec<ProducerId>>,
}

impl InMemoryScoringData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_metrics(&self, producer_id: ProducerId, metrics: ProducerMetrics) {
        self.metrics.write().insert(producer_id, metrics);
    }

    pub fn set_previous_scores(&self, producer_id: ProducerId, scores: PreviousScores) {
        self.previous.write().insert(producer_id, scores);
    }

    /// Producers whose recalculation has been requested, in order
    pub fn recalculations(&self) -> Vec<ProducerId> {
        self.recalculations.read().clone()
    }
}

#[async_trait]
impl ScoringDataGateway for InMemoryScoringData {
    async fn metrics(&self, producer_id: &ProducerId) -> Result<ProducerMetrics> {
        self.metrics
            .read()
            .get(producer_id)
            .cloned()
            .ok_or_else(|| BridgeError::ScoreUnavailable {
                producer_id: producer_id.to_string(),
                reason: "no metrics recorded".to_string(),
            })
    }

    async fn previous_scores(&self, producer_id: &ProducerId) -> Result<PreviousScores> {
        Ok(self
            .previous
            .read()
            .get(producer_id)
            .copied()
            .unwrap_or_default())
    }

    async fn request_recalculation(&self, producer_id: &ProducerId) -> Result<()> {
        self.recalculations.write().push(producer_id.clone());
        Ok(())
    }
}

/// In-memory order directory
#[derive(Default)]
pub struct InMemoryOrderDirectory {
    orders: parking_lot::RwLock<HashMap<OrderId, OrderFacts>>,
    advance_requested: parking_lot::RwLock<HashSet<OrderId>>,
}

impl InMemoryOrderDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, facts: OrderFacts) {
        self.orders.write().insert(facts.order_id.clone(), facts);
    }

    pub fn was_advance_requested(&self, order_id: &OrderId) -> bool {
        self.advance_requested.read().contains(order_id)
    }
}

#[async_trait]
impl OrderDataGateway for InMemoryOrderDirectory {
    async fn order(&self, order_id: &OrderId) -> Result<Option<OrderFacts>> {
        Ok(self.orders.read().get(order_id).cloned())
    }

    async fn mark_advance_requested(&self, order_id: &OrderId) -> Result<()> {
        if !self.orders.read().contains_key(order_id) {
            return Err(BridgeError::OrderNotFound {
                order_id: order_id.to_string(),
            });
        }
        self.advance_requested.write().insert(order_id.clone());
        Ok(())
    }
}

#[derive(Debug, Default)]
struct PoolState {
    available: Amount,
    allocated: HashMap<AdvanceId, Amount>,
}

/// In-memory liquidity pool with per-pool capital accounting
///
/// Tracks free versus allocated capital per pool. Designed for concurrent
/// access; all balance moves happen under one write lock.
#[derive(Default)]
pub struct InMemoryLiquidityPool {
    pools: Arc<tokio::sync::RwLock<HashMap<PoolId, PoolState>>>,
    fail_next_allocation: AtomicBool,
}

impl InMemoryLiquidityPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register_pool(&self, pool_id: PoolId, capital: Amount) {
        self.pools.write().await.insert(
            pool_id,
            PoolState {
                available: capital,
                allocated: HashMap::new(),
            },
        );
    }

    /// Make the next `allocate_capital` call fail (failure-path testing)
    pub fn fail_next_allocation(&self) {
        self.fail_next_allocation.store(true, Ordering::SeqCst);
    }

    pub async fn available_capital(&self, pool_id: &PoolId) -> Amount {
        self.pools
            .read()
            .await
            .get(pool_id)
            .map(|p| p.available)
            .unwrap_or_default()
    }

    pub async fn allocated_to(&self, advance_id: &AdvanceId) -> Amount {
        self.pools
            .read()
            .await
            .values()
            .filter_map(|p| p.allocated.get(advance_id))
            .copied()
            .sum()
    }
}

#[async_trait]
impl LiquidityPoolGateway for InMemoryLiquidityPool {
    async fn find_available_pool(&self, min_capital: Amount) -> Result<Option<PoolSummary>> {
        let pools = self.pools.read().await;
        Ok(pools
            .iter()
            .filter(|(_, state)| state.available >= min_capital)
            .max_by_key(|(_, state)| state.available)
            .map(|(pool_id, state)| PoolSummary {
                pool_id: pool_id.clone(),
                available_capital: state.available,
            }))
    }

    async fn allocate_capital(
        &self,
        pool_id: &PoolId,
        advance_id: &AdvanceId,
        amount: Amount,
    ) -> Result<CapitalAllocation> {
        if self.fail_next_allocation.swap(false, Ordering::SeqCst) {
            return Err(BridgeError::AllocationFailed {
                pool_id: pool_id.to_string(),
                reason: "allocation rejected by pool".to_string(),
            });
        }

        let mut pools = self.pools.write().await;
        let pool = pools
            .get_mut(pool_id)
            .ok_or_else(|| BridgeError::AllocationFailed {
                pool_id: pool_id.to_string(),
                reason: "unknown pool".to_string(),
            })?;

        if pool.available < amount {
            return Err(BridgeError::InsufficientPoolCapital {
                pool_id: pool_id.to_string(),
                requested: amount.to_string(),
                available: pool.available.to_string(),
            });
        }

        pool.available = pool.available.checked_sub(amount)?;
        let allocation = pool.allocated.entry(advance_id.clone()).or_default();
        *allocation = allocation.checked_add(amount)?;

        info!(%pool_id, %advance_id, %amount, "capital allocated");
        Ok(CapitalAllocation {
            allocation_id: AllocationId::new(),
            pool_id: pool_id.clone(),
            advance_id: advance_id.clone(),
            amount,
            allocated_at: Utc::now(),
        })
    }

    async fn release_capital(
        &self,
        pool_id: &PoolId,
        advance_id: &AdvanceId,
        amount: Amount,
        release_type: ReleaseType,
    ) -> Result<()> {
        let mut pools = self.pools.write().await;
        let pool = pools
            .get_mut(pool_id)
            .ok_or_else(|| BridgeError::AllocationFailed {
                pool_id: pool_id.to_string(),
                reason: "unknown pool".to_string(),
            })?;

        let allocation =
            pool.allocated
                .get_mut(advance_id)
                .ok_or_else(|| BridgeError::AllocationFailed {
                    pool_id: pool_id.to_string(),
                    reason: "no active allocation for advance".to_string(),
                })?;

        if amount > *allocation {
            return Err(BridgeError::AllocationFailed {
                pool_id: pool_id.to_string(),
                reason: format!("release of {amount} exceeds allocation of {allocation}"),
            });
        }

        *allocation = allocation.checked_sub(amount)?;
        pool.available = pool.available.checked_add(amount)?;

        // Full repayment clears the allocation; a default writes off whatever
        // was not recovered.
        match release_type {
            ReleaseType::PartialRepayment => {}
            ReleaseType::FullRepayment | ReleaseType::DefaultRecovery => {
                pool.allocated.remove(advance_id);
            }
        }

        info!(%pool_id, %advance_id, %amount, ?release_type, "capital released");
        Ok(())
    }
}
