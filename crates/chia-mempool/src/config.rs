/// The consensus-ish constant a full node's block builder is willing to spend
/// on CLVM + byte + condition cost in a single block. Mirrors
/// `chia-consensus::consensus_constants`'s `MAX_BLOCK_COST_CLVM`.
pub const MAX_BLOCK_COST: u64 = 11_000_000_000;

/// The 63-bit ceiling `MempoolStore` enforces on the running sum of admitted
/// fees (the source names this `SQLITE_INT_MAX`; we don't own a
/// database, so we name it for what it bounds instead of where it historically
/// came from).
pub const TOTAL_FEE_LIMIT: u64 = (1_u64 << 63) - 1;

/// Per-item fee ceiling, matching the source's `FEE_LIMIT = 2^47`: plenty to
/// express reasonable transaction fees without risking overflow anywhere
/// downstream that sums a handful of them.
pub const FEE_LIMIT: u64 = 1 << 47;

/// Every tunable the mempool core needs, collected into one non-secret,
/// `Clone`/`Debug` struct, constructed once and shared read-only by the
/// manager and its store/cache/validator collaborators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MempoolConfig {
    /// Per-transaction CLVM cost budget. Default: `MAX_BLOCK_COST / 2`.
    pub max_tx_clvm_cost: u64,
    /// Per-block CLVM cost budget, after subtracting a fixed block overhead.
    pub max_block_clvm_cost: u64,
    /// Multiplier applied to `max_block_clvm_cost` to get the total mempool
    /// cost cap (`MEMPOOL_MAX_COST`).
    pub mempool_block_buffer: u32,
    /// Minimum non-zero fee-per-cost numerator, compared against a fixed
    /// point scale of 1 (`NONZERO_FEE_MIN_FPC`, default 5).
    pub nonzero_fee_min_fpc: u8,
    /// Absolute minimum fee increase a fee-bump replacement must clear.
    pub min_fee_increase: u64,
    pub conflict_cache_capacity_cost: u64,
    pub conflict_cache_capacity_items: u32,
    pub pending_cache_capacity_cost: u64,
    pub pending_cache_capacity_items: u32,
    /// Number of `spawn_blocking` workers used for pre-validation; 0 runs it
    /// inline on the calling task.
    pub worker_count: u8,
    pub seen_cache_size: u32,
    /// Wall-clock seconds `add_spend_bundle`'s own validator and
    /// `pre_validate_spendbundle` are each allowed before rejecting as a DoS
    /// guard.
    pub validate_time_budget_s: f64,
}

impl MempoolConfig {
    /// `MEMPOOL_MAX_COST`.
    #[must_use]
    pub fn mempool_max_cost(&self) -> u64 {
        self.max_block_clvm_cost * u64::from(self.mempool_block_buffer)
    }
}

impl Default for MempoolConfig {
    fn default() -> Self {
        const BLOCK_OVERHEAD: u64 = 50_000_000;
        Self {
            max_tx_clvm_cost: MAX_BLOCK_COST / 2,
            max_block_clvm_cost: MAX_BLOCK_COST - BLOCK_OVERHEAD,
            mempool_block_buffer: 10,
            nonzero_fee_min_fpc: 5,
            min_fee_increase: 10_000_000,
            conflict_cache_capacity_cost: MAX_BLOCK_COST,
            conflict_cache_capacity_items: 1_000,
            pending_cache_capacity_cost: MAX_BLOCK_COST,
            pending_cache_capacity_items: 1_000,
            worker_count: 2,
            seen_cache_size: 10_000,
            validate_time_budget_s: 2.0,
        }
    }
}
