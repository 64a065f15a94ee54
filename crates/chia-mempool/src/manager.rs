//! The mempool's single entry point (component C6): wires the store,
//! pending caches, fee estimator and the opaque `CoinStore`/`PreValidator`
//! collaborators together into the admission and block-building API a full
//! node actually calls.

use crate::block_generator::{self, NewBlockGenerator};
use crate::caches::{ConflictCache, PendingCache};
use crate::check_time_locks::is_height_pending;
use crate::conditions::SpendBundleConditions;
use crate::config::MempoolConfig;
use crate::error::{Err, MempoolResult};
use crate::fee_estimator::BucketedFeeEstimator;
use crate::filter::MempoolFilter;
use crate::mempool_item::{MempoolItem, MempoolItemInfo, UnspentLineageInfo};
use crate::seen_cache::SeenCache;
use crate::store::{MempoolStore, RemoveReason};
use crate::traits::{CoinStore, FeeEstimator, PreValidator};
use crate::validator::{self, ValidationOutcome};
use chia_protocol::{Bytes32, CoinRecord, SpendBundle};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;

/// The chain tip the manager last observed, as much of it as admission and
/// block-building need.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Peak {
    pub header_hash: Bytes32,
    /// The header hash of this peak's previous transaction block. Compared
    /// against `self.peak.header_hash` on the next `new_peak` call to decide
    /// whether a caller-supplied `spent_coins` list is actually safe to take
    /// the fast path with (this peak must be the direct successor of the one
    /// the mempool last observed), per spec.md §4.6.1.
    pub prev_transaction_block_hash: Bytes32,
    pub height: u32,
    pub timestamp: u64,
}

/// Everything a `new_peak` call needs to know about the block that became
/// the new tip, beyond its header record.
#[derive(Debug, Clone, Default)]
pub struct NewPeakChange {
    /// Coins spent in this block, if known. `None` forces the slow path
    /// (a full rebuild by replaying every admitted item), and so does a
    /// `Some` list whose peak turns out not to be the direct successor of
    /// the one the mempool last observed (checked against
    /// `Peak::prev_transaction_block_hash`).
    pub spent_coins: Option<Vec<Bytes32>>,
}

/// What changed as a result of a `new_peak` call: items retried back into
/// the pool, and items evicted because they confirmed or expired.
#[derive(Debug, Default)]
pub struct NewPeakInfo {
    pub added_items: Vec<Arc<MempoolItem>>,
    pub removed_items: Vec<Arc<MempoolItem>>,
}

pub struct MempoolManager {
    config: MempoolConfig,
    store: MempoolStore,
    conflict_cache: ConflictCache,
    pending_cache: PendingCache,
    seen_cache: SeenCache,
    fee_estimator: Box<dyn FeeEstimator>,
    coin_store: Arc<dyn CoinStore>,
    pre_validator: Arc<dyn PreValidator>,
    worker_semaphore: Semaphore,
    peak: Option<Peak>,
}

impl MempoolManager {
    #[must_use]
    pub fn new(
        config: MempoolConfig,
        coin_store: Arc<dyn CoinStore>,
        pre_validator: Arc<dyn PreValidator>,
    ) -> Self {
        let worker_permits = usize::from(config.worker_count).max(1);
        Self {
            store: MempoolStore::new(&config),
            conflict_cache: ConflictCache::new(
                config.conflict_cache_capacity_cost,
                config.conflict_cache_capacity_items,
            ),
            pending_cache: PendingCache::new(
                config.pending_cache_capacity_cost,
                config.pending_cache_capacity_items,
            ),
            seen_cache: SeenCache::new(config.seen_cache_size),
            fee_estimator: Box::new(BucketedFeeEstimator::new()),
            coin_store,
            pre_validator,
            worker_semaphore: Semaphore::new(worker_permits),
            peak: None,
            config,
        }
    }

    #[must_use]
    pub fn peak(&self) -> Option<Peak> {
        self.peak
    }

    #[must_use]
    pub fn seen(&self, name: Bytes32) -> bool {
        self.seen_cache.seen(name)
    }

    pub fn remove_seen(&mut self, name: Bytes32) {
        self.seen_cache.remove_seen(name);
    }

    #[must_use]
    pub fn get_mempool_item(&self, name: Bytes32) -> Option<Arc<MempoolItem>> {
        self.store.get_item_by_id(name)
    }

    #[must_use]
    pub fn get_spendbundle(&self, name: Bytes32) -> Option<SpendBundle> {
        self.store
            .get_item_by_id(name)
            .map(|item| item.spend_bundle.clone())
    }

    #[must_use]
    pub fn get_filter(&self) -> MempoolFilter {
        MempoolFilter::from_ids(self.store.all_items().map(|item| item.name).collect())
    }

    #[must_use]
    pub fn get_items_not_in_filter(&self, filter: &MempoolFilter, limit: usize) -> Vec<SpendBundle> {
        self.store
            .items_by_feerate()
            .filter(|item| !filter.contains(item.name))
            .take(limit)
            .map(|item| item.spend_bundle.clone())
            .collect()
    }

    /// Admitted items whose create-coin hint metadata matches `hint`, used by
    /// peers asking "tell me about anything touching this puzzle hash".
    #[must_use]
    pub fn get_items_by_hint(&self, hint: &chia_protocol::Bytes) -> Vec<Arc<MempoolItem>> {
        self.store.get_items_by_hint(hint)
    }

    /// Whether a bundle paying `fee` for `cost` would clear the current
    /// admission bar, without running full validation.
    #[must_use]
    pub fn is_fee_enough(&self, fee: u64, cost: u64) -> bool {
        if cost == 0 {
            return false;
        }
        let fee_per_cost = fee as f64 / cost as f64;
        if self.store.at_full_capacity(cost) {
            self.store
                .get_min_fee_rate(cost)
                .is_some_and(|min_rate| fee_per_cost > min_rate)
        } else {
            fee == 0 || fee_per_cost >= f64::from(self.config.nonzero_fee_min_fpc)
        }
    }

    /// Runs the opaque CLVM/signature pre-validator, bounding how many run
    /// concurrently to `config.worker_count` (0 means "run inline, no
    /// concurrency limit beyond the caller's own task").
    pub async fn pre_validate_spendbundle(
        &self,
        spend_bundle: &SpendBundle,
    ) -> MempoolResult<SpendBundleConditions> {
        log::debug!("pre-validating spend bundle {}", spend_bundle.name());
        if spend_bundle.coin_spends.is_empty() {
            return Err(Err::InvalidSpendBundle);
        }
        if self.config.worker_count == 0 {
            return self
                .pre_validator
                .validate_spend_bundle(spend_bundle, self.config.max_tx_clvm_cost)
                .await;
        }

        let _permit = self
            .worker_semaphore
            .acquire()
            .await
            .expect("semaphore is never closed");
        self.pre_validator
            .validate_spend_bundle(spend_bundle, self.config.max_tx_clvm_cost)
            .await
    }

    /// Validates and, if admissible, adds `spend_bundle` to the pool.
    ///
    /// `Err(Err::MempoolConflict)` and the two `AssertHeight*Failed` errors
    /// mean the bundle has been queued in the conflict or pending cache
    /// rather than dropped outright; every other `Err` is a hard rejection.
    pub async fn add_spend_bundle(
        &mut self,
        spend_bundle: SpendBundle,
        conds: SpendBundleConditions,
    ) -> MempoolResult<Vec<Arc<MempoolItem>>> {
        let name = spend_bundle.name();
        if self.store.get_item_by_id(name).is_some() {
            return Ok(Vec::new());
        }
        let peak = self.peak.ok_or(Err::MempoolNotInitialized)?;

        let start = Instant::now();

        let coin_ids: Vec<Bytes32> = conds.spends.iter().map(|s| s.coin_id).collect();
        let coin_records = self.coin_store.get_coin_records(&coin_ids).await;

        let mut lineage_by_puzzle_hash: HashMap<Bytes32, UnspentLineageInfo> = HashMap::new();
        for spend in &conds.spends {
            if !spend.eligible_for_fast_forward() || lineage_by_puzzle_hash.contains_key(&spend.puzzle_hash) {
                continue;
            }
            if let Some(lineage) = self
                .coin_store
                .get_unspent_lineage_info_for_puzzle_hash(spend.puzzle_hash)
                .await
            {
                lineage_by_puzzle_hash.insert(spend.puzzle_hash, lineage);
            }
        }

        let outcome = validator::validate_spend_bundle(
            &self.config,
            &self.store,
            &spend_bundle,
            &conds,
            &coin_records,
            &lineage_by_puzzle_hash,
            peak.height,
            peak.timestamp,
        );

        let elapsed = start.elapsed().as_secs_f64();
        if elapsed > self.config.validate_time_budget_s {
            log::warn!(
                "add_spend_bundle for {name} took {elapsed:.3}s, exceeding the {:.3}s budget",
                self.config.validate_time_budget_s
            );
            return Err(Err::InvalidSpendBundle);
        }

        match outcome? {
            ValidationOutcome::Admit { item, conflicts } => {
                let conflict_names: Vec<Bytes32> = conflicts.iter().map(|c| c.name).collect();
                let removed = self.store.remove_from_pool(&conflict_names, RemoveReason::Conflict);
                for r in &removed.removals {
                    self.fee_estimator.remove_mempool_item(r.info());
                }

                let info = item.info();
                let hints: Vec<chia_protocol::Bytes> = conds
                    .spends
                    .iter()
                    .flat_map(|s| s.create_coin.iter())
                    .filter_map(|(_, _, hint)| hint.clone())
                    .collect();
                let add_info = self.store.add(item)?;
                for r in &add_info.removals {
                    self.fee_estimator.remove_mempool_item(r.info());
                }
                for hint in hints {
                    self.store.index_hint(hint, name);
                }
                self.fee_estimator.add_mempool_item(info);
                self.seen_cache.add_and_maybe_pop_seen(name);

                let mut all_removed = removed.removals;
                all_removed.extend(add_info.removals);
                Ok(all_removed)
            }
            ValidationOutcome::Conflict { item } => {
                log::debug!(
                    "{name} conflicts with an admitted item and doesn't clear the replacement bar, queuing"
                );
                self.conflict_cache.add(item);
                Err(Err::MempoolConflict)
            }
            ValidationOutcome::Pending { item, err } => {
                log::debug!("{name} is pending on a height time-lock ({err}), queuing");
                self.pending_cache.add(item);
                Err(err)
            }
        }
    }

    /// Advances the mempool past a new peak. Fast path: rebase fast-forward
    /// items onto their coins' new lineage and evict everything else
    /// `new_peak.spent_coins` names. Slow path (no spent-coins list, or the
    /// peak doesn't follow the previous one): rebuild the store from
    /// scratch by replaying every admitted item.
    pub async fn new_peak(&mut self, peak: Peak, change: NewPeakChange) -> NewPeakInfo {
        log::debug!("new_peak height={} header_hash={}", peak.height, peak.header_hash);
        let mut info = NewPeakInfo::default();

        let expired = self.store.new_tx_block(peak.height, peak.timestamp);
        for r in &expired.removals {
            self.fee_estimator.remove_mempool_item(r.info());
        }
        info.removed_items.extend(expired.removals);

        // The fast path is only safe when `peak` is the direct successor of
        // the peak we last observed: a caller-supplied `spent_coins` list for
        // any other peak (a reorg, or a gap) describes the wrong set of
        // removed coins relative to our current store, so we must fall back
        // to a full rebuild instead of silently corrupting the store.
        let follows_our_peak = self
            .peak
            .is_some_and(|p| p.header_hash == peak.prev_transaction_block_hash);
        let had_spent_coins = change.spent_coins.is_some();
        let fast_path_spent_coins = change.spent_coins.filter(|_| follows_our_peak);

        match fast_path_spent_coins {
            Some(spent_coins) => {
                let mut updates = Vec::new();
                for coin_id in &spent_coins {
                    let items = self.store.get_items_by_coin_id(*coin_id);
                    for item in items {
                        let Some(spend) = item.bundle_coin_spends.get(coin_id) else {
                            continue;
                        };
                        if !spend.eligible_for_fast_forward {
                            let removed = self
                                .store
                                .remove_from_pool(&[item.name], RemoveReason::BlockInclusion);
                            for r in &removed.removals {
                                self.fee_estimator.remove_mempool_item(r.info());
                            }
                            info.removed_items.extend(removed.removals);
                            continue;
                        }

                        let puzzle_hash = spend.coin_spend.coin.puzzle_hash;
                        match self
                            .coin_store
                            .get_unspent_lineage_info_for_puzzle_hash(puzzle_hash)
                            .await
                        {
                            Some(lineage) if lineage.coin_id != *coin_id => {
                                updates.push((lineage.coin_id, *coin_id, item.name));
                            }
                            Some(_) => {}
                            None => {
                                let removed = self
                                    .store
                                    .remove_from_pool(&[item.name], RemoveReason::BlockInclusion);
                                for r in &removed.removals {
                                    self.fee_estimator.remove_mempool_item(r.info());
                                }
                                info.removed_items.extend(removed.removals);
                            }
                        }
                    }
                }
                self.store.update_spend_index(&updates);
            }
            None => {
                if had_spent_coins {
                    log::warn!(
                        "new_peak at height {} doesn't follow our current peak; rebuilding the mempool from scratch",
                        peak.height
                    );
                } else {
                    log::warn!(
                        "new_peak at height {} has no spent-coins list; rebuilding the mempool from scratch",
                        peak.height
                    );
                }
                self.rebuild_from_scratch(peak).await;
            }
        }

        self.peak = Some(peak);

        let retryable: Vec<MempoolItem> = self
            .pending_cache
            .drain_up_to_height(peak.height)
            .into_iter()
            .chain(self.drain_all_conflicts())
            .collect();

        for item in retryable {
            let spend_bundle = item.spend_bundle.clone();
            let conds = item.conds.clone();
            if let Ok(removed) = self.add_spend_bundle(spend_bundle, conds).await {
                if let Some(readded) = self.store.get_item_by_id(item.name) {
                    info.added_items.push(readded);
                }
                info.removed_items.extend(removed);
            }
        }

        let included: Vec<MempoolItemInfo> = info.removed_items.iter().map(|i| i.info()).collect();
        self.fee_estimator.new_block(peak.height, &included);

        info
    }

    fn drain_all_conflicts(&mut self) -> Vec<MempoolItem> {
        let fresh = ConflictCache::new(
            self.config.conflict_cache_capacity_cost,
            self.config.conflict_cache_capacity_items,
        );
        std::mem::replace(&mut self.conflict_cache, fresh).into_items()
    }

    async fn rebuild_from_scratch(&mut self, peak: Peak) {
        let old_items: Vec<Arc<MempoolItem>> = self.store.all_items().collect();
        self.store = MempoolStore::new(&self.config);

        for item in old_items {
            let spend_bundle = item.spend_bundle.clone();
            let conds = item.conds.clone();
            let coin_ids: Vec<Bytes32> = conds.spends.iter().map(|s| s.coin_id).collect();
            let coin_records: HashMap<Bytes32, CoinRecord> =
                self.coin_store.get_coin_records(&coin_ids).await;

            let mut lineage_by_puzzle_hash: HashMap<Bytes32, UnspentLineageInfo> = HashMap::new();
            for spend in &conds.spends {
                if !spend.eligible_for_fast_forward() {
                    continue;
                }
                if let Some(lineage) = self
                    .coin_store
                    .get_unspent_lineage_info_for_puzzle_hash(spend.puzzle_hash)
                    .await
                {
                    lineage_by_puzzle_hash.insert(spend.puzzle_hash, lineage);
                }
            }

            let outcome = validator::validate_spend_bundle(
                &self.config,
                &self.store,
                &spend_bundle,
                &conds,
                &coin_records,
                &lineage_by_puzzle_hash,
                peak.height,
                peak.timestamp,
            );

            // A double-spend here most likely means the coin confirmed on
            // chain; treat it the same as block-inclusion for accounting
            // purposes. This may over-count if the coin was instead spent by
            // a transaction never itself tracked by this mempool.
            match outcome {
                Ok(ValidationOutcome::Admit { item, .. }) => {
                    let item_name = item.name;
                    self.seen_cache.add_and_maybe_pop_seen(item_name);
                    if self.store.add(item).is_err() {
                        log::warn!("dropping {item_name} during mempool rebuild: it no longer fits the cost cap");
                    }
                }
                _ => continue,
            }
        }
    }

    /// Selects admitted items into a block candidate up to
    /// `config.max_block_clvm_cost`, first confirming the caller's view of
    /// the chain tip (`header_hash`) still matches ours - a stale caller
    /// would otherwise build against coins this mempool no longer agrees
    /// are the tip's. `timeout` bounds the wall-clock time spent selecting;
    /// on expiry the best candidate assembled so far is returned with
    /// `timed_out` set.
    pub fn create_block_generator(
        &self,
        header_hash: Bytes32,
        timeout: Duration,
    ) -> MempoolResult<NewBlockGenerator> {
        self.check_peak_header_hash(header_hash)?;
        Ok(block_generator::create_block_generator(
            self.store.items_by_feerate(),
            self.config.max_block_clvm_cost,
            timeout,
        ))
    }

    /// The same selection as [`Self::create_block_generator`], for hosts
    /// that encode block generators with the newer (de)serialization the
    /// full node calls "generator v2". Selection is identical; only the
    /// byte encoding the caller eventually produces from the result
    /// differs, and that encoding is outside this crate's scope.
    pub fn create_block_generator2(
        &self,
        header_hash: Bytes32,
        timeout: Duration,
    ) -> MempoolResult<NewBlockGenerator> {
        self.create_block_generator(header_hash, timeout)
    }

    /// Superseded convenience wrapper kept for API parity with the source:
    /// the aggregate spend bundle a block-candidate's selected items would
    /// produce, without the per-coin generator detail.
    pub fn create_bundle_from_mempool(
        &self,
        header_hash: Bytes32,
        timeout: Duration,
    ) -> MempoolResult<Option<SpendBundle>> {
        let generator = self.create_block_generator(header_hash, timeout)?;
        if generator.included_items.is_empty() {
            return Ok(None);
        }
        // BLS signature aggregation is explicitly out of scope for this crate
        // (see spec.md §1's Non-goals); a real caller aggregates every
        // included item's `spend_bundle.aggregated_signature` via chia-bls
        // before broadcasting. We hand back the coin spends only.
        let coin_spends = generator.coin_spends;
        Ok(Some(SpendBundle::new(
            coin_spends,
            chia_protocol::Signature::default(),
        )))
    }

    fn check_peak_header_hash(&self, header_hash: Bytes32) -> MempoolResult<()> {
        match self.peak {
            None => Err(Err::MempoolNotInitialized),
            Some(peak) if peak.header_hash == header_hash => Ok(()),
            Some(_) => Err(Err::NewPeakHeaderHashMismatch),
        }
    }
}
