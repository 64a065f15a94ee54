//! The indexed collection of admitted mempool items (component C3).

use crate::config::MempoolConfig;
use crate::error::Err;
use crate::mempool_item::MempoolItem;
use chia_protocol::{Bytes, Bytes32};
use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

/// Why an item left the store. Forwarded to the fee estimator and to
/// callers that need to distinguish "confirmed" from "evicted".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemoveReason {
    BlockInclusion,
    Conflict,
    PoolFull,
    Expired,
}

/// Result of [`MempoolStore::add`]: the items evicted to make room, if any.
#[derive(Debug, Default)]
pub struct MempoolAddInfo {
    pub removals: Vec<Arc<MempoolItem>>,
}

/// Result of a removal operation: the items removed and why.
#[derive(Debug, Default)]
pub struct MempoolRemoveInfo {
    pub removals: Vec<Arc<MempoolItem>>,
    pub reason: Option<RemoveReason>,
}

/// Total order over `f64` fee-per-cost values via `total_cmp`, so they can
/// sit in a `BTreeSet` composite key despite floats having no `Ord`.
#[derive(Debug, Clone, Copy, PartialEq)]
struct FeeRateKey(f64);

impl Eq for FeeRateKey {}

impl PartialOrd for FeeRateKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FeeRateKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

/// Ascending order matches eviction order: lowest fee-per-cost first, ties
/// broken by earliest `height_added_to_mempool`, then by `name` for a total
/// order. Block selection walks this index in reverse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct OrderKey {
    fee_per_cost: FeeRateKey,
    height_added_to_mempool: u32,
    name: Bytes32,
}

impl OrderKey {
    fn of(item: &MempoolItem) -> Self {
        Self {
            fee_per_cost: FeeRateKey(item.fee_per_cost()),
            height_added_to_mempool: item.height_added_to_mempool,
            name: item.name,
        }
    }
}

#[derive(Debug)]
pub struct MempoolStore {
    max_cost: u64,
    by_name: HashMap<Bytes32, Arc<MempoolItem>>,
    by_coin_id: HashMap<Bytes32, HashSet<Bytes32>>,
    by_puzzle_hash: HashMap<Bytes32, HashSet<Bytes32>>,
    by_hint: HashMap<Bytes, HashSet<Bytes32>>,
    ordered: BTreeSet<OrderKey>,
    total_cost: u64,
    total_fees: u64,
}

impl MempoolStore {
    #[must_use]
    pub fn new(config: &MempoolConfig) -> Self {
        Self {
            max_cost: config.mempool_max_cost(),
            by_name: HashMap::new(),
            by_coin_id: HashMap::new(),
            by_puzzle_hash: HashMap::new(),
            by_hint: HashMap::new(),
            ordered: BTreeSet::new(),
            total_cost: 0,
            total_fees: 0,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    #[must_use]
    pub fn total_cost(&self) -> u64 {
        self.total_cost
    }

    #[must_use]
    pub fn total_fees(&self) -> u64 {
        self.total_fees
    }

    #[must_use]
    pub fn get_item_by_id(&self, name: Bytes32) -> Option<Arc<MempoolItem>> {
        self.by_name.get(&name).cloned()
    }

    #[must_use]
    pub fn get_items_by_coin_id(&self, coin_id: Bytes32) -> Vec<Arc<MempoolItem>> {
        self.by_coin_id
            .get(&coin_id)
            .into_iter()
            .flatten()
            .filter_map(|name| self.by_name.get(name).cloned())
            .collect()
    }

    #[must_use]
    pub fn get_items_by_coin_ids(&self, coin_ids: &[Bytes32]) -> Vec<Arc<MempoolItem>> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for id in coin_ids {
            for item in self.get_items_by_coin_id(*id) {
                if seen.insert(item.name) {
                    out.push(item);
                }
            }
        }
        out
    }

    #[must_use]
    pub fn get_items_by_puzzle_hash(&self, puzzle_hash: Bytes32) -> Vec<Arc<MempoolItem>> {
        self.by_puzzle_hash
            .get(&puzzle_hash)
            .into_iter()
            .flatten()
            .filter_map(|name| self.by_name.get(name).cloned())
            .collect()
    }

    /// Iterates admitted items by descending fee-per-cost (ties: most recent
    /// first, then by name), the order block-building and peer-filter
    /// responses use.
    pub fn items_by_feerate(&self) -> impl Iterator<Item = Arc<MempoolItem>> + '_ {
        self.ordered
            .iter()
            .rev()
            .filter_map(move |key| self.by_name.get(&key.name).cloned())
    }

    #[must_use]
    pub fn at_full_capacity(&self, extra_cost: u64) -> bool {
        self.total_cost.saturating_add(extra_cost) > self.max_cost
    }

    /// The fee-per-cost a new item must exceed to displace enough low-rate
    /// items to make room for `extra_cost`, or `None` if `extra_cost` alone
    /// can never fit.
    #[must_use]
    pub fn get_min_fee_rate(&self, extra_cost: u64) -> Option<f64> {
        if extra_cost > self.max_cost {
            return None;
        }
        if !self.at_full_capacity(extra_cost) {
            return Some(0.0);
        }

        let mut freed = 0_u64;
        let needed = self.total_cost + extra_cost - self.max_cost;
        let mut rate = 0.0;
        for key in &self.ordered {
            if freed >= needed {
                break;
            }
            let Some(item) = self.by_name.get(&key.name) else {
                continue;
            };
            freed += item.cost;
            rate = item.fee_per_cost();
        }
        Some(rate)
    }

    /// Inserts `item`, evicting the lowest fee-per-cost items first if
    /// needed to respect the total cost cap. Idempotent on a duplicate name.
    /// Refuses the insert, leaving the store untouched, when `item` still
    /// doesn't fit even once every other item has been evicted.
    pub fn add(&mut self, item: MempoolItem) -> Result<MempoolAddInfo, Err> {
        if self.by_name.contains_key(&item.name) {
            return Ok(MempoolAddInfo::default());
        }
        if item.cost > self.max_cost {
            return Err(Err::InvalidCostResult);
        }

        let mut removals = Vec::new();
        while self.at_full_capacity(item.cost) {
            let Some(key) = self.ordered.iter().next().copied() else {
                break;
            };
            if let Some(removed) = self.remove_one(key.name) {
                removals.push(removed);
            } else {
                self.ordered.remove(&key);
            }
        }

        let item = Arc::new(item);
        let key = OrderKey::of(&item);
        self.ordered.insert(key);
        for coin_id in item.removals() {
            self.by_coin_id.entry(coin_id).or_default().insert(item.name);
        }
        for spend in item.bundle_coin_spends.values() {
            self.by_puzzle_hash
                .entry(spend.coin_spend.coin.puzzle_hash)
                .or_default()
                .insert(item.name);
        }
        self.total_cost += item.cost;
        self.total_fees += item.fee;
        self.by_name.insert(item.name, item);

        Ok(MempoolAddInfo { removals })
    }

    /// Associates `hint` with `name` for later lookup via
    /// [`MempoolStore::get_items_by_hint`]. A no-op if `name` isn't admitted.
    pub fn index_hint(&mut self, hint: Bytes, name: Bytes32) {
        if self.by_name.contains_key(&name) {
            self.by_hint.entry(hint).or_default().insert(name);
        }
    }

    #[must_use]
    pub fn get_items_by_hint(&self, hint: &Bytes) -> Vec<Arc<MempoolItem>> {
        self.by_hint
            .get(hint)
            .into_iter()
            .flatten()
            .filter_map(|name| self.by_name.get(name).cloned())
            .collect()
    }

    fn remove_one(&mut self, name: Bytes32) -> Option<Arc<MempoolItem>> {
        let item = self.by_name.remove(&name)?;
        self.ordered.remove(&OrderKey::of(&item));
        for coin_id in item.removals() {
            if let Some(set) = self.by_coin_id.get_mut(&coin_id) {
                set.remove(&name);
                if set.is_empty() {
                    self.by_coin_id.remove(&coin_id);
                }
            }
        }
        for spend in item.bundle_coin_spends.values() {
            let ph = spend.coin_spend.coin.puzzle_hash;
            if let Some(set) = self.by_puzzle_hash.get_mut(&ph) {
                set.remove(&name);
                if set.is_empty() {
                    self.by_puzzle_hash.remove(&ph);
                }
            }
        }
        self.by_hint.retain(|_, names| {
            names.remove(&name);
            !names.is_empty()
        });
        self.total_cost -= item.cost;
        self.total_fees -= item.fee;
        Some(item)
    }

    pub fn remove_from_pool(&mut self, names: &[Bytes32], reason: RemoveReason) -> MempoolRemoveInfo {
        let mut removals = Vec::new();
        for name in names {
            if let Some(item) = self.remove_one(*name) {
                removals.push(item);
            }
        }
        MempoolRemoveInfo {
            removals,
            reason: Some(reason),
        }
    }

    /// Evicts every item whose `assert_before_height`/`assert_before_seconds`
    /// envelope is no longer satisfiable at the new peak.
    pub fn new_tx_block(&mut self, height: u32, timestamp: u64) -> MempoolRemoveInfo {
        let expired: Vec<Bytes32> = self
            .by_name
            .values()
            .filter(|item| {
                item.assert_before_height.is_some_and(|h| h <= height)
                    || item.assert_before_seconds.is_some_and(|s| s <= timestamp)
            })
            .map(|item| item.name)
            .collect();
        self.remove_from_pool(&expired, RemoveReason::Expired)
    }

    /// Bulk re-keys fast-forward entries in the coin-id index after a
    /// singleton advances on-chain: `(new_coin_id, old_coin_id, item_name)`.
    pub fn update_spend_index(&mut self, updates: &[(Bytes32, Bytes32, Bytes32)]) {
        for (new_coin_id, old_coin_id, name) in updates {
            if let Some(set) = self.by_coin_id.get_mut(old_coin_id) {
                set.remove(name);
                if set.is_empty() {
                    self.by_coin_id.remove(old_coin_id);
                }
            }
            self.by_coin_id.entry(*new_coin_id).or_default().insert(*name);
        }
    }

    pub fn all_items(&self) -> impl Iterator<Item = Arc<MempoolItem>> + '_ {
        self.by_name.values().cloned()
    }
}
