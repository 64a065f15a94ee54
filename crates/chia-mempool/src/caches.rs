//! The two pending caches (component C4): bundles that failed admission for
//! a reason that might resolve itself later. Both evict oldest-first and
//! silently drop whatever they evict — a bundle that falls out of a pending
//! cache is simply not retried, never surfaced as an error.

use crate::mempool_item::MempoolItem;
use chia_protocol::Bytes32;
use indexmap::IndexMap;
use std::collections::BTreeMap;

/// A FIFO cache bounded by both item count and total cost. Used for bundles
/// that conflicted with an already-admitted item (`MempoolConflict`) without
/// satisfying the replacement rules — they may still win out later if the
/// conflicting item is evicted or confirmed.
#[derive(Debug)]
pub struct ConflictCache {
    items: IndexMap<Bytes32, MempoolItem>,
    total_cost: u64,
    capacity_cost: u64,
    capacity_items: u32,
}

impl ConflictCache {
    #[must_use]
    pub fn new(capacity_cost: u64, capacity_items: u32) -> Self {
        Self {
            items: IndexMap::new(),
            total_cost: 0,
            capacity_cost,
            capacity_items,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn evict_oldest(&mut self) -> Option<MempoolItem> {
        let (name, _) = self.items.iter().next().map(|(k, v)| (*k, v.cost))?;
        let item = self.items.shift_remove(&name)?;
        self.total_cost -= item.cost;
        Some(item)
    }

    /// Inserts `item`, evicting the oldest entries first if it would put the
    /// cache over either capacity bound. A no-op if `item.name` is already
    /// present.
    pub fn add(&mut self, item: MempoolItem) {
        if self.items.contains_key(&item.name) {
            return;
        }
        while (self.items.len() as u32) >= self.capacity_items
            || self.total_cost + item.cost > self.capacity_cost
        {
            if self.evict_oldest().is_none() {
                break;
            }
        }
        self.total_cost += item.cost;
        self.items.insert(item.name, item);
    }

    pub fn remove(&mut self, name: Bytes32) -> Option<MempoolItem> {
        let item = self.items.shift_remove(&name)?;
        self.total_cost -= item.cost;
        Some(item)
    }

    #[must_use]
    pub fn contains(&self, name: Bytes32) -> bool {
        self.items.contains_key(&name)
    }

    /// Removes and returns every entry spending any of `coin_ids`, oldest
    /// first. Used when an admitted or confirmed item frees up a coin a
    /// pending conflict was waiting on.
    pub fn drain_conflicting(&mut self, coin_ids: &[Bytes32]) -> Vec<MempoolItem> {
        let names: Vec<Bytes32> = self
            .items
            .iter()
            .filter(|(_, item)| item.removals().any(|id| coin_ids.contains(&id)))
            .map(|(name, _)| *name)
            .collect();
        names.into_iter().filter_map(|n| self.remove(n)).collect()
    }
}

/// A FIFO cache bounded the same way as [`ConflictCache`], additionally
/// indexed by `assert_height` so the manager can cheaply retry every item
/// whose height time-lock might now be satisfied.
#[derive(Debug)]
pub struct PendingCache {
    items: IndexMap<Bytes32, MempoolItem>,
    by_height: BTreeMap<u32, Vec<Bytes32>>,
    total_cost: u64,
    capacity_cost: u64,
    capacity_items: u32,
}

impl PendingCache {
    #[must_use]
    pub fn new(capacity_cost: u64, capacity_items: u32) -> Self {
        Self {
            items: IndexMap::new(),
            by_height: BTreeMap::new(),
            total_cost: 0,
            capacity_cost,
            capacity_items,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn unindex_height(&mut self, name: Bytes32, assert_height: u32) {
        if let Some(names) = self.by_height.get_mut(&assert_height) {
            names.retain(|n| *n != name);
            if names.is_empty() {
                self.by_height.remove(&assert_height);
            }
        }
    }

    fn evict_oldest(&mut self) -> Option<MempoolItem> {
        let name = *self.items.iter().next()?.0;
        let item = self.items.shift_remove(&name)?;
        self.total_cost -= item.cost;
        self.unindex_height(name, item.assert_height);
        Some(item)
    }

    pub fn add(&mut self, item: MempoolItem) {
        if self.items.contains_key(&item.name) {
            return;
        }
        while (self.items.len() as u32) >= self.capacity_items
            || self.total_cost + item.cost > self.capacity_cost
        {
            if self.evict_oldest().is_none() {
                break;
            }
        }
        self.total_cost += item.cost;
        self.by_height.entry(item.assert_height).or_default().push(item.name);
        self.items.insert(item.name, item);
    }

    pub fn remove(&mut self, name: Bytes32) -> Option<MempoolItem> {
        let item = self.items.shift_remove(&name)?;
        self.total_cost -= item.cost;
        self.unindex_height(name, item.assert_height);
        Some(item)
    }

    #[must_use]
    pub fn contains(&self, name: Bytes32) -> bool {
        self.items.contains_key(&name)
    }

    /// Removes and returns every item whose `assert_height` is now at or
    /// below `height`, in ascending-height order — these are the bundles
    /// worth retrying at the new peak.
    pub fn drain_up_to_height(&mut self, height: u32) -> Vec<MempoolItem> {
        let ready_heights: Vec<u32> = self
            .by_height
            .range(..=height)
            .map(|(h, _)| *h)
            .collect();
        let mut out = Vec::new();
        for h in ready_heights {
            let names = self.by_height.remove(&h).unwrap_or_default();
            for name in names {
                if let Some(item) = self.items.shift_remove(&name) {
                    self.total_cost -= item.cost;
                    out.push(item);
                }
            }
        }
        out
    }
}
