use crate::conditions::SpendBundleConditions;
use chia_protocol::{Bytes32, Coin, CoinSpend, SpendBundle};
use indexmap::IndexMap;

/// Identifies the current on-chain tip of a singleton lineage: the unspent
/// coin itself plus its parent and grandparent ids, which a fast-forward
/// rebase needs to rewrite a `CoinSpend`'s lineage proof.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UnspentLineageInfo {
    pub coin_id: Bytes32,
    pub parent_id: Bytes32,
    pub parent_parent_id: Bytes32,
}

/// Per-coin record attached to an admitted item: the original spend plus
/// everything the validator derived about it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleCoinSpend {
    pub coin_spend: CoinSpend,
    pub eligible_for_dedup: bool,
    pub eligible_for_fast_forward: bool,
    pub additions: Vec<Coin>,
    pub cost: u64,
    /// Only set for fast-forward spends: the singleton's current unspent
    /// coin at the time this item was last touched by a peak update.
    pub latest_singleton_lineage: Option<UnspentLineageInfo>,
}

/// The narrow projection of a [`MempoolItem`] the fee estimator is allowed
/// to see.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MempoolItemInfo {
    pub cost: u64,
    pub fee: u64,
    pub height_added_to_mempool: u32,
}

/// An admitted spend bundle. Immutable once constructed; transfers between
/// the store and the pending caches move ownership, never mutate in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MempoolItem {
    pub spend_bundle: SpendBundle,
    pub conds: SpendBundleConditions,
    pub name: Bytes32,
    pub fee: u64,
    pub cost: u64,
    pub height_added_to_mempool: u32,
    pub assert_height: u32,
    pub assert_before_height: Option<u32>,
    pub assert_before_seconds: Option<u64>,
    /// One entry per spent coin, in the order the bundle spends them.
    pub bundle_coin_spends: IndexMap<Bytes32, BundleCoinSpend>,
}

impl MempoolItem {
    #[must_use]
    pub fn fee_per_cost(&self) -> f64 {
        self.fee as f64 / self.cost as f64
    }

    #[must_use]
    pub fn info(&self) -> MempoolItemInfo {
        MempoolItemInfo {
            cost: self.cost,
            fee: self.fee,
            height_added_to_mempool: self.height_added_to_mempool,
        }
    }

    /// The coin ids this item spends, in bundle order.
    pub fn removals(&self) -> impl Iterator<Item = Bytes32> + '_ {
        self.bundle_coin_spends.keys().copied()
    }
}
