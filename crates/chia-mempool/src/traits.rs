//! The external collaborators this crate treats as opaque: where coin
//! records come from, how a bundle's CLVM is pre-validated, and who tracks
//! fee-rate history. A host full node wires concrete implementations of
//! these in; this crate never reaches outside its own process for data.

use crate::conditions::SpendBundleConditions;
use crate::mempool_item::MempoolItemInfo;
use chia_protocol::{Bytes32, CoinRecord, SpendBundle};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

/// A boxed, `Send` future, the common return type for the async trait
/// methods below (object safety rules out `async fn` in a `dyn` trait).
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Read access to the chain's coin set. Implemented by the host's coin
/// store; this crate never mutates it.
pub trait CoinStore: Send + Sync {
    /// Looks up every coin record named in `coin_ids` that exists, omitting
    /// ids that are unknown (spent or unspent alike).
    fn get_coin_records<'a>(
        &'a self,
        coin_ids: &'a [Bytes32],
    ) -> BoxFuture<'a, HashMap<Bytes32, CoinRecord>>;

    /// The current unspent instance of the singleton whose most recent spend
    /// created a coin locked by `puzzle_hash`, if that singleton is still
    /// unspent on-chain.
    fn get_unspent_lineage_info_for_puzzle_hash<'a>(
        &'a self,
        puzzle_hash: Bytes32,
    ) -> BoxFuture<'a, Option<crate::mempool_item::UnspentLineageInfo>>;
}

/// Runs a spend bundle's puzzles and parses their conditions. This crate
/// never touches CLVM directly; every `SpendBundleConditions` it works with
/// was produced by a `PreValidator` implementation.
pub trait PreValidator: Send + Sync {
    fn validate_spend_bundle<'a>(
        &'a self,
        spend_bundle: &'a SpendBundle,
        max_cost: u64,
    ) -> BoxFuture<'a, Result<SpendBundleConditions, crate::error::Err>>;
}

/// Tracks how quickly items at various fee rates have historically cleared,
/// and estimates how long a new item would wait. Updated as items enter and
/// leave the mempool; queried on demand by peers asking "how much fee for
/// N blocks".
pub trait FeeEstimator: Send + Sync {
    fn add_mempool_item(&mut self, info: MempoolItemInfo);
    fn remove_mempool_item(&mut self, info: MempoolItemInfo);
    fn new_block(&mut self, height: u32, included: &[MempoolItemInfo]);
    fn estimate_fee_rate(&self, target_blocks: u32) -> f64;
}
