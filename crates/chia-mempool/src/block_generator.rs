//! Selecting admitted items into a block candidate (component C6.2), walking
//! the store's fee-rate order and rebasing fast-forward spends onto the
//! chain tip the manager observed at the last peak update.

use crate::fast_forward::{next_singleton_coin, rebase_coin_spend};
use crate::mempool_item::{MempoolItem, UnspentLineageInfo};
use chia_protocol::{Bytes32, CoinSpend};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A block candidate: the coin spends to include, and the items they came
/// from (for reporting which bundles made it in, and their total fee).
#[derive(Debug, Default)]
pub struct NewBlockGenerator {
    pub coin_spends: Vec<CoinSpend>,
    pub included_items: Vec<Arc<MempoolItem>>,
    pub cost: u64,
    pub fee: u64,
    /// `true` if the wall-clock deadline was hit before every fitting item
    /// was considered; the result is the best candidate found so far, not
    /// necessarily optimal.
    pub timed_out: bool,
}

/// Greedily fills a block up to `max_cost`, walking items highest
/// fee-per-cost first, stopping early if `deadline` elapses (the caller gets
/// the best candidate assembled so far, per spec.md's cancellation model).
/// An item that doesn't fit is skipped, not stopped on - a smaller,
/// lower-ranked item further down the list might still fit.
///
/// Fast-forward spends are rebased onto a per-build `latest_lineage` table
/// keyed by puzzle hash, seeded from each item's own
/// `latest_singleton_lineage` and advanced to the rebased spend's own child
/// coin after each use - so two items in the same build that spend the same
/// singleton chain onto one another instead of both claiming the same
/// parent. Dedup-eligible spends that exactly match one already selected are
/// included only once.
#[must_use]
pub fn create_block_generator(
    items_by_feerate: impl Iterator<Item = Arc<MempoolItem>>,
    max_cost: u64,
    deadline: Duration,
) -> NewBlockGenerator {
    let start = Instant::now();
    let mut generator = NewBlockGenerator::default();
    let mut seen_dedup: HashSet<(Bytes32, Vec<u8>)> = HashSet::new();
    let mut latest_lineage: HashMap<Bytes32, UnspentLineageInfo> = HashMap::new();

    for item in items_by_feerate {
        if start.elapsed() >= deadline {
            generator.timed_out = true;
            break;
        }
        if generator.cost + item.cost > max_cost {
            continue;
        }

        let mut candidate_spends = Vec::with_capacity(item.bundle_coin_spends.len());
        for (coin_id, spend) in &item.bundle_coin_spends {
            if spend.eligible_for_dedup {
                let key = (*coin_id, spend.coin_spend.solution.to_vec());
                if !seen_dedup.insert(key) {
                    continue;
                }
            }

            let puzzle_hash = spend.coin_spend.coin.puzzle_hash;
            let lineage = if spend.eligible_for_fast_forward {
                match latest_lineage.get(&puzzle_hash).copied().or(spend.latest_singleton_lineage) {
                    Some(l) => Some(l),
                    None => None,
                }
            } else {
                None
            };

            let coin_spend = match lineage {
                Some(lineage) => {
                    let rebased = rebase_coin_spend(&spend.coin_spend, &lineage);
                    let child = next_singleton_coin(&lineage, puzzle_hash, rebased.coin.amount);
                    latest_lineage.insert(
                        puzzle_hash,
                        UnspentLineageInfo {
                            coin_id: child.coin_id(),
                            parent_id: lineage.coin_id,
                            parent_parent_id: lineage.parent_id,
                        },
                    );
                    rebased
                }
                None => spend.coin_spend.clone(),
            };
            candidate_spends.push(coin_spend);
        }

        generator.coin_spends.append(&mut candidate_spends);
        generator.cost += item.cost;
        generator.fee += item.fee;
        generator.included_items.push(item);
    }

    generator
}
