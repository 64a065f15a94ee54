//! Conflict detection and the fee-bump replacement policy (component C5.1).

use crate::config::MempoolConfig;
use crate::error::Err;
use crate::mempool_item::{BundleCoinSpend, MempoolItem};
use crate::store::MempoolStore;
use chia_protocol::Bytes32;
use indexmap::IndexMap;
use std::collections::HashSet;
use std::sync::Arc;

/// One spend the candidate bundle is about to make, as much as
/// [`check_removals`] needs to know about it.
pub struct CandidateSpend<'a> {
    pub coin_id: Bytes32,
    pub eligible_for_dedup: bool,
    pub eligible_for_fast_forward: bool,
    pub solution: &'a [u8],
}

/// Classifies every admitted item that spends one of `spends`' coins.
/// Spends that are mergeable with what's already admitted (two fast-forward
/// spends of the same singleton, or two dedup spends with an identical
/// solution) are left out; everything else comes back as a hard conflict
/// the caller must run through [`can_replace`].
#[must_use]
pub fn check_removals(store: &MempoolStore, spends: &[CandidateSpend]) -> Vec<Arc<MempoolItem>> {
    let mut seen = HashSet::new();
    let mut hard_conflicts = Vec::new();

    for spend in spends {
        for existing_item in store.get_items_by_coin_id(spend.coin_id) {
            let Some(existing_spend) = existing_item.bundle_coin_spends.get(&spend.coin_id) else {
                continue;
            };

            let compatible = (spend.eligible_for_fast_forward
                && existing_spend.eligible_for_fast_forward)
                || (spend.eligible_for_dedup
                    && existing_spend.eligible_for_dedup
                    && spend.solution == existing_spend.coin_spend.solution.as_slice());

            if compatible {
                continue;
            }

            if seen.insert(existing_item.name) {
                hard_conflicts.push(existing_item);
            }
        }
    }

    hard_conflicts
}

/// Everything [`can_replace`] needs about the candidate bundle beyond its
/// fee and cost.
pub struct ReplacementCandidate<'a> {
    pub fee: u64,
    pub cost: u64,
    pub assert_height: u32,
    pub assert_before_height: Option<u32>,
    pub assert_before_seconds: Option<u64>,
    pub bundle_coin_spends: &'a IndexMap<Bytes32, BundleCoinSpend>,
}

fn fee_per_cost(fee: u64, cost: u64) -> f64 {
    if cost == 0 {
        0.0
    } else {
        fee as f64 / cost as f64
    }
}

/// True iff `candidate` is allowed to evict every item in `conflicts` from
/// the mempool. Every rule here must hold simultaneously:
///
/// - `candidate` spends a superset of the coins any conflicting item spends.
/// - its fee-per-cost strictly exceeds the conflicts' combined fee-per-cost.
/// - its absolute fee increase over the conflicts clears the configured
///   minimum (prevents replacement cycling for fractions of a mojo).
/// - its time-lock envelope matches the conflicts' exactly (a replacement
///   can't loosen or tighten when it's replacing for fee alone).
/// - it preserves fast-forward/dedup eligibility on every coin that had it.
pub fn can_replace(
    config: &MempoolConfig,
    candidate: &ReplacementCandidate,
    conflicts: &[Arc<MempoolItem>],
) -> Result<(), Err> {
    if conflicts.is_empty() {
        return Ok(());
    }

    let mut conflicting_fees = 0_u64;
    let mut conflicting_cost = 0_u64;
    let mut assert_height = 0_u32;
    let mut assert_before_height: Option<u32> = None;
    let mut assert_before_seconds: Option<u64> = None;
    let mut existing_ff_spends = HashSet::new();
    let mut existing_dedup_spends = HashSet::new();

    for item in conflicts {
        for coin_id in item.removals() {
            if !candidate.bundle_coin_spends.contains_key(&coin_id) {
                return Err(Err::MempoolConflict);
            }
        }

        conflicting_fees += item.fee;
        conflicting_cost += item.cost;
        assert_height = assert_height.max(item.assert_height);
        assert_before_height = match (assert_before_height, item.assert_before_height) {
            (None, b) => b,
            (a, None) => a,
            (Some(a), Some(b)) => Some(a.min(b)),
        };
        assert_before_seconds = match (assert_before_seconds, item.assert_before_seconds) {
            (None, b) => b,
            (a, None) => a,
            (Some(a), Some(b)) => Some(a.min(b)),
        };

        for (coin_id, spend) in &item.bundle_coin_spends {
            if spend.eligible_for_fast_forward {
                existing_ff_spends.insert(*coin_id);
            }
            if spend.eligible_for_dedup {
                existing_dedup_spends.insert(*coin_id);
            }
        }
    }

    if fee_per_cost(candidate.fee, candidate.cost) <= fee_per_cost(conflicting_fees, conflicting_cost) {
        return Err(Err::MempoolConflict);
    }

    let fee_increase = candidate.fee.checked_sub(conflicting_fees).ok_or(Err::MempoolConflict)?;
    if fee_increase < config.min_fee_increase {
        return Err(Err::MempoolConflict);
    }

    if candidate.assert_height != assert_height
        || candidate.assert_before_height != assert_before_height
        || candidate.assert_before_seconds != assert_before_seconds
    {
        return Err(Err::MempoolConflict);
    }

    for coin_id in existing_ff_spends {
        if !candidate
            .bundle_coin_spends
            .get(&coin_id)
            .is_some_and(|s| s.eligible_for_fast_forward)
        {
            return Err(Err::MempoolConflict);
        }
    }
    for coin_id in existing_dedup_spends {
        if !candidate
            .bundle_coin_spends
            .get(&coin_id)
            .is_some_and(|s| s.eligible_for_dedup)
        {
            return Err(Err::MempoolConflict);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conditions::SpendBundleConditions;
    use chia_protocol::{Coin, CoinSpend, Program, Signature, SpendBundle};

    fn bundle_coin_spend(coin_id_seed: u8, eligible_ff: bool, eligible_dedup: bool, solution: &[u8]) -> BundleCoinSpend {
        BundleCoinSpend {
            coin_spend: CoinSpend::new(
                Coin::new(Bytes32::from([coin_id_seed; 32]), Bytes32::default(), 1),
                Program::default(),
                Program::new(solution.to_vec().into()),
            ),
            eligible_for_dedup: eligible_dedup,
            eligible_for_fast_forward: eligible_ff,
            additions: vec![],
            cost: 10,
            latest_singleton_lineage: None,
        }
    }

    fn make_item(name: u8, fee: u64, cost: u64, coin_id: u8, eligible_ff: bool, eligible_dedup: bool, solution: &[u8]) -> MempoolItem {
        let mut spends = IndexMap::new();
        spends.insert(
            Bytes32::from([coin_id; 32]),
            bundle_coin_spend(coin_id, eligible_ff, eligible_dedup, solution),
        );
        MempoolItem {
            spend_bundle: SpendBundle::new(vec![], Signature::default()),
            conds: SpendBundleConditions {
                cost,
                ..SpendBundleConditions::default()
            },
            name: Bytes32::from([name; 32]),
            fee,
            cost,
            height_added_to_mempool: 0,
            assert_height: 0,
            assert_before_height: None,
            assert_before_seconds: None,
            bundle_coin_spends: spends,
        }
    }

    fn config() -> MempoolConfig {
        MempoolConfig {
            min_fee_increase: 100,
            ..MempoolConfig::default()
        }
    }

    #[test]
    fn check_removals_flags_plain_vs_plain_as_hard_conflict() {
        let mut store = MempoolStore::new(&config());
        store.add(make_item(1, 10, 10, 5, false, false, b"a"));

        let spends = vec![CandidateSpend {
            coin_id: Bytes32::from([5; 32]),
            eligible_for_dedup: false,
            eligible_for_fast_forward: false,
            solution: b"b",
        }];
        let conflicts = check_removals(&store, &spends);
        assert_eq!(conflicts.len(), 1);
    }

    #[test]
    fn check_removals_allows_matching_dedup_solutions_through() {
        let mut store = MempoolStore::new(&config());
        store.add(make_item(1, 10, 10, 5, false, true, b"same"));

        let spends = vec![CandidateSpend {
            coin_id: Bytes32::from([5; 32]),
            eligible_for_dedup: true,
            eligible_for_fast_forward: false,
            solution: b"same",
        }];
        assert!(check_removals(&store, &spends).is_empty());
    }

    #[test]
    fn check_removals_flags_dedup_with_different_solution() {
        let mut store = MempoolStore::new(&config());
        store.add(make_item(1, 10, 10, 5, false, true, b"one"));

        let spends = vec![CandidateSpend {
            coin_id: Bytes32::from([5; 32]),
            eligible_for_dedup: true,
            eligible_for_fast_forward: false,
            solution: b"two",
        }];
        assert_eq!(check_removals(&store, &spends).len(), 1);
    }

    #[test]
    fn check_removals_allows_ff_vs_ff_through() {
        let mut store = MempoolStore::new(&config());
        store.add(make_item(1, 10, 10, 5, true, false, b"x"));

        let spends = vec![CandidateSpend {
            coin_id: Bytes32::from([5; 32]),
            eligible_for_dedup: false,
            eligible_for_fast_forward: true,
            solution: b"y",
        }];
        assert!(check_removals(&store, &spends).is_empty());
    }

    #[test]
    fn can_replace_accepts_a_superset_fee_bump() {
        let conflict = Arc::new(make_item(1, 1000, 100, 5, false, false, b"a"));
        let mut spends = IndexMap::new();
        spends.insert(Bytes32::from([5; 32]), bundle_coin_spend(5, false, false, b"a"));
        let candidate = ReplacementCandidate {
            fee: 2000,
            cost: 100,
            assert_height: 0,
            assert_before_height: None,
            assert_before_seconds: None,
            bundle_coin_spends: &spends,
        };
        assert!(can_replace(&config(), &candidate, &[conflict]).is_ok());
    }

    #[test]
    fn can_replace_rejects_insufficient_fee_increase() {
        let conflict = Arc::new(make_item(1, 1000, 100, 5, false, false, b"a"));
        let mut spends = IndexMap::new();
        spends.insert(Bytes32::from([5; 32]), bundle_coin_spend(5, false, false, b"a"));
        let candidate = ReplacementCandidate {
            fee: 1010,
            cost: 100,
            assert_height: 0,
            assert_before_height: None,
            assert_before_seconds: None,
            bundle_coin_spends: &spends,
        };
        assert_eq!(can_replace(&config(), &candidate, &[conflict]), Err(Err::MempoolConflict));
    }

    #[test]
    fn can_replace_rejects_dropping_a_coin_from_the_superset() {
        let conflict = Arc::new(make_item(1, 1000, 100, 5, false, false, b"a"));
        let spends = IndexMap::new(); // candidate doesn't spend coin 5 at all
        let candidate = ReplacementCandidate {
            fee: 5000,
            cost: 100,
            assert_height: 0,
            assert_before_height: None,
            assert_before_seconds: None,
            bundle_coin_spends: &spends,
        };
        assert_eq!(can_replace(&config(), &candidate, &[conflict]), Err(Err::MempoolConflict));
    }

    #[test]
    fn can_replace_rejects_dropping_fast_forward_eligibility() {
        let conflict = Arc::new(make_item(1, 1000, 100, 5, true, false, b"a"));
        let mut spends = IndexMap::new();
        spends.insert(Bytes32::from([5; 32]), bundle_coin_spend(5, false, false, b"a"));
        let candidate = ReplacementCandidate {
            fee: 5000,
            cost: 100,
            assert_height: 0,
            assert_before_height: None,
            assert_before_seconds: None,
            bundle_coin_spends: &spends,
        };
        assert_eq!(can_replace(&config(), &candidate, &[conflict]), Err(Err::MempoolConflict));
    }
}
