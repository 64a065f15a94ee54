//! Assembles a candidate [`MempoolItem`] from pre-validated conditions and
//! decides whether it's admissible (component C5).
//!
//! This function is deliberately synchronous and free of `CoinStore`/
//! `PreValidator` calls: the manager fetches everything it needs up front
//! and hands it in, which keeps the actual admission policy unit-testable
//! without an async runtime.

use crate::canonical::is_clvm_canonical;
use crate::check_time_locks::check_time_locks;
use crate::conditions::{compute_timelock_envelope, SpendBundleConditions};
use crate::config::{MempoolConfig, FEE_LIMIT};
use crate::error::{Err, MempoolResult};
use crate::mempool_item::{BundleCoinSpend, MempoolItem, UnspentLineageInfo};
use crate::replacement::{self, CandidateSpend, ReplacementCandidate};
use crate::store::MempoolStore;
use chia_protocol::{Bytes32, Coin, CoinRecord, SpendBundle};
use indexmap::IndexMap;
use std::collections::HashMap;
use std::sync::Arc;

/// The outcome of running a bundle through admission. Every variant that
/// carries a constructed [`MempoolItem`] is one the caller may want to
/// retry later, so the item travels with the outcome instead of being
/// dropped on the non-`Admit` paths.
pub enum ValidationOutcome {
    /// Admit the item outright, evicting `conflicts` (may be empty).
    Admit {
        item: MempoolItem,
        conflicts: Vec<Arc<MempoolItem>>,
    },
    /// Conflicts with already-admitted items and doesn't clear the
    /// replacement bar; belongs in the conflict cache.
    Conflict { item: MempoolItem },
    /// A height time-lock isn't satisfied yet but might be at a later peak;
    /// belongs in the pending cache.
    Pending { item: MempoolItem, err: Err },
}

#[allow(clippy::too_many_arguments)]
pub fn validate_spend_bundle(
    config: &MempoolConfig,
    store: &MempoolStore,
    spend_bundle: &SpendBundle,
    conds: &SpendBundleConditions,
    coin_records: &HashMap<Bytes32, CoinRecord>,
    lineage_by_puzzle_hash: &HashMap<Bytes32, UnspentLineageInfo>,
    peak_height: u32,
    peak_timestamp: u64,
) -> MempoolResult<ValidationOutcome> {
    if conds.spends.is_empty() || conds.cost == 0 {
        return Err(Err::InvalidSpendBundle);
    }
    if conds.cost > config.max_tx_clvm_cost {
        return Err(Err::BlockCostExceedsMax);
    }
    // The pre-validator's contract guarantees one `SpendConditions` per
    // `CoinSpend`; a mismatch means the collaborator disagrees with the
    // bundle it was handed, which is a bug in that collaborator, not
    // something this validator can recover from.
    debug_assert_eq!(
        spend_bundle.coin_spends.len(),
        conds.spends.len(),
        "pre-validator returned a different spend count than the bundle it validated"
    );

    let spend_by_coin_id: HashMap<Bytes32, &chia_protocol::CoinSpend> = spend_bundle
        .coin_spends
        .iter()
        .map(|cs| (cs.coin.coin_id(), cs))
        .collect();

    // First pass: per-spend derived data, plus the set of coins this bundle
    // creates itself (ephemeral coins a later spend may consume).
    let mut additions_by_id: HashMap<Bytes32, Coin> = HashMap::new();
    for spend in &conds.spends {
        for (puzzle_hash, amount, _hint) in &spend.create_coin {
            let coin = Coin::new(spend.coin_id, *puzzle_hash, *amount);
            additions_by_id.insert(coin.coin_id(), coin);
        }
    }

    let mut bundle_coin_spends: IndexMap<Bytes32, BundleCoinSpend> = IndexMap::new();
    let mut total_input = 0_u64;
    let mut total_output = 0_u64;
    let mut all_fast_forward = true;

    for spend in &conds.spends {
        let Some(coin_spend) = spend_by_coin_id.get(&spend.coin_id) else {
            return Err(Err::UnknownUnspent);
        };

        let eligible_for_dedup = spend.eligible_for_dedup();
        if eligible_for_dedup && !is_clvm_canonical(coin_spend.solution.as_slice()) {
            return Err(Err::InvalidCoinSolution);
        }
        let eligible_for_fast_forward = spend.eligible_for_fast_forward();
        all_fast_forward &= eligible_for_fast_forward;

        let additions: Vec<Coin> = spend
            .create_coin
            .iter()
            .map(|(ph, amount, _hint)| Coin::new(spend.coin_id, *ph, *amount))
            .collect();

        total_input += spend.coin_amount;
        total_output += additions.iter().map(|c| c.amount).sum::<u64>();

        bundle_coin_spends.insert(
            spend.coin_id,
            BundleCoinSpend {
                coin_spend: (*coin_spend).clone(),
                eligible_for_dedup,
                eligible_for_fast_forward,
                additions,
                cost: spend.cost(),
                latest_singleton_lineage: None,
            },
        );
    }

    if all_fast_forward {
        return Err(Err::InvalidSpendBundle);
    }

    let fee = total_input
        .checked_sub(total_output)
        .ok_or(Err::InvalidBlockFeeAmount)?;
    if fee > FEE_LIMIT {
        return Err(Err::InvalidBlockFeeAmount);
    }

    let fee_per_cost = fee as f64 / conds.cost as f64;
    if store.at_full_capacity(conds.cost) {
        let min_fee_rate = store
            .get_min_fee_rate(conds.cost)
            .ok_or(Err::InvalidCostResult)?;
        if fee_per_cost <= min_fee_rate {
            return Err(Err::InvalidFeeLowFee);
        }
    } else if fee > 0 && fee_per_cost < f64::from(config.nonzero_fee_min_fpc) {
        return Err(Err::InvalidFeeTooCloseToZero);
    }

    // Resolve every spent coin's record, synthesizing ephemeral ones this
    // same bundle creates, then check fast-forward lineage and puzzle hash
    // agreement.
    let mut removal_coin_records: HashMap<Bytes32, CoinRecord> = HashMap::new();
    for spend in &conds.spends {
        let eligible_for_fast_forward = bundle_coin_spends[&spend.coin_id].eligible_for_fast_forward;

        let record = if let Some(record) = coin_records.get(&spend.coin_id) {
            *record
        } else if let Some(coin) = additions_by_id.get(&spend.coin_id) {
            CoinRecord {
                coin: *coin,
                confirmed_block_index: peak_height + 1,
                spent_block_index: 0,
                coinbase: false,
                timestamp: peak_timestamp,
            }
        } else {
            return Err(Err::UnknownUnspent);
        };

        if record.coin.puzzle_hash != spend.puzzle_hash {
            return Err(Err::WrongPuzzleHash);
        }

        if record.spent() {
            if !eligible_for_fast_forward {
                return Err(Err::DoubleSpend);
            }
        } else if eligible_for_fast_forward && !lineage_by_puzzle_hash.contains_key(&spend.puzzle_hash) {
            return Err(Err::DoubleSpend);
        }

        if eligible_for_fast_forward {
            if let Some(lineage) = lineage_by_puzzle_hash.get(&spend.puzzle_hash) {
                bundle_coin_spends
                    .get_mut(&spend.coin_id)
                    .expect("just inserted above")
                    .latest_singleton_lineage = Some(*lineage);
            }
        }

        removal_coin_records.insert(spend.coin_id, record);
    }

    let candidate_spends: Vec<CandidateSpend> = bundle_coin_spends
        .iter()
        .map(|(coin_id, spend)| CandidateSpend {
            coin_id: *coin_id,
            eligible_for_dedup: spend.eligible_for_dedup,
            eligible_for_fast_forward: spend.eligible_for_fast_forward,
            solution: spend.coin_spend.solution.as_slice(),
        })
        .collect();
    let conflicts = replacement::check_removals(store, &candidate_spends);

    let envelope = compute_timelock_envelope(&removal_coin_records, conds);
    if let Some(before_height) = envelope.assert_before_height {
        if before_height <= envelope.assert_height {
            return Err(Err::ImpossibleHeightAbsoluteConstraints);
        }
    }
    if let Some(before_seconds) = envelope.assert_before_seconds {
        if before_seconds <= envelope.assert_seconds {
            return Err(Err::ImpossibleSecondsAbsoluteConstraints);
        }
    }

    let item = MempoolItem {
        spend_bundle: spend_bundle.clone(),
        conds: conds.clone(),
        name: spend_bundle.name(),
        fee,
        cost: conds.cost,
        height_added_to_mempool: peak_height,
        assert_height: envelope.assert_height,
        assert_before_height: envelope.assert_before_height,
        assert_before_seconds: envelope.assert_before_seconds,
        bundle_coin_spends,
    };

    if let Some(err) = check_time_locks(&removal_coin_records, conds, peak_height, peak_timestamp) {
        return if crate::check_time_locks::is_height_pending(err) {
            Ok(ValidationOutcome::Pending { item, err })
        } else {
            Err(err)
        };
    }

    if !conflicts.is_empty() {
        let candidate = ReplacementCandidate {
            fee: item.fee,
            cost: item.cost,
            assert_height: item.assert_height,
            assert_before_height: item.assert_before_height,
            assert_before_seconds: item.assert_before_seconds,
            bundle_coin_spends: &item.bundle_coin_spends,
        };
        if replacement::can_replace(config, &candidate, &conflicts).is_err() {
            return Ok(ValidationOutcome::Conflict { item });
        }
    }

    Ok(ValidationOutcome::Admit { item, conflicts })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conditions::SpendConditions;
    use chia_protocol::{CoinSpend, Program, Signature};

    fn coin_and_spend(coin_id_seed: u8, amount: u64, fee: u64) -> (Coin, SpendBundle, SpendConditions) {
        let parent = Bytes32::from([coin_id_seed; 32]);
        let puzzle_hash = Bytes32::from([100; 32]);
        let coin = Coin::new(parent, puzzle_hash, amount);
        let coin_spend = CoinSpend::new(coin, Program::default(), Program::default());
        let bundle = SpendBundle::new(vec![coin_spend], Signature::default());
        let spend_conditions = SpendConditions {
            coin_id: coin.coin_id(),
            parent_id: parent,
            puzzle_hash,
            coin_amount: amount,
            condition_cost: 10,
            execution_cost: 0,
            flags: 0,
            height_relative: None,
            seconds_relative: None,
            before_height_relative: None,
            before_seconds_relative: None,
            birth_height: None,
            birth_seconds: None,
            create_coin: vec![(puzzle_hash, amount - fee, None)],
        };
        (coin, bundle, spend_conditions)
    }

    fn unspent_record(coin: Coin) -> CoinRecord {
        CoinRecord {
            coin,
            confirmed_block_index: 1,
            spent_block_index: 0,
            coinbase: false,
            timestamp: 1000,
        }
    }

    #[test]
    fn admits_a_simple_fee_paying_spend() {
        let (coin, bundle, spend_conditions) = coin_and_spend(1, 1000, 50);
        let conds = SpendBundleConditions {
            spends: vec![spend_conditions],
            cost: 10,
            ..SpendBundleConditions::default()
        };
        let mut records = HashMap::new();
        records.insert(coin.coin_id(), unspent_record(coin));

        let store = MempoolStore::new(&MempoolConfig::default());
        let result = validate_spend_bundle(
            &MempoolConfig::default(),
            &store,
            &bundle,
            &conds,
            &records,
            &HashMap::new(),
            100,
            5000,
        );
        match result.expect("should admit") {
            ValidationOutcome::Admit { item, conflicts } => {
                assert_eq!(item.fee, 50);
                assert!(conflicts.is_empty());
            }
            _ => panic!("expected Admit"),
        }
    }

    #[test]
    fn rejects_unknown_coin() {
        let (_, bundle, spend_conditions) = coin_and_spend(2, 1000, 50);
        let conds = SpendBundleConditions {
            spends: vec![spend_conditions],
            cost: 10,
            ..SpendBundleConditions::default()
        };
        let store = MempoolStore::new(&MempoolConfig::default());
        let result = validate_spend_bundle(
            &MempoolConfig::default(),
            &store,
            &bundle,
            &conds,
            &HashMap::new(),
            &HashMap::new(),
            100,
            5000,
        );
        assert_eq!(result.err(), Some(Err::UnknownUnspent));
    }

    #[test]
    fn rejects_a_double_spend_of_a_non_fast_forward_coin() {
        let (coin, bundle, spend_conditions) = coin_and_spend(3, 1000, 50);
        let conds = SpendBundleConditions {
            spends: vec![spend_conditions],
            cost: 10,
            ..SpendBundleConditions::default()
        };
        let mut record = unspent_record(coin);
        record.spent_block_index = 50;
        let mut records = HashMap::new();
        records.insert(coin.coin_id(), record);

        let store = MempoolStore::new(&MempoolConfig::default());
        let result = validate_spend_bundle(
            &MempoolConfig::default(),
            &store,
            &bundle,
            &conds,
            &records,
            &HashMap::new(),
            100,
            5000,
        );
        assert_eq!(result.err(), Some(Err::DoubleSpend));
    }

    #[test]
    fn rejects_cost_over_the_per_transaction_budget() {
        let (coin, bundle, spend_conditions) = coin_and_spend(4, 1000, 50);
        let config = MempoolConfig {
            max_tx_clvm_cost: 5,
            ..MempoolConfig::default()
        };
        let conds = SpendBundleConditions {
            spends: vec![spend_conditions],
            cost: 10,
            ..SpendBundleConditions::default()
        };
        let mut records = HashMap::new();
        records.insert(coin.coin_id(), unspent_record(coin));

        let store = MempoolStore::new(&config);
        let result = validate_spend_bundle(
            &config,
            &store,
            &bundle,
            &conds,
            &records,
            &HashMap::new(),
            100,
            5000,
        );
        assert_eq!(result.err(), Some(Err::BlockCostExceedsMax));
    }
}
