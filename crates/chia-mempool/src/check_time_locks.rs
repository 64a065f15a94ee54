use crate::conditions::SpendBundleConditions;
use crate::error::Err;
use chia_protocol::{Bytes32, CoinRecord};
use std::collections::HashMap;

/// Checks a bundle's absolute and relative time-locks against the current
/// peak. Ported from `chia-consensus::check_time_locks::check_time_locks`,
/// generalized from `OwnedSpendBundleConditions` to this crate's
/// [`SpendBundleConditions`]; the height-lock failure kinds are distinguished
/// from the rest because the validator routes them to
/// the height-pending cache instead of failing outright.
pub fn check_time_locks(
    removal_coin_records: &HashMap<Bytes32, CoinRecord>,
    bundle_conds: &SpendBundleConditions,
    prev_transaction_block_height: u32,
    timestamp: u64,
) -> Option<Err> {
    if prev_transaction_block_height < bundle_conds.height_absolute {
        return Some(Err::AssertHeightAbsoluteFailed);
    }
    if timestamp < bundle_conds.seconds_absolute {
        return Some(Err::AssertSecondsAbsoluteFailed);
    }
    if let Some(before_height_absolute) = bundle_conds.before_height_absolute {
        if prev_transaction_block_height >= before_height_absolute {
            return Some(Err::AssertBeforeHeightAbsoluteFailed);
        }
    }
    if let Some(before_seconds_absolute) = bundle_conds.before_seconds_absolute {
        if timestamp >= before_seconds_absolute {
            return Some(Err::AssertBeforeSecondsAbsoluteFailed);
        }
    }

    for spend in &bundle_conds.spends {
        let Some(unspent) = removal_coin_records.get(&spend.coin_id) else {
            // ephemeral coins carry no relative time-lock obligations of
            // their own; they are synthesized at (peak+1, peak_timestamp)
            // before this function is ever called (see validator step 5).
            continue;
        };

        if let Some(height_relative) = spend.height_relative {
            if prev_transaction_block_height < unspent.confirmed_block_index + height_relative {
                return Some(Err::AssertHeightRelativeFailed);
            }
        }
        if let Some(seconds_relative) = spend.seconds_relative {
            if timestamp < unspent.timestamp + seconds_relative {
                return Some(Err::AssertSecondsRelativeFailed);
            }
        }
        if let Some(before_height_relative) = spend.before_height_relative {
            if prev_transaction_block_height
                >= unspent.confirmed_block_index + before_height_relative
            {
                return Some(Err::AssertBeforeHeightRelativeFailed);
            }
        }
        if let Some(before_seconds_relative) = spend.before_seconds_relative {
            if timestamp >= unspent.timestamp + before_seconds_relative {
                return Some(Err::AssertBeforeSecondsRelativeFailed);
            }
        }
    }

    None
}

/// True iff a failure kind belongs in the height-pending cache rather than
/// being rejected outright.
#[must_use]
pub fn is_height_pending(err: Err) -> bool {
    matches!(
        err,
        Err::AssertHeightAbsoluteFailed | Err::AssertHeightRelativeFailed
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conditions::SpendConditions;
    use chia_protocol::Coin;
    use rstest::rstest;

    fn dummy_coin_record(confirmed_block_index: u32, timestamp: u64) -> CoinRecord {
        CoinRecord {
            coin: Coin::new(Bytes32::default(), Bytes32::default(), 1),
            confirmed_block_index,
            spent_block_index: 0,
            coinbase: false,
            timestamp,
        }
    }

    fn dummy_spend(coin_id: Bytes32) -> SpendConditions {
        SpendConditions {
            coin_id,
            parent_id: Bytes32::default(),
            puzzle_hash: Bytes32::default(),
            coin_amount: 1,
            condition_cost: 0,
            execution_cost: 0,
            flags: 0,
            height_relative: None,
            seconds_relative: None,
            before_height_relative: None,
            before_seconds_relative: None,
            birth_height: None,
            birth_seconds: None,
            create_coin: vec![],
        }
    }

    #[rstest]
    #[case(0, 0, 10, 1000, None, None, None)]
    #[case(20, 0, 10, 1000, Some(Err::AssertHeightAbsoluteFailed), None, None)]
    #[case(0, 2000, 10, 1000, Some(Err::AssertSecondsAbsoluteFailed), None, None)]
    #[case(0, 0, 10, 1000, Some(Err::AssertBeforeHeightAbsoluteFailed), Some(5), None)]
    #[case(0, 0, 10, 2000, Some(Err::AssertBeforeSecondsAbsoluteFailed), None, Some(1500))]
    fn test_absolute_constraints(
        #[case] height_absolute: u32,
        #[case] seconds_absolute: u64,
        #[case] prev_height: u32,
        #[case] timestamp: u64,
        #[case] expected: Option<Err>,
        #[case] before_height_absolute: Option<u32>,
        #[case] before_seconds_absolute: Option<u64>,
    ) {
        let bundle = SpendBundleConditions {
            height_absolute,
            seconds_absolute,
            before_height_absolute,
            before_seconds_absolute,
            ..SpendBundleConditions::default()
        };
        let result = check_time_locks(&HashMap::new(), &bundle, prev_height, timestamp);
        assert_eq!(result, expected);
    }

    #[test]
    fn relative_constraints_are_checked_against_the_spent_coin_record() {
        let coin_id = Bytes32::from([3; 32]);
        let record = dummy_coin_record(50, 1000);

        let mut spend = dummy_spend(coin_id);
        spend.seconds_relative = Some(1000); // requires timestamp >= 2000

        let mut map = HashMap::new();
        map.insert(coin_id, record);

        let bundle = SpendBundleConditions {
            spends: vec![spend],
            ..SpendBundleConditions::default()
        };

        let result = check_time_locks(&map, &bundle, 160, 1600);
        assert_eq!(result, Some(Err::AssertSecondsRelativeFailed));
    }

    #[test]
    fn missing_coin_record_is_treated_as_ephemeral_and_skipped() {
        let coin_id = Bytes32::from([4; 32]);
        let mut spend = dummy_spend(coin_id);
        spend.height_relative = Some(5);
        let bundle = SpendBundleConditions {
            spends: vec![spend],
            ..SpendBundleConditions::default()
        };
        assert_eq!(check_time_locks(&HashMap::new(), &bundle, 100, 1000), None);
    }

    #[test]
    fn height_failures_are_pending_others_are_not() {
        assert!(is_height_pending(Err::AssertHeightAbsoluteFailed));
        assert!(is_height_pending(Err::AssertHeightRelativeFailed));
        assert!(!is_height_pending(Err::AssertSecondsAbsoluteFailed));
        assert!(!is_height_pending(Err::DoubleSpend));
    }
}
