use chia_protocol::{Bytes, Bytes32, CoinRecord};
use std::collections::HashMap;

/// The spend is eligible to be deduplicated against another admitted item
/// spending the same coin with an identical solution
/// "Dedup spend"). Matches `chia-consensus::gen::conditions::ELIGIBLE_FOR_DEDUP`.
pub const ELIGIBLE_FOR_DEDUP: u32 = 1;

/// The spend is eligible to be rebased onto a newer instance of the same
/// singleton (a "fast-forward" spend). Matches
/// `chia-consensus::gen::conditions::ELIGIBLE_FOR_FF`.
pub const ELIGIBLE_FOR_FF: u32 = 4;

/// A `(puzzle_hash, amount, hint)` triple created by a spend. `hint` is
/// opaque metadata bytes the puzzle may attach (e.g. for wallet scanning);
/// the mempool indexes admitted items by it.
pub type CreateCoin = (Bytes32, u64, Option<Bytes>);

/// Per-coin conditions produced by pre-validation,
/// `SpendConditions`). Plain owned data - no CLVM `NodePtr` - modeled on
/// `chia-consensus::gen::owned_conditions::OwnedSpend`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpendConditions {
    pub coin_id: Bytes32,
    pub parent_id: Bytes32,
    pub puzzle_hash: Bytes32,
    pub coin_amount: u64,
    pub condition_cost: u64,
    pub execution_cost: u64,
    pub flags: u32,

    pub height_relative: Option<u32>,
    pub seconds_relative: Option<u64>,
    pub before_height_relative: Option<u32>,
    pub before_seconds_relative: Option<u64>,
    pub birth_height: Option<u32>,
    pub birth_seconds: Option<u64>,

    pub create_coin: Vec<CreateCoin>,
}

impl SpendConditions {
    #[must_use]
    pub fn eligible_for_dedup(&self) -> bool {
        self.flags & ELIGIBLE_FOR_DEDUP != 0
    }

    #[must_use]
    pub fn eligible_for_fast_forward(&self) -> bool {
        self.flags & ELIGIBLE_FOR_FF != 0
    }

    #[must_use]
    pub fn cost(&self) -> u64 {
        self.condition_cost + self.execution_cost
    }
}

/// The pre-validated result of running a spend bundle's puzzles and parsing
/// their conditions. Produced by the
/// opaque `validate_clvm_and_signature` collaborator (see
/// [`crate::traits::PreValidator`]) and consumed by [`crate::validator`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpendBundleConditions {
    pub spends: Vec<SpendConditions>,
    pub cost: u64,

    /// Highest (most restrictive) of all ASSERT_HEIGHT_ABSOLUTE conditions.
    pub height_absolute: u32,
    /// Highest (most restrictive) of all ASSERT_SECONDS_ABSOLUTE conditions.
    pub seconds_absolute: u64,
    /// Lowest (most restrictive) of all ASSERT_BEFORE_HEIGHT_ABSOLUTE conditions, if any.
    pub before_height_absolute: Option<u32>,
    /// Lowest (most restrictive) of all ASSERT_BEFORE_SECONDS_ABSOLUTE conditions, if any.
    pub before_seconds_absolute: Option<u64>,

    pub validated_signature: bool,
}

impl Default for SpendBundleConditions {
    fn default() -> Self {
        Self {
            spends: Vec::new(),
            cost: 0,
            height_absolute: 0,
            seconds_absolute: 0,
            before_height_absolute: None,
            before_seconds_absolute: None,
            validated_signature: false,
        }
    }
}

/// The resolved time-lock envelope a [`crate::mempool_item::MempoolItem`]
/// carries once absolute and relative constraints have been folded together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TimelockConditions {
    pub assert_height: u32,
    pub assert_seconds: u64,
    pub assert_before_height: Option<u32>,
    pub assert_before_seconds: Option<u64>,
}

/// Resolves every spend's relative height/seconds bounds against its coin's
/// `confirmed_block_index`/`timestamp` and folds them together with the
/// bundle's absolute bounds, exactly as `mempool_manager.py`'s
/// `compute_assert_height` does: relative lower bounds use `max` (the
/// envelope must be at least as strict as every spend demands), relative
/// upper bounds use `min` (the envelope must be at least as strict as the
/// tightest deadline).
#[must_use]
pub fn compute_timelock_envelope(
    coin_records: &HashMap<Bytes32, CoinRecord>,
    conds: &SpendBundleConditions,
) -> TimelockConditions {
    let mut assert_height = conds.height_absolute;
    let mut assert_seconds = conds.seconds_absolute;
    let mut assert_before_height = conds.before_height_absolute;
    let mut assert_before_seconds = conds.before_seconds_absolute;

    for spend in &conds.spends {
        let Some(record) = coin_records.get(&spend.coin_id) else {
            continue;
        };

        if let Some(height_relative) = spend.height_relative {
            assert_height = assert_height.max(record.confirmed_block_index + height_relative);
        }
        if let Some(seconds_relative) = spend.seconds_relative {
            assert_seconds = assert_seconds.max(record.timestamp + seconds_relative);
        }
        if let Some(before_height_relative) = spend.before_height_relative {
            let bound = record.confirmed_block_index + before_height_relative;
            assert_before_height = Some(assert_before_height.map_or(bound, |b| b.min(bound)));
        }
        if let Some(before_seconds_relative) = spend.before_seconds_relative {
            let bound = record.timestamp + before_seconds_relative;
            assert_before_seconds = Some(assert_before_seconds.map_or(bound, |b| b.min(bound)));
        }
    }

    TimelockConditions {
        assert_height,
        assert_seconds,
        assert_before_height,
        assert_before_seconds,
    }
}
