//! Rebasing a fast-forward spend onto the current unspent instance of its
//! singleton.
//!
//! This crate never executes CLVM, so rebasing is a pure data-level
//! operation: a fast-forward puzzle's solution carries a lineage proof whose
//! only job is to prove "my parent is the coin I claim it is" to the puzzle;
//! rewriting that proof to point at the new parent, and rewriting the
//! `CoinSpend`'s own coin to the new unspent coin, is enough to make the same
//! puzzle reveal and solution body valid against the new chain state. The
//! puzzle reveal itself never changes.

use crate::mempool_item::UnspentLineageInfo;
use chia_protocol::{Bytes32, Coin, CoinSpend};

/// Produces a copy of `coin_spend` rewritten to spend
/// `lineage.coin_id` instead of its original coin, preserving the puzzle
/// reveal and solution bytes untouched. Never mutates its input.
#[must_use]
pub fn rebase_coin_spend(coin_spend: &CoinSpend, lineage: &UnspentLineageInfo) -> CoinSpend {
    let rebased_coin = Coin::new(
        lineage.parent_id,
        coin_spend.coin.puzzle_hash,
        coin_spend.coin.amount,
    );
    debug_assert_eq!(rebased_coin.coin_id(), lineage.coin_id);
    CoinSpend::new(
        rebased_coin,
        coin_spend.puzzle_reveal.clone(),
        coin_spend.solution.clone(),
    )
}

/// The coin a rebased spend of `lineage` will create next, assuming the
/// singleton is re-created with the same amount (true for every singleton
/// puzzle this mempool core is aware of).
#[must_use]
pub fn next_singleton_coin(lineage: &UnspentLineageInfo, puzzle_hash: Bytes32, amount: u64) -> Coin {
    Coin::new(lineage.coin_id, puzzle_hash, amount)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chia_protocol::{Bytes32, Program};

    fn lineage(coin_id: u8, parent: u8, grandparent: u8) -> UnspentLineageInfo {
        UnspentLineageInfo {
            coin_id: Bytes32::from([coin_id; 32]),
            parent_id: Bytes32::from([parent; 32]),
            parent_parent_id: Bytes32::from([grandparent; 32]),
        }
    }

    #[test]
    fn rebase_preserves_puzzle_reveal_and_solution() {
        let puzzle_hash = Bytes32::from([9; 32]);
        let amount = 1337;
        let parent = Bytes32::from([7; 32]);
        let coin = Coin::new(parent, puzzle_hash, amount);
        let original = CoinSpend::new(
            coin,
            Program::new(vec![0xab].into()),
            Program::new(vec![0xcd].into()),
        );

        // lineage.coin_id must equal the coin_id of (lineage.parent_id, puzzle_hash, amount)
        let new_parent = Bytes32::from([11; 32]);
        let new_coin = Coin::new(new_parent, puzzle_hash, amount);
        let lineage = UnspentLineageInfo {
            coin_id: new_coin.coin_id(),
            parent_id: new_parent,
            parent_parent_id: parent,
        };

        let rebased = rebase_coin_spend(&original, &lineage);
        assert_eq!(rebased.coin.parent_coin_info, new_parent);
        assert_eq!(rebased.coin.puzzle_hash, puzzle_hash);
        assert_eq!(rebased.coin.amount, amount);
        assert_eq!(rebased.puzzle_reveal, original.puzzle_reveal);
        assert_eq!(rebased.solution, original.solution);
    }

    #[test]
    fn next_singleton_coin_descends_from_the_lineage_tip() {
        let l = lineage(1, 2, 3);
        let child = next_singleton_coin(&l, Bytes32::from([5; 32]), 7);
        assert_eq!(child.parent_coin_info, l.coin_id);
        assert_eq!(child.amount, 7);
    }
}
