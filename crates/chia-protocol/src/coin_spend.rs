use crate::coin::Coin;
use crate::program::Program;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A single coin's contribution to a spend bundle: which coin is being spent,
/// the puzzle that locks it, and the solution satisfying that puzzle.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CoinSpend {
    pub coin: Coin,
    pub puzzle_reveal: Program,
    pub solution: Program,
}

impl CoinSpend {
    pub fn new(coin: Coin, puzzle_reveal: Program, solution: Program) -> Self {
        Self {
            coin,
            puzzle_reveal,
            solution,
        }
    }
}
