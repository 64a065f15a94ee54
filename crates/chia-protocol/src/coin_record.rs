use crate::Coin;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The persistent-storage view of a coin: in addition to the coin itself,
/// when (if ever) it was confirmed and spent. Owned by the external coin
/// store; the mempool core only ever reads these fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CoinRecord {
    pub coin: Coin,
    pub confirmed_block_index: u32,
    pub spent_block_index: u32,
    pub coinbase: bool,
    /// Timestamp of the block at height `confirmed_block_index`.
    pub timestamp: u64,
}

impl CoinRecord {
    pub fn spent(&self) -> bool {
        self.spent_block_index > 0
    }

    pub fn name(&self) -> crate::Bytes32 {
        self.coin.coin_id()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Bytes32;

    fn record(spent_block_index: u32) -> CoinRecord {
        CoinRecord {
            coin: Coin::new(Bytes32::from([1; 32]), Bytes32::from([2; 32]), 100),
            confirmed_block_index: 5,
            spent_block_index,
            coinbase: false,
            timestamp: 1000,
        }
    }

    #[test]
    fn spent_is_true_only_when_spent_block_index_is_nonzero() {
        assert!(!record(0).spent());
        assert!(record(10).spent());
    }
}
