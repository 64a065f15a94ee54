use crate::Bytes32;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The narrow view of a block record the mempool core needs when a new peak
/// arrives. A full node's `BlockRecord` carries weight, VDF outputs, and
/// sub-slot bookkeeping the mempool never touches; those live entirely in the
/// consensus/block-validation layer, outside this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BlockRecord {
    pub header_hash: Bytes32,
    pub prev_transaction_block_hash: Option<Bytes32>,
    pub height: u32,
    /// `Some` only for transaction blocks.
    pub timestamp: Option<u64>,
}

impl BlockRecord {
    pub fn is_transaction_block(&self) -> bool {
        self.timestamp.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_transaction_block_follows_timestamp_presence() {
        let non_tx = BlockRecord {
            header_hash: Bytes32::default(),
            prev_transaction_block_hash: None,
            height: 10,
            timestamp: None,
        };
        assert!(!non_tx.is_transaction_block());

        let tx = BlockRecord {
            timestamp: Some(1234),
            ..non_tx
        };
        assert!(tx.is_transaction_block());
    }
}
