use crate::coin_spend::CoinSpend;
use crate::signature::Signature;
use crate::Bytes32;
use chia_sha2::Sha256;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A collection of coin spends plus the aggregated signature authorizing them.
///
/// `additions()` is deliberately not provided here: computing the coins a
/// bundle creates requires running the puzzle reveals through a CLVM
/// interpreter, which this crate treats as opaque (see the `PreValidator`
/// trait). Callers get `SpendBundleConditions` from that collaborator instead.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SpendBundle {
    pub coin_spends: Vec<CoinSpend>,
    pub aggregated_signature: Signature,
}

impl SpendBundle {
    pub fn new(coin_spends: Vec<CoinSpend>, aggregated_signature: Signature) -> Self {
        Self {
            coin_spends,
            aggregated_signature,
        }
    }

    pub fn aggregate(spend_bundles: &[SpendBundle]) -> SpendBundle {
        let mut coin_spends = Vec::new();
        for sb in spend_bundles {
            coin_spends.extend_from_slice(&sb.coin_spends[..]);
        }
        SpendBundle {
            coin_spends,
            aggregated_signature: Signature::default(),
        }
    }

    /// The bundle's identity: SHA-256 of each spend's coin id, puzzle reveal,
    /// and solution, in order, followed by the aggregated signature.
    pub fn name(&self) -> Bytes32 {
        let mut hasher = Sha256::new();
        for cs in &self.coin_spends {
            hasher.update(cs.coin.coin_id());
            hasher.update(cs.puzzle_reveal.as_slice());
            hasher.update(cs.solution.as_slice());
        }
        hasher.update(self.aggregated_signature.to_bytes());
        Bytes32::new(hasher.finalize())
    }

    pub fn removals(&self) -> Vec<crate::Coin> {
        self.coin_spends.iter().map(|cs| cs.coin).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Coin, Program};

    fn dummy_spend(amount: u64) -> CoinSpend {
        CoinSpend::new(
            Coin::new(Bytes32::from([1; 32]), Bytes32::from([2; 32]), amount),
            Program::new(vec![1].into()),
            Program::new(vec![0x80].into()),
        )
    }

    #[test]
    fn aggregate_concatenates_coin_spends() {
        let a = SpendBundle::new(vec![dummy_spend(1)], Signature::default());
        let b = SpendBundle::new(vec![dummy_spend(2)], Signature::default());
        let agg = SpendBundle::aggregate(&[a, b]);
        assert_eq!(agg.coin_spends.len(), 2);
    }

    #[test]
    fn name_changes_when_a_spend_changes() {
        let a = SpendBundle::new(vec![dummy_spend(1)], Signature::default());
        let b = SpendBundle::new(vec![dummy_spend(2)], Signature::default());
        assert_ne!(a.name(), b.name());
    }

    #[test]
    fn removals_returns_spent_coins_in_order() {
        let bundle = SpendBundle::new(vec![dummy_spend(1), dummy_spend(2)], Signature::default());
        let removals = bundle.removals();
        assert_eq!(removals.len(), 2);
        assert_eq!(removals[0].amount, 1);
        assert_eq!(removals[1].amount, 2);
    }
}
