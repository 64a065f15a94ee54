//! Default fee-rate estimator (component C2).
//!
//! No Rust crate or corpus source implements Chia's actual
//! `bitcoin_fee_estimator`-derived estimator, so this is an original,
//! dependency-free design: a fixed ladder of fee-per-cost buckets, each
//! tracking an exponentially-decayed estimate of "was an item at or above
//! this rate included in the last block". Assuming inclusion is
//! geometrically distributed, `1 / inclusion_rate` is the expected number of
//! blocks until an item at that rate confirms; `estimate_fee_rate` returns
//! the cheapest bucket whose expected wait is within the caller's horizon.

use crate::mempool_item::MempoolItemInfo;
use crate::traits::FeeEstimator;

/// Smoothing factor for the exponential moving average of each bucket's
/// per-block inclusion hit rate. Closer to 1.0 remembers history longer.
const DECAY: f64 = 0.9;

fn default_buckets() -> Vec<f64> {
    let mut buckets = vec![0.0];
    let mut rate = 1.0_f64;
    while rate < 1e7 {
        buckets.push(rate);
        rate *= 1.5;
    }
    buckets
}

#[derive(Debug, Clone)]
pub struct BucketedFeeEstimator {
    /// Ascending fee-per-cost thresholds; `buckets[i]` is the minimum rate a
    /// bundle must have to count toward `inclusion_rate[i]`.
    buckets: Vec<f64>,
    inclusion_rate: Vec<f64>,
    blocks_observed: u64,
    pending_count: u64,
    pending_cost: u64,
}

impl BucketedFeeEstimator {
    #[must_use]
    pub fn new() -> Self {
        let buckets = default_buckets();
        let inclusion_rate = vec![0.0; buckets.len()];
        Self {
            buckets,
            inclusion_rate,
            blocks_observed: 0,
            pending_count: 0,
            pending_cost: 0,
        }
    }

    #[must_use]
    pub fn pending_count(&self) -> u64 {
        self.pending_count
    }

    #[must_use]
    pub fn pending_cost(&self) -> u64 {
        self.pending_cost
    }
}

impl Default for BucketedFeeEstimator {
    fn default() -> Self {
        Self::new()
    }
}

impl FeeEstimator for BucketedFeeEstimator {
    fn add_mempool_item(&mut self, info: MempoolItemInfo) {
        self.pending_count += 1;
        self.pending_cost += info.cost;
    }

    fn remove_mempool_item(&mut self, info: MempoolItemInfo) {
        self.pending_count = self.pending_count.saturating_sub(1);
        self.pending_cost = self.pending_cost.saturating_sub(info.cost);
    }

    fn new_block(&mut self, _height: u32, included: &[MempoolItemInfo]) {
        let rates: Vec<f64> = included
            .iter()
            .map(|i| i.fee as f64 / i.cost as f64)
            .collect();

        for (bucket, rate) in self.buckets.iter().zip(self.inclusion_rate.iter_mut()) {
            let hit = rates.iter().any(|r| r >= bucket);
            *rate = DECAY * *rate + (1.0 - DECAY) * f64::from(hit);
        }
        self.blocks_observed += 1;
    }

    fn estimate_fee_rate(&self, target_blocks: u32) -> f64 {
        if self.blocks_observed == 0 {
            return self.buckets.last().copied().unwrap_or(0.0);
        }

        for (bucket, rate) in self.buckets.iter().zip(self.inclusion_rate.iter()) {
            if *rate <= 0.0 {
                continue;
            }
            let expected_blocks = 1.0 / rate;
            if expected_blocks <= f64::from(target_blocks) {
                return *bucket;
            }
        }
        self.buckets.last().copied().unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(fee: u64, cost: u64) -> MempoolItemInfo {
        MempoolItemInfo {
            cost,
            fee,
            height_added_to_mempool: 0,
        }
    }

    #[test]
    fn cold_start_returns_the_highest_bucket() {
        let estimator = BucketedFeeEstimator::new();
        assert_eq!(
            estimator.estimate_fee_rate(1),
            estimator.buckets.last().copied().unwrap()
        );
    }

    #[test]
    fn repeated_inclusion_at_a_rate_lowers_its_estimated_wait() {
        let mut estimator = BucketedFeeEstimator::new();
        for _ in 0..50 {
            estimator.new_block(0, &[info(10, 1)]); // fee_per_cost = 10
        }
        // a bucket at or below rate 10 should now confirm within ~1 block
        let estimate = estimator.estimate_fee_rate(2);
        assert!(estimate <= 10.0);
    }

    #[test]
    fn add_and_remove_mempool_item_track_pending_totals() {
        let mut estimator = BucketedFeeEstimator::new();
        estimator.add_mempool_item(info(10, 5));
        estimator.add_mempool_item(info(20, 5));
        assert_eq!(estimator.pending_count(), 2);
        assert_eq!(estimator.pending_cost(), 10);
        estimator.remove_mempool_item(info(10, 5));
        assert_eq!(estimator.pending_count(), 1);
        assert_eq!(estimator.pending_cost(), 5);
    }

    #[test]
    fn never_observing_a_block_means_pending_totals_dont_affect_estimate() {
        let mut estimator = BucketedFeeEstimator::new();
        estimator.add_mempool_item(info(1, 1));
        assert_eq!(estimator.estimate_fee_rate(10), estimator.buckets.last().copied().unwrap());
    }
}
