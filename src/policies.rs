//! Block-selection policies: pure functions mapping a number of available
//! blocks and a requested count to an ordered list of distinct block
//! indices.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::error::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BlockSelectionPolicy {
    LatestBlocksFirst,
    RandomBlocks,
    ContiguousBlocksRandomOffset,
    BiasedRandomBlocks,
    Zeta(u64),
}

impl BlockSelectionPolicy {
    /// Parse a policy name as it appears in config/workload files, e.g.
    /// `"LatestBlocksFirst"` or `"Zeta_1.5"` (the fractional part of `s` is
    /// encoded as a fixed-point integer to keep the enum `Copy`).
    pub fn from_str(name: &str) -> Result<Self, ConfigError> {
        if let Some(rest) = name.strip_prefix("Zeta_") {
            let s: f64 = rest
                .parse()
                .map_err(|_| ConfigError::UnknownPolicyName(name.to_string()))?;
            return Ok(BlockSelectionPolicy::Zeta((s * 1000.0).round() as u64));
        }
        match name {
            "LatestBlocksFirst" => Ok(BlockSelectionPolicy::LatestBlocksFirst),
            "RandomBlocks" => Ok(BlockSelectionPolicy::RandomBlocks),
            "ContiguousBlocksRandomOffset" => Ok(BlockSelectionPolicy::ContiguousBlocksRandomOffset),
            "BiasedRandomBlocks" => Ok(BlockSelectionPolicy::BiasedRandomBlocks),
            _ => Err(ConfigError::UnknownPolicyName(name.to_string())),
        }
    }

    fn zeta_s(&self) -> f64 {
        match self {
            BlockSelectionPolicy::Zeta(fixed) => *fixed as f64 / 1000.0,
            _ => unreachable!(),
        }
    }

    /// Select `k` distinct block indices out of `[0, n_blocks)`. Returns
    /// `None` if `k > n_blocks` (the caller reports `NotEnoughBlocks`).
    pub fn select_blocks<R: Rng + ?Sized>(
        &self,
        n_blocks: usize,
        k: usize,
        rng: &mut R,
    ) -> Option<Vec<usize>> {
        if k > n_blocks {
            return None;
        }
        Some(match self {
            BlockSelectionPolicy::LatestBlocksFirst => {
                ((n_blocks - k)..n_blocks).rev().collect()
            }
            BlockSelectionPolicy::RandomBlocks => {
                let mut all: Vec<usize> = (0..n_blocks).collect();
                all.shuffle(rng);
                all.truncate(k);
                all
            }
            BlockSelectionPolicy::ContiguousBlocksRandomOffset => {
                let offset = rng.gen_range(0..=(n_blocks - k));
                (offset..offset + k).collect()
            }
            BlockSelectionPolicy::BiasedRandomBlocks => {
                let prefer_even: bool = rng.gen_bool(0.7);
                if prefer_even {
                    let even: Vec<usize> = (0..n_blocks).filter(|i| i % 2 == 0).collect();
                    let odd: Vec<usize> = (0..n_blocks).filter(|i| i % 2 != 0).collect();
                    let diff = k as isize - even.len() as isize;
                    if diff > 0 {
                        let mut extra: Vec<usize> = odd.clone();
                        extra.shuffle(rng);
                        extra.truncate(diff as usize);
                        let mut selected = even;
                        selected.extend(extra);
                        selected
                    } else {
                        let mut selected = even;
                        selected.shuffle(rng);
                        selected.truncate(k);
                        selected
                    }
                } else {
                    let mut all: Vec<usize> = (0..n_blocks).collect();
                    all.shuffle(rng);
                    all.truncate(k);
                    all
                }
            }
            BlockSelectionPolicy::Zeta(_) => {
                let s = self.zeta_s();
                let weights: Vec<f64> = (0..n_blocks).map(|i| ((i + 1) as f64).powf(-s)).collect();
                weighted_sample_without_replacement(&weights, k, rng)
            }
        })
    }
}

/// Sample `k` indices out of `weights` without replacement, with probability
/// at each draw proportional to the remaining weight.
fn weighted_sample_without_replacement<R: Rng + ?Sized>(
    weights: &[f64],
    k: usize,
    rng: &mut R,
) -> Vec<usize> {
    let mut remaining: Vec<(usize, f64)> = weights.iter().copied().enumerate().collect();
    let mut chosen = Vec::with_capacity(k);
    for _ in 0..k {
        let total: f64 = remaining.iter().map(|(_, w)| w).sum();
        let mut target = rng.gen::<f64>() * total;
        let mut pick_at = remaining.len() - 1;
        for (idx, (_, w)) in remaining.iter().enumerate() {
            if target < *w {
                pick_at = idx;
                break;
            }
            target -= w;
        }
        let (index, _) = remaining.remove(pick_at);
        chosen.push(index);
    }
    chosen
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(42)
    }

    #[test]
    fn latest_blocks_first_is_descending() {
        let picked = BlockSelectionPolicy::LatestBlocksFirst
            .select_blocks(10, 3, &mut rng())
            .unwrap();
        assert_eq!(picked, vec![9, 8, 7]);
    }

    #[test]
    fn not_enough_blocks_returns_none() {
        assert!(BlockSelectionPolicy::RandomBlocks.select_blocks(2, 5, &mut rng()).is_none());
    }

    #[test]
    fn contiguous_offset_window_is_contiguous() {
        let picked = BlockSelectionPolicy::ContiguousBlocksRandomOffset
            .select_blocks(10, 4, &mut rng())
            .unwrap();
        for w in picked.windows(2) {
            assert_eq!(w[1], w[0] + 1);
        }
    }

    #[test]
    fn contiguous_offset_zero_when_k_equals_n() {
        let picked = BlockSelectionPolicy::ContiguousBlocksRandomOffset
            .select_blocks(5, 5, &mut rng())
            .unwrap();
        assert_eq!(picked, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn random_blocks_has_no_duplicates() {
        let picked = BlockSelectionPolicy::RandomBlocks.select_blocks(20, 7, &mut rng()).unwrap();
        let mut sorted = picked.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), picked.len());
    }

    #[test]
    fn biased_falls_back_to_odds_when_evens_insufficient() {
        let picked = BlockSelectionPolicy::BiasedRandomBlocks.select_blocks(3, 3, &mut rng()).unwrap();
        let mut sorted = picked.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, vec![0, 1, 2]);
    }

    #[test]
    fn zeta_selects_distinct_indices() {
        let picked = BlockSelectionPolicy::Zeta(1500).select_blocks(10, 4, &mut rng()).unwrap();
        let mut sorted = picked.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), 4);
    }
}
