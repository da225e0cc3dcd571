//! Tasks: the demand side of the privacy budget ledger.

use std::collections::HashMap;
use std::sync::OnceLock;

use rand::Rng;

use crate::block::BlockId;
use crate::budget::Budget;
use crate::policies::BlockSelectionPolicy;

pub type TaskId = u64;

/// Either a fixed numeric value or a stochastic distribution string such as
/// `"3:0.2,4:0.5,5:0.3"`, parsed into (value, weight) pairs and sampled once
/// when the task is submitted. Never resample after construction — the
/// sampled value becomes fixed for the task's lifetime.
#[derive(Debug, Clone)]
pub enum Sampled<T> {
    Fixed(T),
    Distribution(Vec<(T, f64)>),
}

impl Sampled<f64> {
    pub fn parse(raw: &str) -> Self {
        match parse_distribution_string(raw) {
            Some(pairs) => Sampled::Distribution(pairs),
            None => Sampled::Fixed(raw.parse().unwrap_or(0.0)),
        }
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        match self {
            Sampled::Fixed(v) => *v,
            Sampled::Distribution(pairs) => sample_from_pairs(pairs, rng),
        }
    }
}

impl Sampled<u32> {
    pub fn parse(raw: &str) -> Self {
        match parse_distribution_string(raw) {
            Some(pairs) => Sampled::Distribution(pairs.into_iter().map(|(v, w)| (v as u32, w)).collect()),
            None => Sampled::Fixed(raw.parse().unwrap_or(1)),
        }
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> u32 {
        match self {
            Sampled::Fixed(v) => *v,
            Sampled::Distribution(pairs) => {
                let as_f64: Vec<(f64, f64)> = pairs.iter().map(|(v, w)| (*v as f64, *w)).collect();
                sample_from_pairs(&as_f64, rng).round() as u32
            }
        }
    }
}

/// Parse `"3:0.2,4:0.5,5:0.3"` into `[(3.0, 0.2), (4.0, 0.5), (5.0, 0.3)]`.
/// Returns `None` if the string doesn't look like a distribution (no `:`),
/// in which case the caller treats it as a plain fixed value.
fn parse_distribution_string(raw: &str) -> Option<Vec<(f64, f64)>> {
    if !raw.contains(':') {
        return None;
    }
    let mut pairs = Vec::new();
    for term in raw.split(',') {
        let term = term.trim();
        let mut parts = term.splitn(2, ':');
        let value: f64 = parts.next()?.trim().parse().ok()?;
        let weight: f64 = parts.next()?.trim().parse().ok()?;
        pairs.push((value, weight));
    }
    if pairs.is_empty() {
        None
    } else {
        Some(pairs)
    }
}

fn sample_from_pairs<R: Rng + ?Sized>(pairs: &[(f64, f64)], rng: &mut R) -> f64 {
    let total: f64 = pairs.iter().map(|(_, w)| w).sum();
    let mut target = rng.gen::<f64>() * total;
    for (value, weight) in pairs {
        if target < *weight {
            return *value;
        }
        target -= weight;
    }
    pairs.last().map(|(v, _)| *v).unwrap_or(0.0)
}

/// A DP analysis task: immutable demand once submitted.
#[derive(Clone)]
pub struct Task {
    pub id: TaskId,
    pub name: Option<String>,
    profit_spec: Sampled<f64>,
    n_blocks_spec: Sampled<u32>,
    demand_epsilon_spec: Sampled<f64>,
    pub block_selection_policy: BlockSelectionPolicy,
    profit: Option<f64>,
    n_blocks: Option<u32>,
    demand_epsilon: Option<f64>,
    budget_per_block: HashMap<BlockId, Budget>,
    demand_matrix: OnceLock<HashMap<BlockId, Vec<f64>>>,
}

impl Task {
    pub fn new(
        id: TaskId,
        profit_spec: Sampled<f64>,
        n_blocks_spec: Sampled<u32>,
        block_selection_policy: BlockSelectionPolicy,
        name: Option<String>,
    ) -> Self {
        Self::with_demand_spec(id, profit_spec, n_blocks_spec, Sampled::Fixed(1.0), block_selection_policy, name)
    }

    pub fn with_demand_spec(
        id: TaskId,
        profit_spec: Sampled<f64>,
        n_blocks_spec: Sampled<u32>,
        demand_epsilon_spec: Sampled<f64>,
        block_selection_policy: BlockSelectionPolicy,
        name: Option<String>,
    ) -> Self {
        Self {
            id,
            name,
            profit_spec,
            n_blocks_spec,
            demand_epsilon_spec,
            block_selection_policy,
            profit: None,
            n_blocks: None,
            demand_epsilon: None,
            budget_per_block: HashMap::new(),
            demand_matrix: OnceLock::new(),
        }
    }

    /// Sample `profit`, `n_blocks`, and the per-block demand epsilon once at
    /// submission time. Calling this more than once is a logic error in the
    /// caller: sampled values, once set, are never resampled.
    pub fn sample_profit_and_n_blocks<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        debug_assert!(self.profit.is_none() && self.n_blocks.is_none());
        self.profit = Some(self.profit_spec.sample(rng));
        self.n_blocks = Some(self.n_blocks_spec.sample(rng).max(1));
        self.demand_epsilon = Some(self.demand_epsilon_spec.sample(rng).max(1e-9));
    }

    pub fn profit(&self) -> f64 {
        self.profit.expect("profit sampled before use")
    }

    pub fn demand_epsilon(&self) -> f64 {
        self.demand_epsilon.expect("demand_epsilon sampled before use")
    }

    pub fn n_blocks(&self) -> u32 {
        self.n_blocks.expect("n_blocks sampled before use")
    }

    pub fn set_budget_per_block(&mut self, block_ids: &[BlockId], budget: Budget) {
        for &block_id in block_ids {
            self.budget_per_block.insert(block_id, budget.clone());
        }
    }

    pub fn budget_for(&self, block_id: BlockId) -> Option<&Budget> {
        self.budget_per_block.get(&block_id)
    }

    pub fn touched_blocks(&self) -> impl Iterator<Item = BlockId> + '_ {
        self.budget_per_block.keys().copied()
    }

    pub fn is_allocated_ready(&self) -> bool {
        !self.budget_per_block.is_empty()
    }

    /// Sparse `block_id -> [demand epsilon at each alpha in `alphas`]`, built
    /// once and cached. `alphas` must be the same canonical order on every
    /// call for a given task — the cache is keyed implicitly by whichever
    /// order first populated it, so callers must always pass the run's
    /// shared alpha list here, never a per-block one.
    pub fn demand_matrix(&self, alphas: &[f64]) -> &HashMap<BlockId, Vec<f64>> {
        self.demand_matrix.get_or_init(|| {
            self.budget_per_block
                .iter()
                .map(|(&block_id, budget)| {
                    let row: Vec<f64> = alphas.iter().map(|&a| budget.epsilon(a)).collect();
                    (block_id, row)
                })
                .collect()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn fixed_sample_returns_constant() {
        let spec = Sampled::Fixed(4.0_f64);
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(spec.sample(&mut rng), 4.0);
    }

    #[test]
    fn distribution_string_samples_one_of_the_listed_values() {
        let spec = Sampled::<f64>::parse("3:0.2,4:0.5,5:0.3");
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..20 {
            let v = spec.sample(&mut rng);
            assert!(v == 3.0 || v == 4.0 || v == 5.0);
        }
    }

    #[test]
    fn sampling_is_fixed_after_first_call() {
        let mut task = Task::new(
            0,
            Sampled::Fixed(10.0),
            Sampled::Fixed(2),
            BlockSelectionPolicy::RandomBlocks,
            None,
        );
        let mut rng = StdRng::seed_from_u64(3);
        task.sample_profit_and_n_blocks(&mut rng);
        assert_eq!(task.profit(), 10.0);
        assert_eq!(task.n_blocks(), 2);
        assert_eq!(task.demand_epsilon(), 1.0);
    }

    #[test]
    fn demand_epsilon_is_sampled_independently_of_profit() {
        let mut task = Task::with_demand_spec(
            0,
            Sampled::Fixed(10.0),
            Sampled::Fixed(2),
            Sampled::Fixed(0.3),
            BlockSelectionPolicy::RandomBlocks,
            None,
        );
        let mut rng = StdRng::seed_from_u64(5);
        task.sample_profit_and_n_blocks(&mut rng);
        assert_eq!(task.demand_epsilon(), 0.3);
    }

    #[test]
    fn demand_matrix_is_sparse_and_aligned_to_the_given_alphas() {
        let mut task = Task::new(
            0,
            Sampled::Fixed(1.0),
            Sampled::Fixed(1),
            BlockSelectionPolicy::RandomBlocks,
            None,
        );
        let alphas = [2.0, 4.0, 8.0];
        let budget_a = Budget::from_epsilons(&alphas, &[1.0, 2.0, 3.0]);
        let budget_b = Budget::from_epsilons(&alphas, &[4.0, 5.0, 6.0]);
        task.set_budget_per_block(&[0], budget_a);
        task.set_budget_per_block(&[7], budget_b);

        let matrix = task.demand_matrix(&alphas);
        assert_eq!(matrix.len(), 2);
        assert_eq!(matrix[&0], vec![1.0, 2.0, 3.0]);
        assert_eq!(matrix[&7], vec![4.0, 5.0, 6.0]);
    }
}
