//! Scheduling metrics: functions that rank pending tasks for the greedy
//! commit algorithm. Higher rank wins. See `SPEC_FULL.md` §4.E for the exact
//! semantics each variant reproduces.

pub mod counters;
mod knapsack;

use std::cmp::Ordering;
use std::collections::HashMap;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use tracing::warn;

use crate::block::{Block, BlockId};
use crate::error::ConfigError;
use crate::task::Task;
use counters::Counters;

/// The result of ranking a task under a metric. `DominantShares` produces a
/// lexicographically-compared vector; every other metric produces a scalar.
#[derive(Debug, Clone)]
pub enum Rank {
    Scalar(f64),
    Vector(Vec<f64>),
}

impl Rank {
    /// Compare two ranks produced by the *same* metric within the *same*
    /// round. Scalars compare numerically (NaN sorts last); vectors compare
    /// lexicographically, shorter-is-less on a common prefix.
    pub fn cmp_for_sort(&self, other: &Rank) -> Ordering {
        match (self, other) {
            (Rank::Scalar(a), Rank::Scalar(b)) => a.partial_cmp(b).unwrap_or(Ordering::Equal),
            (Rank::Vector(a), Rank::Vector(b)) => {
                for (x, y) in a.iter().zip(b.iter()) {
                    match x.partial_cmp(y).unwrap_or(Ordering::Equal) {
                        Ordering::Equal => continue,
                        other => return other,
                    }
                }
                a.len().cmp(&b.len())
            }
            _ => Ordering::Equal,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NormalizeBy {
    None,
    AvailableBudget,
    Capacity,
}

impl NormalizeBy {
    pub fn from_str(s: &str) -> Result<Self, ConfigError> {
        match s {
            "" => Ok(NormalizeBy::None),
            "available_budget" => Ok(NormalizeBy::AvailableBudget),
            "capacity" => Ok(NormalizeBy::Capacity),
            other => Err(ConfigError::InvalidConfig(format!("unknown normalize_by: {other}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricKind {
    Fcfs,
    DominantShares,
    FlatRelevance,
    DynamicFlatRelevance,
    OverflowRelevance,
    BatchOverflowRelevance,
    SoftmaxOverflow,
    SoftKnapsack,
    ArgmaxKnapsack,
}

impl MetricKind {
    pub fn from_str(name: &str) -> Result<Self, ConfigError> {
        Ok(match name {
            "Fcfs" => MetricKind::Fcfs,
            "DominantShares" => MetricKind::DominantShares,
            "FlatRelevance" => MetricKind::FlatRelevance,
            "DynamicFlatRelevance" => MetricKind::DynamicFlatRelevance,
            "OverflowRelevance" => MetricKind::OverflowRelevance,
            "BatchOverflowRelevance" => MetricKind::BatchOverflowRelevance,
            "SoftmaxOverflow" => MetricKind::SoftmaxOverflow,
            "SoftKnapsack" => MetricKind::SoftKnapsack,
            "ArgmaxKnapsack" => MetricKind::ArgmaxKnapsack,
            other => return Err(ConfigError::UnknownMetricName(other.to_string())),
        })
    }

    /// Dynamic metrics must be recomputed every scheduling round; static
    /// ones could in principle be memoised across rounds (this crate
    /// recomputes them anyway for simplicity, since pending-task sets change
    /// between rounds regardless).
    pub fn is_dynamic(&self) -> bool {
        !matches!(self, MetricKind::Fcfs)
    }

    /// Whether this metric needs a once-per-round precomputation pass
    /// (an overflow table or a relevance matrix) before ranking individual
    /// tasks.
    pub fn needs_round_aux(&self) -> bool {
        matches!(
            self,
            MetricKind::OverflowRelevance
                | MetricKind::BatchOverflowRelevance
                | MetricKind::SoftmaxOverflow
                | MetricKind::SoftKnapsack
                | MetricKind::ArgmaxKnapsack
        )
    }
}

/// Tunables that affect metric computation, distinct from the metric kind
/// itself (temperature, normalisation mode, knapsack solver parallelism).
#[derive(Debug, Clone)]
pub struct MetricConfig {
    pub normalize_by: NormalizeBy,
    pub temperature: f64,
    pub n_knapsack_solvers: usize,
    pub knapsack_timeout: Duration,
    pub clip_demands_in_relevance: bool,
}

impl Default for MetricConfig {
    fn default() -> Self {
        Self {
            normalize_by: NormalizeBy::None,
            temperature: 0.1,
            n_knapsack_solvers: 4,
            knapsack_timeout: Duration::from_millis(500),
            clip_demands_in_relevance: false,
        }
    }
}

/// Precomputed state shared across all tasks ranked in the same round.
pub enum RoundAux {
    None,
    /// `overflow[block_id][alpha_index]`.
    Overflow(HashMap<BlockId, Vec<f64>>),
    /// Dense `[block_row][alpha_index]` relevance values, already normalised.
    Relevance {
        block_order: Vec<BlockId>,
        alphas: Vec<f64>,
        values: Vec<Vec<f64>>,
    },
}

/// Build the round-level auxiliary state a metric needs before ranking
/// individual tasks. No-op for metrics without `needs_round_aux`.
pub async fn prepare_round_aux(
    kind: MetricKind,
    blocks: &HashMap<BlockId, Block>,
    pending: &[Task],
    alphas: &[f64],
    config: &MetricConfig,
    counters: &Counters,
) -> RoundAux {
    match kind {
        MetricKind::OverflowRelevance => {
            RoundAux::Overflow(compute_overflow_table(blocks, pending, alphas, OverflowBaseline::Initial, config))
        }
        MetricKind::BatchOverflowRelevance => {
            RoundAux::Overflow(compute_overflow_table(blocks, pending, alphas, OverflowBaseline::Unlocked, config))
        }
        MetricKind::SoftmaxOverflow => {
            let (block_order, values) = compute_softmax_overflow_matrix(blocks, pending, alphas, config.temperature);
            RoundAux::Relevance { block_order, alphas: alphas.to_vec(), values }
        }
        MetricKind::SoftKnapsack => {
            let (block_order, values) =
                compute_soft_knapsack_matrix(blocks, pending, alphas, config, counters).await;
            RoundAux::Relevance { block_order, alphas: alphas.to_vec(), values }
        }
        MetricKind::ArgmaxKnapsack => {
            let (block_order, values) =
                compute_argmax_knapsack_matrix(blocks, pending, alphas, config).await;
            RoundAux::Relevance { block_order, alphas: alphas.to_vec(), values }
        }
        _ => RoundAux::None,
    }
}

/// Rank a single task under `kind`, given the round's auxiliary state.
pub fn rank_task(
    kind: MetricKind,
    task: &Task,
    blocks: &HashMap<BlockId, Block>,
    aux: &RoundAux,
    config: &MetricConfig,
) -> Rank {
    match kind {
        MetricKind::Fcfs => Rank::Scalar(1.0 / (task.id as f64 + 1.0)),
        MetricKind::DominantShares => Rank::Vector(dominant_shares(task, blocks)),
        MetricKind::FlatRelevance => Rank::Scalar(flat_relevance(task, blocks, false, config)),
        MetricKind::DynamicFlatRelevance => Rank::Scalar(flat_relevance(task, blocks, true, config)),
        MetricKind::OverflowRelevance | MetricKind::BatchOverflowRelevance => {
            let RoundAux::Overflow(table) = aux else {
                panic!("overflow metric requires RoundAux::Overflow");
            };
            Rank::Scalar(overflow_relevance(task, table, blocks, config))
        }
        MetricKind::SoftmaxOverflow | MetricKind::SoftKnapsack | MetricKind::ArgmaxKnapsack => {
            let RoundAux::Relevance { block_order, alphas, values } = aux else {
                panic!("relevance metric requires RoundAux::Relevance");
            };
            Rank::Scalar(relevance_dot_product(task, block_order, alphas, values, blocks, config))
        }
    }
}

/// Clip a demand epsilon to its block capacity when
/// `config.clip_demands_in_relevance` is set, matching the original
/// `RelevanceMetric.apply` behaviour of bounding relevance contributions by
/// what a block can actually give.
fn clip_demand(demand_epsilon: f64, capacity: f64, config: &MetricConfig) -> f64 {
    if config.clip_demands_in_relevance { demand_epsilon.min(capacity) } else { demand_epsilon }
}

fn dominant_shares(task: &Task, blocks: &HashMap<BlockId, Block>) -> Vec<f64> {
    let mut shares = Vec::new();
    for block_id in task.touched_blocks() {
        let Some(block) = blocks.get(&block_id) else { continue };
        let Some(demand) = task.budget_for(block_id) else { continue };
        for &alpha in block.initial_budget().alphas() {
            let capacity = block.initial_budget().epsilon(alpha);
            if capacity > 0.0 {
                let demand_fraction = demand.epsilon(alpha) / capacity;
                shares.push(task.profit() / demand_fraction);
            }
        }
    }
    shares.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    shares
}

fn flat_relevance(task: &Task, blocks: &HashMap<BlockId, Block>, dynamic: bool, config: &MetricConfig) -> f64 {
    let mut cost = 0.0;
    for block_id in task.touched_blocks() {
        let Some(block) = blocks.get(&block_id) else { continue };
        let Some(demand) = task.budget_for(block_id) else { continue };
        let baseline = if dynamic { block.remaining_budget() } else { block.initial_budget() };
        for &alpha in baseline.alphas() {
            let capacity = baseline.epsilon(alpha);
            if capacity > 0.0 {
                cost += clip_demand(demand.epsilon(alpha), capacity, config) / capacity;
            }
        }
    }
    if dynamic && cost == 0.0 {
        return f64::INFINITY;
    }
    task.profit() / cost
}

enum OverflowBaseline {
    Initial,
    Unlocked,
}

fn compute_overflow_table(
    blocks: &HashMap<BlockId, Block>,
    pending: &[Task],
    alphas: &[f64],
    baseline: OverflowBaseline,
    config: &MetricConfig,
) -> HashMap<BlockId, Vec<f64>> {
    let mut table: HashMap<BlockId, Vec<f64>> = HashMap::new();
    let mut capacities: HashMap<BlockId, Vec<f64>> = HashMap::new();
    for block_id in blocks.keys() {
        let block = &blocks[block_id];
        let mut caps = Vec::with_capacity(alphas.len());
        let base: Vec<f64> = alphas
            .iter()
            .map(|&alpha| match baseline {
                OverflowBaseline::Initial => {
                    caps.push(block.initial_budget().epsilon(alpha));
                    -block.initial_budget().epsilon(alpha)
                }
                OverflowBaseline::Unlocked => {
                    let available = block.available_unlocked_budget().epsilon(alpha);
                    caps.push(available.max(0.0));
                    if available > 0.0 { -available } else { f64::INFINITY }
                }
            })
            .collect();
        table.insert(*block_id, base);
        capacities.insert(*block_id, caps);
    }
    for task in pending {
        for block_id in task.touched_blocks() {
            let Some(demand) = task.budget_for(block_id) else { continue };
            if let (Some(row), Some(caps)) = (table.get_mut(&block_id), capacities.get(&block_id)) {
                for (i, &alpha) in alphas.iter().enumerate() {
                    if row[i].is_finite() {
                        row[i] += clip_demand(demand.epsilon(alpha), caps[i], config);
                    }
                }
            }
        }
    }
    table
}

fn overflow_relevance(
    task: &Task,
    table: &HashMap<BlockId, Vec<f64>>,
    blocks: &HashMap<BlockId, Block>,
    config: &MetricConfig,
) -> f64 {
    let mut total_cost = 0.0;
    for block_id in task.touched_blocks() {
        let Some(demand) = task.budget_for(block_id) else { continue };
        let Some(row) = table.get(&block_id) else { continue };
        let block = blocks.get(&block_id);
        let mut block_cost = 0.0;
        let mut contended = true;
        for (i, &alpha) in demand.alphas().iter().enumerate() {
            let overflow = row.get(i).copied().unwrap_or(f64::INFINITY);
            if overflow > 0.0 {
                let capacity = block.map(|b| b.initial_budget().epsilon(alpha)).unwrap_or(f64::INFINITY);
                block_cost += clip_demand(demand.epsilon(alpha), capacity, config) / overflow;
            } else {
                contended = false;
                break;
            }
        }
        if contended {
            total_cost += block_cost;
        }
    }
    if total_cost <= 0.0 {
        f64::INFINITY
    } else {
        task.profit() / total_cost
    }
}

fn compute_softmax_overflow_matrix(
    blocks: &HashMap<BlockId, Block>,
    pending: &[Task],
    alphas: &[f64],
    temperature: f64,
) -> (Vec<BlockId>, Vec<Vec<f64>>) {
    let mut block_order: Vec<BlockId> = blocks.keys().copied().collect();
    block_order.sort_unstable();
    let n_alphas = alphas.len();

    let mut available = vec![vec![0.0_f64; n_alphas]; block_order.len()];
    for (row, block_id) in block_order.iter().enumerate() {
        let block = &blocks[block_id];
        for (i, &alpha) in alphas.iter().enumerate() {
            let eps = block.available_unlocked_budget().epsilon(alpha);
            available[row][i] = if eps >= 0.0 { eps } else { f64::NEG_INFINITY };
        }
    }

    let mut overflow = vec![vec![0.0_f64; n_alphas]; block_order.len()];
    for (row, block_id) in block_order.iter().enumerate() {
        for (i, &alpha) in alphas.iter().enumerate() {
            let mut demand_sum = 0.0;
            for task in pending {
                if let Some(demand) = task.budget_for(*block_id) {
                    demand_sum += demand.epsilon(alpha);
                }
            }
            overflow[row][i] = demand_sum - available[row][i];
        }
    }

    for row in 0..block_order.len() {
        if overflow[row].iter().cloned().fold(f64::INFINITY, f64::min) <= 0.0 {
            overflow[row] = vec![f64::INFINITY; n_alphas];
        }
    }

    let mut relevance = vec![vec![0.0_f64; n_alphas]; block_order.len()];
    for row in 0..block_order.len() {
        let exp_row: Vec<f64> = overflow[row].iter().map(|&o| (-temperature * o).exp()).collect();
        let sum: f64 = exp_row.iter().sum::<f64>() + 1e-15;
        for i in 0..n_alphas {
            let softmax = exp_row[i] / sum;
            relevance[row][i] = if available[row][i] != 0.0 { softmax / available[row][i] } else { 0.0 };
        }
    }

    (block_order, relevance)
}

async fn compute_soft_knapsack_matrix(
    blocks: &HashMap<BlockId, Block>,
    pending: &[Task],
    alphas: &[f64],
    config: &MetricConfig,
    counters: &Counters,
) -> (Vec<BlockId>, Vec<Vec<f64>>) {
    let (block_order, available, mut tasks_per_cell) = gather_knapsack_inputs(blocks, pending, alphas);
    let n_alphas = alphas.len();

    let mut jobs = Vec::with_capacity(block_order.len() * n_alphas);
    for row in 0..block_order.len() {
        for col in 0..n_alphas {
            let idx = row * n_alphas + col;
            let capacity = available[row][col];
            let (demands, profits) = std::mem::take(&mut tasks_per_cell[row][col]);
            let timeout = config.knapsack_timeout;
            let block_id = block_order[row];
            let alpha = alphas[col];
            let counters = counters.clone();
            jobs.push(async move {
                let value = tokio::task::spawn_blocking(move || {
                    knapsack::solve_profit_knapsack(capacity, &demands, &profits, timeout, block_id, alpha, &counters)
                })
                .await
                .unwrap_or(0.0);
                (idx, value)
            });
        }
    }
    let flat: Vec<(usize, f64)> = stream::iter(jobs)
        .buffer_unordered(config.n_knapsack_solvers.max(1))
        .collect()
        .await;
    let mut max_profits = vec![vec![0.0_f64; n_alphas]; block_order.len()];
    for (idx, value) in flat {
        max_profits[idx / n_alphas][idx % n_alphas] = value;
    }

    let relevance = softmax_rows_then_normalize(&max_profits, &available, blocks, &block_order, alphas, config);
    (block_order, relevance)
}

async fn compute_argmax_knapsack_matrix(
    blocks: &HashMap<BlockId, Block>,
    pending: &[Task],
    alphas: &[f64],
    config: &MetricConfig,
) -> (Vec<BlockId>, Vec<Vec<f64>>) {
    let (block_order, available, mut tasks_per_cell) = gather_knapsack_inputs(blocks, pending, alphas);
    let n_alphas = alphas.len();

    let mut jobs = Vec::with_capacity(block_order.len() * n_alphas);
    for row in 0..block_order.len() {
        for col in 0..n_alphas {
            let idx = row * n_alphas + col;
            let capacity = available[row][col];
            let (demands, _profits) = std::mem::take(&mut tasks_per_cell[row][col]);
            jobs.push(async move {
                let value = tokio::task::spawn_blocking(move || knapsack::solve_item_count_knapsack(capacity, &demands))
                    .await
                    .unwrap_or(0.0);
                (idx, value)
            });
        }
    }
    let flat: Vec<(usize, f64)> = stream::iter(jobs)
        .buffer_unordered(config.n_knapsack_solvers.max(1))
        .collect()
        .await;
    let mut max_counts = vec![vec![0.0_f64; n_alphas]; block_order.len()];
    for (idx, value) in flat {
        max_counts[idx / n_alphas][idx % n_alphas] = value;
    }

    let mut hard_argmax = vec![vec![0.0_f64; n_alphas]; block_order.len()];
    for row in 0..block_order.len() {
        let best = max_counts[row].iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        for col in 0..n_alphas {
            if (max_counts[row][col] - best).abs() < 1e-9 {
                hard_argmax[row][col] = 1.0;
            }
        }
    }

    let relevance = normalize_matrix(&hard_argmax, &available, blocks, &block_order, alphas, config);
    (block_order, relevance)
}

#[allow(clippy::type_complexity)]
fn gather_knapsack_inputs(
    blocks: &HashMap<BlockId, Block>,
    pending: &[Task],
    alphas: &[f64],
) -> (Vec<BlockId>, Vec<Vec<f64>>, Vec<Vec<(Vec<f64>, Vec<f64>)>>) {
    let mut block_order: Vec<BlockId> = blocks.keys().copied().collect();
    block_order.sort_unstable();
    let n_alphas = alphas.len();

    let mut available = vec![vec![0.0_f64; n_alphas]; block_order.len()];
    for (row, block_id) in block_order.iter().enumerate() {
        let block = &blocks[block_id];
        for (i, &alpha) in alphas.iter().enumerate() {
            let eps = block.available_unlocked_budget().epsilon(alpha);
            available[row][i] = if eps > 0.0 { eps } else { 0.0 };
        }
    }

    let mut tasks_per_cell: Vec<Vec<(Vec<f64>, Vec<f64>)>> =
        vec![vec![(Vec::new(), Vec::new()); n_alphas]; block_order.len()];
    for (row, block_id) in block_order.iter().enumerate() {
        for task in pending {
            let Some(row_demands) = task.demand_matrix(alphas).get(block_id) else { continue };
            for col in 0..n_alphas {
                tasks_per_cell[row][col].0.push(row_demands[col]);
                tasks_per_cell[row][col].1.push(task.profit());
            }
        }
    }

    (block_order, available, tasks_per_cell)
}

fn softmax_rows_then_normalize(
    max_profits: &[Vec<f64>],
    available: &[Vec<f64>],
    blocks: &HashMap<BlockId, Block>,
    block_order: &[BlockId],
    alphas: &[f64],
    config: &MetricConfig,
) -> Vec<Vec<f64>> {
    let n_alphas = alphas.len();
    let mut softmax = vec![vec![0.0_f64; n_alphas]; block_order.len()];
    for row in 0..block_order.len() {
        let row_max = max_profits[row].iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let scaled: Vec<f64> = max_profits[row]
            .iter()
            .map(|&v| ((v / config.temperature) - (row_max / config.temperature)).exp())
            .collect();
        let sum: f64 = scaled.iter().sum();
        for col in 0..n_alphas {
            softmax[row][col] = if sum > 0.0 { scaled[col] / sum } else { 0.0 };
        }
    }
    normalize_matrix(&softmax, available, blocks, block_order, alphas, config)
}

fn normalize_matrix(
    matrix: &[Vec<f64>],
    available: &[Vec<f64>],
    blocks: &HashMap<BlockId, Block>,
    block_order: &[BlockId],
    alphas: &[f64],
    config: &MetricConfig,
) -> Vec<Vec<f64>> {
    let n_alphas = alphas.len();
    match config.normalize_by {
        NormalizeBy::AvailableBudget => matrix
            .iter()
            .enumerate()
            .map(|(row, values)| {
                values
                    .iter()
                    .enumerate()
                    .map(|(col, &v)| if available[row][col] > 0.0 { v / available[row][col] } else { 0.0 })
                    .collect()
            })
            .collect(),
        NormalizeBy::Capacity => block_order
            .iter()
            .enumerate()
            .map(|(row, block_id)| {
                let block = &blocks[block_id];
                (0..n_alphas)
                    .map(|col| {
                        let capacity = block.initial_budget().epsilon(alphas[col]);
                        if capacity > 0.0 { matrix[row][col] / capacity } else { 0.0 }
                    })
                    .collect()
            })
            .collect(),
        NormalizeBy::None => matrix.to_vec(),
    }
}

fn relevance_dot_product(
    task: &Task,
    block_order: &[BlockId],
    alphas: &[f64],
    values: &[Vec<f64>],
    blocks: &HashMap<BlockId, Block>,
    config: &MetricConfig,
) -> f64 {
    let mut cost = 0.0;
    for (row, block_id) in block_order.iter().enumerate() {
        let Some(demand) = task.budget_for(*block_id) else { continue };
        let block = blocks.get(block_id);
        for (col, &alpha) in alphas.iter().enumerate() {
            let capacity = block.map(|b| b.initial_budget().epsilon(alpha)).unwrap_or(f64::INFINITY);
            cost += clip_demand(demand.epsilon(alpha), capacity, config) * values[row][col];
        }
    }
    if cost > 0.0 {
        task.profit() / cost
    } else {
        warn!(task_id = task.id, "zero relevance cost, ranking task maximally");
        f64::INFINITY
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::budget::{Budget, DEFAULT_ALPHAS};
    use crate::policies::BlockSelectionPolicy;
    use crate::task::Sampled;

    fn make_block(id: BlockId, eps: f64) -> Block {
        Block::new(id, Budget::from_epsilon_delta(DEFAULT_ALPHAS, eps, 1e-7))
    }

    fn make_task(id: u64, profit: f64, block_id: BlockId, demand_eps: f64) -> Task {
        let mut task = Task::new(
            id,
            Sampled::Fixed(profit),
            Sampled::Fixed(1),
            BlockSelectionPolicy::RandomBlocks,
            None,
        );
        let mut rng = rand::rngs::mock::StepRng::new(0, 1);
        task.sample_profit_and_n_blocks(&mut rng);
        let demand = Budget::from_epsilons(DEFAULT_ALPHAS, &vec![demand_eps; DEFAULT_ALPHAS.len()]);
        task.set_budget_per_block(&[block_id], demand);
        task
    }

    #[test]
    fn fcfs_favors_lower_ids() {
        let t0 = make_task(0, 1.0, 0, 1.0);
        let t5 = make_task(5, 1.0, 0, 1.0);
        let blocks = HashMap::new();
        let r0 = rank_task(MetricKind::Fcfs, &t0, &blocks, &RoundAux::None, &MetricConfig::default());
        let r5 = rank_task(MetricKind::Fcfs, &t5, &blocks, &RoundAux::None, &MetricConfig::default());
        assert_eq!(r0.cmp_for_sort(&r5), Ordering::Greater);
    }

    #[test]
    fn flat_relevance_prefers_high_profit_low_demand() {
        let mut blocks = HashMap::new();
        blocks.insert(0, make_block(0, 10.0));
        let cheap = make_task(0, 10.0, 0, 0.5);
        let expensive = make_task(1, 10.0, 0, 5.0);
        let r_cheap = rank_task(MetricKind::FlatRelevance, &cheap, &blocks, &RoundAux::None, &MetricConfig::default());
        let r_expensive =
            rank_task(MetricKind::FlatRelevance, &expensive, &blocks, &RoundAux::None, &MetricConfig::default());
        assert_eq!(r_cheap.cmp_for_sort(&r_expensive), Ordering::Greater);
    }

    #[test]
    fn dominant_shares_is_lexicographically_sortable() {
        let mut blocks = HashMap::new();
        blocks.insert(0, make_block(0, 10.0));
        let t = make_task(0, 10.0, 0, 1.0);
        let rank = rank_task(MetricKind::DominantShares, &t, &blocks, &RoundAux::None, &MetricConfig::default());
        match rank {
            Rank::Vector(v) => assert!(!v.is_empty()),
            _ => panic!("expected vector rank"),
        }
    }
}
