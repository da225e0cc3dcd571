//! Per-(block, alpha) knapsack solvers backing [`super::MetricKind::SoftKnapsack`]
//! and [`super::MetricKind::ArgmaxKnapsack`].

use std::time::{Duration, Instant};

use tracing::warn;

use super::counters::Counters;
use crate::block::BlockId;
use crate::error::MetricError;

/// Discretisation resolution for the profit-maximising DP knapsack. Higher
/// values trade solve time for precision; capacities are rescaled into this
/// many integer buckets.
const DP_BUCKETS: usize = 512;

/// Solve a 0/1 knapsack maximising total profit subject to a capacity
/// constraint, via a capacity-discretised DP. Demands are non-negative
/// epsilon values; profits are positive. Returns the best value found within
/// `timeout`; if the DP does not finish in time, falls back to a greedy
/// profit-density heuristic lower bound, logging and counting the fallback
/// via `counters.knapsack_timeouts`.
#[allow(clippy::too_many_arguments)]
pub fn solve_profit_knapsack(
    capacity: f64,
    demands: &[f64],
    profits: &[f64],
    timeout: Duration,
    block_id: BlockId,
    alpha: f64,
    counters: &Counters,
) -> f64 {
    if capacity <= 0.0 || demands.is_empty() {
        return 0.0;
    }
    let start = Instant::now();
    let scale = DP_BUCKETS as f64 / capacity;
    let cap_units = DP_BUCKETS;
    let mut dp = vec![0.0_f64; cap_units + 1];

    for (i, (&demand, &profit)) in demands.iter().zip(profits.iter()).enumerate() {
        if i % 64 == 0 && start.elapsed() > timeout {
            Counters::incr(&counters.knapsack_timeouts);
            let err = MetricError::KnapsackTimeout { block_id, alpha };
            warn!(block_id, alpha, error = %err, "knapsack solve exceeded timeout, falling back to greedy profit density");
            return greedy_profit_density(capacity, demands, profits);
        }
        let weight_units = ((demand * scale).round() as usize).min(cap_units);
        for w in (weight_units..=cap_units).rev() {
            let candidate = dp[w - weight_units] + profit;
            if candidate > dp[w] {
                dp[w] = candidate;
            }
        }
    }
    dp[cap_units]
}

fn greedy_profit_density(capacity: f64, demands: &[f64], profits: &[f64]) -> f64 {
    let mut order: Vec<usize> = (0..demands.len()).collect();
    order.sort_by(|&a, &b| {
        let density_a = if demands[a] > 0.0 { profits[a] / demands[a] } else { f64::INFINITY };
        let density_b = if demands[b] > 0.0 { profits[b] / demands[b] } else { f64::INFINITY };
        density_b.partial_cmp(&density_a).unwrap_or(std::cmp::Ordering::Equal)
    });
    let mut remaining = capacity;
    let mut total = 0.0;
    for i in order {
        if demands[i] <= remaining {
            remaining -= demands[i];
            total += profits[i];
        }
    }
    total
}

/// Maximise the *number* of admitted items (unit values) under a sum
/// capacity constraint. Smallest-demand-first greedy fill is provably
/// optimal for this objective: if a feasible set of size k exists, the k
/// smallest demands also fit, by an exchange argument.
pub fn solve_item_count_knapsack(capacity: f64, demands: &[f64]) -> f64 {
    if capacity <= 0.0 {
        return 0.0;
    }
    let mut sorted: Vec<f64> = demands.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mut remaining = capacity;
    let mut count = 0.0;
    for demand in sorted {
        if demand <= remaining {
            remaining -= demand;
            count += 1.0;
        } else {
            break;
        }
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profit_knapsack_picks_best_subset() {
        let demands = vec![2.0, 3.0, 4.0];
        let profits = vec![3.0, 4.0, 5.0];
        let counters = Counters::default();
        let value = solve_profit_knapsack(5.0, &demands, &profits, Duration::from_millis(50), 0, 2.0, &counters);
        assert!(value >= 7.0 - 0.5, "expected near-optimal value close to 7, got {value}");
        assert_eq!(Counters::get(&counters.knapsack_timeouts), 0);
    }

    #[test]
    fn item_count_knapsack_maximizes_count_not_profit() {
        let demands = vec![1.0, 1.0, 1.0, 10.0];
        let count = solve_item_count_knapsack(3.0, &demands);
        assert_eq!(count, 3.0);
    }

    #[test]
    fn zero_capacity_yields_zero() {
        let counters = Counters::default();
        assert_eq!(
            solve_profit_knapsack(0.0, &[1.0], &[5.0], Duration::from_millis(10), 0, 2.0, &counters),
            0.0
        );
        assert_eq!(solve_item_count_knapsack(0.0, &[1.0]), 0.0);
    }

    #[test]
    fn profit_knapsack_falls_back_to_greedy_and_counts_timeout_on_expiry() {
        let demands = vec![2.0, 3.0, 4.0];
        let profits = vec![3.0, 4.0, 5.0];
        let counters = Counters::default();
        let value = solve_profit_knapsack(5.0, &demands, &profits, Duration::from_nanos(0), 0, 1.5, &counters);
        let expected = greedy_profit_density(5.0, &demands, &profits);
        assert_eq!(value, expected);
        assert_eq!(Counters::get(&counters.knapsack_timeouts), 1);
    }
}
