//! Minimal workload replay and sampling support: a task-CSV reader for
//! replay-mode runs, and the in-memory `TaskSpec` + frequency sampler for
//! zoo-style task-type sampling. Reading a directory tree of per-task-type
//! YAML files is left to the external workload generator; this module only
//! implements the record shape and the sampling operation, grounded on
//! `SPEC_FULL.md` §4.J/§6.

use rand::Rng;
use serde::Deserialize;

use crate::budget::Budget;
use crate::policies::BlockSelectionPolicy;
use crate::task::{Sampled, Task, TaskId};

/// One row of the replay-mode task CSV: `task_name, profit, n_blocks,
/// block_selection_policy, alphas, rdp_epsilons, relative_submit_time`.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskCsvRow {
    pub task_name: String,
    pub profit: f64,
    pub n_blocks: u32,
    pub block_selection_policy: String,
    /// Comma-separated list, e.g. `"1.5;2;3"`.
    pub alphas: String,
    /// Comma-separated list aligned with `alphas`.
    pub rdp_epsilons: String,
    pub relative_submit_time: f64,
}

impl TaskCsvRow {
    fn parse_list(raw: &str) -> Vec<f64> {
        raw.split(';').filter_map(|s| s.trim().parse().ok()).collect()
    }

    pub fn alphas_vec(&self) -> Vec<f64> {
        Self::parse_list(&self.alphas)
    }

    pub fn rdp_epsilons_vec(&self) -> Vec<f64> {
        Self::parse_list(&self.rdp_epsilons)
    }

    pub fn demand_budget(&self) -> Budget {
        Budget::from_epsilons(&self.alphas_vec(), &self.rdp_epsilons_vec())
    }
}

/// A replayed task: its CSV-derived demand budget plus the submit time it
/// should be fed to the task producer at, relative to the run start.
#[derive(Debug, Clone)]
pub struct ReplayedTask {
    pub task: Task,
    pub demand_budget: Budget,
    pub submit_time_ticks: u64,
}

/// Parse a task-replay CSV, normalising `relative_submit_time` so the whole
/// batch's inter-arrival times sum to exactly `online_ticks` (the number of
/// ticks between the initial and the final block arrival).
pub fn load_task_csv(csv: &str, online_ticks: u64) -> Result<Vec<ReplayedTask>, csv::Error> {
    let mut reader = csv::ReaderBuilder::new().has_headers(true).from_reader(csv.as_bytes());
    let rows: Vec<TaskCsvRow> = reader.deserialize().collect::<Result<_, _>>()?;

    let total_relative: f64 = rows.iter().map(|r| r.relative_submit_time.max(0.0)).sum();
    let scale = if total_relative > 0.0 { online_ticks as f64 / total_relative } else { 0.0 };

    let mut cumulative = 0.0_f64;
    let mut out = Vec::with_capacity(rows.len());
    for (id, row) in rows.into_iter().enumerate() {
        cumulative += row.relative_submit_time.max(0.0) * scale;
        let policy = BlockSelectionPolicy::from_str(&row.block_selection_policy)
            .unwrap_or(BlockSelectionPolicy::RandomBlocks);
        let demand_budget = row.demand_budget();
        let task = Task::new(
            id as TaskId,
            Sampled::Fixed(row.profit),
            Sampled::Fixed(row.n_blocks),
            policy,
            Some(row.task_name.clone()),
        );
        out.push(ReplayedTask { task, demand_budget, submit_time_ticks: cumulative.round() as u64 });
    }
    Ok(out)
}

/// In-memory record for one task type in a sampling-mode workload, loaded by
/// the external workload generator from a per-task-type YAML file.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskSpec {
    pub alphas: Vec<f64>,
    pub rdp_epsilons: Vec<f64>,
    pub n_blocks: u32,
    pub profit: f64,
    pub block_selection_policy: String,
}

impl TaskSpec {
    pub fn demand_budget(&self) -> Budget {
        Budget::from_epsilons(&self.alphas, &self.rdp_epsilons)
    }

    pub fn block_selection_policy(&self) -> BlockSelectionPolicy {
        BlockSelectionPolicy::from_str(&self.block_selection_policy).unwrap_or(BlockSelectionPolicy::RandomBlocks)
    }
}

/// A discrete distribution over task-type names, loaded from `frequencies.yaml`.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskTypeFrequencies(pub Vec<(String, f64)>);

impl TaskTypeFrequencies {
    /// Sample one task-type name according to the stored weights. Every call
    /// draws fresh randomness: per-task n_blocks/profit must never be cached
    /// across instances of the same type.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&str> {
        let total: f64 = self.0.iter().map(|(_, w)| w).sum();
        if total <= 0.0 {
            return None;
        }
        let mut target = rng.gen::<f64>() * total;
        for (name, weight) in &self.0 {
            if target < *weight {
                return Some(name);
            }
            target -= weight;
        }
        self.0.last().map(|(name, _)| name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn csv_rows_parse_lists_and_submit_times_are_normalised() {
        let csv = "task_name,profit,n_blocks,block_selection_policy,alphas,rdp_epsilons,relative_submit_time\n\
                   t0,1.0,1,RandomBlocks,1.5;2;3,0.1;0.2;0.3,1\n\
                   t1,2.0,1,RandomBlocks,1.5;2;3,0.1;0.2;0.3,1\n";
        let replayed = load_task_csv(csv, 10).unwrap();
        assert_eq!(replayed.len(), 2);
        assert_eq!(replayed[1].submit_time_ticks, 10);
        assert!((replayed[0].demand_budget.epsilon(2.0) - 0.2).abs() < 1e-9);
    }

    #[test]
    fn frequency_sampler_returns_a_listed_name() {
        let freqs = TaskTypeFrequencies(vec![("small".into(), 0.7), ("large".into(), 0.3)]);
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..10 {
            let name = freqs.sample(&mut rng).unwrap();
            assert!(name == "small" || name == "large");
        }
    }
}
