//! Scheduler core: pending-task queue, block map, and the batch/offline
//! commit loop.

use std::collections::HashMap;
use std::time::Duration;

use rand::Rng;
use tokio::time::interval;
use tracing::{debug, info, instrument, warn};

use crate::block::{Block, BlockId};
use crate::budget::Budget;
use crate::error::{AdmissionError, MetricError};
use crate::metrics::counters::Counters;
use crate::metrics::{self, MetricConfig, MetricKind, RoundAux};
use crate::task::{Task, TaskId};

/// One committed (task, blocks) pair, recorded for reporting.
#[derive(Debug, Clone)]
pub struct AllocationRecord {
    pub task_id: TaskId,
    pub block_ids: Vec<BlockId>,
}

/// Final report produced at the end of a run. See `SPEC_FULL.md` §6.
#[derive(Debug, Clone, serde::Serialize)]
pub struct Report {
    pub n_allocated_tasks: u64,
    pub total_tasks: u64,
    pub realized_profit: f64,
    pub scheduler_metric: String,
}

pub struct SchedulerCore {
    blocks: HashMap<BlockId, Block>,
    pending: Vec<Task>,
    allocations: Vec<AllocationRecord>,
    metric_kind: MetricKind,
    metric_config: MetricConfig,
    alphas: Vec<f64>,
    delta: f64,
    unlock_steps: u32,
    counters: Counters,
    realized_profit: f64,
}

impl SchedulerCore {
    pub fn new(
        metric_kind: MetricKind,
        metric_config: MetricConfig,
        alphas: Vec<f64>,
        delta: f64,
        unlock_steps: u32,
        counters: Counters,
    ) -> Self {
        Self {
            blocks: HashMap::new(),
            pending: Vec::new(),
            allocations: Vec::new(),
            metric_kind,
            metric_config,
            alphas,
            delta,
            unlock_steps,
            counters,
            realized_profit: 0.0,
        }
    }

    pub fn blocks(&self) -> &HashMap<BlockId, Block> {
        &self.blocks
    }

    pub fn counters(&self) -> &Counters {
        &self.counters
    }

    #[instrument(skip(self, block), fields(block_id = block.id), target = "scheduler")]
    pub fn add_block(&mut self, block: Block) {
        Counters::incr(&self.counters.blocks_created);
        self.blocks.insert(block.id, block);
    }

    /// Resolve block IDs for `task` via its own selection policy, validate
    /// feasibility, and push it onto the pending queue.
    #[instrument(skip(self, task, rng), fields(task_id = task.id), target = "scheduler")]
    pub fn add_task<R: Rng + ?Sized>(
        &mut self,
        mut task: Task,
        rng: &mut R,
    ) -> Result<(), AdmissionError> {
        Counters::incr(&self.counters.tasks_submitted);
        task.sample_profit_and_n_blocks(rng);
        let demand_budget = crate::budget::Budget::from_epsilon_delta(&self.alphas, task.demand_epsilon(), self.delta);

        let n_blocks_available = self.blocks.len();
        let requested = task.n_blocks() as usize;
        let Some(indices) = task
            .block_selection_policy
            .select_blocks(n_blocks_available, requested, rng)
        else {
            Counters::incr(&self.counters.tasks_dropped_not_enough_blocks);
            warn!(task_id = task.id, requested, n_blocks_available, "not enough blocks");
            return Err(AdmissionError::NotEnoughBlocks { requested, available: n_blocks_available });
        };

        let mut block_ids: Vec<BlockId> = self.blocks.keys().copied().collect();
        block_ids.sort_unstable();
        let chosen: Vec<BlockId> = indices.into_iter().map(|i| block_ids[i]).collect();

        for &block_id in &chosen {
            let block = &self.blocks[&block_id];
            let (shared, _, _) = Budget::same_support(block.initial_budget(), &demand_budget);
            if shared.is_empty() {
                Counters::incr(&self.counters.tasks_dropped_infeasible);
                let reason = MetricError::BudgetSupportMismatch(format!(
                    "task {} has no alpha overlap with block {block_id}",
                    task.id
                ));
                warn!(task_id = task.id, block_id, error = %reason, "task infeasible, dropping");
                return Err(AdmissionError::InfeasibleTask { task_id: task.id, block_id });
            }
        }

        task.set_budget_per_block(&chosen, demand_budget);
        self.pending.push(task);
        Ok(())
    }

    /// Offline single pass over the whole pending set.
    #[instrument(skip(self), target = "scheduler")]
    pub async fn schedule_queue(&mut self) {
        self.run_one_round().await;
    }

    /// Periodic batch scheduling: run one round every `period` ticks until
    /// `terminate` resolves.
    pub async fn run_batch_scheduling(
        &mut self,
        period: Duration,
        mut terminate: tokio::sync::oneshot::Receiver<()>,
    ) {
        let mut ticker = interval(period);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.run_one_round().await;
                }
                _ = &mut terminate => {
                    info!("batch scheduling loop terminating");
                    break;
                }
            }
        }
    }

    #[instrument(skip(self), target = "scheduler")]
    pub async fn run_one_round(&mut self) {
        Counters::incr(&self.counters.rounds_run);
        if self.pending.is_empty() {
            debug!("no pending tasks, round is a no-op");
            return;
        }

        for block in self.blocks.values_mut() {
            block.unlock_step(self.unlock_steps);
        }

        let aux = if self.metric_kind.needs_round_aux() {
            metrics::prepare_round_aux(
                self.metric_kind,
                &self.blocks,
                &self.pending,
                &self.alphas,
                &self.metric_config,
                &self.counters,
            )
            .await
        } else {
            RoundAux::None
        };

        let mut order: Vec<usize> = (0..self.pending.len()).collect();
        let mut ranks = Vec::with_capacity(self.pending.len());
        for task in &self.pending {
            ranks.push(metrics::rank_task(self.metric_kind, task, &self.blocks, &aux, &self.metric_config));
        }
        order.sort_by(|&a, &b| {
            ranks[b].cmp_for_sort(&ranks[a]).then_with(|| self.pending[a].id.cmp(&self.pending[b].id))
        });

        let mut committed_indices = Vec::new();
        for &idx in &order {
            let task = &self.pending[idx];
            let feasible = task
                .touched_blocks()
                .all(|block_id| match (self.blocks.get(&block_id), task.budget_for(block_id)) {
                    (Some(block), Some(demand)) => block.can_allocate(demand),
                    _ => false,
                });
            if !feasible {
                continue;
            }
            for block_id in task.touched_blocks() {
                let demand = task.budget_for(block_id).unwrap().clone();
                self.blocks.get_mut(&block_id).unwrap().allocate(&demand);
            }
            self.realized_profit += task.profit();
            self.allocations.push(AllocationRecord {
                task_id: task.id,
                block_ids: task.touched_blocks().collect(),
            });
            Counters::incr(&self.counters.tasks_allocated);
            committed_indices.push(idx);
        }

        committed_indices.sort_unstable();
        for &idx in committed_indices.iter().rev() {
            self.pending.remove(idx);
        }

        info!(
            committed = committed_indices.len(),
            still_pending = self.pending.len(),
            "scheduling round complete"
        );
    }

    pub fn report(&self) -> Report {
        Report {
            n_allocated_tasks: self.allocations.len() as u64,
            total_tasks: Counters::get(&self.counters.tasks_submitted),
            realized_profit: self.realized_profit,
            scheduler_metric: format!("{:?}", self.metric_kind),
        }
    }

    pub fn allocations(&self) -> &[AllocationRecord] {
        &self.allocations
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::budget::{Budget, DEFAULT_ALPHAS};
    use crate::policies::BlockSelectionPolicy;
    use crate::task::Sampled;
    use rand::rngs::mock::StepRng;

    fn make_scheduler() -> SchedulerCore {
        SchedulerCore::new(
            MetricKind::Fcfs,
            MetricConfig::default(),
            DEFAULT_ALPHAS.to_vec(),
            0.99,
            1,
            Counters::default(),
        )
    }

    fn task_with_demand(id: TaskId, profit: f64, n_blocks: u32) -> Task {
        Task::with_demand_spec(
            id,
            Sampled::Fixed(profit),
            Sampled::Fixed(n_blocks),
            Sampled::Fixed(1.0),
            BlockSelectionPolicy::RandomBlocks,
            None,
        )
    }

    #[tokio::test]
    async fn single_block_single_task_is_allocated() {
        let mut sched = make_scheduler();
        sched.add_block(Block::new(0, Budget::from_epsilon_delta(DEFAULT_ALPHAS, 10.0, 0.99)));

        let mut rng = StepRng::new(0, 1);
        let task = task_with_demand(0, 5.0, 1);
        sched.add_task(task, &mut rng).unwrap();

        sched.schedule_queue().await;
        let report = sched.report();
        assert_eq!(report.n_allocated_tasks, 1);
        assert_eq!(report.realized_profit, 5.0);
    }

    #[tokio::test]
    async fn fcfs_admits_in_arrival_order_under_contention() {
        let mut sched = SchedulerCore::new(
            MetricKind::Fcfs,
            MetricConfig::default(),
            DEFAULT_ALPHAS.to_vec(),
            0.99,
            1,
            Counters::default(),
        );
        sched.add_block(Block::new(0, Budget::from_epsilon_delta(DEFAULT_ALPHAS, 2.0, 0.99)));

        let mut rng = StepRng::new(0, 1);
        for (id, profit) in [(0, 1.0), (1, 5.0), (2, 2.0)] {
            let task = task_with_demand(id, profit, 1);
            sched.add_task(task, &mut rng).unwrap();
        }

        sched.schedule_queue().await;
        let report = sched.report();
        assert_eq!(report.n_allocated_tasks, 2);
        assert_eq!(report.realized_profit, 6.0);
    }

    #[tokio::test]
    async fn not_enough_blocks_is_reported_and_dropped() {
        let mut sched = make_scheduler();
        sched.add_block(Block::new(0, Budget::from_epsilon_delta(DEFAULT_ALPHAS, 10.0, 0.99)));
        let mut rng = StepRng::new(0, 1);
        let task = task_with_demand(0, 5.0, 5);
        let result = sched.add_task(task, &mut rng);
        assert!(matches!(result, Err(AdmissionError::NotEnoughBlocks { .. })));
    }

    #[tokio::test]
    async fn infeasible_task_is_rejected_and_counted_on_alpha_support_mismatch() {
        let mut sched = make_scheduler();
        // Block's budget lives on an alpha support disjoint from `DEFAULT_ALPHAS`,
        // the support every demand budget in `add_task` is built against.
        sched.add_block(Block::new(0, Budget::from_epsilons(&[100.0, 200.0], &[5.0, 5.0])));

        let mut rng = StepRng::new(0, 1);
        let task = task_with_demand(0, 1.0, 1);
        let result = sched.add_task(task, &mut rng);
        assert!(matches!(result, Err(AdmissionError::InfeasibleTask { .. })));
        assert_eq!(Counters::get(&sched.counters().tasks_dropped_infeasible), 1);
    }
}
