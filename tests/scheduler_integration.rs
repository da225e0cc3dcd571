use privacy_scheduler::block::Block;
use privacy_scheduler::budget::{Budget, DEFAULT_ALPHAS};
use privacy_scheduler::metrics::counters::Counters;
use privacy_scheduler::metrics::{MetricConfig, MetricKind};
use privacy_scheduler::policies::BlockSelectionPolicy;
use privacy_scheduler::scheduler::SchedulerCore;
use privacy_scheduler::task::{Sampled, Task};

use rand::rngs::mock::StepRng;

fn scheduler(metric: MetricKind) -> SchedulerCore {
    SchedulerCore::new(metric, MetricConfig::default(), DEFAULT_ALPHAS.to_vec(), 0.99, 1, Counters::default())
}

fn small_demand_task(id: u64, profit: f64, n_blocks: u32) -> Task {
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
async fn single_block_single_task_end_to_end() {
    let mut sched = scheduler(MetricKind::Fcfs);
    sched.add_block(Block::new(0, Budget::from_epsilon_delta(DEFAULT_ALPHAS, 10.0, 0.99)));

    let mut rng = StepRng::new(0, 1);
    sched.add_task(small_demand_task(0, 3.0, 1), &mut rng).unwrap();
    sched.schedule_queue().await;

    let report = sched.report();
    assert_eq!(report.n_allocated_tasks, 1);
    assert_eq!(report.realized_profit, 3.0);
    assert_eq!(sched.pending_len(), 0);
}

/// Many small-demand tasks should all fit against one block instead of
/// exhausting it after a single allocation: the demand budget is a small
/// per-task fraction of the block's total capacity, not the whole thing.
#[tokio::test]
async fn many_tasks_fit_against_one_block() {
    let mut sched = scheduler(MetricKind::Fcfs);
    sched.add_block(Block::new(0, Budget::from_epsilon_delta(DEFAULT_ALPHAS, 10.0, 0.99)));

    let mut rng = StepRng::new(0, 1);
    for id in 0..20 {
        sched.add_task(small_demand_task(id, 1.0, 1), &mut rng).unwrap();
    }
    sched.schedule_queue().await;

    let report = sched.report();
    assert!(report.n_allocated_tasks > 1, "expected more than one task admitted against a single block");
}

#[tokio::test]
async fn dominant_shares_prefers_lower_demand_fraction_first() {
    let mut sched = scheduler(MetricKind::DominantShares);
    sched.add_block(Block::new(0, Budget::from_epsilon_delta(DEFAULT_ALPHAS, 3.0, 0.99)));

    let mut rng = StepRng::new(0, 1);
    // Task 0 has a much larger demand (scarce relative to its profit) than
    // task 1; both cannot be admitted once the first consumes the block.
    let hungry = Task::with_demand_spec(
        0,
        Sampled::Fixed(1.0),
        Sampled::Fixed(1),
        Sampled::Fixed(2.9),
        BlockSelectionPolicy::RandomBlocks,
        None,
    );
    let frugal = Task::with_demand_spec(
        1,
        Sampled::Fixed(1.0),
        Sampled::Fixed(1),
        Sampled::Fixed(0.01),
        BlockSelectionPolicy::RandomBlocks,
        None,
    );
    sched.add_task(hungry, &mut rng).unwrap();
    sched.add_task(frugal, &mut rng).unwrap();
    sched.schedule_queue().await;

    let allocated: Vec<u64> = sched.allocations().iter().map(|a| a.task_id).collect();
    assert!(allocated.contains(&1), "the low-demand-fraction task should be admitted");
}

#[tokio::test]
async fn not_enough_blocks_is_rejected_without_touching_pending_queue() {
    let mut sched = scheduler(MetricKind::Fcfs);
    sched.add_block(Block::new(0, Budget::from_epsilon_delta(DEFAULT_ALPHAS, 10.0, 0.99)));

    let mut rng = StepRng::new(0, 1);
    let result = sched.add_task(small_demand_task(0, 5.0, 3), &mut rng);
    assert!(result.is_err());
    assert_eq!(sched.pending_len(), 0);
}

#[tokio::test]
async fn progressive_unlocking_grows_available_budget_across_rounds() {
    let mut sched = scheduler(MetricKind::BatchOverflowRelevance);
    sched.add_block(Block::new(0, Budget::from_epsilon_delta(DEFAULT_ALPHAS, 10.0, 0.99)));

    let mut rng = StepRng::new(0, 1);
    sched.add_task(small_demand_task(0, 1.0, 1), &mut rng).unwrap();
    sched.schedule_queue().await;

    let unlocked_after_one = sched.blocks()[&0].available_unlocked_budget().epsilon(DEFAULT_ALPHAS[0]);
    assert!(unlocked_after_one > 0.0);

    sched.add_task(small_demand_task(1, 1.0, 1), &mut rng).unwrap();
    sched.schedule_queue().await;
    let unlocked_after_two = sched.blocks()[&0].available_unlocked_budget().epsilon(DEFAULT_ALPHAS[0]);
    assert!(unlocked_after_two >= unlocked_after_one, "unlocking must never shrink");
}

fn demand_task(id: u64, profit: f64, demand: f64) -> Task {
    Task::with_demand_spec(
        id,
        Sampled::Fixed(profit),
        Sampled::Fixed(1),
        Sampled::Fixed(demand),
        BlockSelectionPolicy::RandomBlocks,
        None,
    )
}

/// One big task (demand 3.0) arrives first, then five small ones (demand
/// 1.0 each), against a block with capacity for 5.0. FCFS admits the big
/// task plus two small ones before running out (count 3); ArgmaxKnapsack
/// ranks by item-count contention and should skip the big task entirely,
/// fitting all five small ones instead (count 5, strictly more than FCFS).
#[tokio::test]
async fn argmax_knapsack_admits_more_than_fcfs_under_contention() {
    let workload = |sched: &mut SchedulerCore, rng: &mut StepRng| {
        sched.add_task(demand_task(0, 1.0, 3.0), rng).unwrap();
        for id in 1..=5 {
            sched.add_task(demand_task(id, 1.0, 1.0), rng).unwrap();
        }
    };

    let mut fcfs = scheduler(MetricKind::Fcfs);
    fcfs.add_block(Block::new(0, Budget::from_epsilon_delta(DEFAULT_ALPHAS, 5.0, 0.99)));
    let mut rng = StepRng::new(0, 1);
    workload(&mut fcfs, &mut rng);
    fcfs.schedule_queue().await;
    let fcfs_report = fcfs.report();
    assert_eq!(fcfs_report.n_allocated_tasks, 3);

    let mut argmax = scheduler(MetricKind::ArgmaxKnapsack);
    argmax.add_block(Block::new(0, Budget::from_epsilon_delta(DEFAULT_ALPHAS, 5.0, 0.99)));
    let mut rng = StepRng::new(0, 1);
    workload(&mut argmax, &mut rng);
    argmax.schedule_queue().await;
    let argmax_report = argmax.report();
    assert_eq!(argmax_report.n_allocated_tasks, 5);

    assert!(argmax_report.n_allocated_tasks > fcfs_report.n_allocated_tasks);
}

/// Offline scheduling is exactly one batch round: building the same pending
/// set and running it through `schedule_queue()` vs a single
/// `run_one_round()` call must produce identical outcomes.
#[tokio::test]
async fn offline_single_pass_matches_a_single_batch_round() {
    let workload = |sched: &mut SchedulerCore, rng: &mut StepRng| {
        sched.add_block(Block::new(0, Budget::from_epsilon_delta(DEFAULT_ALPHAS, 3.0, 0.99)));
        for (id, profit) in [(0, 1.0), (1, 2.0), (2, 3.0)] {
            sched.add_task(demand_task(id, profit, 1.0), rng).unwrap();
        }
    };

    let mut offline = scheduler(MetricKind::FlatRelevance);
    let mut rng = StepRng::new(0, 1);
    workload(&mut offline, &mut rng);
    offline.schedule_queue().await;
    let offline_report = offline.report();

    let mut batch = scheduler(MetricKind::FlatRelevance);
    let mut rng = StepRng::new(0, 1);
    workload(&mut batch, &mut rng);
    batch.run_one_round().await;
    let batch_report = batch.report();

    assert_eq!(offline_report.n_allocated_tasks, batch_report.n_allocated_tasks);
    assert_eq!(offline_report.realized_profit, batch_report.realized_profit);
}
