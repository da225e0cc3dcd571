//! Block and task producers: emit arrivals onto the channels the resource
//! manager drains, grounded on the block/task arrival behavior described in
//! `SPEC_FULL.md` §4.G.

use std::sync::Arc;

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::{Distribution, Poisson};
use tokio::sync::mpsc::Sender;
use tracing::info;

use crate::block::Block;
use crate::budget::Budget;
use crate::config::{Config, TaskSampling};
use crate::policies::BlockSelectionPolicy;
use crate::task::{Sampled, Task};

use super::clock::Clock;

const BLOCK_ARRIVAL_INTERVAL: u64 = 1;

pub async fn block_producer(config: Config, clock: Arc<dyn Clock>, tx: Sender<Block>) {
    let alphas = config.alphas_vec();
    for id in 0..config.blocks_initial_num as u64 {
        let budget = Budget::from_epsilon_delta(&alphas, config.epsilon, config.delta);
        if tx.send(Block::new(id, budget)).await.is_err() {
            return;
        }
    }
    info!("done producing initial blocks");

    for id in config.blocks_initial_num as u64..config.blocks_max_num as u64 {
        clock.sleep_ticks(BLOCK_ARRIVAL_INTERVAL).await;
        let budget = Budget::from_epsilon_delta(&alphas, config.epsilon, config.delta);
        if tx.send(Block::new(id, budget)).await.is_err() {
            return;
        }
    }
    info!("done producing blocks");
}

pub async fn task_producer(
    config: Config,
    clock: Arc<dyn Clock>,
    tx: Sender<Task>,
    policy: BlockSelectionPolicy,
    epsilon: f64,
    delta: f64,
    alphas: Vec<f64>,
) {
    let mut rng = StdRng::seed_from_u64(config.global_seed.wrapping_add(1));
    let mut next_id: u64 = 0;

    for _ in 0..config.tasks_initial_num {
        let task = spawn_task(next_id, policy, epsilon, delta, &alphas);
        next_id += 1;
        if tx.send(task).await.is_err() {
            return;
        }
    }
    info!("done producing initial tasks");

    let sampling = config.task_sampling().unwrap_or(TaskSampling::None);
    let total_online_blocks = config.blocks_max_num.saturating_sub(config.blocks_initial_num) as u64;

    match sampling {
        TaskSampling::None => {}
        TaskSampling::Constant => {
            let per_tick = config.tasks_avg_num_tasks_per_block.max(0.0).round() as u64;
            for _ in 0..total_online_blocks {
                clock.sleep_ticks(BLOCK_ARRIVAL_INTERVAL).await;
                for _ in 0..per_tick {
                    let task = spawn_task(next_id, policy, epsilon, delta, &alphas);
                    next_id += 1;
                    if tx.send(task).await.is_err() {
                        return;
                    }
                }
            }
        }
        TaskSampling::Poisson => {
            let lambda = config.tasks_avg_num_tasks_per_block.max(1e-6);
            let poisson = Poisson::new(lambda).unwrap_or_else(|_| Poisson::new(1.0).unwrap());
            for _ in 0..total_online_blocks {
                clock.sleep_ticks(BLOCK_ARRIVAL_INTERVAL).await;
                let count = poisson.sample(&mut rng).round() as u64;
                for _ in 0..count {
                    let task = spawn_task(next_id, policy, epsilon, delta, &alphas);
                    next_id += 1;
                    if tx.send(task).await.is_err() {
                        return;
                    }
                }
            }
        }
    }
    info!("done producing tasks");
}

/// Build a fresh task with a demand epsilon sampled as a small fraction of
/// the block's own `epsilon`, so many tasks can be admitted against a single
/// block instead of exhausting it after one allocation.
fn spawn_task(id: u64, policy: BlockSelectionPolicy, epsilon: f64, delta: f64, alphas: &[f64]) -> Task {
    let _ = (delta, alphas);
    let demand_spec = Sampled::<f64>::Distribution(vec![
        (epsilon * 0.01, 0.3),
        (epsilon * 0.02, 0.4),
        (epsilon * 0.05, 0.3),
    ]);
    Task::with_demand_spec(
        id,
        Sampled::<f64>::parse("1:0.3,2:0.4,4:0.3"),
        Sampled::<u32>::parse("1:0.6,2:0.3,3:0.1"),
        demand_spec,
        policy,
        None,
    )
}
