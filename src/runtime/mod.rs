//! Resource manager and clock: arrival of blocks and tasks on a discrete
//! event clock, driving the scheduler core to completion.

pub mod clock;
mod producers;

use std::sync::Arc;
use std::time::Duration;

use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::sync::mpsc;
use tokio::time::interval;
use tracing::{info, instrument};

use crate::block::Block;
use crate::config::{Config, SchedulingMethod};
use crate::error::SchedulerError;
use crate::metrics::counters::Counters;
use crate::scheduler::{Report, SchedulerCore};
use crate::task::Task;
use clock::Clock;

/// Drives block/task arrival and the scheduler core to completion for a
/// single simulation run. Blocks and tasks arrive on bounded channels fed by
/// background producer tasks; this struct is the single place that mutates
/// the scheduler, so no lock is needed (see `SPEC_FULL.md` §5).
pub struct ResourceManager {
    config: Config,
    clock: Arc<dyn Clock>,
}

impl ResourceManager {
    pub fn new(config: Config, clock: Arc<dyn Clock>) -> Self {
        Self { config, clock }
    }

    #[instrument(skip(self), target = "resource_manager")]
    pub async fn run(self) -> Result<Report, SchedulerError> {
        self.config.validate()?;

        let alphas = self.config.alphas_vec();
        let metric_kind = self.config.metric_kind()?;
        let metric_config = self.config.metric_config()?;
        let policy = self.config.block_selection_policy()?;
        let method = self.config.scheduling_method()?;
        let counters = Counters::default();

        let mut scheduler = SchedulerCore::new(
            metric_kind,
            metric_config,
            alphas.clone(),
            self.config.delta,
            self.config.unlock_steps,
            counters.clone(),
        );

        let mut rng = StdRng::seed_from_u64(self.config.global_seed);

        let (block_tx, mut block_rx) = mpsc::channel::<Block>(64);
        let (task_tx, mut task_rx) = mpsc::channel::<Task>(256);

        let block_producer = tokio::spawn(producers::block_producer(
            self.config.clone(),
            self.clock.clone(),
            block_tx,
        ));
        let task_producer = tokio::spawn(producers::task_producer(
            self.config.clone(),
            self.clock.clone(),
            task_tx,
            policy,
            self.config.epsilon,
            self.config.delta,
            alphas,
        ));

        match method {
            SchedulingMethod::Offline => {
                while let Some(block) = block_rx.recv().await {
                    scheduler.add_block(block);
                }
                while let Some(task) = task_rx.recv().await {
                    if let Err(err) = scheduler.add_task(task, &mut rng) {
                        tracing::warn!(error = %err, "task rejected during ingestion");
                    }
                }
                info!("all tasks consumed, running offline scheduling pass");
                scheduler.schedule_queue().await;
            }
            SchedulingMethod::Batch => {
                let period = Duration::from_millis(self.config.scheduling_wait_time.max(1));
                let mut ticker = interval(period);
                let mut blocks_done = false;
                let mut tasks_done = false;
                let mut drain_ticks_remaining: Option<u64> = None;

                loop {
                    tokio::select! {
                        maybe_block = block_rx.recv(), if !blocks_done => {
                            match maybe_block {
                                Some(block) => scheduler.add_block(block),
                                None => blocks_done = true,
                            }
                        }
                        maybe_task = task_rx.recv(), if !tasks_done => {
                            match maybe_task {
                                Some(task) => {
                                    if let Err(err) = scheduler.add_task(task, &mut rng) {
                                        tracing::warn!(error = %err, "task rejected during ingestion");
                                    }
                                }
                                None => tasks_done = true,
                            }
                        }
                        _ = ticker.tick() => {
                            scheduler.run_one_round().await;
                            if blocks_done && tasks_done {
                                match drain_ticks_remaining {
                                    None => drain_ticks_remaining = Some(self.config.data_lifetime),
                                    Some(0) => break,
                                    Some(n) => drain_ticks_remaining = Some(n - 1),
                                }
                            }
                        }
                    }
                    if blocks_done && tasks_done && scheduler.pending_len() == 0 {
                        break;
                    }
                }
                info!("simulation terminated, running final drain round");
                scheduler.run_one_round().await;
            }
        }

        block_producer.await.expect("block producer panicked");
        task_producer.await.expect("task producer panicked");

        Ok(scheduler.report())
    }
}
