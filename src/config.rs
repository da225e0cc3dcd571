use clap::Parser;

use crate::error::ConfigError;
use crate::metrics::{MetricConfig, MetricKind, NormalizeBy};
use crate::policies::BlockSelectionPolicy;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulingMethod {
    Batch,
    Offline,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskSampling {
    None,
    Poisson,
    Constant,
}

/// Merged configuration for one simulation run: built-in defaults overridden
/// by CLI flags / environment variables, validated eagerly at construction.
#[derive(Debug, Clone, clap::Parser)]
#[command(name = "privacy-scheduler", about = "Privacy-budget admission and allocation scheduler")]
pub struct Config {
    // =========================
    // Scheduler configuration
    // =========================
    /// `"batch"` runs a periodic ticking scheduler; `"offline"` ingests the
    /// whole workload and runs a single pass.
    #[arg(long, env = "SCHEDULER_METHOD", default_value = "batch")]
    pub scheduler_method: String,

    /// Ticks between batch scheduling rounds.
    #[arg(long, env = "SCHEDULER_WAIT_TIME", default_value_t = 10)]
    pub scheduling_wait_time: u64,

    /// Name of the ranking metric (see [`MetricKind`]).
    #[arg(long, env = "SCHEDULER_METRIC", default_value = "ArgmaxKnapsack")]
    pub metric: String,

    /// How many admits within one round before re-ranking the remainder.
    /// `0` disables mid-round re-ranking.
    #[arg(long, env = "METRIC_RECOMPUTATION_PERIOD", default_value_t = 0)]
    pub metric_recomputation_period: u32,

    /// Ticks to wait after the last block arrives before terminating.
    #[arg(long, env = "SCHEDULER_DATA_LIFETIME", default_value_t = 20)]
    pub data_lifetime: u64,

    /// Number of progressive-unlocking steps covering a block's lifetime.
    #[arg(long, env = "SCHEDULER_N", default_value_t = 10)]
    pub unlock_steps: u32,

    /// Wall-clock budget for a single scheduler tick.
    #[arg(long, env = "SCHEDULER_TIMEOUT_SECONDS", default_value_t = 30)]
    pub scheduler_timeout_seconds: u64,

    // =========================
    // Metric configuration
    // =========================
    /// `""`, `"available_budget"`, or `"capacity"`.
    #[arg(long, env = "METRIC_NORMALIZE_BY", default_value = "")]
    pub normalize_by: String,

    /// Softmax temperature for contention-aware metrics.
    #[arg(long, env = "METRIC_TEMPERATURE", default_value_t = 0.1)]
    pub temperature: f64,

    /// How many (block, alpha) knapsack solves run concurrently.
    #[arg(long, env = "N_KNAPSACK_SOLVERS", default_value_t = 4)]
    pub n_knapsack_solvers: usize,

    /// Per-cell knapsack solve timeout, in milliseconds.
    #[arg(long, env = "KNAPSACK_TIMEOUT_MS", default_value_t = 500)]
    pub knapsack_timeout_ms: u64,

    #[arg(long, env = "CLIP_DEMANDS_IN_RELEVANCE", default_value_t = false)]
    pub clip_demands_in_relevance: bool,

    // =========================
    // Blocks / tasks configuration
    // =========================
    #[arg(long, env = "BLOCKS_INITIAL_NUM", default_value_t = 5)]
    pub blocks_initial_num: usize,

    #[arg(long, env = "BLOCKS_MAX_NUM", default_value_t = 50)]
    pub blocks_max_num: usize,

    /// `""`, `"poisson"`, or `"constant"`.
    #[arg(long, env = "TASKS_SAMPLING", default_value = "")]
    pub tasks_sampling: String,

    #[arg(long, env = "TASKS_DATA_PATH")]
    pub tasks_data_path: Option<String>,

    #[arg(long, env = "TASKS_BLOCK_SELECTION_POLICY", default_value = "RandomBlocks")]
    pub tasks_block_selection_policy: String,

    #[arg(long, env = "TASKS_AVG_NUM_PER_BLOCK", default_value_t = 10.0)]
    pub tasks_avg_num_tasks_per_block: f64,

    #[arg(long, env = "TASKS_INITIAL_NUM", default_value_t = 0)]
    pub tasks_initial_num: usize,

    // =========================
    // Privacy parameters
    // =========================
    #[arg(long, env = "EPSILON", default_value_t = 10.0)]
    pub epsilon: f64,

    #[arg(long, env = "DELTA", default_value_t = 1e-7)]
    pub delta: f64,

    /// Comma-separated list of Rényi orders. Defaults to
    /// [`crate::budget::DEFAULT_ALPHAS`] when empty.
    #[arg(long, env = "ALPHAS", default_value = "")]
    pub alphas: String,

    #[arg(long, env = "GLOBAL_SEED", default_value_t = 42)]
    pub global_seed: u64,
}

impl Config {
    pub fn alphas_vec(&self) -> Vec<f64> {
        if self.alphas.trim().is_empty() {
            crate::budget::DEFAULT_ALPHAS.to_vec()
        } else {
            self.alphas.split(',').filter_map(|s| s.trim().parse().ok()).collect()
        }
    }

    pub fn scheduling_method(&self) -> Result<SchedulingMethod, ConfigError> {
        match self.scheduler_method.as_str() {
            "batch" => Ok(SchedulingMethod::Batch),
            "offline" => Ok(SchedulingMethod::Offline),
            other => Err(ConfigError::InvalidConfig(format!("unknown scheduler.method: {other}"))),
        }
    }

    pub fn task_sampling(&self) -> Result<TaskSampling, ConfigError> {
        match self.tasks_sampling.as_str() {
            "" => Ok(TaskSampling::None),
            "poisson" => Ok(TaskSampling::Poisson),
            "constant" => Ok(TaskSampling::Constant),
            other => Err(ConfigError::InvalidConfig(format!("unknown tasks.sampling: {other}"))),
        }
    }

    pub fn metric_kind(&self) -> Result<MetricKind, ConfigError> {
        MetricKind::from_str(&self.metric)
    }

    pub fn block_selection_policy(&self) -> Result<BlockSelectionPolicy, ConfigError> {
        BlockSelectionPolicy::from_str(&self.tasks_block_selection_policy)
    }

    pub fn metric_config(&self) -> Result<MetricConfig, ConfigError> {
        Ok(MetricConfig {
            normalize_by: NormalizeBy::from_str(&self.normalize_by)?,
            temperature: self.temperature,
            n_knapsack_solvers: self.n_knapsack_solvers,
            knapsack_timeout: std::time::Duration::from_millis(self.knapsack_timeout_ms),
            clip_demands_in_relevance: self.clip_demands_in_relevance,
        })
    }

    /// Validate the merged config, failing fast on the combinations that
    /// would otherwise surface as confusing runtime errors.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.scheduling_method()?;
        self.task_sampling()?;
        self.metric_kind()?;
        self.block_selection_policy()?;
        self.metric_config()?;
        if self.temperature <= 0.0 {
            return Err(ConfigError::InvalidConfig("metric.temperature must be positive".into()));
        }
        if self.alphas_vec().is_empty() {
            return Err(ConfigError::InvalidConfig("alphas must not be empty".into()));
        }
        if self.blocks_initial_num > self.blocks_max_num {
            return Err(ConfigError::InvalidConfig("blocks.initial_num exceeds blocks.max_num".into()));
        }
        Ok(())
    }

    pub fn from_args() -> Self {
        Config::parse()
    }
}
