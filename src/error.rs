use thiserror::Error;

/// Errors raised while building or validating a [`crate::config::Config`].
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("unknown block-selection policy: {0}")]
    UnknownPolicyName(String),

    #[error("unknown scheduling metric: {0}")]
    UnknownMetricName(String),

    #[error("invalid config: {0}")]
    InvalidConfig(String),
}

/// Errors raised while admitting a task into the scheduler.
#[derive(Error, Debug)]
pub enum AdmissionError {
    #[error("not enough blocks available: requested {requested}, have {available}")]
    NotEnoughBlocks { requested: usize, available: usize },

    #[error("task {task_id} is infeasible on block {block_id}")]
    InfeasibleTask { task_id: u64, block_id: u64 },
}

/// Errors raised inside metric evaluation.
#[derive(Error, Debug)]
pub enum MetricError {
    #[error("knapsack solve timed out for block {block_id}, alpha {alpha}")]
    KnapsackTimeout { block_id: u64, alpha: f64 },

    #[error("budgets do not share a support: {0}")]
    BudgetSupportMismatch(String),
}

#[derive(Error, Debug)]
pub enum SchedulerError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Admission(#[from] AdmissionError),

    #[error(transparent)]
    Metric(#[from] MetricError),

    #[error("scheduler invariant violated: {0}")]
    Invariant(String),
}
