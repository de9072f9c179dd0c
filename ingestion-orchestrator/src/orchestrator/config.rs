use common::{
    store::consistency::{ConsistencyModel, ValidationPolicy},
    utils::config::AppConfig,
};

/// How batches are dispatched relative to each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    /// Batches run strictly in submission order.
    Sequential,
    /// Up to `concurrent_batches` batches run at once behind a permit pool.
    Parallel { concurrent_batches: usize },
}

#[derive(Debug, Clone)]
pub struct BatchTuning {
    /// When false the whole job runs as a single batch.
    pub batch_mode: bool,
    pub files_per_batch: usize,
    pub execution_mode: ExecutionMode,
}

impl Default for BatchTuning {
    fn default() -> Self {
        Self {
            batch_mode: true,
            files_per_batch: 16,
            execution_mode: ExecutionMode::Parallel {
                concurrent_batches: 4,
            },
        }
    }
}

/// Everything the orchestrator needs for one job, constructed once from the
/// application configuration and passed down explicitly.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub tuning: BatchTuning,
    pub validation_policy: ValidationPolicy,
}

impl OrchestratorConfig {
    pub fn from_app_config(config: &AppConfig) -> Self {
        let model = ConsistencyModel::from_backend(
            &config.vector_store_name,
            config.vector_store_aws_service.as_deref(),
        );
        let validation_policy =
            ValidationPolicy::for_model(model).with_max_retries(config.validation_max_retries);

        let execution_mode = if config.parallel_batch_mode {
            ExecutionMode::Parallel {
                concurrent_batches: config.concurrent_batches.max(1),
            }
        } else {
            ExecutionMode::Sequential
        };

        Self {
            tuning: BatchTuning {
                batch_mode: config.batch_mode,
                files_per_batch: config.files_per_batch.max(1),
                execution_mode,
            },
            validation_policy,
        }
    }
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            tuning: BatchTuning::default(),
            validation_policy: ValidationPolicy::for_model(ConsistencyModel::Immediate),
        }
    }
}
