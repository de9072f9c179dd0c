use std::time::Duration;

/// Consistency behaviour of the backing store, decided once per job from
/// the configured backend identity and never re-derived inside helpers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsistencyModel {
    /// Writes become visible to reads asynchronously, possibly tens of
    /// seconds later (serverless search offerings).
    Eventual,
    /// Writes become visible shortly after an index refresh (managed
    /// search services).
    Synchronous,
    /// Writes are visible to the next read.
    Immediate,
}

impl ConsistencyModel {
    /// Classifies a backend from its service name plus the optional AWS
    /// service indicator, where "aoss" marks the serverless offering.
    pub fn from_backend(store_name: &str, aws_service: Option<&str>) -> Self {
        let is_search_backend = matches!(
            store_name.to_lowercase().as_str(),
            "opensearch" | "elasticsearch"
        );
        if !is_search_backend {
            return ConsistencyModel::Immediate;
        }

        match aws_service.map(str::to_lowercase).as_deref() {
            Some("aoss") => ConsistencyModel::Eventual,
            _ => ConsistencyModel::Synchronous,
        }
    }
}

/// Retry budget governing one consistency-validation phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationPolicy {
    /// Total poll attempts, always at least one.
    pub max_retries: u32,
    /// Pause between consecutive polls. Zero means no sleep.
    pub retry_delay: Duration,
    /// One-off pause before the first poll, to give the store a head start.
    pub initial_delay: Duration,
}

impl ValidationPolicy {
    pub fn for_model(model: ConsistencyModel) -> Self {
        match model {
            ConsistencyModel::Eventual => Self {
                max_retries: 10,
                retry_delay: Duration::from_secs(10),
                initial_delay: Duration::from_secs(5),
            },
            ConsistencyModel::Synchronous => Self {
                max_retries: 5,
                retry_delay: Duration::from_secs(3),
                initial_delay: Duration::ZERO,
            },
            ConsistencyModel::Immediate => Self {
                max_retries: 1,
                retry_delay: Duration::ZERO,
                initial_delay: Duration::ZERO,
            },
        }
    }

    /// Applies the operator override for the retry count. A single poll
    /// always happens, even when the override asks for zero.
    pub fn with_max_retries(mut self, max_retries: Option<u32>) -> Self {
        if let Some(retries) = max_retries {
            self.max_retries = retries.max(1);
        }
        self
    }
}
