use std::time::Duration;

use bandblur_imgproc::parallel::ExecutionStrategy;

/// Configuration of a distributed convolution run.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use bandblur_dist::ClusterConfig;
///
/// let config = ClusterConfig::new(4)
///     .with_threads(2)
///     .with_gather_timeout(Duration::from_secs(5));
///
/// assert_eq!(config.num_workers, 4);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterConfig {
    /// The number of workers, coordinator included.
    pub num_workers: usize,
    /// How each worker schedules the pixels of its band.
    pub strategy: ExecutionStrategy,
    /// How long the coordinator waits for each band. `None` waits forever.
    pub gather_timeout: Option<Duration>,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self::new(1)
    }
}

impl ClusterConfig {
    /// Create a configuration for `num_workers` workers with the default thread pool.
    pub fn new(num_workers: usize) -> Self {
        Self {
            num_workers,
            strategy: ExecutionStrategy::default(),
            gather_timeout: None,
        }
    }

    /// Use a dedicated pool of `num_threads` threads in every worker.
    pub fn with_threads(mut self, num_threads: usize) -> Self {
        self.strategy = ExecutionStrategy::Fixed(num_threads);
        self
    }

    /// Set the scheduling strategy of every worker.
    pub fn with_strategy(mut self, strategy: ExecutionStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Fail the gather when a band does not arrive within `timeout`.
    pub fn with_gather_timeout(mut self, timeout: Duration) -> Self {
        self.gather_timeout = Some(timeout);
        self
    }
}
