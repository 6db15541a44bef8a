/// Configuration for one worker pool generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerPoolConfig {
    /// Number of workers to spawn; also the concurrency bound.
    pub max_concurrent_workers: usize,
}

impl WorkerPoolConfig {
    /// Creates a config for `workers` workers (at least one).
    #[must_use]
    pub fn with_workers(workers: usize) -> Self {
        Self {
            max_concurrent_workers: workers.max(1),
        }
    }
}

impl Default for WorkerPoolConfig {
    fn default() -> Self {
        Self::with_workers(default_parallelism())
    }
}

/// The machine's available parallelism, or 1 if it cannot be queried.
#[must_use]
pub fn default_parallelism() -> usize {
    std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_workers_clamped() {
        assert_eq!(WorkerPoolConfig::with_workers(0).max_concurrent_workers, 1);
    }

    #[test]
    fn default_uses_parallelism() {
        assert_eq!(
            WorkerPoolConfig::default().max_concurrent_workers,
            default_parallelism()
        );
        assert!(default_parallelism() >= 1);
    }
}
