use super::{default_parallelism, JobHandler, PoolError, WorkerPool, WorkerPoolConfig};
use crate::bus::LocalBus;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

/// Owns the current pool generation.
///
/// Start, resize and teardown are serialized behind one async lock, so a
/// pool is never mutated while it is being torn down.
///
/// # Example
///
/// ```ignore
/// let manager = PoolManager::new(handler, bus);
/// manager.ensure_started(Some(4)).await;
/// manager.wait_until_ready().await?;
/// ```
pub struct PoolManager {
    handler: Arc<dyn JobHandler>,
    bus: Arc<LocalBus>,
    current: Mutex<Option<Arc<WorkerPool>>>,
}

impl PoolManager {
    /// Creates a manager whose pools run `handler` and re-publish worker
    /// events on `bus`.
    #[must_use]
    pub fn new(handler: Arc<dyn JobHandler>, bus: Arc<LocalBus>) -> Self {
        Self {
            handler,
            bus,
            current: Mutex::new(None),
        }
    }

    /// The coordinator bus worker events are re-published on.
    #[must_use]
    pub fn bus(&self) -> &Arc<LocalBus> {
        &self.bus
    }

    /// Returns a pool with `desired` workers (default: available
    /// parallelism), restarting the current one if its size differs.
    ///
    /// Restarting ends the old pool first; its in-flight jobs fail with
    /// [`PoolError::Ended`].
    pub async fn ensure_started(&self, desired: Option<usize>) -> Arc<WorkerPool> {
        let config = WorkerPoolConfig::with_workers(desired.unwrap_or_else(default_parallelism));
        let mut current = self.current.lock().await;

        if let Some(pool) = current.as_ref() {
            if pool.max_concurrent_workers() == config.max_concurrent_workers && !pool.is_ended() {
                return Arc::clone(pool);
            }
        }

        if let Some(old) = current.take() {
            info!(
                from = old.max_concurrent_workers(),
                to = config.max_concurrent_workers,
                "restarting worker pool"
            );
            old.end();
        }

        let pool = WorkerPool::start(config, Arc::clone(&self.handler), Arc::clone(&self.bus));
        *current = Some(Arc::clone(&pool));
        pool
    }

    /// The current pool, if one was started.
    pub async fn current(&self) -> Option<Arc<WorkerPool>> {
        self.current.lock().await.clone()
    }

    /// Resolves once every worker of the current pool is ready.
    ///
    /// # Errors
    ///
    /// - [`PoolError::NotStarted`] if no pool was started
    /// - [`PoolError::Ended`] if the pool is torn down while waiting
    pub async fn wait_until_ready(&self) -> Result<(), PoolError> {
        let pool = self.current().await.ok_or(PoolError::NotStarted)?;
        pool.wait_until_ready().await
    }

    /// Ends the current pool, if any.
    pub async fn end(&self) {
        if let Some(pool) = self.current.lock().await.take() {
            pool.end();
        }
    }
}

impl std::fmt::Debug for PoolManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PoolManager").finish_non_exhaustive()
    }
}
