use std::sync::atomic::{AtomicBool, Ordering};
use weft_types::WorkerId;

/// Coordinator-side view of one worker.
///
/// Owned by the pool; flags are flipped by the worker's reader task.
#[derive(Debug)]
pub struct WorkerHandle {
    id: WorkerId,
    alive: AtomicBool,
    ready: AtomicBool,
}

impl WorkerHandle {
    pub(crate) fn new(id: WorkerId) -> Self {
        Self {
            id,
            alive: AtomicBool::new(true),
            ready: AtomicBool::new(false),
        }
    }

    /// Worker identity within its pool.
    #[must_use]
    pub fn id(&self) -> WorkerId {
        self.id
    }

    /// `false` once the worker has terminated.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    /// `true` once the worker reported ready.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    /// Marks the worker ready. Returns `false` if it already was.
    pub(crate) fn mark_ready(&self) -> bool {
        !self.ready.swap(true, Ordering::AcqRel)
    }

    pub(crate) fn mark_dead(&self) {
        self.alive.store(false, Ordering::Release);
    }
}
