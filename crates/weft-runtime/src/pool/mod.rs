//! Worker pool lifecycle.
//!
//! # Architecture
//!
//! ```text
//!                  PoolManager (one per process)
//!                        │ ensure_started(n): restart on size change
//!                        ▼
//! ┌──────────────────────────────────────────────────────────┐
//! │ WorkerPool (one generation)                              │
//! │                                                          │
//! │  run_job ─► Semaphore(n) ─► idle queue ─► Correlator ──┐ │
//! │                                                        │ │
//! │  reader task per worker ◄── ready / callMaster / reply ┘ │
//! │     ready      → ready_count += 1, "ready" on LocalBus   │
//! │     callMaster → LocalBus::publish (bus emit)            │
//! └──────────────────────────────────────────────────────────┘
//!                        │ Envelope channels
//!                        ▼
//!              worker tasks (JobHandler + ForwardingBus)
//! ```
//!
//! A worker returns to the idle queue when its reply arrives, not when
//! the caller stops waiting, so an abandoned job still occupies it.
//!
//! A pool never changes size. Resizing ends the old generation, which
//! abandons its in-flight jobs, and starts a new one.

mod config;
mod error;
mod handle;
mod manager;
mod worker;

pub use config::{default_parallelism, WorkerPoolConfig};
pub use error::PoolError;
pub use handle::WorkerHandle;
pub use manager::PoolManager;
pub use worker::{JobHandler, JobReply, WorkerContext};

use crate::bus::{Bus, LocalBus};
use crate::rpc::Correlator;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::{mpsc, watch, OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use weft_event::{kind, Envelope, MasterCall};
use weft_types::WorkerId;

/// Bus event published when every worker of a pool is ready.
pub const POOL_READY_EVENT: &str = "ready";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct PoolState {
    ready: usize,
    ended: bool,
}

struct WorkerSlot {
    handle: Arc<WorkerHandle>,
    correlator: Arc<Correlator>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    /// Held from dispatch until the job's reply arrives.
    busy: Mutex<Option<OwnedSemaphorePermit>>,
}

/// One generation of workers.
pub struct WorkerPool {
    config: WorkerPoolConfig,
    workers: Vec<WorkerSlot>,
    idle: Mutex<VecDeque<WorkerId>>,
    permits: Arc<Semaphore>,
    state: watch::Sender<PoolState>,
}

impl WorkerPool {
    /// Spawns `config.max_concurrent_workers` workers running `handler`.
    ///
    /// Worker bus events are re-published on `bus`. Must be called from
    /// within a Tokio runtime.
    #[must_use]
    pub fn start(
        config: WorkerPoolConfig,
        handler: Arc<dyn JobHandler>,
        bus: Arc<LocalBus>,
    ) -> Arc<Self> {
        let size = config.max_concurrent_workers;
        let (state, _) = watch::channel(PoolState::default());

        let pool = Arc::new_cyclic(|weak: &std::sync::Weak<Self>| {
            let mut workers = Vec::with_capacity(size);
            for index in 0..size {
                let id = WorkerId::new(index);
                let (to_worker, worker_inbound) = mpsc::unbounded_channel();
                let (worker_outbound, mut from_worker) = mpsc::unbounded_channel();

                let handle = Arc::new(WorkerHandle::new(id));
                let correlator = Arc::new(Correlator::new(to_worker));

                let worker_task = tokio::spawn(worker::run_worker(
                    id,
                    Arc::clone(&handler),
                    worker_inbound,
                    worker_outbound,
                ));

                let reader_task = {
                    let handle = Arc::clone(&handle);
                    let correlator = Arc::clone(&correlator);
                    let bus = Arc::clone(&bus);
                    let weak = weak.clone();
                    tokio::spawn(async move {
                        while let Some(envelope) = from_worker.recv().await {
                            if envelope.is_response() {
                                // Only jobs are awaited on this side.
                                if correlator.route(envelope).is_some() {
                                    debug!(worker_id = %handle.id(), "reply for abandoned job");
                                }
                                if let Some(pool) = weak.upgrade() {
                                    pool.release(handle.id());
                                }
                                continue;
                            }
                            let Some(envelope) = correlator.route(envelope) else {
                                continue;
                            };
                            match envelope.kind.as_str() {
                                kind::READY => {
                                    if handle.mark_ready() {
                                        if let Some(pool) = weak.upgrade() {
                                            pool.worker_ready(handle.id(), &bus);
                                        }
                                    }
                                }
                                kind::CALL_MASTER => {
                                    handle_master_call(&correlator, &bus, &envelope);
                                }
                                other => {
                                    debug!(
                                        worker_id = %handle.id(),
                                        kind = other,
                                        "unexpected message"
                                    );
                                }
                            }
                        }
                        handle.mark_dead();
                        correlator.close();
                        if let Some(pool) = weak.upgrade() {
                            pool.retire(handle.id());
                        }
                    })
                };

                workers.push(WorkerSlot {
                    handle,
                    correlator,
                    tasks: Mutex::new(vec![worker_task, reader_task]),
                    busy: Mutex::new(None),
                });
            }

            Self {
                config: config.clone(),
                workers,
                idle: Mutex::new((0..size).map(WorkerId::new).collect()),
                permits: Arc::new(Semaphore::new(size)),
                state,
            }
        });

        info!(workers = size, "worker pool started");
        pool
    }

    /// Configured size of this generation.
    #[must_use]
    pub fn max_concurrent_workers(&self) -> usize {
        self.config.max_concurrent_workers
    }

    /// Number of workers that have reported ready.
    #[must_use]
    pub fn ready_count(&self) -> usize {
        self.state.borrow().ready
    }

    /// `true` once every worker is ready.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.ready_count() == self.max_concurrent_workers()
    }

    /// `true` once [`WorkerPool::end`] ran.
    #[must_use]
    pub fn is_ended(&self) -> bool {
        self.state.borrow().ended
    }

    /// Handles of every worker in this generation.
    pub fn workers(&self) -> impl Iterator<Item = &WorkerHandle> {
        self.workers.iter().map(|slot| slot.handle.as_ref())
    }

    /// Resolves once every worker is ready.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::Ended`] if the pool ends first.
    pub async fn wait_until_ready(&self) -> Result<(), PoolError> {
        let max = self.max_concurrent_workers();
        let mut rx = self.state.subscribe();
        let state = rx
            .wait_for(|s| s.ended || s.ready >= max)
            .await
            .map_err(|_| PoolError::Ended)?;
        if state.ended {
            return Err(PoolError::Ended);
        }
        Ok(())
    }

    /// Runs one job on the next idle worker.
    ///
    /// At most `max_concurrent_workers` jobs are in flight; further calls
    /// wait for a worker to free up. Dropping the returned future does not
    /// free the worker early.
    ///
    /// # Errors
    ///
    /// - [`PoolError::Ended`] if the pool ends before or during the job
    /// - [`PoolError::JobFailed`] if the handler returned an error
    /// - [`PoolError::InvalidReply`] if the reply is malformed
    pub async fn run_job(&self, job: Value) -> Result<Value, PoolError> {
        let permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|_| PoolError::Ended)?;

        let worker = self.idle.lock().pop_front().ok_or(PoolError::Ended)?;
        let slot = self
            .workers
            .get(worker.index())
            .ok_or(PoolError::Ended)?;
        *slot.busy.lock() = Some(permit);

        debug!(worker_id = %worker, "dispatching job");
        let reply = slot
            .correlator
            .send(kind::JOB, job)
            .await
            .map_err(|e| {
                if self.is_ended() {
                    PoolError::Ended
                } else {
                    PoolError::Rpc(e)
                }
            })?;

        match serde_json::from_value::<JobReply>(reply) {
            Ok(JobReply::Ok(value)) => Ok(value),
            Ok(JobReply::Err(message)) => Err(PoolError::JobFailed { worker, message }),
            Err(e) => Err(PoolError::InvalidReply(e.to_string())),
        }
    }

    /// Terminates every worker and abandons in-flight jobs. Idempotent.
    pub fn end(&self) {
        let mut already = false;
        self.state.send_modify(|s| {
            already = s.ended;
            s.ended = true;
        });
        if already {
            return;
        }

        self.permits.close();
        for slot in &self.workers {
            let _ = slot.correlator.post(kind::END, Value::Null);
            for task in slot.tasks.lock().drain(..) {
                task.abort();
            }
            slot.correlator.close();
            slot.handle.mark_dead();
        }
        info!(workers = self.workers.len(), "worker pool ended");
    }

    /// Puts a worker back in the idle queue once its reply is in.
    fn release(&self, id: WorkerId) {
        let Some(slot) = self.workers.get(id.index()) else {
            return;
        };
        let permit = slot.busy.lock().take();
        if let Some(permit) = permit {
            self.idle.lock().push_back(id);
            drop(permit);
        }
    }

    /// Takes a terminated worker out of rotation for good.
    fn retire(&self, id: WorkerId) {
        if self.is_ended() {
            return;
        }
        warn!(worker_id = %id, "worker terminated");
        let Some(slot) = self.workers.get(id.index()) else {
            return;
        };
        let busy = slot.busy.lock().take();
        if let Some(permit) = busy {
            permit.forget();
        } else {
            let was_idle = {
                let mut idle = self.idle.lock();
                let before = idle.len();
                idle.retain(|w| *w != id);
                idle.len() < before
            };
            if was_idle {
                if let Ok(permit) = self.permits.try_acquire() {
                    permit.forget();
                }
            }
        }
        if self.workers().all(|w| !w.is_alive()) {
            // Nothing left to run jobs; waiting callers fail with `Ended`.
            self.permits.close();
        }
    }

    fn worker_ready(&self, id: WorkerId, bus: &LocalBus) {
        let max = self.max_concurrent_workers();
        let mut became_ready = false;
        self.state.send_modify(|s| {
            if !s.ended && s.ready < max {
                s.ready += 1;
                became_ready = s.ready == max;
            }
        });
        debug!(worker_id = %id, ready = self.ready_count(), max, "worker ready");
        if became_ready {
            bus.publish(POOL_READY_EVENT, vec![json!(max)]);
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.end();
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("max_concurrent_workers", &self.max_concurrent_workers())
            .field("ready", &self.ready_count())
            .field("ended", &self.is_ended())
            .finish()
    }
}

/// Serves a worker's call into the coordinator.
fn handle_master_call(correlator: &Correlator, bus: &LocalBus, envelope: &Envelope) {
    let call = match MasterCall::from_value(envelope.data.clone()) {
        Ok(call) => call,
        Err(e) => {
            warn!(error = %e, "malformed master call");
            return;
        }
    };

    let result = if call.is_bus_emit() {
        match call.to_bus_event() {
            Ok(event) => Ok(json!(bus.publish(&event.name, event.args))),
            Err(e) => Err(e.to_string()),
        }
    } else {
        Err(format!("unknown call target {}::{}", call.location, call.method))
    };

    if let Err(message) = &result {
        warn!(
            location = %call.location,
            method = %call.method,
            error = %message,
            "master call failed"
        );
    }

    if call.await_response {
        let reply = match result {
            Ok(value) => JobReply::Ok(value),
            Err(message) => JobReply::Err(message),
        };
        let data = serde_json::to_value(&reply).unwrap_or(Value::Null);
        if let Err(e) = correlator.reply(envelope, data) {
            debug!(error = %e, "master call reply dropped");
        }
    }
}
