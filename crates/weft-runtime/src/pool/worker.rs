//! Worker-side loop and the job handler seam.
//!
//! A worker owns a [`Correlator`] over its channel to the coordinator and
//! a [`ForwardingBus`]. It reports `ready` after [`JobHandler::init`],
//! then serves `job` envelopes until `end` arrives or the channel closes.
//! Jobs run on their own tasks so the loop keeps routing responses to
//! calls the handler makes back to the coordinator. A handler that
//! panics still answers, with a [`JobReply::Err`].

use crate::bus::{Bus, ForwardingBus};
use crate::rpc::{Correlator, RpcError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinError;
use tracing::{debug, warn};
use weft_event::{kind, Envelope, MasterCall};
use weft_types::WorkerId;

/// Outcome of one job as carried in the response envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum JobReply {
    /// Handler returned a value.
    Ok(Value),
    /// Handler failed with a message.
    Err(String),
}

/// Code that runs inside each worker.
#[async_trait]
pub trait JobHandler: Send + Sync + 'static {
    /// One-time setup before the worker reports ready.
    ///
    /// An error keeps the worker from ever becoming ready.
    async fn init(&self, _ctx: &WorkerContext) -> Result<(), String> {
        Ok(())
    }

    /// Runs one opaque job.
    async fn handle(&self, job: Value, ctx: &WorkerContext) -> Result<Value, String>;
}

/// What a job handler can reach from inside a worker.
#[derive(Clone)]
pub struct WorkerContext {
    id: WorkerId,
    bus: Arc<dyn Bus>,
    correlator: Arc<Correlator>,
}

impl WorkerContext {
    /// This worker's id.
    #[must_use]
    pub fn id(&self) -> WorkerId {
        self.id
    }

    /// The worker's bus. Publishes are forwarded to the coordinator.
    #[must_use]
    pub fn bus(&self) -> &dyn Bus {
        self.bus.as_ref()
    }

    /// Invokes `method` on a coordinator object and waits for the reply.
    ///
    /// # Errors
    ///
    /// Returns [`RpcError`] if the coordinator channel is gone.
    pub async fn call_master(
        &self,
        location: &str,
        method: &str,
        args: Vec<Value>,
    ) -> Result<Value, RpcError> {
        let call = MasterCall {
            location: location.to_string(),
            method: method.to_string(),
            args,
            await_response: true,
        };
        self.correlator.send(kind::CALL_MASTER, call.to_value()).await
    }
}

/// Runs a worker until `end` or channel close.
pub(crate) async fn run_worker(
    id: WorkerId,
    handler: Arc<dyn JobHandler>,
    mut inbound: mpsc::UnboundedReceiver<Envelope>,
    outbound: mpsc::UnboundedSender<Envelope>,
) {
    let correlator = Arc::new(Correlator::new(outbound));
    let ctx = WorkerContext {
        id,
        bus: Arc::new(ForwardingBus::new(Arc::clone(&correlator))),
        correlator: Arc::clone(&correlator),
    };

    if let Err(e) = handler.init(&ctx).await {
        warn!(worker_id = %id, error = %e, "worker init failed");
        return;
    }
    if correlator.post(kind::READY, Value::Null).is_err() {
        return;
    }
    debug!(worker_id = %id, "worker ready");

    while let Some(envelope) = inbound.recv().await {
        let Some(envelope) = correlator.route(envelope) else {
            continue;
        };
        match envelope.kind.as_str() {
            kind::JOB => {
                let handler = Arc::clone(&handler);
                let ctx = ctx.clone();
                tokio::spawn(async move {
                    let job = {
                        let ctx = ctx.clone();
                        let data = envelope.data.clone();
                        tokio::spawn(async move { handler.handle(data, &ctx).await })
                    };
                    let reply = match job.await {
                        Ok(Ok(value)) => JobReply::Ok(value),
                        Ok(Err(message)) => JobReply::Err(message),
                        Err(e) => {
                            let message = panic_message(e);
                            warn!(worker_id = %ctx.id, error = %message, "job handler panicked");
                            JobReply::Err(format!("worker job panicked: {message}"))
                        }
                    };
                    let data = serde_json::to_value(&reply).unwrap_or(Value::Null);
                    if let Err(e) = ctx.correlator.reply(&envelope, data) {
                        debug!(worker_id = %ctx.id, error = %e, "job reply dropped");
                    }
                });
            }
            kind::END => break,
            other => debug!(worker_id = %id, kind = other, "worker ignoring message"),
        }
    }

    correlator.close();
    debug!(worker_id = %id, "worker stopped");
}

fn panic_message(error: JoinError) -> String {
    match error.try_into_panic() {
        Ok(payload) => payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic payload".to_string()),
        Err(e) => e.to_string(),
    }
}
