use super::RpcError;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, trace};
use weft_event::Envelope;
use weft_types::CorrelationId;

/// Outbound half of one channel plus the calls waiting on it.
///
/// The inbound half is owned by whoever reads the channel; it hands
/// every message to [`Correlator::route`], which completes the matching
/// pending call or returns the message for normal dispatch.
pub struct Correlator {
    outbound: mpsc::UnboundedSender<Envelope>,
    pending: Mutex<HashMap<CorrelationId, oneshot::Sender<Value>>>,
}

/// Removes a pending entry if the caller stops waiting.
struct PendingGuard<'a> {
    pending: &'a Mutex<HashMap<CorrelationId, oneshot::Sender<Value>>>,
    id: CorrelationId,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.pending.lock().remove(&self.id);
    }
}

impl Correlator {
    /// Creates a correlator posting to `outbound`.
    #[must_use]
    pub fn new(outbound: mpsc::UnboundedSender<Envelope>) -> Self {
        Self {
            outbound,
            pending: Mutex::new(HashMap::new()),
        }
    }

    /// Sends `{kind, data, id}` with a fresh id and waits for the first
    /// message carrying the same id.
    ///
    /// # Errors
    ///
    /// - [`RpcError::SendFailed`] if the outbound channel is closed
    /// - [`RpcError::ChannelClosed`] if [`Correlator::close`] runs first
    pub async fn send(&self, kind: &str, data: Value) -> Result<Value, RpcError> {
        self.send_envelope(Envelope::new(kind, data)).await
    }

    /// Like [`Correlator::send`], attaching transferable-buffer hints.
    ///
    /// # Errors
    ///
    /// Same as [`Correlator::send`].
    pub async fn send_with_transfer(
        &self,
        kind: &str,
        data: Value,
        transfer: Vec<String>,
    ) -> Result<Value, RpcError> {
        self.send_envelope(Envelope::new(kind, data).with_transfer(transfer))
            .await
    }

    async fn send_envelope(&self, envelope: Envelope) -> Result<Value, RpcError> {
        let id = envelope.id;
        let (tx, rx) = oneshot::channel();
        self.pending.lock().insert(id, tx);
        let _guard = PendingGuard {
            pending: &self.pending,
            id,
        };

        trace!(%id, kind = %envelope.kind, "rpc send");
        if self.outbound.send(envelope).is_err() {
            return Err(RpcError::SendFailed(id));
        }

        rx.await.map_err(|_| RpcError::ChannelClosed(id))
    }

    /// Posts a message without registering a pending call.
    ///
    /// # Errors
    ///
    /// Returns [`RpcError::SendFailed`] if the outbound channel is closed.
    pub fn post(&self, kind: &str, data: Value) -> Result<CorrelationId, RpcError> {
        let envelope = Envelope::new(kind, data);
        let id = envelope.id;
        self.outbound
            .send(envelope)
            .map_err(|_| RpcError::SendFailed(id))?;
        Ok(id)
    }

    /// Answers `request` with a response envelope carrying its id.
    ///
    /// # Errors
    ///
    /// Returns [`RpcError::SendFailed`] if the outbound channel is closed.
    pub fn reply(&self, request: &Envelope, data: Value) -> Result<(), RpcError> {
        self.outbound
            .send(request.respond(data))
            .map_err(|_| RpcError::SendFailed(request.id))
    }

    /// Completes the pending call matching `envelope.id`.
    ///
    /// Returns the envelope back when no call is waiting on that id, so
    /// the reader can dispatch it as a request.
    pub fn route(&self, envelope: Envelope) -> Option<Envelope> {
        let waiter = self.pending.lock().remove(&envelope.id);
        match waiter {
            Some(tx) => {
                trace!(id = %envelope.id, "rpc response routed");
                // Caller may have stopped waiting.
                let _ = tx.send(envelope.data);
                None
            }
            None => Some(envelope),
        }
    }

    /// Fails every pending call with [`RpcError::ChannelClosed`].
    ///
    /// Called by the reader once the inbound channel ends.
    pub fn close(&self) {
        let drained: Vec<_> = self.pending.lock().drain().collect();
        if !drained.is_empty() {
            debug!(count = drained.len(), "closing correlator with pending calls");
        }
    }

    /// Number of calls awaiting a response.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }
}

impl std::fmt::Debug for Correlator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Correlator")
            .field("pending", &self.pending_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;
    use weft_event::kind;

    fn correlator() -> (Arc<Correlator>, mpsc::UnboundedReceiver<Envelope>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Arc::new(Correlator::new(tx)), rx)
    }

    #[tokio::test]
    async fn send_resolves_with_matching_payload() {
        let (corr, mut rx) = correlator();
        let call = {
            let corr = Arc::clone(&corr);
            tokio::spawn(async move { corr.send("ping", json!(1)).await })
        };

        let req = rx.recv().await.unwrap();
        assert_eq!(req.kind, "ping");
        assert_eq!(req.data, json!(1));
        assert!(corr.route(req.respond(json!("pong"))).is_none());

        assert_eq!(call.await.unwrap().unwrap(), json!("pong"));
        assert_eq!(corr.pending_count(), 0);
    }

    #[tokio::test]
    async fn responses_out_of_order_reach_their_callers() {
        let (corr, mut rx) = correlator();
        let mut calls = Vec::new();
        for name in ["a", "b", "c"] {
            let corr = Arc::clone(&corr);
            calls.push(tokio::spawn(async move { corr.send("call", json!(name)).await }));
        }

        let mut requests = Vec::new();
        for _ in 0..3 {
            requests.push(rx.recv().await.unwrap());
        }
        let by_name = |name: &str| {
            requests
                .iter()
                .find(|r| r.data == json!(name))
                .unwrap()
                .clone()
        };

        for name in ["c", "a", "b"] {
            let req = by_name(name);
            corr.route(req.respond(json!(format!("reply-{name}"))));
        }

        let results: Vec<Value> = futures_join(calls).await;
        assert_eq!(
            results,
            vec![json!("reply-a"), json!("reply-b"), json!("reply-c")]
        );
    }

    async fn futures_join(
        calls: Vec<tokio::task::JoinHandle<Result<Value, RpcError>>>,
    ) -> Vec<Value> {
        let mut out = Vec::new();
        for call in calls {
            out.push(call.await.unwrap().unwrap());
        }
        out
    }

    #[tokio::test]
    async fn unmatched_message_is_returned() {
        let (corr, _rx) = correlator();
        let stray = Envelope::new(kind::CALL_MASTER, json!(null));
        let back = corr.route(stray.clone()).unwrap();
        assert_eq!(back, stray);
    }

    #[tokio::test]
    async fn any_message_kind_with_matching_id_completes_call() {
        let (corr, mut rx) = correlator();
        let call = {
            let corr = Arc::clone(&corr);
            tokio::spawn(async move { corr.send("x", json!(null)).await })
        };
        let req = rx.recv().await.unwrap();
        corr.route(Envelope::with_id("whatever", json!(7), req.id));
        assert_eq!(call.await.unwrap().unwrap(), json!(7));
    }

    #[tokio::test]
    async fn send_on_closed_channel_fails_and_cleans_up() {
        let (corr, rx) = correlator();
        drop(rx);
        let err = corr.send("x", json!(null)).await.unwrap_err();
        assert!(matches!(err, RpcError::SendFailed(_)));
        assert_eq!(corr.pending_count(), 0);
    }

    #[tokio::test]
    async fn close_fails_pending_calls() {
        let (corr, mut rx) = correlator();
        let call = {
            let corr = Arc::clone(&corr);
            tokio::spawn(async move { corr.send("x", json!(null)).await })
        };
        rx.recv().await.unwrap();
        corr.close();
        assert!(matches!(
            call.await.unwrap(),
            Err(RpcError::ChannelClosed(_))
        ));
    }

    #[tokio::test]
    async fn dropped_caller_removes_pending_entry() {
        let (corr, mut rx) = correlator();
        let call = {
            let corr = Arc::clone(&corr);
            tokio::spawn(async move { corr.send("x", json!(null)).await })
        };
        let req = rx.recv().await.unwrap();
        assert_eq!(corr.pending_count(), 1);

        call.abort();
        let _ = call.await;
        assert_eq!(corr.pending_count(), 0);

        // Late response is handed back as unmatched.
        assert!(corr.route(req.respond(json!(1))).is_some());
    }

    #[tokio::test]
    async fn transfer_hints_are_posted() {
        let (corr, mut rx) = correlator();
        let corr2 = Arc::clone(&corr);
        let _call = tokio::spawn(async move {
            corr2
                .send_with_transfer("x", json!(null), vec!["buf".into()])
                .await
        });
        let req = rx.recv().await.unwrap();
        assert_eq!(req.transfer, vec!["buf".to_string()]);
    }

    #[test]
    fn reply_uses_request_id() {
        let (corr, mut rx) = correlator();
        let req = Envelope::new("job", json!(null));
        corr.reply(&req, json!(true)).unwrap();
        let resp = rx.try_recv().unwrap();
        assert!(resp.is_response());
        assert_eq!(resp.id, req.id);
    }
}
