//! Session-owned structured result channel.
//!
//! The engine writes JSON-logger style messages through a [`Reporter`]
//! (stdout and stderr are two slots feeding the same stream). The
//! orchestrator session owns the matching [`ReporterStream`] and tears it
//! down with the session, so concurrent sessions never see each other's
//! results.

use super::diagnostics::Diagnostic;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::trace;

/// A bundle as reported by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleInfo {
    /// Working-root path of the written bundle.
    pub file_path: String,
    /// Size in bytes.
    pub size: u64,
    /// Time spent, in milliseconds.
    pub time: u64,
}

/// One reporter message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ReporterMessage {
    /// Build finished with bundles.
    #[serde(rename_all = "camelCase")]
    BuildSuccess {
        /// Written bundles.
        bundles: Vec<BundleInfo>,
        /// Total build time in milliseconds.
        build_time: u64,
    },
    /// Build failed.
    BuildFailure {
        /// Raw diagnostics.
        message: Vec<Diagnostic>,
    },
    /// Source-map visualization payload.
    Sourcemap {
        /// Opaque payload.
        data: Value,
    },
    /// Any other log line. Ignored by the orchestrator.
    Log {
        /// Log level.
        level: String,
        /// Message text.
        message: String,
    },
}

impl ReporterMessage {
    /// Returns `true` for `buildSuccess` and `buildFailure`.
    #[must_use]
    pub fn is_build_result(&self) -> bool {
        matches!(self, Self::BuildSuccess { .. } | Self::BuildFailure { .. })
    }
}

/// Engine-side handle. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Reporter {
    tx: mpsc::UnboundedSender<ReporterMessage>,
}

impl Reporter {
    /// Writes to the stdout slot.
    pub fn stdout(&self, message: ReporterMessage) {
        self.emit("stdout", message);
    }

    /// Writes to the stderr slot.
    pub fn stderr(&self, message: ReporterMessage) {
        self.emit("stderr", message);
    }

    /// Hands a source-map visualization payload to the session.
    pub fn sourcemap(&self, data: Value) {
        self.emit("sourcemap", ReporterMessage::Sourcemap { data });
    }

    fn emit(&self, slot: &'static str, message: ReporterMessage) {
        trace!(slot, "reporter message");
        // Session already torn down.
        let _ = self.tx.send(message);
    }
}

/// Session-side receiving end.
#[derive(Debug)]
pub struct ReporterStream {
    rx: mpsc::UnboundedReceiver<ReporterMessage>,
}

impl ReporterStream {
    /// Next message, or `None` once every [`Reporter`] is dropped.
    pub async fn recv(&mut self) -> Option<ReporterMessage> {
        self.rx.recv().await
    }
}

/// Creates a connected reporter pair.
#[must_use]
pub fn channel() -> (Reporter, ReporterStream) {
    let (tx, rx) = mpsc::unbounded_channel();
    (Reporter { tx }, ReporterStream { rx })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn wire_names_match_json_logger() {
        let msg = ReporterMessage::BuildSuccess {
            bundles: vec![BundleInfo {
                file_path: "/app/dist/index.js".into(),
                size: 10,
                time: 1,
            }],
            build_time: 5,
        };
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["type"], "buildSuccess");
        assert_eq!(value["buildTime"], 5);
        assert_eq!(value["bundles"][0]["filePath"], "/app/dist/index.js");

        let failure: ReporterMessage = serde_json::from_value(json!({
            "type": "buildFailure",
            "message": [{"message": "bad"}]
        }))
        .unwrap();
        assert!(failure.is_build_result());
    }

    #[tokio::test]
    async fn both_slots_feed_one_stream() {
        let (reporter, mut stream) = channel();
        reporter.stdout(ReporterMessage::Log {
            level: "info".into(),
            message: "hi".into(),
        });
        reporter.stderr(ReporterMessage::BuildFailure { message: vec![] });
        reporter.sourcemap(json!({"a": 1}));
        drop(reporter);

        assert!(!stream.recv().await.unwrap().is_build_result());
        assert!(stream.recv().await.unwrap().is_build_result());
        assert!(matches!(
            stream.recv().await,
            Some(ReporterMessage::Sourcemap { .. })
        ));
        assert!(stream.recv().await.is_none());
    }

    #[test]
    fn send_after_teardown_is_silent() {
        let (reporter, stream) = channel();
        drop(stream);
        reporter.stdout(ReporterMessage::BuildFailure { message: vec![] });
    }
}
