//! Caller-facing build results.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use weft_types::ErrorCode;

/// One output bundle, read back from the working filesystem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bundle {
    /// Caller-facing path (`/dist/index.js`).
    pub name: String,
    /// Content with one trailing newline stripped.
    pub content: String,
    /// Size reported by the engine, in bytes.
    pub size: u64,
    /// Time the engine spent on this bundle, in milliseconds.
    pub time: u64,
}

/// A rendered graph dump.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Graph {
    /// Graph name.
    pub name: String,
    /// Rendered content.
    pub content: String,
}

/// Diagnostic severity. Everything the translator emits is an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Build-breaking problem.
    Error,
}

/// A diagnostic addressed by linear character offsets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditorDiagnostic {
    /// Start offset, in characters.
    pub from: u64,
    /// End offset, in characters.
    pub to: u64,
    /// Always [`Severity::Error`].
    pub severity: Severity,
    /// Origin label, `"info"` when the engine gave none.
    pub source: String,
    /// Human-readable message.
    pub message: String,
}

/// Diagnostics grouped by caller-facing path.
pub type DiagnosticMap = BTreeMap<String, Vec<EditorDiagnostic>>;

/// An error raised outside the structured result path, passed through
/// to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawError {
    /// Machine-readable code (see `weft_types::ErrorCode`).
    pub code: String,
    /// Display form of the error.
    pub message: String,
}

impl RawError {
    /// Captures an error's code and message.
    #[must_use]
    pub fn from_error<E: ErrorCode + std::fmt::Display>(err: &E) -> Self {
        Self {
            code: err.code().to_string(),
            message: err.to_string(),
        }
    }
}

/// Result of one build.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum BuildOutput {
    /// The engine produced bundles.
    #[serde(rename_all = "camelCase")]
    Success {
        /// Bundles sorted by name.
        bundles: Vec<Bundle>,
        /// Total build time in milliseconds.
        build_time: u64,
        /// Graph dumps, when requested.
        graphs: Option<Vec<Graph>>,
        /// Source-map visualization payload, when requested.
        sourcemaps: Option<Value>,
    },
    /// The build failed.
    #[serde(rename_all = "camelCase")]
    Failure {
        /// Translated diagnostics.
        diagnostics: DiagnosticMap,
        /// Error raised outside the structured path, if any.
        error: Option<RawError>,
    },
}

impl BuildOutput {
    /// Returns `true` for [`BuildOutput::Success`].
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Bundles of a successful build; empty for failures.
    #[must_use]
    pub fn bundles(&self) -> &[Bundle] {
        match self {
            Self::Success { bundles, .. } => bundles,
            Self::Failure { .. } => &[],
        }
    }

    /// Sourcemap visualization payload, when one was requested and sent.
    #[must_use]
    pub fn sourcemaps(&self) -> Option<&Value> {
        match self {
            Self::Success { sourcemaps, .. } => sourcemaps.as_ref(),
            Self::Failure { .. } => None,
        }
    }
}
