//! Line/column diagnostics → linear offsets.
//!
//! The engine reports positions as 1-based (line, column) pairs; editors
//! want a character offset into the file. For a highlight at
//! (line, column):
//!
//! ```text
//! offset = nth_index(text, '\n', line - 1) + column
//! ```
//!
//! where `nth_index` is −1 for line 1. With `"a\nbb\nccc"`, line 2
//! column 1 gives `1 + 1 = 2`.

use super::result::{DiagnosticMap, EditorDiagnostic, Severity};
use crate::fs::FileSystem;
use crate::paths;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Source label used when a diagnostic has no origin.
const DEFAULT_SOURCE: &str = "info";

/// A 1-based position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    /// 1-based line.
    pub line: u32,
    /// Column, added verbatim to the line's start offset.
    pub column: u32,
}

impl Position {
    /// Creates a position.
    #[must_use]
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

/// A highlighted span inside a code frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeHighlight {
    /// Span start.
    pub start: Position,
    /// Span end.
    pub end: Position,
    /// Highlight-specific message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Source excerpt attached to a diagnostic.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeFrame {
    /// Full file text, if the engine captured it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Highlighted spans.
    #[serde(default)]
    pub code_highlights: Vec<CodeHighlight>,
}

/// A diagnostic as emitted by the build engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    /// Human-readable message.
    pub message: String,
    /// Component that produced it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
    /// Working-root path of the affected file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    /// Source excerpt with highlights.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_frame: Option<CodeFrame>,
}

impl Diagnostic {
    /// Creates a diagnostic with only a message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            origin: None,
            file_path: None,
            code_frame: None,
        }
    }

    /// Sets the origin.
    #[must_use]
    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    /// Sets the file path.
    #[must_use]
    pub fn with_file_path(mut self, path: impl Into<String>) -> Self {
        self.file_path = Some(path.into());
        self
    }

    /// Sets the code frame.
    #[must_use]
    pub fn with_code_frame(mut self, frame: CodeFrame) -> Self {
        self.code_frame = Some(frame);
        self
    }
}

/// Character index of the `n`-th occurrence of `pat` in `text`.
///
/// Returns −1 when `n` is zero or there are fewer than `n` occurrences.
///
/// ```
/// use weft_runtime::orchestrator::nth_index;
///
/// assert_eq!(nth_index("a\nbb\nccc", '\n', 0), -1);
/// assert_eq!(nth_index("a\nbb\nccc", '\n', 1), 1);
/// assert_eq!(nth_index("a\nbb\nccc", '\n', 2), 4);
/// assert_eq!(nth_index("a\nbb\nccc", '\n', 3), -1);
/// ```
#[must_use]
pub fn nth_index(text: &str, pat: char, n: usize) -> i64 {
    if n == 0 {
        return -1;
    }
    text.chars()
        .enumerate()
        .filter(|(_, c)| *c == pat)
        .nth(n - 1)
        .and_then(|(i, _)| i64::try_from(i).ok())
        .unwrap_or(-1)
}

fn offset(text: &str, pos: Position) -> u64 {
    let line_start = nth_index(text, '\n', pos.line.saturating_sub(1) as usize);
    u64::try_from(line_start + i64::from(pos.column)).unwrap_or(0)
}

/// Converts engine diagnostics into offset-addressed editor diagnostics
/// grouped by caller-facing path.
///
/// Text comes from the code frame when present, otherwise it is read
/// fresh from `fs`. A file that cannot be read is treated as empty.
pub async fn translate_diagnostics(
    fs: &dyn FileSystem,
    diagnostics: &[Diagnostic],
) -> DiagnosticMap {
    let mut grouped = DiagnosticMap::new();

    for diagnostic in diagnostics {
        let file_path = diagnostic.file_path.as_deref().unwrap_or("");
        let source = diagnostic
            .origin
            .clone()
            .unwrap_or_else(|| DEFAULT_SOURCE.to_string());
        let list = grouped.entry(paths::to_asset_path(file_path)).or_default();

        let Some(frame) = &diagnostic.code_frame else {
            list.push(EditorDiagnostic {
                from: 0,
                to: 0,
                severity: Severity::Error,
                source,
                message: diagnostic.message.clone(),
            });
            continue;
        };

        let text = match &frame.code {
            Some(code) => code.clone(),
            None => read_source(fs, file_path).await,
        };

        for highlight in &frame.code_highlights {
            list.push(EditorDiagnostic {
                from: offset(&text, highlight.start),
                to: offset(&text, highlight.end),
                severity: Severity::Error,
                source: source.clone(),
                message: highlight
                    .message
                    .clone()
                    .unwrap_or_else(|| diagnostic.message.clone()),
            });
        }
    }

    grouped
}

async fn read_source(fs: &dyn FileSystem, file_path: &str) -> String {
    let path = paths::resolve(paths::APP_DIR, file_path);
    match fs.read_to_string(&path).await {
        Ok(text) => text,
        Err(e) => {
            warn!(path = %path, error = %e, "diagnostic source unreadable");
            String::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MemoryFs;

    fn frame(code: Option<&str>, highlights: Vec<CodeHighlight>) -> CodeFrame {
        CodeFrame {
            code: code.map(str::to_string),
            code_highlights: highlights,
        }
    }

    fn span(sl: u32, sc: u32, el: u32, ec: u32) -> CodeHighlight {
        CodeHighlight {
            start: Position::new(sl, sc),
            end: Position::new(el, ec),
            message: None,
        }
    }

    #[test]
    fn nth_index_counts_chars_not_bytes() {
        assert_eq!(nth_index("é\nx", '\n', 1), 1);
        assert_eq!(nth_index("", '\n', 1), -1);
    }

    #[tokio::test]
    async fn offsets_from_code_frame() {
        let fs = MemoryFs::new();
        let diag = Diagnostic::new("boom")
            .with_file_path("/app/index.js")
            .with_code_frame(frame(Some("a\nbb\nccc"), vec![span(2, 1, 2, 2)]));

        let out = translate_diagnostics(&fs, &[diag]).await;

        let list = &out["/index.js"];
        assert_eq!(list.len(), 1);
        assert_eq!((list[0].from, list[0].to), (2, 3));
        assert_eq!(list[0].source, "info");
        assert_eq!(list[0].message, "boom");
        assert_eq!(list[0].severity, Severity::Error);
    }

    #[tokio::test]
    async fn first_line_offset_is_column_minus_one() {
        let fs = MemoryFs::new();
        let diag = Diagnostic::new("x")
            .with_file_path("/app/a.js")
            .with_code_frame(frame(Some("abc"), vec![span(1, 1, 1, 3)]));
        let out = translate_diagnostics(&fs, &[diag]).await;
        assert_eq!((out["/a.js"][0].from, out["/a.js"][0].to), (0, 2));
    }

    #[tokio::test]
    async fn reads_file_when_frame_has_no_code() {
        let fs = MemoryFs::new();
        fs.mkdirp("/app").await.unwrap();
        fs.write("/app/index.js", "x\ny\nz").await.unwrap();

        let diag = Diagnostic::new("x")
            .with_origin("weft-transformer-js")
            .with_file_path("index.js")
            .with_code_frame(frame(None, vec![span(3, 1, 3, 1)]));
        let out = translate_diagnostics(&fs, &[diag]).await;

        let d = &out["index.js"][0];
        assert_eq!(d.from, 4);
        assert_eq!(d.source, "weft-transformer-js");
    }

    #[tokio::test]
    async fn highlight_message_overrides_diagnostic_message() {
        let fs = MemoryFs::new();
        let mut hl = span(1, 1, 1, 1);
        hl.message = Some("here".into());
        let diag = Diagnostic::new("outer")
            .with_file_path("/app/a.js")
            .with_code_frame(frame(Some("a"), vec![hl, span(1, 1, 1, 1)]));
        let out = translate_diagnostics(&fs, &[diag]).await;

        let messages: Vec<_> = out["/a.js"].iter().map(|d| d.message.as_str()).collect();
        assert_eq!(messages, vec!["here", "outer"]);
    }

    #[tokio::test]
    async fn no_code_frame_yields_zero_marker() {
        let fs = MemoryFs::new();
        let diags = vec![
            Diagnostic::new("first").with_file_path("/app/a.js"),
            Diagnostic::new("no file"),
            Diagnostic::new("second").with_file_path("/app/a.js"),
        ];
        let out = translate_diagnostics(&fs, &diags).await;

        assert_eq!(out.len(), 2);
        let a: Vec<_> = out["/a.js"]
            .iter()
            .map(|d| (d.from, d.to, d.message.as_str()))
            .collect();
        assert_eq!(a, vec![(0, 0, "first"), (0, 0, "second")]);
        assert_eq!(out[""][0].message, "no file");
    }

    #[tokio::test]
    async fn unreadable_source_clamps_to_zero() {
        let fs = MemoryFs::new();
        let diag = Diagnostic::new("x")
            .with_file_path("/app/missing.js")
            .with_code_frame(frame(None, vec![span(5, 0, 5, 0)]));
        let out = translate_diagnostics(&fs, &[diag]).await;
        assert_eq!((out["/missing.js"][0].from, out["/missing.js"][0].to), (0, 0));
    }
}
