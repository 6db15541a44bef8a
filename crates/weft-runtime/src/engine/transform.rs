//! Worker-side transform job.

use crate::orchestrator::{CodeFrame, CodeHighlight, Diagnostic, Position};
use crate::pool::{JobHandler, WorkerContext};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::trace;

/// Bus event published by a worker after each transform, with the
/// transformed path as its only argument.
pub const TRANSFORMED_EVENT: &str = "transformed";

/// Origin label on transform diagnostics.
pub const TRANSFORM_ORIGIN: &str = "weft-transformer-js";

/// One transform request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformJob {
    /// Working-root path of the source.
    pub path: String,
    /// Source text.
    pub source: String,
    /// Strip blank lines and indentation.
    #[serde(default)]
    pub minify: bool,
}

/// Transform result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformOutput {
    /// Transformed code, absent when diagnostics were raised.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Problems found in the source.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<Diagnostic>,
}

/// [`JobHandler`] that checks bracket balance and wraps the module.
#[derive(Debug, Clone, Copy, Default)]
pub struct TransformWorker;

#[async_trait]
impl JobHandler for TransformWorker {
    async fn handle(&self, job: Value, ctx: &WorkerContext) -> Result<Value, String> {
        let job: TransformJob =
            serde_json::from_value(job).map_err(|e| format!("invalid transform job: {e}"))?;
        trace!(worker_id = %ctx.id(), path = %job.path, "transforming");

        let output = transform(&job);
        ctx.bus().publish(TRANSFORMED_EVENT, vec![json!(job.path)]);
        serde_json::to_value(output).map_err(|e| e.to_string())
    }
}

/// Runs the transform in the calling task.
#[must_use]
pub fn transform(job: &TransformJob) -> TransformOutput {
    let diagnostics = check_brackets(&job.path, &job.source);
    if !diagnostics.is_empty() {
        return TransformOutput {
            code: None,
            diagnostics,
        };
    }

    let body = if job.minify {
        job.source
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    } else {
        job.source.trim_end_matches('\n').to_string()
    };

    TransformOutput {
        code: Some(format!("// {}\n{body}", job.path)),
        diagnostics: Vec::new(),
    }
}

fn check_brackets(path: &str, source: &str) -> Vec<Diagnostic> {
    let mut open: Vec<(char, Position)> = Vec::new();
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut comment = false;
    let (mut line, mut column) = (1u32, 0u32);
    let mut prev = '\0';

    let diagnostic = |message: String, pos: Position| {
        Diagnostic::new(message.clone())
            .with_origin(TRANSFORM_ORIGIN)
            .with_file_path(path)
            .with_code_frame(CodeFrame {
                code: Some(source.to_string()),
                code_highlights: vec![CodeHighlight {
                    start: pos,
                    end: pos,
                    message: Some(message),
                }],
            })
    };

    for c in source.chars() {
        if c == '\n' {
            line += 1;
            column = 0;
            comment = false;
            prev = c;
            continue;
        }
        column += 1;
        let pos = Position::new(line, column);

        if comment {
            continue;
        }
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }

        match c {
            '"' | '\'' | '`' => quote = Some(c),
            '/' if prev == '/' => comment = true,
            '(' | '[' | '{' => open.push((c, pos)),
            ')' | ']' | '}' => match open.pop() {
                Some((o, _)) if closer(o) == c => {}
                _ => return vec![diagnostic(format!("Unexpected token `{c}`"), pos)],
            },
            _ => {}
        }
        prev = c;
    }

    match open.pop() {
        Some((o, pos)) => vec![diagnostic(format!("Unterminated `{o}`"), pos)],
        None => Vec::new(),
    }
}

fn closer(open: char) -> char {
    match open {
        '(' => ')',
        '[' => ']',
        _ => '}',
    }
}
