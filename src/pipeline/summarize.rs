//! Summarization adapter: extracted text → non-empty summary, under a deadline.
//!
//! ## Deadline race
//!
//! The upstream call is spawned as its own task and raced against the
//! configured timeout. Whichever settles first decides the outcome. When the
//! deadline wins the task is aborted, so a late answer can never be observed:
//! the caller sees exactly one `AI_TIMEOUT`.
//!
//! ## Reply shapes
//!
//! Upstream APIs do not agree on what "the generated text" looks like. A
//! backend hands back a [`ModelReply`] and [`normalize_reply`] tries the
//! recognised shapes in a fixed order. A reply that matches none of them is
//! an explicit failure, never a stringified blob.

use crate::error::{SummarizeError, UpstreamError};
use crate::prompts::build_prompt;
use futures::future::BoxFuture;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// A value returned by an upstream model, before normalization.
pub enum ModelReply {
    /// Plain generated text.
    Text(String),
    /// A JSON document: a bare string, an object with a `text` string
    /// field, or a `generateContent`-style object with candidate parts.
    Structured(Value),
    /// A deferred accessor yielding another reply when called.
    Deferred(Box<dyn FnOnce() -> ModelReply + Send>),
}

impl fmt::Debug for ModelReply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelReply::Text(s) => f.debug_tuple("Text").field(s).finish(),
            ModelReply::Structured(v) => f.debug_tuple("Structured").field(v).finish(),
            ModelReply::Deferred(_) => f.write_str("Deferred(<fn>)"),
        }
    }
}

/// Accessors are unwrapped at most this many times.
const MAX_DEFERRED_DEPTH: usize = 4;

/// Coerce a reply into its generated text.
///
/// Order for structured replies: JSON string, `text` string field, `text`
/// object holding a string (one more level), then candidate parts. The
/// result is not trimmed here.
pub fn normalize_reply(mut reply: ModelReply) -> Result<String, SummarizeError> {
    for _ in 0..=MAX_DEFERRED_DEPTH {
        match reply {
            ModelReply::Text(text) => return Ok(text),
            ModelReply::Structured(value) => return text_from_value(&value),
            ModelReply::Deferred(accessor) => reply = accessor(),
        }
    }
    Err(SummarizeError::UnrecognizedReply(
        "deferred reply nested too deeply".into(),
    ))
}

fn text_from_value(value: &Value) -> Result<String, SummarizeError> {
    if let Some(s) = value.as_str() {
        return Ok(s.to_string());
    }
    match value.get("text") {
        Some(Value::String(s)) => return Ok(s.clone()),
        Some(inner @ Value::Object(_)) => {
            if let Some(s) = inner.get("text").and_then(Value::as_str) {
                return Ok(s.to_string());
            }
        }
        _ => {}
    }
    if let Some(text) = candidate_text(value) {
        return Ok(text);
    }
    Err(SummarizeError::UnrecognizedReply(describe_shape(value)))
}

/// Concatenate `candidates[0].content.parts[*].text`.
fn candidate_text(value: &Value) -> Option<String> {
    let parts = value
        .get("candidates")?
        .get(0)?
        .get("content")?
        .get("parts")?
        .as_array()?;
    let texts: Vec<&str> = parts
        .iter()
        .filter_map(|p| p.get("text").and_then(Value::as_str))
        .collect();
    if texts.is_empty() {
        None
    } else {
        Some(texts.concat())
    }
}

fn describe_shape(value: &Value) -> String {
    match value {
        Value::Object(map) => {
            let keys: Vec<&str> = map.keys().map(String::as_str).collect();
            format!("object with keys [{}]", keys.join(", "))
        }
        Value::Array(items) => format!("array of {} items", items.len()),
        Value::Null => "null".to_string(),
        Value::Bool(_) => "boolean".to_string(),
        Value::Number(_) => "number".to_string(),
        Value::String(_) => "string".to_string(),
    }
}

/// A remote model that turns a prompt into generated text.
pub trait SummaryBackend: Send + Sync {
    /// Generate a completion for `prompt` with `model`.
    ///
    /// Implementations check their own credentials before any network I/O
    /// and report them as [`UpstreamError::MissingCredential`].
    fn generate<'a>(
        &'a self,
        prompt: &'a str,
        model: &'a str,
    ) -> BoxFuture<'a, Result<ModelReply, UpstreamError>>;
}

/// A normalized, non-empty summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummarizationResult {
    pub summary: String,
    pub model: String,
}

/// The summarization adapter: prompt building, deadline race, normalization.
#[derive(Clone)]
pub struct Summarizer {
    backend: Arc<dyn SummaryBackend>,
    model: String,
    timeout: Duration,
    max_input_chars: usize,
}

impl fmt::Debug for Summarizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Summarizer")
            .field("backend", &"<dyn SummaryBackend>")
            .field("model", &self.model)
            .field("timeout", &self.timeout)
            .field("max_input_chars", &self.max_input_chars)
            .finish()
    }
}

impl Summarizer {
    pub fn new(
        backend: Arc<dyn SummaryBackend>,
        model: impl Into<String>,
        timeout: Duration,
        max_input_chars: usize,
    ) -> Self {
        Self {
            backend,
            model: model.into(),
            timeout,
            max_input_chars,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Summarize `text`, bounded by the configured deadline.
    pub async fn summarize(&self, text: &str) -> Result<SummarizationResult, SummarizeError> {
        let prompt = build_prompt(text, self.max_input_chars);
        let timeout_ms = whole_millis(self.timeout);
        debug!(
            prompt_chars = prompt.chars().count(),
            model = %self.model,
            timeout_ms,
            "calling summarization backend"
        );

        let backend = Arc::clone(&self.backend);
        let model = self.model.clone();
        let call = tokio::spawn(async move { backend.generate(&prompt, &model).await });
        let abort = call.abort_handle();

        let reply = match tokio::time::timeout(self.timeout, call).await {
            Err(_elapsed) => {
                abort.abort();
                warn!(timeout_ms, "summarization deadline exceeded");
                return Err(SummarizeError::AiTimeout { timeout_ms });
            }
            Ok(Err(join_err)) => {
                return Err(SummarizeError::Internal(format!(
                    "summarization task failed: {join_err}"
                )))
            }
            Ok(Ok(result)) => result.map_err(|e| e.into_request_error(timeout_ms))?,
        };

        let summary = normalize_reply(reply)?.trim().to_string();
        if summary.is_empty() {
            return Err(SummarizeError::EmptySummary);
        }

        Ok(SummarizationResult {
            summary,
            model: self.model.clone(),
        })
    }
}

/// Milliseconds in `d`, saturating at `u64::MAX`.
pub(crate) fn whole_millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
