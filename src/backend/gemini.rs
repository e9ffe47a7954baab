//! Google Gemini over its REST API.
//!
//! `POST {base}/models/{model}:generateContent` with a single user turn. The
//! key travels in the `x-goog-api-key` header. The raw JSON answer is handed
//! to the adapter as [`ModelReply::Structured`]; picking the text out of it
//! is not this module's job.

use crate::error::{SummarizeError, UpstreamError};
use crate::pipeline::summarize::{ModelReply, SummaryBackend};
use futures::future::BoxFuture;
use serde_json::{json, Value};
use tracing::debug;

/// Variable the key is read from; named in the missing-credential error.
pub const API_KEY_VAR: &str = "GEMINI_API_KEY";

const API_KEY_HEADER: &str = "x-goog-api-key";

/// Gemini `generateContent` client.
#[derive(Clone)]
pub struct GeminiBackend {
    client: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
}

impl std::fmt::Debug for GeminiBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiBackend")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl GeminiBackend {
    pub fn new(api_key: Option<String>, base_url: impl Into<String>) -> Result<Self, SummarizeError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("pdf-summarizer/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| SummarizeError::Internal(format!("HTTP client: {e}")))?;
        Ok(Self {
            client,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/models/{model}:generateContent", self.base_url)
    }

    async fn call(&self, prompt: &str, model: &str) -> Result<ModelReply, UpstreamError> {
        let key = self
            .api_key
            .as_deref()
            .ok_or_else(|| UpstreamError::MissingCredential {
                var: API_KEY_VAR.to_string(),
            })?;

        let body = json!({ "contents": [{ "parts": [{ "text": prompt }] }] });
        debug!(model, "POST generateContent");

        let response = self
            .client
            .post(self.endpoint(model))
            .header(API_KEY_HEADER, key)
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        let raw = response.bytes().await.map_err(transport_error)?;
        let payload = serde_json::from_slice::<Value>(&raw);

        if !status.is_success() {
            let message = payload
                .ok()
                .as_ref()
                .and_then(error_message)
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("error").to_string());
            return Err(UpstreamError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        payload
            .map(ModelReply::Structured)
            .map_err(|e| UpstreamError::Other(format!("invalid JSON from Gemini: {e}")))
    }
}

impl SummaryBackend for GeminiBackend {
    fn generate<'a>(
        &'a self,
        prompt: &'a str,
        model: &'a str,
    ) -> BoxFuture<'a, Result<ModelReply, UpstreamError>> {
        Box::pin(self.call(prompt, model))
    }
}

fn transport_error(e: reqwest::Error) -> UpstreamError {
    if e.is_timeout() {
        UpstreamError::TimedOut(e.to_string())
    } else {
        UpstreamError::Other(e.to_string())
    }
}

/// `{"error": {"message": "..."}}`, the shape Google APIs use for failures.
fn error_message(payload: &Value) -> Option<String> {
    payload
        .get("error")?
        .get("message")?
        .as_str()
        .map(str::to_string)
}
