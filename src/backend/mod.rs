//! Concrete [`SummaryBackend`] implementations.
//!
//! * [`gemini`]: Google Gemini `generateContent` over REST (default).
//! * [`provider`]: any provider the edgequake factory knows (`openai`,
//!   `anthropic`, `ollama`, …), selected with `SUMMARIZER_BACKEND`.

pub mod gemini;
pub mod provider;

use crate::config::{BackendKind, SummarizerConfig};
use crate::error::SummarizeError;
use crate::pipeline::summarize::SummaryBackend;
use std::sync::Arc;
use tracing::info;

pub use gemini::GeminiBackend;
pub use provider::ProviderBackend;

/// Build the backend selected by `config.backend`.
///
/// Never fails on missing credentials: those are reported per request so the
/// server can start without them.
pub fn build_backend(config: &SummarizerConfig) -> Result<Arc<dyn SummaryBackend>, SummarizeError> {
    info!(backend = %config.backend, model = %config.model, "summarization backend selected");
    let backend: Arc<dyn SummaryBackend> = match &config.backend {
        BackendKind::Gemini => Arc::new(GeminiBackend::new(
            config.api_key.clone(),
            config.gemini_base_url.clone(),
        )?),
        BackendKind::Provider(name) => Arc::new(ProviderBackend::new(name, &config.model)),
    };
    Ok(backend)
}
