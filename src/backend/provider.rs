//! Backends from the edgequake provider factory.
//!
//! The provider is instantiated once, when the service is built. The factory
//! reads the provider's own key variable (`OPENAI_API_KEY`, …). If that
//! fails the reason is kept and every request reports it as a configuration
//! problem, so the server still starts and serves `/api/health`.

use crate::error::UpstreamError;
use crate::pipeline::summarize::{ModelReply, SummaryBackend};
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, LlmError, ProviderFactory};
use futures::future::BoxFuture;
use std::sync::Arc;
use tracing::{debug, warn};

/// Sampling temperature for summaries.
const TEMPERATURE: f32 = 0.2;

/// A [`SummaryBackend`] wrapping an edgequake [`LLMProvider`].
pub struct ProviderBackend {
    name: String,
    provider: Result<Arc<dyn LLMProvider>, String>,
}

impl std::fmt::Debug for ProviderBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderBackend")
            .field("name", &self.name)
            .field("ready", &self.provider.is_ok())
            .finish()
    }
}

impl ProviderBackend {
    /// Create the named provider for `model` via [`ProviderFactory::create_llm_provider`].
    pub fn new(name: &str, model: &str) -> Self {
        let provider = ProviderFactory::create_llm_provider(name, model).map_err(|e| {
            warn!(provider = name, error = %e, "provider could not be created");
            format!("provider '{name}' is not configured: {e}")
        });
        Self {
            name: name.to_string(),
            provider,
        }
    }

    /// Wrap an already configured provider.
    pub fn with_provider(name: impl Into<String>, provider: Arc<dyn LLMProvider>) -> Self {
        Self {
            name: name.into(),
            provider: Ok(provider),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_ready(&self) -> bool {
        self.provider.is_ok()
    }

    async fn call(&self, prompt: &str, model: &str) -> Result<ModelReply, UpstreamError> {
        let provider = self
            .provider
            .as_ref()
            .map_err(|reason| UpstreamError::Unavailable(reason.clone()))?;

        let messages = [ChatMessage::user(prompt)];
        let options = CompletionOptions {
            temperature: Some(TEMPERATURE),
            ..Default::default()
        };

        let response = provider
            .chat(&messages, Some(&options))
            .await
            .map_err(upstream_error)?;

        debug!(
            provider = %self.name,
            model,
            input_tokens = response.prompt_tokens,
            output_tokens = response.completion_tokens,
            "provider answered"
        );
        Ok(ModelReply::Text(response.content))
    }
}

impl SummaryBackend for ProviderBackend {
    fn generate<'a>(
        &'a self,
        prompt: &'a str,
        model: &'a str,
    ) -> BoxFuture<'a, Result<ModelReply, UpstreamError>> {
        Box::pin(self.call(prompt, model))
    }
}

/// Sort a provider failure into the buckets the error classifier knows.
fn upstream_error(e: LlmError) -> UpstreamError {
    let message = e.to_string();
    match e {
        LlmError::Timeout => UpstreamError::TimedOut(message),
        LlmError::AuthError(_) | LlmError::ConfigError(_) => UpstreamError::Unavailable(message),
        _ => UpstreamError::Other(message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use edgequake_llm::MockProvider;

    #[tokio::test]
    async fn wrapped_provider_answers_as_text() {
        let mock = MockProvider::new();
        mock.add_response("a short summary").await;
        let backend = ProviderBackend::with_provider("mock", Arc::new(mock));
        assert!(backend.is_ready());
        assert_eq!(backend.name(), "mock");

        match backend.generate("p", "m").await.unwrap() {
            ModelReply::Text(text) => assert_eq!(text, "a short summary"),
            _ => panic!("expected a text reply"),
        }
    }

    #[test]
    fn provider_timeout_is_an_ai_timeout() {
        let err = upstream_error(LlmError::Timeout);
        assert!(matches!(err, UpstreamError::TimedOut(_)));

        let classified = err.into_request_error(30_000).classify();
        assert_eq!(classified.code, ErrorCode::AiTimeout);
        assert_eq!(classified.status.as_u16(), 504);
    }

    #[test]
    fn provider_auth_and_config_failures_are_configuration_errors() {
        for e in [
            LlmError::AuthError("bad key".into()),
            LlmError::ConfigError("OPENAI_API_KEY not set".into()),
        ] {
            let classified = upstream_error(e).into_request_error(30_000).classify();
            assert_eq!(classified.code, ErrorCode::ConfigurationError);
            assert_eq!(classified.status.as_u16(), 500);
        }
    }

    #[test]
    fn other_provider_failures_stay_upstream() {
        let classified = upstream_error(LlmError::RateLimited("slow down".into()))
            .into_request_error(30_000)
            .classify();
        assert_eq!(classified.code, ErrorCode::AiUpstreamError);
        assert!(classified.message.contains("slow down"));
    }

    #[tokio::test]
    async fn construction_failure_is_reported_per_request() {
        let backend = ProviderBackend {
            name: "nowhere".into(),
            provider: Err("provider 'nowhere' is not configured: unknown".into()),
        };
        assert!(!backend.is_ready());

        let err = backend.generate("p", "m").await.unwrap_err();
        match err {
            UpstreamError::Unavailable(reason) => assert!(reason.contains("nowhere")),
            other => panic!("unexpected: {other:?}"),
        }
    }
}
