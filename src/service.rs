//! The request pipeline: gate → extract → summarize → response.
//!
//! [`SummaryService`] is transport-agnostic. The HTTP handler and the CLI both
//! hand it a [`RawUpload`] and get back either a [`PipelineResponse`] or a
//! [`SummarizeError`] for the classifier. Each call is independent; nothing
//! is cached between requests.

use crate::backend::build_backend;
use crate::config::SummarizerConfig;
use crate::error::SummarizeError;
use crate::output::PipelineResponse;
use crate::pipeline::extract::{extract_text, PdfiumExtractor, TextExtractor};
use crate::pipeline::gate::{admit, RawUpload};
use crate::pipeline::summarize::{whole_millis, Summarizer};
use crate::progress::SummaryProgressCallback;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Runs one upload through the whole pipeline.
#[derive(Clone)]
pub struct SummaryService {
    extractor: Arc<dyn TextExtractor>,
    summarizer: Summarizer,
    max_upload_bytes: usize,
    progress: Option<Arc<dyn SummaryProgressCallback>>,
}

impl std::fmt::Debug for SummaryService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SummaryService")
            .field("summarizer", &self.summarizer)
            .field("max_upload_bytes", &self.max_upload_bytes)
            .field("progress", &self.progress.as_ref().map(|_| "<callback>"))
            .finish()
    }
}

impl SummaryService {
    pub fn new(
        extractor: Arc<dyn TextExtractor>,
        summarizer: Summarizer,
        max_upload_bytes: usize,
    ) -> Self {
        Self {
            extractor,
            summarizer,
            max_upload_bytes,
            progress: None,
        }
    }

    /// PDFium extraction plus the backend named in `config`.
    pub fn from_config(config: &SummarizerConfig) -> Result<Self, SummarizeError> {
        let backend = build_backend(config)?;
        let summarizer = Summarizer::new(
            backend,
            config.model.clone(),
            config.timeout,
            config.max_input_chars,
        );
        Ok(Self::new(
            Arc::new(PdfiumExtractor),
            summarizer,
            config.max_upload_bytes,
        ))
    }

    pub fn with_progress(mut self, callback: Arc<dyn SummaryProgressCallback>) -> Self {
        self.progress = Some(callback);
        self
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_bytes
    }

    pub fn model(&self) -> &str {
        self.summarizer.model()
    }

    /// Process one upload.
    ///
    /// `durationMs` covers the summarization call only; gate and extraction
    /// time are excluded.
    pub async fn run(&self, upload: Option<RawUpload>) -> Result<PipelineResponse, SummarizeError> {
        let result = self.run_stages(upload).await;
        if let Err(e) = &result {
            let classified = e.classify();
            warn!(code = %classified.code, error = %e, "summarize request failed");
            if let Some(cb) = &self.progress {
                cb.on_failure(classified.code.as_str(), &classified.message);
            }
        }
        result
    }

    async fn run_stages(
        &self,
        upload: Option<RawUpload>,
    ) -> Result<PipelineResponse, SummarizeError> {
        let doc = admit(upload, self.max_upload_bytes)?;
        if let Some(cb) = &self.progress {
            cb.on_upload_accepted(doc.len());
        }

        let text = extract_text(self.extractor.as_ref(), doc).await?;
        // UTF-16 code units, the unit browser clients count string length in.
        let input_chars = text.encode_utf16().count();
        debug!(input_chars, "extraction done");
        if let Some(cb) = &self.progress {
            cb.on_text_extracted(input_chars);
            cb.on_summary_start(self.summarizer.model());
        }

        let started = Instant::now();
        let result = self.summarizer.summarize(&text).await?;
        let duration_ms = whole_millis(started.elapsed());

        info!(
            model = %result.model,
            input_chars,
            duration_ms,
            "summary ready"
        );
        if let Some(cb) = &self.progress {
            cb.on_summary_complete(duration_ms);
        }

        Ok(PipelineResponse {
            summary: result.summary,
            model: result.model,
            input_chars,
            duration_ms,
        })
    }
}
