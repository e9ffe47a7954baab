//! # pdf-summarizer
//!
//! Upload a PDF, get a short model-written summary back.
//!
//! ## Pipeline Overview
//!
//! ```text
//! multipart upload
//!  │
//!  ├─ 1. Gate       presence, size ceiling, `%PDF-` signature
//!  ├─ 2. Extract    PDFium text extraction (spawn_blocking)
//!  ├─ 3. Summarize  prompt + head-truncated text, raced against a deadline
//!  └─ 4. Respond    { summary, model, inputChars, durationMs }
//! ```
//!
//! Any failure becomes a JSON `{ code, message }` with a stable `code`; see
//! [`error::ErrorCode`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdf_summarizer::{RawUpload, SummarizerConfig, SummaryService};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // GEMINI_API_KEY, GEMINI_MODEL, GEMINI_TIMEOUT_MS, …
//!     let config = SummarizerConfig::from_env()?;
//!     let service = SummaryService::from_config(&config)?;
//!
//!     let bytes = std::fs::read("report.pdf")?;
//!     let upload = RawUpload { bytes, ..Default::default() };
//!     let response = service.run(Some(upload)).await?;
//!     println!("{}", response.summary);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf-summarizer` binary (clap + anyhow + indicatif + tracing-subscriber) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod backend;
pub mod config;
pub mod engine;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod server;
pub mod service;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{BackendKind, SummarizerConfig, SummarizerConfigBuilder};
pub use error::{Classified, ErrorCode, SummarizeError, UpstreamError};
pub use output::{ErrorBody, PipelineResponse};
pub use pipeline::extract::{PdfiumExtractor, TextExtractor};
pub use pipeline::gate::{RawUpload, UploadedDocument};
pub use pipeline::summarize::{ModelReply, Summarizer, SummaryBackend};
pub use progress::SummaryProgressCallback;
pub use server::{build_router, serve};
pub use service::SummaryService;
