//! Error types and the failure classifier for the summarization pipeline.
//!
//! Two error types reflect two layers:
//!
//! * [`UpstreamError`]: raised by a [`crate::pipeline::summarize::SummaryBackend`].
//!   Backends tag what they can recognise at the point of detection (missing
//!   credentials, deadline, HTTP rejection) and fall back to
//!   [`UpstreamError::Other`] for anything else.
//!
//! * [`SummarizeError`]: the request-level failure. Every stage of the
//!   pipeline returns it, and [`SummarizeError::classify`] is the single
//!   place where a failure becomes an `(HTTP status, code, message)` triple.
//!
//! The `code` strings are a public contract: clients branch on them, so
//! they never change once shipped.

use axum::http::StatusCode;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use thiserror::Error;

/// All request-level failures of the upload → extract → summarize pipeline.
#[derive(Debug, Error)]
pub enum SummarizeError {
    // ── Validation ────────────────────────────────────────────────────────
    /// No `file` field was supplied, or it carried zero bytes.
    #[error("file is required and must be a PDF")]
    MissingFile,

    /// The payload does not start with the `%PDF-` signature.
    #[error("payload is not a PDF (first bytes: {magic:?})")]
    NotAPdf { magic: Vec<u8> },

    /// The upload exceeded the configured byte ceiling.
    #[error("upload exceeds {limit} bytes")]
    PayloadTooLarge { limit: usize },

    /// The multipart envelope itself could not be read.
    #[error("malformed upload: {0}")]
    MalformedUpload(String),

    // ── Extraction ────────────────────────────────────────────────────────
    /// The PDF parsed but contains no text (e.g. a scanned image-only PDF).
    #[error("no extractable text in PDF")]
    EmptyPdf,

    /// The PDF parser failed.
    #[error("text extraction failed: {0}")]
    ExtractionFailed(String),

    // ── Upstream ──────────────────────────────────────────────────────────
    /// The summarization backend cannot be used as configured.
    #[error("summarizer is not configured: {0}")]
    Configuration(String),

    /// The summarization call did not settle before the deadline.
    #[error("upstream model did not answer within {timeout_ms}ms")]
    AiTimeout { timeout_ms: u64 },

    /// The model answered, but the answer trimmed to nothing.
    #[error("empty summary from model")]
    EmptySummary,

    /// The model answered in a shape the adapter does not recognise.
    #[error("unrecognised reply from model: {0}")]
    UnrecognizedReply(String),

    /// Any other upstream failure. The message is preserved for the client.
    #[error("{0}")]
    Upstream(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error. Details are logged, never returned.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Failures reported by a summarization backend.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum UpstreamError {
    /// A credential the backend needs is absent.
    #[error("{var} is missing")]
    MissingCredential { var: String },

    /// The backend could not be constructed (unknown provider, bad model…).
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    /// The transport layer itself gave up waiting.
    #[error("request timed out: {0}")]
    TimedOut(String),

    /// The upstream API answered with a non-success status.
    #[error("upstream returned HTTP {status}: {message}")]
    Rejected { status: u16, message: String },

    /// Anything not recognised at the point of detection.
    #[error("{0}")]
    Other(String),
}

impl UpstreamError {
    /// Lift a backend failure into the request-level taxonomy.
    ///
    /// `timeout_ms` is the deadline the adapter was running under; a
    /// transport-level timeout is reported against it.
    pub fn into_request_error(self, timeout_ms: u64) -> SummarizeError {
        match self {
            UpstreamError::MissingCredential { .. } | UpstreamError::Unavailable(_) => {
                SummarizeError::Configuration(self.to_string())
            }
            UpstreamError::TimedOut(_) => SummarizeError::AiTimeout { timeout_ms },
            UpstreamError::Rejected { .. } | UpstreamError::Other(_) => {
                SummarizeError::Upstream(self.to_string())
            }
        }
    }
}

/// Stable, client-facing error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ValidationError,
    UnsupportedMediaType,
    PayloadTooLarge,
    EmptyPdf,
    ConfigurationError,
    AiTimeout,
    EmptySummary,
    AiUpstreamError,
    InternalError,
}

impl ErrorCode {
    /// The wire string, e.g. `"AI_TIMEOUT"`.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::ValidationError => "VALIDATION_ERROR",
            ErrorCode::UnsupportedMediaType => "UNSUPPORTED_MEDIA_TYPE",
            ErrorCode::PayloadTooLarge => "PAYLOAD_TOO_LARGE",
            ErrorCode::EmptyPdf => "EMPTY_PDF",
            ErrorCode::ConfigurationError => "CONFIGURATION_ERROR",
            ErrorCode::AiTimeout => "AI_TIMEOUT",
            ErrorCode::EmptySummary => "EMPTY_SUMMARY",
            ErrorCode::AiUpstreamError => "AI_UPSTREAM_ERROR",
            ErrorCode::InternalError => "INTERNAL_ERROR",
        }
    }

    /// The HTTP status paired with this code.
    pub fn status(self) -> StatusCode {
        match self {
            ErrorCode::ValidationError | ErrorCode::EmptyPdf => StatusCode::BAD_REQUEST,
            ErrorCode::UnsupportedMediaType => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ErrorCode::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ErrorCode::AiTimeout => StatusCode::GATEWAY_TIMEOUT,
            ErrorCode::EmptySummary | ErrorCode::AiUpstreamError => StatusCode::BAD_GATEWAY,
            ErrorCode::ConfigurationError | ErrorCode::InternalError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The outcome of classifying a [`SummarizeError`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classified {
    pub status: StatusCode,
    pub code: ErrorCode,
    pub message: String,
}

impl Classified {
    fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            status: code.status(),
            code,
            message: message.into(),
        }
    }
}

static RE_TIMEOUT_LIKE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)abort|timeout").expect("static regex"));

/// Whether an unclassified upstream message looks like a deadline failure.
///
/// Only consulted for [`SummarizeError::Upstream`]; every other category is
/// tagged where it is detected.
pub fn looks_like_timeout(message: &str) -> bool {
    RE_TIMEOUT_LIKE.is_match(message)
}

/// Human form of an upload ceiling: whole megabytes when it is at least one,
/// bytes otherwise, so a small ceiling never reads as `0MB`.
pub fn describe_limit(limit: usize) -> String {
    const MIB: usize = 1024 * 1024;
    if limit >= MIB {
        format!("{}MB", limit / MIB)
    } else {
        format!("{limit} bytes")
    }
}

impl SummarizeError {
    /// Map this failure to the `(status, code, message)` returned to clients.
    ///
    /// Total: every variant has exactly one classification. Messages never
    /// carry internal details; those stay in the server log.
    pub fn classify(&self) -> Classified {
        match self {
            SummarizeError::MissingFile => Classified::new(
                ErrorCode::ValidationError,
                "file is required and must be a PDF",
            ),
            SummarizeError::MalformedUpload(_) => {
                Classified::new(ErrorCode::ValidationError, "Malformed multipart upload")
            }
            SummarizeError::NotAPdf { .. } => {
                Classified::new(ErrorCode::UnsupportedMediaType, "File is not a valid PDF")
            }
            SummarizeError::PayloadTooLarge { limit } => Classified::new(
                ErrorCode::PayloadTooLarge,
                format!("File too large (max {})", describe_limit(*limit)),
            ),
            SummarizeError::EmptyPdf => {
                Classified::new(ErrorCode::EmptyPdf, "No extractable text in PDF")
            }
            SummarizeError::ExtractionFailed(_) => Classified::new(
                ErrorCode::AiUpstreamError,
                "Failed to extract text from PDF",
            ),
            SummarizeError::Configuration(msg) => {
                Classified::new(ErrorCode::ConfigurationError, msg.clone())
            }
            SummarizeError::AiTimeout { .. } => {
                Classified::new(ErrorCode::AiTimeout, "Upstream model timeout")
            }
            SummarizeError::EmptySummary => {
                Classified::new(ErrorCode::EmptySummary, "Empty summary from model")
            }
            SummarizeError::UnrecognizedReply(_) => Classified::new(
                ErrorCode::AiUpstreamError,
                "Unrecognised response from model",
            ),
            SummarizeError::Upstream(msg) if looks_like_timeout(msg) => {
                Classified::new(ErrorCode::AiTimeout, "Upstream model timeout")
            }
            SummarizeError::Upstream(msg) => {
                Classified::new(ErrorCode::AiUpstreamError, msg.clone())
            }
            SummarizeError::Internal(_) => {
                Classified::new(ErrorCode::InternalError, "Unexpected error")
            }
        }
    }
}
