//! Progress-callback trait for pipeline stage events.
//!
//! Inject an [`Arc<dyn SummaryProgressCallback>`] via
//! [`crate::service::SummaryService::with_progress`] to observe a request as
//! it moves through the gate, extraction and summarization. The CLI uses it
//! to drive its spinner.
//!
//! # Example
//!
//! ```rust
//! use pdf_summarizer::SummaryProgressCallback;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//!
//! struct CharCounter(AtomicUsize);
//!
//! impl SummaryProgressCallback for CharCounter {
//!     fn on_text_extracted(&self, input_chars: usize) {
//!         self.0.store(input_chars, Ordering::SeqCst);
//!     }
//! }
//! ```

/// Called by [`crate::service::SummaryService`] at each stage boundary.
///
/// All methods have no-op defaults. Requests run concurrently on the server,
/// so implementations guard shared state themselves.
pub trait SummaryProgressCallback: Send + Sync {
    /// The upload passed the gate.
    fn on_upload_accepted(&self, bytes: usize) {
        let _ = bytes;
    }

    /// Text extraction produced `input_chars` characters.
    fn on_text_extracted(&self, input_chars: usize) {
        let _ = input_chars;
    }

    /// The upstream call is about to be made.
    fn on_summary_start(&self, model: &str) {
        let _ = model;
    }

    /// The summary is ready.
    fn on_summary_complete(&self, duration_ms: u64) {
        let _ = duration_ms;
    }

    /// The request failed with the given client-facing code.
    fn on_failure(&self, code: &str, message: &str) {
        let _ = (code, message);
    }
}
