//! Pipeline stages for PDF summarization.
//!
//! ## Data Flow
//!
//! ```text
//! gate ──▶ extract ──▶ summarize
//! (bytes)   (PDFium)    (LLM, deadline)
//! ```
//!
//! 1. [`gate`]: admit or reject the raw upload; signature over declared type
//! 2. [`extract`]: PDF bytes to trimmed, non-empty text; runs in
//!    `spawn_blocking` because PDFium is synchronous
//! 3. [`summarize`]: build the prompt, race the backend against the
//!    deadline and normalize whatever shape it answers with

pub mod extract;
pub mod gate;
pub mod summarize;
