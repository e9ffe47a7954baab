//! Text extraction: admitted PDF bytes → non-empty text.
//!
//! The parser is a black box behind [`TextExtractor`]. Whatever it raises is
//! an opaque [`SummarizeError::ExtractionFailed`]; it is never re-tagged as a
//! validation problem. A document that parses but yields only whitespace
//! (typically a scanned, image-only PDF) is the distinct
//! [`SummarizeError::EmptyPdf`].

use crate::engine;
use crate::error::SummarizeError;
use crate::pipeline::gate::UploadedDocument;
use futures::future::BoxFuture;
use tracing::debug;

/// Something that turns PDF bytes into text.
pub trait TextExtractor: Send + Sync {
    /// Extract the concatenated text of every page.
    fn extract(&self, pdf: Vec<u8>) -> BoxFuture<'_, Result<String, SummarizeError>>;
}

/// Run the extractor and enforce the non-empty-text invariant.
///
/// Returns the trimmed text. Consumes the document: the upload buffer is
/// released as soon as the parser is done with it.
pub async fn extract_text(
    extractor: &dyn TextExtractor,
    doc: UploadedDocument,
) -> Result<String, SummarizeError> {
    let raw = extractor.extract(doc.bytes).await?;
    let text = raw.trim();
    if text.is_empty() {
        return Err(SummarizeError::EmptyPdf);
    }
    debug!(chars = text.chars().count(), "text extracted");
    Ok(text.to_string())
}

/// [`TextExtractor`] backed by PDFium.
///
/// Parsing runs in `spawn_blocking`: PDFium is a synchronous C library and
/// would otherwise stall a runtime worker for the whole document.
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfiumExtractor;

impl TextExtractor for PdfiumExtractor {
    fn extract(&self, pdf: Vec<u8>) -> BoxFuture<'_, Result<String, SummarizeError>> {
        Box::pin(async move {
            tokio::task::spawn_blocking(move || extract_blocking(&pdf))
                .await
                .map_err(|e| SummarizeError::Internal(format!("extraction task failed: {e}")))?
        })
    }
}

fn extract_blocking(pdf: &[u8]) -> Result<String, SummarizeError> {
    let pdfium = engine::pdfium().map_err(|e| SummarizeError::Internal(e.to_string()))?;

    let document = pdfium
        .load_pdf_from_byte_slice(pdf, None)
        .map_err(|e| SummarizeError::ExtractionFailed(format!("{e:?}")))?;

    let mut text = String::new();
    for (idx, page) in document.pages().iter().enumerate() {
        let page_text = page
            .text()
            .map_err(|e| SummarizeError::ExtractionFailed(format!("page {}: {e:?}", idx + 1)))?;
        if idx > 0 {
            text.push('\n');
        }
        text.push_str(&page_text.all());
    }
    Ok(text)
}
