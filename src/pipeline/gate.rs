//! Input gate: decide whether an upload may enter the pipeline.
//!
//! The byte signature is authoritative: a payload that does not start with
//! `%PDF-` never passes. The declared content type can only narrow that. A
//! client that names a type other than `application/pdf` or the generic
//! `application/octet-stream` is turned away even when the bytes look right.

use crate::error::{describe_limit, SummarizeError};
use tracing::debug;

/// Every PDF starts with these five bytes.
pub const PDF_SIGNATURE: &[u8; 5] = b"%PDF-";

/// Media type a well-behaved client declares for a PDF.
pub const PDF_MEDIA_TYPE: &str = "application/pdf";

/// Generic binary type some clients send when they don't know better.
pub const OCTET_STREAM_MEDIA_TYPE: &str = "application/octet-stream";

/// A payload that passed the gate.
#[derive(Debug, Clone)]
pub struct UploadedDocument {
    /// Raw bytes, starting with [`PDF_SIGNATURE`].
    pub bytes: Vec<u8>,
    /// Content type the client declared, if any. Untrusted.
    pub declared_type: Option<String>,
    /// Original filename, if any. Used for logging only.
    pub file_name: Option<String>,
}

impl UploadedDocument {
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// An upload as received from the transport, before validation.
#[derive(Debug, Clone, Default)]
pub struct RawUpload {
    pub bytes: Vec<u8>,
    pub declared_type: Option<String>,
    pub file_name: Option<String>,
}

/// Validate an upload.
///
/// Order of checks: presence, size ceiling, declared type, signature. A
/// payload exactly `max_bytes` long is accepted.
pub fn admit(
    upload: Option<RawUpload>,
    max_bytes: usize,
) -> Result<UploadedDocument, SummarizeError> {
    let upload = match upload {
        Some(u) if !u.bytes.is_empty() => u,
        _ => return Err(SummarizeError::MissingFile),
    };

    if upload.bytes.len() > max_bytes {
        return Err(SummarizeError::PayloadTooLarge { limit: max_bytes });
    }

    let declared_ok = upload
        .declared_type
        .as_deref()
        .is_none_or(is_accepted_media_type);
    if !declared_ok || !has_pdf_signature(&upload.bytes) {
        debug!(
            declared = upload.declared_type.as_deref().unwrap_or("<none>"),
            "upload is not a PDF"
        );
        let magic = upload.bytes.iter().take(PDF_SIGNATURE.len()).copied().collect();
        return Err(SummarizeError::NotAPdf { magic });
    }

    debug!(
        bytes = upload.bytes.len(),
        file = upload.file_name.as_deref().unwrap_or("<unnamed>"),
        "upload admitted"
    );

    Ok(UploadedDocument {
        bytes: upload.bytes,
        declared_type: upload.declared_type,
        file_name: upload.file_name,
    })
}

/// Whether `bytes` begins with the literal `%PDF-` signature.
pub fn has_pdf_signature(bytes: &[u8]) -> bool {
    bytes.starts_with(PDF_SIGNATURE)
}

/// `type/subtype` without parameters, e.g. `application/pdf` from
/// `Application/PDF; charset=binary`.
fn essence(declared: &str) -> &str {
    declared.split(';').next().unwrap_or_default().trim()
}

fn is_pdf_media_type(declared: &str) -> bool {
    essence(declared).eq_ignore_ascii_case(PDF_MEDIA_TYPE)
}

fn is_accepted_media_type(declared: &str) -> bool {
    is_pdf_media_type(declared) || essence(declared).eq_ignore_ascii_case(OCTET_STREAM_MEDIA_TYPE)
}

/// Why a client-side pre-check turned a file down.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrecheckRejection {
    /// The declared type is not `application/pdf`.
    NotPdf,
    /// The declared size is above the ceiling.
    TooLarge { limit: usize },
}

impl PrecheckRejection {
    /// User-facing explanation.
    pub fn message(&self) -> String {
        match self {
            PrecheckRejection::NotPdf => "Only PDF files are allowed".to_string(),
            PrecheckRejection::TooLarge { limit } => {
                format!("File is too large (max {})", describe_limit(*limit))
            }
        }
    }
}

/// Cheap client-side check on declared metadata, before any bytes are sent.
///
/// Informational only: the server never trusts it and always runs [`admit`].
pub fn precheck(
    declared_type: &str,
    declared_size: u64,
    max_bytes: usize,
) -> Result<(), PrecheckRejection> {
    if !is_pdf_media_type(declared_type) {
        return Err(PrecheckRejection::NotPdf);
    }
    if declared_size > max_bytes as u64 {
        return Err(PrecheckRejection::TooLarge { limit: max_bytes });
    }
    Ok(())
}
