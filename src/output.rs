//! Wire shapes returned to clients.

use crate::error::Classified;
use serde::{Deserialize, Serialize};

/// Successful pipeline result (HTTP 200).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineResponse {
    /// The trimmed summary text.
    pub summary: String,
    /// Model identifier the summary was requested from.
    pub model: String,
    /// Length of the extracted (trimmed) text in UTF-16 code units, counted
    /// before truncation.
    pub input_chars: usize,
    /// Wall-clock milliseconds spent in the summarization step only.
    pub duration_ms: u64,
}

/// Failure body, always paired with the status from the classifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

impl From<&Classified> for ErrorBody {
    fn from(c: &Classified) -> Self {
        Self {
            code: c.code.as_str().to_string(),
            message: c.message.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_uses_camel_case() {
        let r = PipelineResponse {
            summary: "Point A.".into(),
            model: "gemini-2.5-flash".into(),
            input_chars: 42,
            duration_ms: 7,
        };
        let v = serde_json::to_value(&r).unwrap();
        assert_eq!(
            v,
            serde_json::json!({
                "summary": "Point A.",
                "model": "gemini-2.5-flash",
                "inputChars": 42,
                "durationMs": 7,
            })
        );
    }
}
