//! The instruction prompt sent ahead of the extracted PDF text.
//!
//! Keeping the prompt and the truncation bound here means the summary style
//! can be tuned without touching the deadline or error-handling logic in
//! [`crate::pipeline::summarize`].

/// Instruction prefix for every summarization request.
pub const SUMMARY_PROMPT: &str = "Summarize the following PDF text in 5–8 brief points. \
Be factual and concise, paying attention to details. At the very beginning, describe \
what this file is about and what information it contains.";

/// Upper bound on the number of characters of PDF text sent upstream.
///
/// Head-truncated: anything past the bound is dropped, with no attempt to
/// keep the tail of the document.
pub const MAX_INPUT_CHARS: usize = 120_000;

/// Cut `text` to at most `max_chars` characters, on a char boundary.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

/// Build the full prompt: instruction, blank line, (truncated) document text.
pub fn build_prompt(text: &str, max_chars: usize) -> String {
    format!("{SUMMARY_PROMPT}\n\n{}", truncate_chars(text, max_chars))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_untouched() {
        assert_eq!(truncate_chars("hello", 10), "hello");
        assert_eq!(truncate_chars("hello", 5), "hello");
    }

    #[test]
    fn truncation_is_head_only() {
        assert_eq!(truncate_chars("abcdef", 3), "abc");
    }

    #[test]
    fn truncation_respects_multibyte_chars() {
        // Each 'ż' is two bytes; slicing by bytes would panic.
        assert_eq!(truncate_chars("żżżż", 2), "żż");
    }

    #[test]
    fn prompt_starts_with_instruction() {
        let prompt = build_prompt("Body text", MAX_INPUT_CHARS);
        assert!(prompt.starts_with(SUMMARY_PROMPT));
        assert!(prompt.ends_with("\n\nBody text"));
    }

    #[test]
    fn prompt_body_is_bounded() {
        let long = "x".repeat(MAX_INPUT_CHARS + 500);
        let prompt = build_prompt(&long, MAX_INPUT_CHARS);
        assert_eq!(prompt.len(), SUMMARY_PROMPT.len() + 2 + MAX_INPUT_CHARS);
    }
}
