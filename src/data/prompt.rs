// ============================================================
// Layer 4 — Prompt Builder
// ============================================================
// Builds the exact string handed to the T5 model:
//
//   "question: {question} context: {last N chars of context}"
//
// Only a trailing window of the document is used. For a long
// document everything before the window is invisible to the
// model on that turn; this is a fixed latency trade-off, not
// an adaptive one.
//
// The window is counted in chars (Unicode scalar values), so a
// multi-byte character is never split in half.
//
// Reference: Rust Book §8 (Storing UTF-8 Encoded Text with Strings)

/// Default number of trailing context characters kept in a prompt
pub const CONTEXT_WINDOW_CHARS: usize = 1000;

/// Return the last `max_chars` characters of `text`.
/// Returns the whole string when it is already short enough.
pub fn trailing_window(text: &str, max_chars: usize) -> &str {
    if max_chars == 0 {
        return "";
    }
    // char_indices().rev().nth(k) lands on the start of the
    // (k+1)-th character from the end
    match text.char_indices().rev().nth(max_chars - 1) {
        Some((start, _)) => &text[start..],
        None             => text,
    }
}

/// Assemble the model prompt from a question and the document context.
pub fn build_prompt(question: &str, context: &str, max_context_chars: usize) -> String {
    let trimmed = trailing_window(context, max_context_chars);
    format!("question: {question} context: {trimmed}")
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_context_is_kept_whole() {
        let prompt = build_prompt("What is this?", "Hello world", CONTEXT_WINDOW_CHARS);
        assert_eq!(prompt, "question: What is this? context: Hello world");
    }

    #[test]
    fn test_long_context_keeps_only_trailing_window() {
        // 500 'a' then 1000 'b': only the b's may reach the model
        let context = format!("{}{}", "a".repeat(500), "b".repeat(1000));
        let prompt  = build_prompt("q", &context, CONTEXT_WINDOW_CHARS);

        assert!(!prompt.contains('a'));
        assert_eq!(prompt, format!("question: q context: {}", "b".repeat(1000)));
    }

    #[test]
    fn test_window_of_exact_length() {
        let context = "x".repeat(1000);
        assert_eq!(trailing_window(&context, 1000), context);
    }

    #[test]
    fn test_window_counts_chars_not_bytes() {
        // 'é' is two bytes; the last three chars are "é!é"
        let text = "abcé!é";
        assert_eq!(trailing_window(text, 3), "é!é");
        assert_eq!(trailing_window(text, 3).chars().count(), 3);
    }

    #[test]
    fn test_zero_window_and_empty_context() {
        assert_eq!(trailing_window("abc", 0), "");
        assert_eq!(build_prompt("q", "", 10), "question: q context: ");
    }
}
