// ============================================================
// Layer 6 — Tokenizer Store
// ============================================================
// Loads the model's HuggingFace tokenizer.json and applies the
// input policy the generator relies on:
//   - truncation: prompts longer than the limit keep their
//     first `max_input_tokens` tokens (EOS is re-added by the
//     post-processor)
//   - no padding: one prompt is encoded at a time
//
// Reference: tokenizers crate docs (TruncationParams)

use anyhow::{anyhow, Result};
use std::path::PathBuf;
use tokenizers::{Tokenizer, TruncationParams};

pub struct TokenizerStore {
    path: PathBuf,
}

impl TokenizerStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Load the tokenizer and configure truncation to `max_input_tokens`
    pub fn load(&self, max_input_tokens: usize) -> Result<Tokenizer> {
        let mut tokenizer = Tokenizer::from_file(&self.path)
            .map_err(|e| anyhow!(
                "Cannot load tokenizer from '{}': {}", self.path.display(), e
            ))?;

        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: max_input_tokens,
                ..Default::default()
            }))
            .map_err(|e| anyhow!("Cannot configure truncation: {e}"))?;
        tokenizer.with_padding(None);

        tracing::debug!(
            "Tokenizer loaded from '{}' (max {} input tokens)",
            self.path.display(),
            max_input_tokens
        );
        Ok(tokenizer)
    }
}


// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::fixtures::write_word_level_tokenizer;
    use super::*;

    #[test]
    fn test_truncates_long_prompts() {
        let dir  = tempfile::tempdir().unwrap();
        let path = write_word_level_tokenizer(dir.path());

        let tokenizer = TokenizerStore::new(&path).load(4).unwrap();
        let encoding  = tokenizer
            .encode("question : hello world context : hello world", true)
            .unwrap();
        assert_eq!(encoding.get_ids(), &[3, 7, 5, 6]);
    }

    #[test]
    fn test_short_prompts_untouched() {
        let dir  = tempfile::tempdir().unwrap();
        let path = write_word_level_tokenizer(dir.path());

        let tokenizer = TokenizerStore::new(&path).load(1024).unwrap();
        let encoding  = tokenizer.encode("hello world", true).unwrap();
        assert_eq!(encoding.get_ids(), &[5, 6]);
    }

    #[test]
    fn test_missing_file_names_the_path() {
        let err = TokenizerStore::new("/nonexistent/tokenizer.json")
            .load(8)
            .unwrap_err();
        assert!(err.to_string().contains("/nonexistent/tokenizer.json"));
    }
}
