// ============================================================
// Layer 5 — T5 Answer Generator
// ============================================================
// Answers a question about the document with a pretrained T5
// encoder-decoder (flan-t5-base by default):
//
//   1. build "question: … context: <last 1000 chars>"  (Layer 4)
//   2. tokenise, truncated to 1024 tokens
//   3. run the encoder once
//   4. beam-search the decoder (width 2, ≤ 80 new tokens,
//      no sampling, early stopping)
//   5. decode the winning tokens with special tokens removed
//
// The decoder runs without its KV cache: every beam step feeds
// the full prefix, so beams can branch freely without copying
// cache state between them. Answers are at most 80 tokens, so
// the quadratic cost stays small.
//
// The candle module needs &mut self while decoding, so it sits
// behind a Mutex. Concurrent questions from different sessions
// take turns on the one loaded model.
//
// Reference: candle-transformers T5 example
//            Raffel et al. (2020) T5 paper

use std::sync::Mutex;

use anyhow::{anyhow, Result};
use candle_core::{DType, Device, Tensor, D};
use candle_transformers::models::t5::{self, T5ForConditionalGeneration};
use serde::{Deserialize, Serialize};
use tokenizers::Tokenizer;

use crate::data::prompt::{build_prompt, CONTEXT_WINDOW_CHARS};
use crate::domain::traits::AnswerGenerator;
use crate::ml::beam::{beam_search, BeamConfig, StepScorer};

// ─── Generation Settings ──────────────────────────────────────────────────────
// The decoding policy. Defaults favour latency over context
// coverage and answer length.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationSettings {
    /// Trailing characters of the document placed in the prompt
    pub context_chars:    usize,
    /// Prompt tokens beyond this are truncated away
    pub max_input_tokens: usize,
    pub max_new_tokens:   usize,
    pub num_beams:        usize,
    pub early_stopping:   bool,
    pub length_penalty:   f32,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            context_chars:    CONTEXT_WINDOW_CHARS,
            max_input_tokens: 1024,
            max_new_tokens:   80,
            num_beams:        2,
            early_stopping:   true,
            length_penalty:   1.0,
        }
    }
}

impl GenerationSettings {
    fn beam_config(&self, start_token: u32, eos_token: u32) -> BeamConfig {
        BeamConfig {
            num_beams:      self.num_beams,
            max_new_tokens: self.max_new_tokens,
            early_stopping: self.early_stopping,
            length_penalty: self.length_penalty,
            start_token,
            eos_token,
        }
    }
}

// ─── T5Generator ──────────────────────────────────────────────────────────────
pub struct T5Generator {
    model:       Mutex<T5ForConditionalGeneration>,
    tokenizer:   Tokenizer,
    device:      Device,
    settings:    GenerationSettings,
    start_token: u32,
    eos_token:   u32,
}

impl T5Generator {
    pub fn new(
        model:     T5ForConditionalGeneration,
        config:    &t5::Config,
        tokenizer: Tokenizer,
        device:    Device,
        settings:  GenerationSettings,
    ) -> Self {
        // T5 starts decoding from the pad token unless told otherwise
        let start_token = config
            .decoder_start_token_id
            .unwrap_or(config.pad_token_id) as u32;
        Self {
            model: Mutex::new(model),
            tokenizer,
            device,
            settings,
            start_token,
            eos_token: config.eos_token_id as u32,
        }
    }

    /// Token ids of the windowed, truncated prompt
    fn prompt_ids(&self, context: &str, question: &str) -> Result<Vec<u32>> {
        let prompt   = build_prompt(question, context, self.settings.context_chars);
        let encoding = self.tokenizer
            .encode(prompt, true)
            .map_err(|e| anyhow!("Prompt tokenise: {e}"))?;
        tracing::debug!("Prompt is {} tokens", encoding.get_ids().len());
        Ok(encoding.get_ids().to_vec())
    }
}

impl AnswerGenerator for T5Generator {
    fn generate(&self, context: &str, question: &str) -> Result<String> {
        let ids   = self.prompt_ids(context, question)?;
        let input = Tensor::new(ids.as_slice(), &self.device)?.unsqueeze(0)?;

        let mut model = self.model
            .lock()
            .map_err(|_| anyhow!("model lock poisoned by an earlier panic"))?;
        model.clear_kv_cache();

        let encoder_output = model.encode(&input)?;
        let mut scorer = T5Scorer {
            model:          &mut *model,
            encoder_output: &encoder_output,
            device:         &self.device,
        };
        let beam_cfg = self.settings.beam_config(self.start_token, self.eos_token);
        let tokens   = beam_search(&mut scorer, &beam_cfg)?;

        let answer = self.tokenizer
            .decode(&tokens, true)
            .map_err(|e| anyhow!("Decode: {e}"))?;

        tracing::debug!("Generated {} tokens: '{}'", tokens.len(), answer);
        Ok(answer)
    }
}

/// Scores decoder prefixes against one encoded prompt
struct T5Scorer<'a> {
    model:          &'a mut T5ForConditionalGeneration,
    encoder_output: &'a Tensor,
    device:         &'a Device,
}

impl StepScorer for T5Scorer<'_> {
    fn log_probs(&mut self, prefix: &[u32]) -> Result<Vec<f32>> {
        let decoder_input = Tensor::new(prefix, self.device)?.unsqueeze(0)?;
        // decode() returns logits for the last position only: [1, vocab]
        let logits = self.model
            .decode(&decoder_input, self.encoder_output)?
            .squeeze(0)?
            .to_dtype(DType::F32)?;
        let log_probs = candle_nn::ops::log_softmax(&logits, D::Minus1)?;
        Ok(log_probs.to_vec1::<f32>()?)
    }
}
