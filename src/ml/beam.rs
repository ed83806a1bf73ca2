// ============================================================
// Layer 5 — Beam Search
// ============================================================
// Deterministic beam-search decoding, independent of any model.
//
// The model is reached through the StepScorer trait: given the
// decoder tokens so far, return log-probabilities for the next
// token. T5Generator implements it with candle; the tests below
// implement it with a lookup table.
//
// One step, for a beam width of W:
//   1. every live beam proposes its top 2·W next tokens
//   2. all proposals are ranked by cumulative log-probability
//      (ties: lower beam index, then lower token id)
//   3. an EOS proposal ranked inside the top W closes a
//      hypothesis scored sum_logprobs / len^length_penalty
//   4. the first W non-EOS proposals become the next beams
//
// With early stopping the search ends as soon as W hypotheses
// are closed. Without it, the search ends when no live beam can
// still beat the worst kept hypothesis. Either way it never runs
// past max_new_tokens; beams still alive then are closed as-is.
//
// Reference: Wiseman & Rush (2016) on beam search for seq2seq
//            Rust Book §10 (Traits and Generics)

use std::cmp::Ordering;

use anyhow::{bail, Result};

/// Anything that can score the next decoder token
pub trait StepScorer {
    /// Log-probabilities over the vocabulary for the token following `prefix`.
    /// `prefix` always starts with the decoder start token.
    fn log_probs(&mut self, prefix: &[u32]) -> Result<Vec<f32>>;
}

#[derive(Debug, Clone)]
pub struct BeamConfig {
    pub num_beams:      usize,
    pub max_new_tokens: usize,
    pub early_stopping: bool,
    pub length_penalty: f32,
    pub start_token:    u32,
    pub eos_token:      u32,
}

/// A finished candidate sequence
#[derive(Debug, Clone, PartialEq)]
pub struct Hypothesis {
    /// Generated tokens, without the start token and without EOS
    pub tokens: Vec<u32>,
    /// Length-normalised log-probability
    pub score: f32,
}

struct Beam {
    tokens:   Vec<u32>,
    log_prob: f32,
}

/// Keeps the best `capacity` hypotheses seen so far
struct HypothesisPool {
    capacity: usize,
    length_penalty: f32,
    kept: Vec<Hypothesis>,
}

impl HypothesisPool {
    fn new(capacity: usize, length_penalty: f32) -> Self {
        Self { capacity, length_penalty, kept: Vec::with_capacity(capacity + 1) }
    }

    /// `generated_len` counts every generated token, EOS included
    fn close(&mut self, tokens: Vec<u32>, sum_log_probs: f32, generated_len: usize) {
        let score = normalise(sum_log_probs, generated_len, self.length_penalty);
        self.kept.push(Hypothesis { tokens, score });
        // Stable sort keeps the earlier hypothesis first on equal scores
        self.kept.sort_by(|a, b| b.score.total_cmp(&a.score));
        self.kept.truncate(self.capacity);
    }

    fn is_full(&self) -> bool {
        self.kept.len() >= self.capacity
    }

    fn worst_score(&self) -> Option<f32> {
        self.kept.last().map(|h| h.score)
    }

    fn into_best(self) -> Option<Hypothesis> {
        self.kept.into_iter().next()
    }
}

fn normalise(sum_log_probs: f32, generated_len: usize, length_penalty: f32) -> f32 {
    sum_log_probs / (generated_len.max(1) as f32).powf(length_penalty)
}

/// Run beam search and return the tokens of the best hypothesis.
pub fn beam_search<S: StepScorer>(scorer: &mut S, cfg: &BeamConfig) -> Result<Vec<u32>> {
    if cfg.num_beams == 0 {
        bail!("beam width must be at least 1");
    }
    let width = cfg.num_beams;

    let mut beams = vec![Beam { tokens: vec![cfg.start_token], log_prob: 0.0 }];
    let mut pool  = HypothesisPool::new(width, cfg.length_penalty);

    for step in 0..cfg.max_new_tokens {
        // ── Step 1: collect 2·W proposals from every live beam ────────────────
        let mut candidates: Vec<(f32, usize, u32)> = Vec::with_capacity(beams.len() * 2 * width);
        for (beam_idx, beam) in beams.iter().enumerate() {
            let log_probs = scorer.log_probs(&beam.tokens)?;
            for (token, lp) in top_k(&log_probs, 2 * width) {
                candidates.push((beam.log_prob + lp, beam_idx, token));
            }
        }

        // ── Step 2: rank all proposals together ───────────────────────────────
        candidates.sort_by(|a, b| {
            b.0.total_cmp(&a.0)
                .then(a.1.cmp(&b.1))
                .then(a.2.cmp(&b.2))
        });

        // ── Step 3: close EOS hypotheses, keep W continuations ────────────────
        let mut next: Vec<Beam> = Vec::with_capacity(width);
        for (rank, (score, beam_idx, token)) in candidates.into_iter().enumerate() {
            let parent = &beams[beam_idx];
            if token == cfg.eos_token {
                if rank < width {
                    pool.close(parent.tokens[1..].to_vec(), score, parent.tokens.len());
                }
                continue;
            }
            let mut tokens = parent.tokens.clone();
            tokens.push(token);
            next.push(Beam { tokens, log_prob: score });
            if next.len() == width {
                break;
            }
        }

        beams = next;
        if beams.is_empty() || is_done(&pool, &beams, cfg, step + 1) {
            tracing::debug!("Beam search finished after {} steps", step + 1);
            beams.clear();
            break;
        }
    }

    // Budget exhausted: live beams become hypotheses without EOS
    for beam in beams {
        let generated = beam.tokens.len() - 1;
        pool.close(beam.tokens[1..].to_vec(), beam.log_prob, generated);
    }

    pool.into_best()
        .map(|h| h.tokens)
        .ok_or_else(|| anyhow::anyhow!("beam search produced no hypothesis"))
}

fn is_done(pool: &HypothesisPool, beams: &[Beam], cfg: &BeamConfig, generated_len: usize) -> bool {
    if !pool.is_full() {
        return false;
    }
    if cfg.early_stopping {
        return true;
    }
    // Live beams are sorted best first, so beams[0] is the best one
    let best_live = normalise(beams[0].log_prob, generated_len, cfg.length_penalty);
    pool.worst_score().map(|worst| worst >= best_live).unwrap_or(false)
}

/// The `k` largest values as (index, value), largest first.
/// NaN entries are ignored; ties go to the lower index.
pub fn top_k(values: &[f32], k: usize) -> Vec<(u32, f32)> {
    let mut indexed: Vec<(u32, f32)> = values
        .iter()
        .enumerate()
        .filter(|(_, v)| !v.is_nan())
        .map(|(i, &v)| (i as u32, v))
        .collect();

    let k = k.min(indexed.len());
    if k == 0 {
        return Vec::new();
    }

    let by_value_desc = |a: &(u32, f32), b: &(u32, f32)| -> Ordering {
        b.1.total_cmp(&a.1).then(a.0.cmp(&b.0))
    };
    indexed.select_nth_unstable_by(k - 1, by_value_desc);
    indexed.truncate(k);
    indexed.sort_by(by_value_desc);
    indexed
}
