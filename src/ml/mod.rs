// ============================================================
// Layer 5 — ML / Generation Layer (candle)
// ============================================================
// All candle-specific code lives here. No other layer imports
// candle_core or candle_transformers directly, except the model
// store in Layer 6, which only builds the model and hands it in.
//
//   beam.rs:      model-agnostic beam search over a StepScorer
//
//   generator.rs: T5Generator: prompt → tokens → encoder →
//                 beam-searched decoder → decoded answer.
//                 Implements the AnswerGenerator trait.
//
// Reference: candle book (Tensors, Device)
//            candle-transformers T5 example

/// Deterministic beam search with early stopping
pub mod beam;

/// T5 question answering over the document context
pub mod generator;
