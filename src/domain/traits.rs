// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The session controller only talks to these traits, never to
// lopdf or candle directly. That keeps the controller testable
// without a model download: tests plug in fakes that count
// calls or return canned answers.
//
// All three are Send + Sync because one loader and one model
// cache are shared by every session in the process.
//
// Reference: Rust Book §10 (Traits: Defining Shared Behaviour)
//            Rust Book §17 (Trait Objects)

use std::sync::Arc;

use anyhow::Result;
use crate::domain::document::Document;

// ─── DocumentSource ───────────────────────────────────────────────────────────
/// Anything that can turn an uploaded file into a Document.
///
/// Implementations:
///   - PdfLoader → extracts page text with lopdf
pub trait DocumentSource: Send + Sync {
    /// Extract the text of `bytes`, naming the result `name`.
    /// Fails if the bytes are not a readable document or carry no text.
    fn load(&self, name: &str, bytes: &[u8]) -> Result<Document>;
}

// ─── AnswerGenerator ──────────────────────────────────────────────────────────
/// Anything that can answer a question given a context string.
///
/// Implementations:
///   - T5Generator → beam-search generation with a local T5 model
pub trait AnswerGenerator: Send + Sync {
    fn generate(&self, context: &str, question: &str) -> Result<String>;
}

// ─── ModelProvider ────────────────────────────────────────────────────────────
/// Hands out a shared AnswerGenerator, loading it on first use.
///
/// Implementations:
///   - SharedModel → process-wide cache around T5Generator
pub trait ModelProvider: Send + Sync {
    fn acquire(&self) -> Result<Arc<dyn AnswerGenerator>>;
}
