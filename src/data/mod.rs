// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything between the uploaded bytes and the prompt string:
//
//   uploaded .pdf bytes
//       │
//       ▼
//   PdfLoader      → extracts page text, concatenated in page order
//       │
//       ▼
//   Document       → stored in the session, never modified
//       │
//       ▼
//   build_prompt   → "question: … context: <last 1000 chars>"
//       │
//       ▼
//   AnswerGenerator (Layer 5)
//
// Reference: lopdf crate documentation
//            Rust Book §8 (Strings), §13 (Iterators)

/// Extracts text from PDF bytes using lopdf
pub mod loader;

/// Builds the bounded-length model prompt
pub mod prompt;
