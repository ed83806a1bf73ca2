// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Concerns used by several layers that belong to none of them:
//
//   model_store.rs:     Locating model files (local directory or
//                       the HuggingFace hub), building the T5
//                       generator, and caching it once per
//                       process behind SharedModel.
//
//   tokenizer_store.rs: Loading tokenizer.json and applying the
//                       1024-token input truncation policy.
//
// Reference: Rust Book §7 (Modules)
//            Rust Book §16 (Shared-State Concurrency)

/// Model file resolution and the process-wide model cache
pub mod model_store;

/// Tokenizer loading with truncation
pub mod tokenizer_store;
