// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust structs and traits that name the core concepts:
// the uploaded document, the chat transcript, and the seams
// through which the application layer reaches the loader and
// the language model.
//
// Rules for this layer:
//   - NO candle / tokenizers types
//   - NO file I/O, HTTP, or PDF parsing
//   - Only plain Rust structs, enums, and traits
//
// Reference: Rust Book §5 (Structs), §10 (Traits)

// The text extracted from one uploaded document
pub mod document;

// A single line of the chat transcript
pub mod message;

// Core abstractions (traits) that other layers implement
pub mod traits;
