// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// Orchestrates the other layers to get something done for the
// person at the keyboard or in the browser.
//
// Rules for this layer:
//   - No candle or lopdf code here (Layers 4–6)
//   - No HTML, HTTP, or terminal printing (Layer 1)
//   - Only workflow coordination over the domain traits
//
// Reference: Clean Architecture pattern
//            Rust Book §7 (Module System)

// The interactive upload → question → answer cycle
pub mod session;

// One-shot question answering over a PDF on disk
pub mod ask_use_case;
