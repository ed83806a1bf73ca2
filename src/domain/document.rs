// ============================================================
// Layer 3 — Document Domain Type
// ============================================================
// The document context of a chat session: the uploaded file's
// name and every page's text joined into one string.
//
// Created once per upload and never modified afterwards.
// Fields are private so the text cannot be edited in place;
// callers read it through the accessor methods.

use serde::Serialize;

/// The text of one uploaded document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Document {
    /// The uploaded file name, shown in the greeting and header
    name: String,

    /// All extracted page text in page order
    #[serde(skip)]
    text: String,
}

impl Document {
    /// Create a new Document from a file name and its extracted text.
    ///
    /// Example:
    ///   let doc = Document::new("doc.pdf", "Hello world");
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Number of characters (not bytes) in the extracted text
    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_char_count_counts_scalars_not_bytes() {
        let doc = Document::new("café.pdf", "café");
        assert_eq!(doc.char_count(), 4);
        assert_eq!(doc.text().len(), 5);
    }

    #[test]
    fn test_serialises_name_only() {
        let doc  = Document::new("doc.pdf", "secret body");
        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json, serde_json::json!({ "name": "doc.pdf" }));
    }
}
