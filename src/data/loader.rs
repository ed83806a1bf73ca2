// ============================================================
// Layer 4 — PDF Document Loader
// ============================================================
// Turns the bytes of an uploaded PDF into a single Document.
//
// How lopdf sees a PDF:
//   Document
//     └── page tree: BTreeMap<page_number, ObjectId>
//           └── content stream (BT … Tj/TJ … ET operators)
//                 └── the actual glyph strings
//
// We walk the page tree in ascending page number and append
// each page's extracted text exactly as lopdf returns it. No
// separator or page marker is inserted between pages.
//
// A page whose content lopdf cannot decode is skipped with a
// warning; the upload only fails when the bytes are not a PDF
// at all or when no page yields any text (scanned/image-only).
//
// Reference: lopdf crate documentation (Document::extract_text)
//            Rust Book §9 (Error Handling)

use anyhow::{bail, Context, Result};

use crate::domain::document::Document;
use crate::domain::traits::DocumentSource;

/// Extracts page text from in-memory PDF bytes.
/// Implements the DocumentSource trait from Layer 3.
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfLoader;

impl PdfLoader {
    pub fn new() -> Self {
        Self
    }
}

impl DocumentSource for PdfLoader {
    fn load(&self, name: &str, bytes: &[u8]) -> Result<Document> {
        // Parse the cross-reference table and object graph
        let pdf = lopdf::Document::load_mem(bytes)
            .with_context(|| format!("'{name}' is not a readable PDF"))?;

        // get_pages() is a BTreeMap, so iteration is already in page order
        let pages = pdf.get_pages();
        let text  = join_pages(
            name,
            pages.keys().map(|n| (*n, pdf.extract_text(&[*n]))),
        );

        if text.trim().is_empty() {
            bail!(
                "'{}' has no extractable text layer ({} pages, possibly scanned)",
                name,
                pages.len()
            );
        }

        let doc = Document::new(name, text);
        tracing::info!(
            "Loaded '{}': {} pages, {} chars",
            doc.name(),
            pages.len(),
            doc.char_count()
        );
        Ok(doc)
    }
}

/// Concatenate per-page extraction results in the order given.
/// A page that failed to extract contributes nothing and is logged.
fn join_pages<I, E>(name: &str, pages: I) -> String
where
    I: IntoIterator<Item = (u32, std::result::Result<String, E>)>,
    E: std::fmt::Display,
{
    let mut text = String::new();
    for (page_number, extracted) in pages {
        match extracted {
            Ok(page_text) => text.push_str(&page_text),
            Err(e) => {
                tracing::warn!(
                    "Skipping page {} of '{}': {}",
                    page_number,
                    name,
                    e
                );
            }
        }
    }
    text
}

/// Returns true if an upload looks like a PDF, judged by any of:
///   - a `.pdf` file extension (case-insensitive)
///   - a `Content-Type` containing `application/pdf`
///   - the `%PDF-` magic bytes at the start of the body
pub fn is_pdf(file_name: &str, content_type: Option<&str>, head: &[u8]) -> bool {
    let by_name = file_name.to_ascii_lowercase().ends_with(".pdf");
    let by_type = content_type
        .map(|ct| ct.to_ascii_lowercase().contains("application/pdf"))
        .unwrap_or(false);
    by_name || by_type || head.starts_with(b"%PDF-")
}
