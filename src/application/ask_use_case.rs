// ============================================================
// Layer 2 — Ask Use Case
// ============================================================
// One question about one PDF, without a session:
//   1. Read the file from disk
//   2. Extract its text                 (Layer 4 - data)
//   3. Acquire the model                (Layer 6 - infra)
//   4. Generate the answer              (Layer 5 - ml)
//
// No latency floor here: nobody is watching a chat bubble.

use anyhow::{bail, Context, Result};
use std::{fs, path::Path, sync::Arc};

use crate::domain::traits::{DocumentSource, ModelProvider};

pub struct AskUseCase {
    loader: Arc<dyn DocumentSource>,
    models: Arc<dyn ModelProvider>,
}

impl AskUseCase {
    pub fn new(loader: Arc<dyn DocumentSource>, models: Arc<dyn ModelProvider>) -> Self {
        Self { loader, models }
    }

    pub fn answer(&self, pdf_path: &Path, question: &str) -> Result<String> {
        if question.trim().is_empty() {
            bail!("The question must not be empty");
        }

        let bytes = fs::read(pdf_path)
            .with_context(|| format!("Cannot read '{}'", pdf_path.display()))?;
        let name = pdf_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("document.pdf");

        let document  = self.loader.load(name, &bytes)?;
        let generator = self.models.acquire()?;
        generator.generate(document.text(), question)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::session::tests::{FixedModels, RecordingGenerator};
    use crate::data::loader::{fixtures::pdf_with_pages, PdfLoader};
    use std::sync::atomic::AtomicUsize;

    fn use_case() -> (AskUseCase, Arc<RecordingGenerator>) {
        let generator = Arc::new(RecordingGenerator::default());
        let models = Arc::new(FixedModels {
            generator: Arc::clone(&generator),
            acquired:  AtomicUsize::new(0),
        });
        (AskUseCase::new(Arc::new(PdfLoader::new()), models), generator)
    }

    #[test]
    fn test_answers_from_pdf_on_disk() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.pdf");
        fs::write(&path, pdf_with_pages(&["Rust was first released in 2015"])).unwrap();

        let (ask, generator) = use_case();
        let answer = ask.answer(&path, "When was Rust released?").unwrap();

        assert_eq!(answer, "answer #1");
        let calls = generator.calls.lock().unwrap();
        assert!(calls[0].0.contains("Rust was first released in 2015"));
        assert_eq!(calls[0].1, "When was Rust released?");
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let (ask, _) = use_case();
        let err = ask.answer(Path::new("/no/such/file.pdf"), "anything?").unwrap_err();
        assert!(err.to_string().contains("/no/such/file.pdf"));
    }

    #[test]
    fn test_blank_question_is_rejected() {
        let (ask, generator) = use_case();
        assert!(ask.answer(Path::new("unused.pdf"), "  ").is_err());
        assert!(generator.calls.lock().unwrap().is_empty());
    }
}
