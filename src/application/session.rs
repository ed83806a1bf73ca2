// ============================================================
// Layer 2 — Chat Session Controller
// ============================================================
// One ChatSession per person chatting. It is a two-state
// machine:
//
//   Empty ──upload ok──▶ Active ──submit──▶ Active (+2 messages)
//                          │
//                          └─upload──▶ Ignored, or Replaced
//                                      (per ReuploadPolicy)
//
// The transcript lives inside the Active state, so there is
// never a transcript without a document.
//
// Every event is handled to completion before returning, and
// the session is only changed once everything has succeeded.
// A failed upload leaves the session as it was; a failed
// generation leaves the transcript as it was.
//
// Answers are held back until at least `latency_floor` has
// passed since generation started (1.2 s by default). This is
// pacing for the person reading, not a timeout: a slow model is
// never delayed further.
//
// Reference: Rust Book §17.3 (Implementing a State Pattern)

use std::{
    sync::Arc,
    thread,
    time::{Duration, Instant},
};

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::domain::document::Document;
use crate::domain::message::ChatMessage;
use crate::domain::traits::{AnswerGenerator, DocumentSource, ModelProvider};

pub const DEFAULT_LATENCY_FLOOR: Duration = Duration::from_millis(1200);

/// The assistant's first message after a document is loaded
pub fn greeting(file_name: &str) -> String {
    format!("Hiya! I'm ready to chat with your file **{file_name}**! Ask me anything 💕")
}

// ─── Settings ─────────────────────────────────────────────────────────────────
/// What to do with an upload while a document is already loaded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReuploadPolicy {
    /// Keep the current document and transcript; the upload is not read
    #[default]
    Ignore,
    /// Load the new document and start a fresh transcript
    Replace,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSettings {
    pub latency_floor: Duration,
    pub reupload:      ReuploadPolicy,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            latency_floor: DEFAULT_LATENCY_FLOOR,
            reupload:      ReuploadPolicy::default(),
        }
    }
}

/// Collaborators shared by every session in the process
#[derive(Clone)]
pub struct SessionServices {
    pub loader:   Arc<dyn DocumentSource>,
    pub models:   Arc<dyn ModelProvider>,
    pub settings: SessionSettings,
}

// ─── Outcomes ─────────────────────────────────────────────────────────────────
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadOutcome {
    /// First document of the session
    Loaded,
    /// A previous document and its transcript were discarded
    Replaced,
    /// A document was already loaded; nothing changed
    Ignored,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// A user message and an assistant answer were appended
    Answered,
    /// Blank input, or no document yet; nothing changed
    Ignored,
}

// ─── State ────────────────────────────────────────────────────────────────────
struct ActiveChat {
    document:  Document,
    messages:  Vec<ChatMessage>,
    generator: Arc<dyn AnswerGenerator>,
}

enum SessionState {
    Empty,
    Active(ActiveChat),
}

pub struct ChatSession {
    services: SessionServices,
    state:    SessionState,
}

impl ChatSession {
    pub fn new(services: SessionServices) -> Self {
        Self { services, state: SessionState::Empty }
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, SessionState::Active(_))
    }

    /// The loaded document, if any
    pub fn document(&self) -> Option<&Document> {
        match &self.state {
            SessionState::Active(chat) => Some(&chat.document),
            SessionState::Empty        => None,
        }
    }

    /// The transcript in insertion order; empty before the first upload
    pub fn messages(&self) -> &[ChatMessage] {
        match &self.state {
            SessionState::Active(chat) => &chat.messages,
            SessionState::Empty        => &[],
        }
    }

    /// Handle a file upload.
    ///
    /// Steps, all before the session is touched:
    ///   1. extract the document text
    ///   2. acquire the shared model (loads it on first use)
    ///   3. build the greeting naming the file
    pub fn upload(&mut self, file_name: &str, bytes: &[u8]) -> Result<UploadOutcome> {
        let outcome = match (&self.state, self.services.settings.reupload) {
            (SessionState::Active(chat), ReuploadPolicy::Ignore) => {
                tracing::info!(
                    "Ignoring upload of '{}': already chatting with '{}'",
                    file_name,
                    chat.document.name()
                );
                return Ok(UploadOutcome::Ignored);
            }
            (SessionState::Active(_), ReuploadPolicy::Replace) => UploadOutcome::Replaced,
            (SessionState::Empty, _)                           => UploadOutcome::Loaded,
        };

        let document  = self.services.loader.load(file_name, bytes)?;
        let generator = self.services.models.acquire()?;
        let welcome   = ChatMessage::assistant(greeting(document.name()));

        tracing::info!("Session now chatting with '{}' ({:?})", document.name(), outcome);
        self.state = SessionState::Active(ActiveChat {
            document,
            messages: vec![welcome],
            generator,
        });
        Ok(outcome)
    }

    /// Handle a submitted question.
    pub fn submit(&mut self, input: &str) -> Result<SubmitOutcome> {
        let floor = self.services.settings.latency_floor;

        let chat = match &mut self.state {
            SessionState::Active(chat) => chat,
            SessionState::Empty => {
                tracing::debug!("Question submitted before any upload; ignoring");
                return Ok(SubmitOutcome::Ignored);
            }
        };
        if input.trim().is_empty() {
            return Ok(SubmitOutcome::Ignored);
        }

        // Stamped now so it sorts before the answer
        let question = ChatMessage::user(input);

        let started = Instant::now();
        let answer  = chat.generator.generate(chat.document.text(), input)?;
        let elapsed = started.elapsed();
        if let Some(remaining) = floor.checked_sub(elapsed) {
            thread::sleep(remaining);
        }
        tracing::info!(
            "Answered in {:.2}s (generation {:.2}s)",
            started.elapsed().as_secs_f32(),
            elapsed.as_secs_f32()
        );

        chat.messages.push(question);
        chat.messages.push(ChatMessage::assistant(answer));
        Ok(SubmitOutcome::Answered)
    }
}
