// ============================================================
// Layer 3 — Chat Message Domain Type
// ============================================================
// One entry of the transcript: who said it, what was said,
// and when. Messages are appended and never edited, so the
// struct exposes no setters.
//
// The timestamp is local time because the page shows it as a
// wall-clock "03:41 PM" label for the person chatting.
//
// Reference: chrono docs (DateTime<Local>, strftime syntax)

use chrono::{DateTime, Local};
use serde::Serialize;

/// Who wrote a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    /// Display label, e.g. "User:" in the chat bubble header
    pub fn label(self) -> &'static str {
        match self {
            Role::User      => "User",
            Role::Assistant => "Assistant",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatMessage {
    role:      Role,
    text:      String,
    timestamp: DateTime<Local>,
}

impl ChatMessage {
    /// A user message stamped with the current time
    pub fn user(text: impl Into<String>) -> Self {
        Self::at(Role::User, text, Local::now())
    }

    /// An assistant message stamped with the current time
    pub fn assistant(text: impl Into<String>) -> Self {
        Self::at(Role::Assistant, text, Local::now())
    }

    pub fn at(role: Role, text: impl Into<String>, timestamp: DateTime<Local>) -> Self {
        Self { role, text: text.into(), timestamp }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn timestamp(&self) -> DateTime<Local> {
        self.timestamp
    }

    /// 12-hour clock with AM/PM suffix, e.g. "09:05 PM"
    pub fn clock_label(&self) -> String {
        self.timestamp().format("%I:%M %p").to_string()
    }
}
