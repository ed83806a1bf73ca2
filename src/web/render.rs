// ============================================================
// Layer 1 — Page Rendering
// ============================================================
// Turns a ChatSession into HTML.
//
//   base.html   ← shared <head>, styling, header
//   chat.html   ← upload form, or transcript + question form
//   error.html  ← shown for 4xx / 5xx responses
//
// Templates end in .html, so minijinja escapes every {{ value }}
// by default. The only pre-rendered HTML that reaches a page is
// message bodies, which go through markdown_to_html first.
//
// Reference: minijinja docs (Environment, auto-escaping)
//            pulldown-cmark docs (Parser, html::push_html)

use std::sync::OnceLock;

use anyhow::Result;
use axum::http::StatusCode;
use minijinja::{context, Environment};
use pulldown_cmark::{html, Event, Parser};
use serde::Serialize;
use uuid::Uuid;

use crate::application::session::{ChatSession, ReuploadPolicy};
use crate::domain::message::{ChatMessage, Role};

const BASE: &str = r#"<!doctype html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>PDF Chat Café</title>
<style>
body { background-color: #fef6fd; font-family: 'Segoe UI', sans-serif; }
h1, h2, h3 { color: #a64ac9; text-align: center; }
.tagline { text-align: center; color: #999; }
.chat-container { background-color: #fff0f6; border-radius: 20px; padding: 1.5rem; max-width: 750px; margin: 2rem auto 6rem auto; }
.chatting-with { font-weight: bold; color: #000; }
.chat-bubble { padding: 0.75rem 1rem; margin: 0.5rem 0; border-radius: 18px; max-width: 85%; line-height: 1.5; }
.user-bubble { background-color: #c5dfff; color: #333; margin-left: auto; text-align: right; }
.bot-bubble { background-color: #ffe0f0; color: #222; margin-right: auto; text-align: left; }
.message-meta { font-size: 0.7rem; color: #888; margin-top: 0.3rem; }
.panel { max-width: 750px; margin: 1rem auto; }
.info { background-color: #eef6ff; border-radius: 12px; padding: 1rem; }
input[type="text"] { border: 2px solid #f9d5ec; border-radius: 16px; padding: 1rem; width: 80%; }
</style>
</head>
<body>
<h1>💬 PDF Chat Café</h1>
<p class="tagline">Upload a PDF and chat with it like it's your study buddy ☕</p>
{% block body %}{% endblock %}
</body>
</html>
"#;

const CHAT: &str = r#"{% extends "base.html" %}
{% block body %}
{% if not active or allow_replace %}
<form class="panel" method="post" action="/s/{{ session_id }}/upload" enctype="multipart/form-data">
  <input type="file" name="file" accept="application/pdf,.pdf" required>
  <button type="submit">📎 Upload your adorable PDF</button>
</form>
{% endif %}
{% if active %}
<div class="chat-container">
  <p class="chatting-with">📁 You're chatting with: {{ document }}</p>
  {% for m in messages %}
  <div class="chat-bubble {{ m.css_class }}">
    <b>{{ m.emoji }} {{ m.label }}:</b><br>{{ m.body|safe }}
    <div class="message-meta">{{ m.clock }}</div>
  </div>
  {% endfor %}
</div>
<form class="panel" method="post" action="/s/{{ session_id }}/ask">
  <input type="text" name="question" placeholder="Ask a question about your PDF... ✨" autocomplete="off" autofocus>
  <button type="submit">📨 Send</button>
</form>
{% else %}
<p class="panel info">🌼 Please upload your adorable PDF to begin chatting.</p>
{% endif %}
{% endblock %}
"#;

const ERROR: &str = r#"{% extends "base.html" %}
{% block body %}
<div class="panel info">
  <h2>{{ status }}</h2>
  <p>{{ message }}</p>
  <p><a href="/">Start a new chat</a></p>
</div>
{% endblock %}
"#;

fn environment() -> &'static Environment<'static> {
    static ENV: OnceLock<Environment<'static>> = OnceLock::new();
    ENV.get_or_init(|| {
        let mut env = Environment::new();
        for (name, source) in [("base.html", BASE), ("chat.html", CHAT), ("error.html", ERROR)] {
            if let Err(e) = env.add_template(name, source) {
                tracing::error!("Template '{}' does not compile: {}", name, e);
            }
        }
        env
    })
}

// ─── View models ──────────────────────────────────────────────────────────────
#[derive(Serialize)]
struct MessageView {
    css_class: &'static str,
    emoji:     &'static str,
    label:     &'static str,
    body:      String,
    clock:     String,
}

impl From<&ChatMessage> for MessageView {
    fn from(message: &ChatMessage) -> Self {
        let (css_class, emoji) = match message.role() {
            Role::User      => ("user-bubble", "🧑‍🎓"),
            Role::Assistant => ("bot-bubble", "🤖"),
        };
        Self {
            css_class,
            emoji,
            label: message.role().label(),
            body:  markdown_to_html(message.text()),
            clock: message.clock_label(),
        }
    }
}

/// Render message text as markdown. Raw HTML in the text is shown
/// literally, never interpreted.
pub fn markdown_to_html(text: &str) -> String {
    let events = Parser::new(text).map(|event| match event {
        Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
        other => other,
    });
    let mut out = String::with_capacity(text.len() * 3 / 2);
    html::push_html(&mut out, events);
    out
}

// ─── Pages ────────────────────────────────────────────────────────────────────
pub fn chat_page(session_id: Uuid, session: &ChatSession, reupload: ReuploadPolicy) -> Result<String> {
    let messages: Vec<MessageView> = session.messages().iter().map(MessageView::from).collect();
    let page = environment().get_template("chat.html")?.render(context! {
        session_id    => session_id.to_string(),
        active        => session.is_active(),
        document      => session.document().map(|d| d.name()),
        allow_replace => reupload == ReuploadPolicy::Replace,
        messages      => messages,
    })?;
    Ok(page)
}

pub fn error_page(status: StatusCode, message: &str) -> Result<String> {
    let page = environment().get_template("error.html")?.render(context! {
        status  => status.to_string(),
        message => message,
    })?;
    Ok(page)
}
