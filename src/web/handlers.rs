// ============================================================
// Layer 1 — HTTP Handlers
// ============================================================
// Each handler is one user event against one session:
//
//   GET    /                  → new session, 303 to its page
//   GET    /s/{id}            → render the session
//   POST   /s/{id}/upload     → multipart "file" field
//   POST   /s/{id}/ask        → form field "question"
//   GET    /s/{id}/messages   → transcript as JSON
//   DELETE /s/{id}            → dispose the session
//
// Upload and ask run PDF parsing, model loading, and generation,
// all of which block. They run on the blocking pool while holding
// the session lock, so a second event for the same session waits
// until the first has fully finished.

use axum::{
    extract::{rejection::FormRejection, Multipart, Path, State},
    http::StatusCode,
    response::{Html, Redirect},
    Form, Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::application::session::{SubmitOutcome, UploadOutcome};
use crate::data::loader::is_pdf;
use crate::domain::message::ChatMessage;
use crate::web::{error::AppError, render, store::SharedSession, AppState};

fn session_url(id: Uuid) -> String {
    format!("/s/{id}")
}

fn find(state: &AppState, id: Uuid) -> Result<SharedSession, AppError> {
    state.sessions.get(id).ok_or(AppError::UnknownSession(id))
}

pub async fn index(State(state): State<AppState>) -> Redirect {
    let id = state.sessions.create(state.services.clone());
    Redirect::to(&session_url(id))
}

pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Html<String>, AppError> {
    let session = find(&state, id)?;
    let session = session.lock().await;
    let page = render::chat_page(id, &session, state.services.settings.reupload)?;
    Ok(Html(page))
}

pub async fn upload(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<Redirect, AppError> {
    let session = find(&state, id)?;

    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Malformed upload: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let name = field.file_name().unwrap_or_default().to_string();
        let content_type = field.content_type().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(format!("Malformed upload: {e}")))?;
        upload = Some((name, content_type, bytes));
        break;
    }

    let (name, content_type, bytes) = upload
        .filter(|(name, _, bytes)| !name.is_empty() && !bytes.is_empty())
        .ok_or_else(|| AppError::BadRequest("Choose a PDF file to upload.".into()))?;

    if !is_pdf(&name, content_type.as_deref(), &bytes) {
        return Err(AppError::BadRequest(format!("'{name}' is not a PDF file.")));
    }

    tracing::info!("Session {}: upload '{}' ({} bytes)", id, name, bytes.len());
    let outcome = tokio::task::spawn_blocking(move || {
        session.blocking_lock().upload(&name, &bytes)
    })
    .await??;

    if outcome == UploadOutcome::Ignored {
        tracing::info!("Session {}: document already loaded, upload ignored", id);
    }
    Ok(Redirect::to(&session_url(id)))
}

#[derive(Debug, Deserialize)]
pub struct AskForm {
    pub question: String,
}

pub async fn ask(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    form: Result<Form<AskForm>, FormRejection>,
) -> Result<Redirect, AppError> {
    let session = find(&state, id)?;
    let Form(form) = form.map_err(|e| AppError::BadRequest(format!("Malformed question: {e}")))?;

    let outcome = tokio::task::spawn_blocking(move || {
        session.blocking_lock().submit(&form.question)
    })
    .await??;

    if outcome == SubmitOutcome::Ignored {
        tracing::debug!("Session {}: question ignored", id);
    }
    Ok(Redirect::to(&session_url(id)))
}

#[derive(Debug, Serialize)]
pub struct Transcript {
    pub document: Option<String>,
    pub messages: Vec<ChatMessage>,
}

pub async fn transcript(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Transcript>, AppError> {
    let session = find(&state, id)?;
    let session = session.lock().await;
    Ok(Json(Transcript {
        document: session.document().map(|d| d.name().to_string()),
        messages: session.messages().to_vec(),
    }))
}

pub async fn dispose(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    if state.sessions.remove(id) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::UnknownSession(id))
    }
}
