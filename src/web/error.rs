// ============================================================
// Layer 1 — Web Errors
// ============================================================
// Every handler returns Result<_, AppError>. The `?` operator
// turns any anyhow-compatible error into AppError::Internal,
// which is logged and shown as a generic error page. The other
// variants are the request's fault and are not logged as errors.

use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use uuid::Uuid;

use crate::web::render;

#[derive(Debug)]
pub enum AppError {
    /// No live session under this id (never created, or disposed)
    UnknownSession(Uuid),
    /// Malformed or unacceptable input, shown back to the user
    BadRequest(String),
    Internal(anyhow::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::UnknownSession(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_)     => StatusCode::BAD_REQUEST,
            AppError::Internal(_)       => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> String {
        match self {
            AppError::UnknownSession(id) => {
                format!("Session {id} does not exist. Start a new chat from the home page.")
            }
            AppError::BadRequest(reason) => reason.clone(),
            AppError::Internal(err)      => format!("Something went wrong: {err:#}"),
        }
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        AppError::Internal(err.into())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            AppError::Internal(err) => tracing::error!("Request failed: {:#}", err),
            other                   => tracing::debug!("Rejected request: {:?}", other),
        }

        match render::error_page(status, &self.message()) {
            Ok(html) => (status, Html(html)).into_response(),
            Err(e) => {
                tracing::error!("Cannot render error page: {:#}", e);
                (status, self.message()).into_response()
            }
        }
    }
}
