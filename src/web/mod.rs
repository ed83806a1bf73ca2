// ============================================================
// Layer 1 — Web Interface
// ============================================================
// The browser front end. Each visitor gets their own ChatSession,
// addressed by the UUID in the URL; the model behind it is shared
// by every session in the process.
//
// Uploads are not size-limited here (DefaultBodyLimit disabled);
// put a proxy in front if that matters. Sessions left alone for
// longer than the session TTL are swept away in the background.
//
// Reference: axum docs (Router, State, Multipart)
//            tower-http docs (TraceLayer)

pub mod error;
pub mod handlers;
pub mod render;
pub mod store;

use std::{net::SocketAddr, time::Duration};

use anyhow::{Context, Result};
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::application::session::SessionServices;
use store::SessionStore;

#[derive(Clone)]
pub struct AppState {
    pub sessions: SessionStore,
    pub services: SessionServices,
}

impl AppState {
    pub fn new(services: SessionServices) -> Self {
        Self { sessions: SessionStore::new(), services }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/s/:id", get(handlers::show).delete(handlers::dispose))
        .route("/s/:id/upload", post(handlers::upload))
        .route("/s/:id/ask", post(handlers::ask))
        .route("/s/:id/messages", get(handlers::transcript))
        .layer(DefaultBodyLimit::disable())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// How often idle sessions are looked for: a quarter of the TTL,
/// between one second and one minute
pub fn sweep_period(session_ttl: Duration) -> Duration {
    (session_ttl / 4).clamp(Duration::from_secs(1), Duration::from_secs(60))
}

/// Serve until Ctrl-C
pub async fn serve(addr: SocketAddr, state: AppState, session_ttl: Duration) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Cannot bind {addr}"))?;
    tracing::info!("PDF Chat listening on http://{}", listener.local_addr()?);
    tracing::info!("Idle sessions expire after {}s", session_ttl.as_secs());

    let sweeper = tokio::spawn(store::sweep_idle(
        state.sessions.clone(),
        session_ttl,
        sweep_period(session_ttl),
    ));

    let served = axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error");
    sweeper.abort();
    served?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Cannot listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown requested");
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::session::tests::{FixedModels, RecordingGenerator};
    use crate::application::session::{ReuploadPolicy, SessionSettings};
    use crate::data::loader::{fixtures::pdf_with_pages, PdfLoader};
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, Response, StatusCode},
    };
    use std::sync::{atomic::AtomicUsize, Arc};
    use std::time::Duration;
    use tower::ServiceExt;
    use uuid::Uuid;

    const BOUNDARY: &str = "pdfchatboundary";

    struct TestApp {
        app:       Router,
        state:     AppState,
        generator: Arc<RecordingGenerator>,
    }

    fn test_app(reupload: ReuploadPolicy) -> TestApp {
        let generator = Arc::new(RecordingGenerator::default());
        let models = Arc::new(FixedModels {
            generator: Arc::clone(&generator),
            acquired:  AtomicUsize::new(0),
        });
        let services = SessionServices {
            loader:   Arc::new(PdfLoader::new()),
            models,
            settings: SessionSettings { latency_floor: Duration::ZERO, reupload },
        };
        let state = AppState::new(services);
        TestApp { app: router(state.clone()), state, generator }
    }

    async fn send(app: &Router, request: Request<Body>) -> Response<Body> {
        app.clone().oneshot(request).await.unwrap()
    }

    async fn body_text(response: Response<Body>) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::get(uri).body(Body::empty()).unwrap()
    }

    fn multipart_upload(id: Uuid, file_name: &str, content_type: &str, bytes: &[u8]) -> Request<Body> {
        let mut body = format!(
            "--{BOUNDARY}\r\n\
             Content-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\n\
             Content-Type: {content_type}\r\n\r\n"
        )
        .into_bytes();
        body.extend_from_slice(bytes);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

        Request::post(format!("/s/{id}/upload"))
            .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"))
            .body(Body::from(body))
            .unwrap()
    }

    fn ask(id: Uuid, encoded_question: &str) -> Request<Body> {
        Request::post(format!("/s/{id}/ask"))
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(format!("question={encoded_question}")))
            .unwrap()
    }

    async fn new_session(t: &TestApp) -> Uuid {
        let response = send(&t.app, get("/")).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let location = response.headers()[header::LOCATION].to_str().unwrap();
        location.trim_start_matches("/s/").parse().unwrap()
    }

    async fn transcript(t: &TestApp, id: Uuid) -> serde_json::Value {
        let response = send(&t.app, get(&format!("/s/{id}/messages"))).await;
        assert_eq!(response.status(), StatusCode::OK);
        serde_json::from_str(&body_text(response).await).unwrap()
    }

    #[tokio::test]
    async fn test_root_creates_session_and_redirects() {
        let t = test_app(ReuploadPolicy::Ignore);
        let id = new_session(&t).await;
        assert!(t.state.sessions.get(id).is_some());

        let page = body_text(send(&t.app, get(&format!("/s/{id}"))).await).await;
        assert!(page.contains("type=\"file\""));
        assert!(page.contains("Please upload your adorable PDF"));
    }

    #[tokio::test]
    async fn test_unknown_session_is_not_found() {
        let t = test_app(ReuploadPolicy::Ignore);
        let response = send(&t.app, get(&format!("/s/{}", Uuid::new_v4()))).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_non_pdf_upload_is_rejected() {
        let t = test_app(ReuploadPolicy::Ignore);
        let id = new_session(&t).await;

        let response = send(&t.app, multipart_upload(id, "notes.txt", "text/plain", b"just text")).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body_text(response).await.contains("is not a PDF"));
        assert!(transcript(&t, id).await["document"].is_null());
    }

    #[tokio::test]
    async fn test_upload_then_ask() {
        let t = test_app(ReuploadPolicy::Ignore);
        let id = new_session(&t).await;
        let pdf = pdf_with_pages(&["The cafe opens at nine"]);

        let response = send(&t.app, multipart_upload(id, "menu.pdf", "application/pdf", &pdf)).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);

        let page = body_text(send(&t.app, get(&format!("/s/{id}"))).await).await;
        assert!(page.contains("You're chatting with: menu.pdf"));
        assert!(page.contains("<strong>menu.pdf</strong>"));

        let response = send(&t.app, ask(id, "When+does+it+open%3F")).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);

        let json = transcript(&t, id).await;
        assert_eq!(json["document"], "menu.pdf");
        let messages = json["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[1]["role"], "user");
        assert_eq!(messages[1]["text"], "When does it open?");
        assert_eq!(messages[2]["role"], "assistant");
        assert_eq!(messages[2]["text"], "answer #1");

        let calls = t.generator.calls.lock().unwrap();
        assert!(calls[0].0.contains("The cafe opens at nine"));
    }

    #[tokio::test]
    async fn test_blank_question_adds_nothing() {
        let t = test_app(ReuploadPolicy::Ignore);
        let id = new_session(&t).await;
        let pdf = pdf_with_pages(&["Some text"]);
        send(&t.app, multipart_upload(id, "a.pdf", "application/pdf", &pdf)).await;

        let response = send(&t.app, ask(id, "+++")).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(transcript(&t, id).await["messages"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_user_text_is_escaped_on_page() {
        let t = test_app(ReuploadPolicy::Ignore);
        let id = new_session(&t).await;
        let pdf = pdf_with_pages(&["Some text"]);
        send(&t.app, multipart_upload(id, "a.pdf", "application/pdf", &pdf)).await;
        send(&t.app, ask(id, "%3Cscript%3Ealert(1)%3C%2Fscript%3E")).await;

        let page = body_text(send(&t.app, get(&format!("/s/{id}"))).await).await;
        assert!(!page.contains("<script>"));
        assert!(page.contains("&lt;script&gt;"));
    }

    #[tokio::test]
    async fn test_replace_policy_shows_upload_form_while_active() {
        let t = test_app(ReuploadPolicy::Replace);
        let id = new_session(&t).await;
        send(&t.app, multipart_upload(id, "one.pdf", "application/pdf", &pdf_with_pages(&["first"]))).await;
        send(&t.app, multipart_upload(id, "two.pdf", "application/pdf", &pdf_with_pages(&["second"]))).await;

        let page = body_text(send(&t.app, get(&format!("/s/{id}"))).await).await;
        assert!(page.contains("type=\"file\""));
        assert_eq!(transcript(&t, id).await["document"], "two.pdf");
    }

    #[tokio::test]
    async fn test_sessions_are_isolated() {
        let t = test_app(ReuploadPolicy::Ignore);
        let a = new_session(&t).await;
        let b = new_session(&t).await;
        send(&t.app, multipart_upload(a, "a.pdf", "application/pdf", &pdf_with_pages(&["alpha"]))).await;

        assert_eq!(transcript(&t, a).await["document"], "a.pdf");
        assert!(transcript(&t, b).await["document"].is_null());
        assert_eq!(t.state.sessions.live(), 2);
    }

    #[tokio::test]
    async fn test_missing_question_field_is_bad_request() {
        let t = test_app(ReuploadPolicy::Ignore);
        let id = new_session(&t).await;
        send(&t.app, multipart_upload(id, "a.pdf", "application/pdf", &pdf_with_pages(&["text"]))).await;

        let request = Request::post(format!("/s/{id}/ask"))
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from("other=1"))
            .unwrap();
        let response = send(&t.app, request).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body_text(response).await.contains("400 Bad Request"));
        assert_eq!(transcript(&t, id).await["messages"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_idle_sessions_are_swept() {
        let t = test_app(ReuploadPolicy::Ignore);
        for _ in 0..5 {
            new_session(&t).await;
        }
        assert_eq!(t.state.sessions.live(), 5);

        assert_eq!(t.state.sessions.evict_idle(Duration::ZERO), 5);
        assert_eq!(t.state.sessions.live(), 0);
    }

    #[test]
    fn test_sweep_period_is_bounded() {
        assert_eq!(sweep_period(Duration::from_secs(3600)), Duration::from_secs(60));
        assert_eq!(sweep_period(Duration::from_secs(20)), Duration::from_secs(5));
        assert_eq!(sweep_period(Duration::ZERO), Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_delete_disposes_session() {
        let t = test_app(ReuploadPolicy::Ignore);
        let id = new_session(&t).await;

        let request = Request::delete(format!("/s/{id}")).body(Body::empty()).unwrap();
        assert_eq!(send(&t.app, request).await.status(), StatusCode::NO_CONTENT);
        assert_eq!(send(&t.app, get(&format!("/s/{id}"))).await.status(), StatusCode::NOT_FOUND);
    }
}
