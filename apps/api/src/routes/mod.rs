pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::state::AppState;
use crate::tailoring::handlers;

pub fn build_router(state: AppState) -> Router {
    let body_limit = state.config.max_upload_bytes;

    Router::new()
        .route("/health", get(health::health_handler))
        // Tailoring API
        .route("/api/v1/tailor", post(handlers::handle_tailor))
        .route("/api/v1/cover-letter", post(handlers::handle_cover_letter))
        // Building blocks
        .route("/api/v1/diff", post(handlers::handle_diff))
        .route("/api/v1/render", post(handlers::handle_render))
        .route("/api/v1/extract", post(handlers::handle_extract))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use async_trait::async_trait;
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tokio::sync::Notify;
    use tower::ServiceExt;

    use crate::config::Config;
    use crate::llm_client::{ChatClient, LlmError};
    use crate::tailoring::handlers::SESSION_HEADER;
    use crate::tailoring::pipeline::tests::ScriptedChat;
    use crate::tailoring::prompt_builder::PromptBuilder;
    use crate::tailoring::session::InFlightSessions;

    const BOUNDARY: &str = "jobfit-test-boundary";

    fn state_with(chat: Arc<dyn ChatClient>) -> AppState {
        let config = Config::from_lookup(|_| None).unwrap();
        AppState {
            chat,
            prompt_builder: PromptBuilder::from_config(&config),
            sessions: InFlightSessions::default(),
            config,
        }
    }

    fn scripted(replies: Vec<Result<String, LlmError>>) -> AppState {
        state_with(Arc::new(ScriptedChat::new(replies)))
    }

    fn multipart_body(files: &[(&str, &str, &str)], fields: &[(&str, &str)]) -> Body {
        let mut body = String::new();
        for (name, filename, content) in files {
            body.push_str(&format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\n\
                 Content-Type: application/octet-stream\r\n\r\n{content}\r\n"
            ));
        }
        for (name, value) in fields {
            body.push_str(&format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            ));
        }
        body.push_str(&format!("--{BOUNDARY}--\r\n"));
        Body::from(body)
    }

    fn multipart_request(uri: &str, session: Option<&str>, body: Body) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            );
        if let Some(id) = session {
            builder = builder.header(SESSION_HEADER, id);
        }
        builder.body(body).unwrap()
    }

    fn json_request(uri: &str, value: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(value.to_string()))
            .unwrap()
    }

    fn tailor_body(fields: &[(&str, &str)]) -> Body {
        multipart_body(
            &[
                ("resume", "resume.txt", "Managed a team of 5 engineers"),
                ("job_description", "jd.txt", "Seeking a senior engineering lead"),
            ],
            fields,
        )
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let app = build_router(scripted(vec![]));
        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["status"], "ok");
    }

    #[tokio::test]
    async fn test_tailor_returns_text_and_diff() {
        let app = build_router(scripted(vec![Ok(
            "Led a team of 5 senior engineers".to_string()
        )]));
        let response = app
            .oneshot(multipart_request(
                "/api/v1/tailor",
                None,
                tailor_body(&[("intensity", "deep")]),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["tailored_text"], "Led a team of 5 senior engineers");
        assert_eq!(body["intensity"], "deep");
        assert_eq!(body["diff"]["granularity"], "word");
        assert_eq!(
            body["diff"]["tokens"][0],
            json!({"kind": "removed", "text": "Managed"})
        );
        assert_eq!(
            body["diff"]["tokens"][1],
            json!({"kind": "added", "text": "Led"})
        );
        assert!(body["cover_letter"].is_null());
        assert_eq!(body["downloads"]["resume_filename"], "Tailored_Resume.pdf");
    }

    #[tokio::test]
    async fn test_tailor_with_cover_letter_flag() {
        let app = build_router(scripted(vec![
            Ok("Led a team".to_string()),
            Ok("Dear hiring manager".to_string()),
        ]));
        let response = app
            .oneshot(multipart_request(
                "/api/v1/tailor",
                None,
                tailor_body(&[("include_cover_letter", "true")]),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["cover_letter"], "Dear hiring manager");
        assert_eq!(body["downloads"]["cover_letter_filename"], "Cover_Letter.pdf");
    }

    #[tokio::test]
    async fn test_tailor_missing_job_description_is_bad_request() {
        let app = build_router(scripted(vec![]));
        let body = multipart_body(&[("resume", "resume.txt", "Managed a team")], &[]);
        let response = app
            .oneshot(multipart_request("/api/v1/tailor", None, body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"]["code"], "INVALID_REQUEST");
    }

    #[tokio::test]
    async fn test_tailor_bad_intensity_is_bad_request() {
        let app = build_router(scripted(vec![]));
        let response = app
            .oneshot(multipart_request(
                "/api/v1/tailor",
                None,
                tailor_body(&[("intensity", "extreme")]),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_tailor_surfaces_missing_credential() {
        let app = build_router(scripted(vec![Err(LlmError::MissingCredential)]));
        let response = app
            .oneshot(multipart_request("/api/v1/tailor", None, tailor_body(&[])))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            json_body(response).await["error"]["code"],
            "MISSING_CREDENTIAL"
        );
    }

    #[tokio::test]
    async fn test_tailor_surfaces_rate_limit() {
        let app = build_router(scripted(vec![Err(LlmError::RateLimited {
            message: "429".to_string(),
        })]));
        let response = app
            .oneshot(multipart_request("/api/v1/tailor", None, tailor_body(&[])))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(json_body(response).await["error"]["code"], "RATE_LIMITED");
    }

    /// Blocks inside `complete` until released, so a request can be held in flight.
    struct GatedChat {
        entered: Notify,
        release: Notify,
    }

    #[async_trait]
    impl ChatClient for GatedChat {
        async fn complete(&self, _system: &str, _prompt: &str) -> Result<String, LlmError> {
            self.entered.notify_one();
            self.release.notified().await;
            Ok("Led a team".to_string())
        }

        fn model(&self) -> &str {
            "gated"
        }
    }

    #[tokio::test]
    async fn test_overlapping_request_for_same_session_conflicts() {
        let chat = Arc::new(GatedChat {
            entered: Notify::new(),
            release: Notify::new(),
        });
        let state = state_with(chat.clone());
        let sessions = state.sessions.clone();
        let app = build_router(state);

        let first = tokio::spawn(app.clone().oneshot(multipart_request(
            "/api/v1/tailor",
            Some("session-1"),
            tailor_body(&[]),
        )));
        chat.entered.notified().await;

        let second = app
            .clone()
            .oneshot(multipart_request(
                "/api/v1/tailor",
                Some("session-1"),
                tailor_body(&[]),
            ))
            .await
            .unwrap();
        assert_eq!(second.status(), StatusCode::CONFLICT);

        chat.release.notify_one();
        let first = first.await.unwrap().unwrap();
        assert_eq!(first.status(), StatusCode::OK);
        assert!(!sessions.is_active("session-1"));
    }

    #[tokio::test]
    async fn test_session_released_after_failure() {
        let state = scripted(vec![Err(LlmError::Upstream("boom".to_string()))]);
        let sessions = state.sessions.clone();
        let app = build_router(state);

        let response = app
            .oneshot(multipart_request(
                "/api/v1/tailor",
                Some("session-2"),
                tailor_body(&[]),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert!(!sessions.is_active("session-2"));
    }

    #[tokio::test]
    async fn test_cover_letter_endpoint() {
        let app = build_router(scripted(vec![Ok("Dear hiring manager".to_string())]));
        let response = app
            .oneshot(multipart_request("/api/v1/cover-letter", None, tailor_body(&[])))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["cover_letter"], "Dear hiring manager");
        assert_eq!(body["filename"], "Cover_Letter.pdf");
    }

    #[tokio::test]
    async fn test_diff_endpoint_line_granularity() {
        let app = build_router(scripted(vec![]));
        let response = app
            .oneshot(json_request(
                "/api/v1/diff",
                json!({"original": "a\nb", "revised": "a\nc", "granularity": "line"}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(
            body["tokens"],
            json!([
                {"kind": "unchanged", "text": "a"},
                {"kind": "removed", "text": "b"},
                {"kind": "added", "text": "c"}
            ])
        );
        assert_eq!(body["stats"]["removed"], 1);
    }

    #[tokio::test]
    async fn test_render_endpoint_returns_pdf_attachment() {
        let app = build_router(scripted(vec![]));
        let response = app
            .oneshot(json_request(
                "/api/v1/render",
                json!({"text": "Jane Doe\n\nLed a team", "filename": "Cover_Letter.pdf"}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/pdf"
        );
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"Cover_Letter.pdf\""
        );
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[tokio::test]
    async fn test_render_endpoint_default_filename() {
        let app = build_router(scripted(vec![]));
        let response = app
            .oneshot(json_request("/api/v1/render", json!({"text": "Jane Doe"})))
            .await
            .unwrap();
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"Tailored_Resume.pdf\""
        );
    }

    #[tokio::test]
    async fn test_extract_endpoint() {
        let app = build_router(scripted(vec![]));
        let body = multipart_body(&[("file", "jd.txt", "Rust, Kubernetes")], &[]);
        let response = app
            .oneshot(multipart_request("/api/v1/extract", None, body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["format"], "plain_text");
        assert_eq!(body["text"], "Rust, Kubernetes");
    }

    #[tokio::test]
    async fn test_extract_endpoint_bad_docx_is_unprocessable() {
        let app = build_router(scripted(vec![]));
        let body = multipart_body(&[("file", "cv.doc", "legacy binary")], &[]);
        let response = app
            .oneshot(multipart_request("/api/v1/extract", None, body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            json_body(response).await["error"]["code"],
            "EXTRACTION_FAILURE"
        );
    }
}
