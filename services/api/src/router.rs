//! Axum Router Configuration
//!
//! This module defines the complete HTTP routing for the application,
//! including the chat page, the REST API, the WebSocket endpoint, and
//! OpenAPI documentation.

use crate::{
    handlers,
    models::{
        AudioPayload, ChatMessage, ErrorResponse, HealthResponse, MessageRole, NoticeKind,
        NoticePayload, SessionCreated, SubmitTurnPayload, TranscriptResponse, TurnResponse,
    },
    state::AppState,
    ws::ws_handler,
};

use axum::{
    Router,
    routing::{delete, get, post},
};
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health,
        handlers::create_session,
        handlers::get_transcript,
        handlers::submit_turn,
        handlers::delete_session,
    ),
    components(
        schemas(
            SessionCreated, TranscriptResponse, ChatMessage, MessageRole, SubmitTurnPayload,
            TurnResponse, AudioPayload, NoticePayload, NoticeKind, HealthResponse, ErrorResponse
        )
    ),
    tags(
        (name = "Parley API", description = "Multilingual chat sessions with spoken replies")
    )
)]
pub struct ApiDoc;

/// Creates the main Axum router for the application.
pub fn create_router(app_state: Arc<AppState>) -> Router {
    // Group all routes that require AppState into their own router.
    let api_router = Router::new()
        .route("/", get(handlers::index))
        .route("/health", get(handlers::health))
        .route("/sessions", post(handlers::create_session))
        .route("/sessions/{id}", delete(handlers::delete_session))
        .route("/sessions/{id}/transcript", get(handlers::get_transcript))
        .route("/sessions/{id}/turns", post(handlers::submit_turn))
        .route("/ws", get(ws_handler))
        .with_state(app_state);

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(api_router)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, Provider};
    use async_trait::async_trait;
    use axum::{
        body::{Body, to_bytes},
        http::{Request, StatusCode, header},
        response::Response,
    };
    use parley_core::{
        error::{DetectionError, GenerationError, SynthesisError},
        language::LanguageDetector,
        llm_client::{EchoClient, LLMClient},
        message::Message,
        speech::{AudioClip, SpeechSynthesizer},
        turn::Collaborators,
    };
    use serde_json::Value;
    use std::path::PathBuf;
    use std::time::Duration;
    use tower::ServiceExt;
    use tracing::Level;

    struct FixedLanguage(&'static str);

    impl LanguageDetector for FixedLanguage {
        fn detect(&self, _text: &str) -> Result<String, DetectionError> {
            Ok(self.0.to_string())
        }
    }

    struct FakeSpeech;

    #[async_trait]
    impl SpeechSynthesizer for FakeSpeech {
        async fn synthesize(&self, _: &str, _: &str) -> Result<AudioClip, SynthesisError> {
            Ok(AudioClip::mp3(vec![0xFF, 0xFB, 0x90, 0x00]))
        }
    }

    struct BrokenSpeech;

    #[async_trait]
    impl SpeechSynthesizer for BrokenSpeech {
        async fn synthesize(&self, _: &str, _: &str) -> Result<AudioClip, SynthesisError> {
            Err(SynthesisError::Rejected { status: 500 })
        }
    }

    struct QuotaExhausted;

    #[async_trait]
    impl LLMClient for QuotaExhausted {
        async fn generate(&self, _: &[Message], _: &str) -> Result<String, GenerationError> {
            Err(GenerationError::QuotaExceeded("daily limit".to_string()))
        }
    }

    fn test_config(transcript_limit: usize) -> Config {
        Config {
            bind_address: "127.0.0.1:0".parse().unwrap(),
            provider: Provider::Echo,
            gemini_api_key: None,
            openai_api_key: None,
            chat_model: "echo".to_string(),
            temperature: 0.0,
            top_p: 0.95,
            top_k: 64,
            max_output_tokens: 8192,
            transcript_limit,
            session_idle_timeout: Duration::from_secs(1800),
            default_language: "en".to_string(),
            tts_base_url: "http://localhost".to_string(),
            tts_slow: false,
            log_level: Level::INFO,
            prompts_path: PathBuf::from("./prompts"),
        }
    }

    fn app_with(
        llm: Arc<dyn LLMClient>,
        synthesizer: Arc<dyn SpeechSynthesizer>,
        transcript_limit: usize,
    ) -> Router {
        let collaborators = Collaborators {
            llm,
            detector: Arc::new(FixedLanguage("fr")),
            synthesizer,
        };
        create_router(Arc::new(AppState::new(
            collaborators,
            test_config(transcript_limit),
        )))
    }

    fn echo_app() -> Router {
        app_with(Arc::new(EchoClient), Arc::new(FakeSpeech), 50)
    }

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn create_session(app: &Router) -> String {
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/sessions")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let json = body_json(response).await;
        json["session_id"].as_str().unwrap().to_string()
    }

    async fn submit(app: &Router, session_id: &str, text: &str) -> Response {
        let body = serde_json::json!({ "text": text }).to_string();
        app.clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(format!("/sessions/{}/turns", session_id))
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap()
    }

    async fn transcript(app: &Router, session_id: &str) -> Response {
        app.clone()
            .oneshot(
                Request::builder()
                    .uri(format!("/sessions/{}/transcript", session_id))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let response = echo_app()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["status"], "ok");
    }

    #[tokio::test]
    async fn test_index_serves_chat_page() {
        let response = echo_app()
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let page = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(page.contains("<html"));
        assert!(page.contains("/ws"));
    }

    #[tokio::test]
    async fn test_openapi_document_lists_turns() {
        let response = echo_app()
            .oneshot(
                Request::builder()
                    .uri("/api-docs/openapi.json")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert!(json["paths"]["/sessions/{id}/turns"].is_object());
    }

    #[tokio::test]
    async fn test_successful_turn_records_both_messages() {
        let app = echo_app();
        let session_id = create_session(&app).await;

        let response = submit(&app, &session_id, "Bonjour").await;
        assert_eq!(response.status(), StatusCode::OK);
        let turn = body_json(response).await;
        assert_eq!(turn["user"]["text"], "Bonjour");
        assert_eq!(turn["bot"]["text"], "[1] Bonjour");
        assert_eq!(turn["language"], "fr");
        assert_eq!(turn["audio"]["mime_type"], "audio/mpeg");
        assert_eq!(turn["audio"]["data"], "//uQAA==");

        let json = body_json(transcript(&app, &session_id).await).await;
        let messages = json["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0]["role"], "user");
        assert_eq!(messages[1]["role"], "bot");
    }

    #[tokio::test]
    async fn test_synthesis_failure_still_records_turn() {
        let app = app_with(Arc::new(EchoClient), Arc::new(BrokenSpeech), 50);
        let session_id = create_session(&app).await;

        let response = submit(&app, &session_id, "Bonjour").await;
        assert_eq!(response.status(), StatusCode::OK);
        let turn = body_json(response).await;
        assert!(turn["audio"].is_null());
        assert_eq!(turn["notices"][0]["kind"], "synthesis");

        let json = body_json(transcript(&app, &session_id).await).await;
        assert_eq!(json["messages"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_generation_failure_is_bad_gateway() {
        let app = app_with(Arc::new(QuotaExhausted), Arc::new(FakeSpeech), 50);
        let session_id = create_session(&app).await;

        let response = submit(&app, &session_id, "Hello").await;
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let json = body_json(response).await;
        assert!(json["message"].as_str().unwrap().contains("quota"));

        let json = body_json(transcript(&app, &session_id).await).await;
        assert!(json["messages"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_input_is_no_content() {
        let app = echo_app();
        let session_id = create_session(&app).await;

        let response = submit(&app, &session_id, "   ").await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let json = body_json(transcript(&app, &session_id).await).await;
        assert!(json["messages"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_transcript_is_bounded() {
        let app = app_with(Arc::new(EchoClient), Arc::new(FakeSpeech), 4);
        let session_id = create_session(&app).await;

        for text in ["one", "two", "three"] {
            let response = submit(&app, &session_id, text).await;
            assert_eq!(response.status(), StatusCode::OK);
        }

        let json = body_json(transcript(&app, &session_id).await).await;
        let texts: Vec<&str> = json["messages"]
            .as_array()
            .unwrap()
            .iter()
            .map(|m| m["text"].as_str().unwrap())
            .collect();
        assert_eq!(texts, vec!["two", "[2] two", "three", "[3] three"]);
    }

    #[tokio::test]
    async fn test_unknown_session_is_not_found() {
        let app = echo_app();
        let missing = uuid::Uuid::new_v4().to_string();

        let response = submit(&app, &missing, "Hello").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = transcript(&app, &missing).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_delete_session() {
        let app = echo_app();
        let session_id = create_session(&app).await;

        let delete = || {
            Request::builder()
                .method("DELETE")
                .uri(format!("/sessions/{}", session_id))
                .body(Body::empty())
                .unwrap()
        };

        let response = app.clone().oneshot(delete()).await.unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = app.clone().oneshot(delete()).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = transcript(&app, &session_id).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
