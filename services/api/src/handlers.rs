//! Axum Handlers for the REST API
//!
//! This module contains the logic for handling HTTP requests for chat sessions.
//! It uses `utoipa` doc comments to generate OpenAPI documentation.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Json, Response},
};
use chrono::Utc;
use parley_core::error::TurnError;
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

use crate::{
    models::{
        ErrorResponse, HealthResponse, SessionCreated, SubmitTurnPayload, TranscriptResponse,
        TurnResponse,
    },
    state::AppState,
};

const CHAT_PAGE: &str = include_str!("../assets/index.html");

pub enum ApiError {
    NotFound(String),
    /// The language model failed; the turn was discarded.
    BadGateway(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::NotFound(message) => {
                (StatusCode::NOT_FOUND, Json(ErrorResponse { message })).into_response()
            }
            ApiError::BadGateway(message) => {
                warn!("Turn failed: {}", message);
                (StatusCode::BAD_GATEWAY, Json(ErrorResponse { message })).into_response()
            }
        }
    }
}

fn session_not_found(id: Uuid) -> ApiError {
    ApiError::NotFound(format!("Session with id '{}' not found", id))
}

/// Serves the browser chat page.
pub async fn index() -> Html<&'static str> {
    Html(CHAT_PAGE)
}

/// Liveness probe.
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is up", body = HealthResponse))
)]
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// Start a new chat session with an empty transcript.
#[utoipa::path(
    post,
    path = "/sessions",
    responses(
        (status = 201, description = "Session created successfully", body = SessionCreated)
    )
)]
pub async fn create_session(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let session_id = state.sessions.insert(state.new_conversation()).await;
    (
        StatusCode::CREATED,
        Json(SessionCreated {
            session_id,
            transcript_limit: state.config.transcript_limit,
            created_at: Utc::now(),
        }),
    )
}

/// Get the retained transcript of a session, oldest message first.
#[utoipa::path(
    get,
    path = "/sessions/{id}/transcript",
    responses(
        (status = 200, description = "Session transcript", body = TranscriptResponse),
        (status = 404, description = "Session not found", body = ErrorResponse)
    ),
    params(("id" = Uuid, Path, description = "Session ID"))
)]
pub async fn get_transcript(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<TranscriptResponse>, ApiError> {
    let conversation = state
        .sessions
        .get(id)
        .await
        .ok_or_else(|| session_not_found(id))?;
    let messages = conversation
        .lock()
        .await
        .transcript()
        .all()
        .into_iter()
        .map(Into::into)
        .collect();
    Ok(Json(TranscriptResponse { messages }))
}

/// Submit a user message and receive the bot's reply with optional audio.
#[utoipa::path(
    post,
    path = "/sessions/{id}/turns",
    request_body = SubmitTurnPayload,
    responses(
        (status = 200, description = "Turn completed", body = TurnResponse),
        (status = 204, description = "Empty input, nothing recorded"),
        (status = 404, description = "Session not found", body = ErrorResponse),
        (status = 502, description = "Language model failed; turn discarded", body = ErrorResponse)
    ),
    params(("id" = Uuid, Path, description = "Session ID"))
)]
pub async fn submit_turn(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SubmitTurnPayload>,
) -> Result<Response, ApiError> {
    let conversation = state
        .sessions
        .get(id)
        .await
        .ok_or_else(|| session_not_found(id))?;

    // Holding the lock for the whole turn serializes submissions per session.
    let mut conversation = conversation.lock().await;
    match conversation.submit(&payload.text).await {
        Ok(outcome) => Ok(Json(TurnResponse::from(outcome)).into_response()),
        Err(TurnError::EmptyInput) => Ok(StatusCode::NO_CONTENT.into_response()),
        Err(TurnError::Generation(e)) => Err(ApiError::BadGateway(e.to_string())),
    }
}

/// End a session and discard its transcript.
#[utoipa::path(
    delete,
    path = "/sessions/{id}",
    responses(
        (status = 204, description = "Session ended"),
        (status = 404, description = "Session not found", body = ErrorResponse)
    ),
    params(("id" = Uuid, Path, description = "Session ID"))
)]
pub async fn delete_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    if state.sessions.remove(id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(session_not_found(id))
    }
}
