//! API Models
//!
//! This module defines the request and response bodies of the REST and
//! WebSocket interfaces, annotated for OpenAPI generation with `utoipa`.

use chrono::{DateTime, Utc};
use parley_core::{
    message::{Message, Role},
    turn::{self, TurnOutcome},
};
use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, Copy, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Bot,
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageRole::User => write!(f, "user"),
            MessageRole::Bot => write!(f, "bot"),
        }
    }
}

impl From<Role> for MessageRole {
    fn from(role: Role) -> Self {
        match role {
            Role::User => MessageRole::User,
            Role::Bot => MessageRole::Bot,
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, PartialEq)]
pub struct ChatMessage {
    #[schema(example = "user")]
    pub role: MessageRole,
    #[schema(example = "Hello")]
    pub text: String,
}

impl From<Message> for ChatMessage {
    fn from(message: Message) -> Self {
        Self {
            role: message.role.into(),
            text: message.text,
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone)]
pub struct SessionCreated {
    #[schema(value_type = String, format = Uuid)]
    pub session_id: Uuid,
    #[schema(example = 50)]
    pub transcript_limit: usize,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone)]
pub struct TranscriptResponse {
    pub messages: Vec<ChatMessage>,
}

#[derive(Deserialize, ToSchema)]
pub struct SubmitTurnPayload {
    #[schema(example = "Bonjour, comment ça va ?")]
    pub text: String,
}

/// Base64-encoded reply audio.
#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, PartialEq)]
pub struct AudioPayload {
    #[schema(example = "audio/mpeg")]
    pub mime_type: String,
    pub data: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, Copy, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum NoticeKind {
    Detection,
    Synthesis,
}

impl From<turn::NoticeKind> for NoticeKind {
    fn from(kind: turn::NoticeKind) -> Self {
        match kind {
            turn::NoticeKind::Detection => NoticeKind::Detection,
            turn::NoticeKind::Synthesis => NoticeKind::Synthesis,
        }
    }
}

/// A non-blocking warning attached to a completed turn.
#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, PartialEq)]
pub struct NoticePayload {
    pub kind: NoticeKind,
    pub message: String,
}

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone)]
pub struct TurnResponse {
    pub user: ChatMessage,
    pub bot: ChatMessage,
    #[schema(example = "fr")]
    pub language: String,
    pub audio: Option<AudioPayload>,
    pub notices: Vec<NoticePayload>,
}

impl From<TurnOutcome> for TurnResponse {
    fn from(outcome: TurnOutcome) -> Self {
        Self {
            user: outcome.user.into(),
            bot: outcome.bot.into(),
            language: outcome.language,
            audio: outcome.audio.map(crate::audio::encode_clip),
            notices: outcome
                .notices
                .into_iter()
                .map(|n| NoticePayload {
                    kind: n.kind.into(),
                    message: n.message,
                })
                .collect(),
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    #[schema(example = "ok")]
    pub status: String,
}

#[derive(Serialize, ToSchema)]
pub struct ErrorResponse {
    pub message: String,
}
