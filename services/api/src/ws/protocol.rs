//! Defines the WebSocket message protocol between the browser client and the API server.

use crate::models::TurnResponse;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Messages sent from the client (browser) to the server.
#[derive(Deserialize, Debug)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// A text message from the user.
    UserMessage { text: String },
}

/// Messages sent from the server to the client (browser).
#[derive(Serialize, Debug, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Sent once when the connection opens.
    Initialized {
        session_id: Uuid,
        transcript_limit: usize,
    },
    /// A turn has started; the reply is being prepared.
    Thinking,
    /// A completed turn: both messages, the detected language and optional audio.
    Turn(TurnResponse),
    /// The current turn failed and was discarded, or the input was not understood.
    Error { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ChatMessage, MessageRole};

    #[test]
    fn test_user_message_deserialization() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"type":"user_message","text":"Hello"}"#).unwrap();
        let ClientMessage::UserMessage { text } = msg;
        assert_eq!(text, "Hello");
    }

    #[test]
    fn test_unknown_client_message_is_rejected() {
        let result: Result<ClientMessage, _> = serde_json::from_str(r#"{"type":"init"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_server_message_tags() {
        let json = serde_json::to_value(ServerMessage::Thinking).unwrap();
        assert_eq!(json, serde_json::json!({ "type": "thinking" }));

        let json = serde_json::to_value(ServerMessage::Error {
            message: "boom".to_string(),
        })
        .unwrap();
        assert_eq!(json["type"], "error");
        assert_eq!(json["message"], "boom");
    }

    #[test]
    fn test_turn_message_is_flattened() {
        let turn = TurnResponse {
            user: ChatMessage {
                role: MessageRole::User,
                text: "Hello".to_string(),
            },
            bot: ChatMessage {
                role: MessageRole::Bot,
                text: "Hi there!".to_string(),
            },
            language: "en".to_string(),
            audio: None,
            notices: vec![],
        };
        let json = serde_json::to_value(ServerMessage::Turn(turn)).unwrap();
        assert_eq!(json["type"], "turn");
        assert_eq!(json["bot"]["text"], "Hi there!");
        assert_eq!(json["language"], "en");
    }
}
