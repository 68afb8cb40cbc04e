//! Manages the WebSocket connection lifecycle for a chat session.

use super::protocol::{ClientMessage, ServerMessage};
use crate::{models::TurnResponse, state::AppState};
use anyhow::Result;
use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use parley_core::{error::TurnError, turn::TurnOrchestrator};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

/// Axum handler to upgrade an HTTP connection to a WebSocket.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> Response {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

/// Main handler for an individual WebSocket connection.
///
/// Creates the connection's conversation, announces it to the client and then
/// processes user messages one at a time until the socket closes.
#[instrument(name = "ws_session", skip_all, fields(session_id))]
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let session_id = Uuid::new_v4();
    tracing::Span::current().record("session_id", tracing::field::display(session_id));
    info!("New WebSocket connection.");

    let (mut socket_tx, socket_rx) = socket.split();
    let conversation = state.new_conversation();

    if send_msg(
        &mut socket_tx,
        ServerMessage::Initialized {
            session_id,
            transcript_limit: conversation.transcript().limit(),
        },
    )
    .await
    .is_err()
    {
        error!("Failed to send Initialized message to client.");
        return;
    }

    if let Err(e) = run_chat_session(conversation, socket_tx, socket_rx).await {
        error!(error = ?e, "Chat session terminated with error.");
    }
    info!("WebSocket connection closed; transcript discarded.");
}

/// The main event loop for an active WebSocket session.
///
/// Messages are handled sequentially, so at most one turn runs at a time.
/// Each turn is announced with `thinking` before it runs.
async fn run_chat_session<S, R>(
    mut conversation: TurnOrchestrator,
    mut socket_tx: S,
    mut socket_rx: R,
) -> Result<()>
where
    S: Sink<Message> + Unpin,
    S::Error: std::error::Error + Send + Sync + 'static,
    R: Stream<Item = Result<Message, axum::Error>> + Unpin,
{
    while let Some(msg_result) = socket_rx.next().await {
        match msg_result {
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientMessage>(&text) {
                Ok(ClientMessage::UserMessage { text }) => {
                    if text.trim().is_empty() {
                        continue;
                    }
                    send_msg(&mut socket_tx, ServerMessage::Thinking).await?;
                    let reply = run_turn(&mut conversation, &text).await;
                    send_msg(&mut socket_tx, reply).await?;
                }
                Err(e) => {
                    warn!(error = %e, "Ignoring unrecognized client message.");
                    send_msg(
                        &mut socket_tx,
                        ServerMessage::Error {
                            message: format!("Unrecognized message: {}", e),
                        },
                    )
                    .await?;
                }
            },
            Ok(Message::Binary(_)) => warn!("Ignoring binary frame; only text messages are supported."),
            Ok(Message::Close(_)) => {
                info!("Client sent close frame. Shutting down session.");
                break;
            }
            Ok(Message::Ping(_) | Message::Pong(_)) => {}
            Err(e) => {
                error!("Error receiving from client WebSocket: {:?}", e);
                break;
            }
        }
    }
    Ok(())
}

/// Runs one turn and converts its result into the message for the client.
async fn run_turn(conversation: &mut TurnOrchestrator, text: &str) -> ServerMessage {
    match conversation.submit(text).await {
        Ok(outcome) => ServerMessage::Turn(TurnResponse::from(outcome)),
        Err(TurnError::EmptyInput) => ServerMessage::Error {
            message: TurnError::EmptyInput.to_string(),
        },
        Err(TurnError::Generation(e)) => ServerMessage::Error {
            message: format!("Could not get a reply: {}", e),
        },
    }
}

/// A helper function to serialize and send a `ServerMessage` to the client.
pub(crate) async fn send_msg<S>(socket_tx: &mut S, msg: ServerMessage) -> Result<()>
where
    S: Sink<Message> + Unpin,
    S::Error: std::error::Error + Send + Sync + 'static,
{
    let serialized = serde_json::to_string(&msg)?;
    socket_tx.send(Message::Text(serialized.into())).await?;
    Ok(())
}
