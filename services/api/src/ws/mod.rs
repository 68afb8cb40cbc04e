//! WebSocket Chat Sessions
//!
//! Each WebSocket connection is one chat session: the connection task owns the
//! conversation, so its transcript lives exactly as long as the socket.
//!
//! - `protocol`: Defines the JSON-based message format for client-server communication.
//! - `session`: Manages the connection lifecycle and runs turns as messages arrive.

pub mod protocol;
pub mod session;

pub use session::ws_handler;
