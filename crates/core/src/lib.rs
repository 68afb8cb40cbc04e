pub mod error;
pub mod gemini;
pub mod language;
pub mod llm_client;
pub mod message;
pub mod session;
pub mod speech;
pub mod transcript;
pub mod turn;

/// Language code used when detection fails and nothing else is configured.
pub const DEFAULT_LANGUAGE: &str = "en";

/// Number of messages a transcript keeps before evicting the oldest.
pub const DEFAULT_TRANSCRIPT_LIMIT: usize = 50;
