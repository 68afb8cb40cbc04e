//! Error taxonomy for a conversational turn.
//!
//! Each collaborator has its own error type so the orchestrator can decide
//! per step whether a failure is fatal to the turn. Only [`GenerationError`]
//! aborts a turn; detection and synthesis failures degrade it.

/// The language detector could not tag the input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DetectionError {
    #[error("no language could be detected in the input")]
    Undetermined,
    #[error("detected language '{0}' has no short language code")]
    Unmapped(String),
}

/// The LLM collaborator failed to produce a reply.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerationError {
    #[error("language model unavailable: {0}")]
    Unavailable(String),
    #[error("language model quota exceeded: {0}")]
    QuotaExceeded(String),
    #[error("language model rejected the credentials: {0}")]
    Unauthorized(String),
    #[error("language model blocked the prompt: {0}")]
    Blocked(String),
    #[error("language model returned HTTP {status}: {message}")]
    Rejected { status: u16, message: String },
    #[error("malformed language model response: {0}")]
    Malformed(String),
}

/// The speech synthesizer could not render the reply.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SynthesisError {
    #[error("language '{0}' is not supported by the speech synthesizer")]
    UnsupportedLanguage(String),
    #[error("nothing to speak")]
    EmptyText,
    #[error("speech service unavailable: {0}")]
    Unavailable(String),
    #[error("speech service returned HTTP {status}")]
    Rejected { status: u16 },
}

/// Why a submitted turn produced no transcript entries.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TurnError {
    #[error("message cannot be empty")]
    EmptyInput,
    #[error(transparent)]
    Generation(#[from] GenerationError),
}
