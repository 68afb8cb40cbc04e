//! Turn orchestration: detect, generate, synthesize, record.
//!
//! A turn runs its steps strictly in sequence because each step consumes the
//! previous step's output. Only a generation failure aborts the turn; a
//! detection failure falls back to the default language and a synthesis
//! failure drops the audio. Either way the exchange is recorded.

use crate::{
    error::TurnError,
    language::LanguageDetector,
    llm_client::LLMClient,
    message::Message,
    session::ChatSession,
    speech::{AudioClip, SpeechSynthesizer},
    transcript::Transcript,
};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Steps of a single turn. Every turn starts and ends in `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    Idle,
    Detecting,
    Generating,
    Synthesizing,
    Recording,
}

/// The external services a conversation depends on.
#[derive(Clone)]
pub struct Collaborators {
    pub llm: Arc<dyn LLMClient>,
    pub detector: Arc<dyn LanguageDetector>,
    pub synthesizer: Arc<dyn SpeechSynthesizer>,
}

/// Which best-effort step degraded a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Detection,
    Synthesis,
}

/// A non-blocking problem to show alongside an otherwise successful turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

/// Everything the presentation layer needs after a successful turn.
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    pub user: Message,
    pub bot: Message,
    pub language: String,
    pub audio: Option<AudioClip>,
    pub notices: Vec<Notice>,
}

/// Drives turns for one conversation and owns its transcript.
pub struct TurnOrchestrator {
    detector: Arc<dyn LanguageDetector>,
    synthesizer: Arc<dyn SpeechSynthesizer>,
    session: ChatSession,
    transcript: Transcript,
    default_language: String,
    state: TurnState,
}

impl TurnOrchestrator {
    pub fn new(collaborators: &Collaborators, transcript_limit: usize) -> Self {
        Self {
            detector: collaborators.detector.clone(),
            synthesizer: collaborators.synthesizer.clone(),
            session: ChatSession::new(collaborators.llm.clone()),
            transcript: Transcript::new(transcript_limit),
            default_language: crate::DEFAULT_LANGUAGE.to_string(),
            state: TurnState::Idle,
        }
    }

    /// Overrides the language used when detection fails.
    pub fn with_default_language(mut self, language: impl Into<String>) -> Self {
        self.default_language = language.into();
        self
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn session(&self) -> &ChatSession {
        &self.session
    }

    pub fn state(&self) -> TurnState {
        self.state
    }

    fn enter(&mut self, next: TurnState) {
        debug!(from = ?self.state, to = ?next, "Turn state transition");
        self.state = next;
    }

    /// Runs one turn for `input`.
    ///
    /// On success the transcript has gained the user message and the bot
    /// message, in that order, and is back within its limit. On error the
    /// transcript is unchanged.
    pub async fn submit(&mut self, input: &str) -> Result<TurnOutcome, TurnError> {
        if input.trim().is_empty() {
            return Err(TurnError::EmptyInput);
        }
        if self.state != TurnState::Idle {
            // A previous turn was dropped mid-flight; nothing was recorded.
            warn!(state = ?self.state, "Resetting interrupted turn");
            self.state = TurnState::Idle;
        }
        let mut notices = Vec::new();

        self.enter(TurnState::Detecting);
        let language = match self.detector.detect(input) {
            Ok(code) => code,
            Err(e) => {
                warn!(error = %e, fallback = %self.default_language, "Language detection failed");
                notices.push(Notice {
                    kind: NoticeKind::Detection,
                    message: format!("Error detecting language: {e}"),
                });
                self.default_language.clone()
            }
        };

        self.enter(TurnState::Generating);
        let reply = match self.session.send(input).await {
            Ok(reply) => reply,
            Err(e) => {
                error!(error = %e, "Generation failed; discarding turn");
                self.enter(TurnState::Idle);
                return Err(e.into());
            }
        };

        self.enter(TurnState::Synthesizing);
        let audio = match self.synthesizer.synthesize(&reply, &language).await {
            Ok(clip) => Some(clip),
            Err(e) => {
                warn!(error = %e, language = %language, "Speech synthesis failed");
                notices.push(Notice {
                    kind: NoticeKind::Synthesis,
                    message: format!("Error generating audio: {e}"),
                });
                None
            }
        };

        self.enter(TurnState::Recording);
        let user = Message::user(input);
        let bot = Message::bot(reply);
        self.transcript.record_exchange(user.clone(), bot.clone());
        info!(
            language = %language,
            has_audio = audio.is_some(),
            transcript_len = self.transcript.len(),
            "Turn recorded"
        );
        self.enter(TurnState::Idle);

        Ok(TurnOutcome {
            user,
            bot,
            language,
            audio,
            notices,
        })
    }
}
