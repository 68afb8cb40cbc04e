//! Conversational context forwarded to the language model.

use crate::{error::GenerationError, llm_client::LLMClient, message::Message};
use std::sync::Arc;

/// The ordered history of one conversation, bound to an LLM collaborator.
///
/// The history is what the model sees as context. It is separate from the
/// bounded transcript shown to the user and is never trimmed here.
pub struct ChatSession {
    llm: Arc<dyn LLMClient>,
    history: Vec<Message>,
}

impl ChatSession {
    pub fn new(llm: Arc<dyn LLMClient>) -> Self {
        Self {
            llm,
            history: Vec::new(),
        }
    }

    pub fn history(&self) -> &[Message] {
        &self.history
    }

    /// Sends `user_text` with the accumulated history and returns the reply.
    ///
    /// The exchange is added to the history only when the model answers; a
    /// failed call leaves the history as it was.
    pub async fn send(&mut self, user_text: &str) -> Result<String, GenerationError> {
        let reply = self.llm.generate(&self.history, user_text).await?;
        self.history.push(Message::user(user_text));
        self.history.push(Message::bot(reply.clone()));
        Ok(reply)
    }
}
