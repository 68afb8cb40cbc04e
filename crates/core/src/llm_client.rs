use crate::{error::GenerationError, message::Message, message::Role};
use async_openai::{
    Client,
    config::OpenAIConfig,
    error::OpenAIError,
    types::{
        ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs,
    },
};
use async_trait::async_trait;
use tracing::debug;

/// Default persona, matching `prompts/system_prompt.md`.
pub const DEFAULT_SYSTEM_INSTRUCTION: &str = "You are an expert chatbot capable of assisting humans in various languages. \
Your task is to engage in conversations across different languages, translate language, \
answer queries, and provide helpful responses. Simplify complex topics, provide relatable \
examples, and ensure responses remain culturally relevant.";

/// Static sampling configuration, fixed once at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationSettings {
    pub model: String,
    pub system_instruction: String,
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
    pub max_output_tokens: u32,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            model: "gemini-1.5-flash".to_string(),
            system_instruction: DEFAULT_SYSTEM_INSTRUCTION.to_string(),
            temperature: 0.0,
            top_p: 0.95,
            top_k: 64,
            max_output_tokens: 8192,
        }
    }
}

/// A hosted language model that continues a conversation.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LLMClient: Send + Sync {
    /// Produces the model's reply to `user_text`, given the prior exchanges.
    ///
    /// `history` holds earlier user and bot messages in order and does not
    /// include `user_text` itself.
    async fn generate(&self, history: &[Message], user_text: &str)
    -> Result<String, GenerationError>;
}

/// An implementation of `LLMClient` for any OpenAI-compatible API.
pub struct OpenAICompatibleClient {
    client: Client<OpenAIConfig>,
    settings: GenerationSettings,
}

impl OpenAICompatibleClient {
    /// Creates a new client for an OpenAI-compatible service.
    ///
    /// # Arguments
    ///
    /// * `config` - API key and base URL of the service.
    /// * `settings` - Model and sampling configuration. The chat completions
    ///   API has no top-k parameter, so `top_k` is ignored.
    pub fn new(config: OpenAIConfig, settings: GenerationSettings) -> Self {
        Self {
            client: Client::with_config(config),
            settings,
        }
    }

    fn build_messages(
        &self,
        history: &[Message],
        user_text: &str,
    ) -> Result<Vec<ChatCompletionRequestMessage>, OpenAIError> {
        let mut messages: Vec<ChatCompletionRequestMessage> = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(self.settings.system_instruction.clone())
                .build()?
                .into(),
        ];
        for msg in history {
            match msg.role {
                Role::User => messages.push(
                    ChatCompletionRequestUserMessageArgs::default()
                        .content(msg.text.clone())
                        .build()?
                        .into(),
                ),
                Role::Bot => messages.push(
                    ChatCompletionRequestAssistantMessageArgs::default()
                        .content(msg.text.clone())
                        .build()?
                        .into(),
                ),
            }
        }
        messages.push(
            ChatCompletionRequestUserMessageArgs::default()
                .content(user_text.to_string())
                .build()?
                .into(),
        );
        Ok(messages)
    }
}

#[async_trait]
impl LLMClient for OpenAICompatibleClient {
    async fn generate(
        &self,
        history: &[Message],
        user_text: &str,
    ) -> Result<String, GenerationError> {
        let messages = self
            .build_messages(history, user_text)
            .map_err(map_openai_error)?;
        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.settings.model)
            .messages(messages)
            .temperature(self.settings.temperature)
            .top_p(self.settings.top_p)
            .max_completion_tokens(self.settings.max_output_tokens)
            .build()
            .map_err(map_openai_error)?;

        debug!(model = %self.settings.model, history_len = history.len(), "Requesting chat completion");
        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(map_openai_error)?;

        response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .filter(|content| !content.is_empty())
            .ok_or_else(|| GenerationError::Malformed("no text content in completion".into()))
    }
}

fn map_openai_error(err: OpenAIError) -> GenerationError {
    match err {
        OpenAIError::Reqwest(e) => GenerationError::Unavailable(e.to_string()),
        OpenAIError::ApiError(api) => {
            if api.message.to_lowercase().contains("quota") {
                GenerationError::QuotaExceeded(api.message)
            } else {
                GenerationError::Rejected {
                    status: 0,
                    message: api.message,
                }
            }
        }
        other => GenerationError::Malformed(other.to_string()),
    }
}

/// Credential-free client that repeats the user's text back.
///
/// Useful for running the service offline and for integration tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct EchoClient;

#[async_trait]
impl LLMClient for EchoClient {
    async fn generate(
        &self,
        history: &[Message],
        user_text: &str,
    ) -> Result<String, GenerationError> {
        let turn = history.iter().filter(|m| m.role == Role::User).count() + 1;
        Ok(format!("[{turn}] {user_text}"))
    }
}
