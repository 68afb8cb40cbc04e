//! Google Gemini client over the native `generateContent` REST endpoint.

use crate::{
    error::GenerationError,
    llm_client::{GenerationSettings, LLMClient},
    message::{Message, Role},
};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Harm categories and the threshold each is blocked at.
const SAFETY_SETTINGS: [(&str, &str); 4] = [
    ("HARM_CATEGORY_HARASSMENT", "BLOCK_NONE"),
    ("HARM_CATEGORY_HATE_SPEECH", "BLOCK_MEDIUM_AND_ABOVE"),
    ("HARM_CATEGORY_SEXUALLY_EXPLICIT", "BLOCK_MEDIUM_AND_ABOVE"),
    ("HARM_CATEGORY_DANGEROUS_CONTENT", "BLOCK_MEDIUM_AND_ABOVE"),
];

/// Gemini service implementation of [`LLMClient`].
pub struct GeminiClient {
    client: Client,
    api_key: String,
    base_url: String,
    settings: GenerationSettings,
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>, settings: GenerationSettings) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            settings,
        }
    }

    /// Points the client at a different API root (a proxy or gateway).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.settings.model
        )
    }

    fn build_request(&self, history: &[Message], user_text: &str) -> GenerateContentRequest {
        let mut contents: Vec<Content> = history
            .iter()
            .map(|msg| Content::text(gemini_role(msg.role), &msg.text))
            .collect();
        contents.push(Content::text("user", user_text));

        GenerateContentRequest {
            contents,
            system_instruction: (!self.settings.system_instruction.is_empty()).then(|| Content {
                role: None,
                parts: vec![Part {
                    text: Some(self.settings.system_instruction.clone()),
                }],
            }),
            generation_config: GenerationConfig {
                temperature: self.settings.temperature,
                top_p: self.settings.top_p,
                top_k: self.settings.top_k,
                max_output_tokens: self.settings.max_output_tokens,
                response_mime_type: "text/plain".to_string(),
            },
            safety_settings: SAFETY_SETTINGS
                .iter()
                .map(|(category, threshold)| SafetySetting {
                    category: category.to_string(),
                    threshold: threshold.to_string(),
                })
                .collect(),
        }
    }
}

fn gemini_role(role: Role) -> &'static str {
    match role {
        Role::User => "user",
        Role::Bot => "model",
    }
}

/// Pulls the reply text out of a successful response body.
fn extract_reply(response: GenerateContentResponse) -> Result<String, GenerationError> {
    let Some(candidate) = response.candidates.into_iter().next() else {
        return Err(match response.prompt_feedback.and_then(|f| f.block_reason) {
            Some(reason) => GenerationError::Blocked(reason),
            None => GenerationError::Malformed("no candidates in response".into()),
        });
    };

    let text: String = candidate
        .content
        .map(|content| content.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if !text.is_empty() {
        return Ok(text);
    }
    match candidate.finish_reason.as_deref() {
        Some(reason @ ("SAFETY" | "RECITATION" | "BLOCKLIST" | "PROHIBITED_CONTENT")) => {
            Err(GenerationError::Blocked(reason.to_string()))
        }
        _ => Err(GenerationError::Malformed("candidate has no text".into())),
    }
}

/// Classifies a non-success HTTP response.
fn classify_failure(status: u16, body: &str) -> GenerationError {
    let (message, api_status) = match serde_json::from_str::<ErrorResponse>(body) {
        Ok(resp) => (resp.error.message, resp.error.status),
        Err(_) => (body.to_string(), None),
    };
    if status == 429 || api_status.as_deref() == Some("RESOURCE_EXHAUSTED") {
        return GenerationError::QuotaExceeded(message);
    }
    match status {
        401 | 403 => GenerationError::Unauthorized(message),
        500..=599 => GenerationError::Unavailable(format!("HTTP {status}: {message}")),
        _ => GenerationError::Rejected { status, message },
    }
}

#[async_trait]
impl LLMClient for GeminiClient {
    async fn generate(
        &self,
        history: &[Message],
        user_text: &str,
    ) -> Result<String, GenerationError> {
        let request = self.build_request(history, user_text);
        debug!(model = %self.settings.model, history_len = history.len(), "Calling Gemini generateContent");

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| GenerationError::Unavailable(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| GenerationError::Unavailable(format!("failed to read response: {e}")))?;

        if !status.is_success() {
            return Err(classify_failure(status.as_u16(), &body));
        }

        let parsed: GenerateContentResponse = serde_json::from_str(&body)
            .map_err(|e| GenerationError::Malformed(e.to_string()))?;
        extract_reply(parsed)
    }
}

// Gemini API types

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    generation_config: GenerationConfig,
    safety_settings: Vec<SafetySetting>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

impl Content {
    fn text(role: &str, text: &str) -> Self {
        Self {
            role: Some(role.to_string()),
            parts: vec![Part {
                text: Some(text.to_string()),
            }],
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    top_p: f32,
    top_k: u32,
    max_output_tokens: u32,
    response_mime_type: String,
}

#[derive(Debug, Serialize)]
struct SafetySetting {
    category: String,
    threshold: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
    status: Option<String>,
}
