use parley_core::llm_client::GenerationSettings;
use std::fmt::Display;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::Level;

/// Largest accepted `TRANSCRIPT_LIMIT`.
pub const MAX_TRANSCRIPT_LIMIT: usize = 10_000;

/// Default for `SESSION_IDLE_TIMEOUT_SECS`.
pub const DEFAULT_SESSION_IDLE_TIMEOUT_SECS: u64 = 30 * 60;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVar(String),
    #[error("Invalid value for environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Defines the supported backends for the language model collaborator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Provider {
    Gemini,
    OpenAI,
    /// Offline provider that echoes the user's text; needs no credential.
    Echo,
}

impl Provider {
    fn default_model(&self) -> &'static str {
        match self {
            Provider::Gemini => "gemini-1.5-flash",
            Provider::OpenAI => "gpt-4o",
            Provider::Echo => "echo",
        }
    }
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub provider: Provider,
    pub gemini_api_key: Option<String>,
    pub openai_api_key: Option<String>,
    pub chat_model: String,
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
    pub max_output_tokens: u32,
    pub transcript_limit: usize,
    /// REST sessions idle for longer than this are dropped.
    pub session_idle_timeout: Duration,
    pub default_language: String,
    pub tts_base_url: String,
    pub tts_slow: bool,
    pub log_level: Level,
    pub prompts_path: PathBuf,
}

/// Reads `name` and parses it, falling back to `default` when unset.
fn parse_var<T>(name: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidValue(name.to_string(), format!("'{}': {}", raw, e))),
        Err(_) => Ok(default),
    }
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        let bind_address_str =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let bind_address = bind_address_str
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string()))?;

        let provider_str = std::env::var("LLM_PROVIDER").unwrap_or_else(|_| "gemini".to_string());
        let provider = match provider_str.to_lowercase().as_str() {
            "gemini" => Provider::Gemini,
            "openai" => Provider::OpenAI,
            "echo" => Provider::Echo,
            other => {
                return Err(ConfigError::InvalidValue(
                    "LLM_PROVIDER".to_string(),
                    format!("'{}' is not one of gemini, openai, echo", other),
                ));
            }
        };

        let gemini_api_key = std::env::var("GEMINI_API_KEY").ok();
        let openai_api_key = std::env::var("OPENAI_API_KEY").ok();

        let chat_model =
            std::env::var("CHAT_MODEL").unwrap_or_else(|_| provider.default_model().to_string());

        let temperature = parse_var("TEMPERATURE", 0.0_f32)?;
        if temperature < 0.0 {
            return Err(ConfigError::InvalidValue(
                "TEMPERATURE".to_string(),
                "must not be negative".to_string(),
            ));
        }
        let top_p = parse_var("TOP_P", 0.95_f32)?;
        if !(0.0..=1.0).contains(&top_p) {
            return Err(ConfigError::InvalidValue(
                "TOP_P".to_string(),
                "must be between 0 and 1".to_string(),
            ));
        }
        let top_k = parse_var("TOP_K", 64_u32)?;
        let max_output_tokens = parse_var("MAX_OUTPUT_TOKENS", 8192_u32)?;

        let transcript_limit =
            parse_var("TRANSCRIPT_LIMIT", parley_core::DEFAULT_TRANSCRIPT_LIMIT)?;
        if !(2..=MAX_TRANSCRIPT_LIMIT).contains(&transcript_limit) {
            return Err(ConfigError::InvalidValue(
                "TRANSCRIPT_LIMIT".to_string(),
                format!("must be between 2 and {}", MAX_TRANSCRIPT_LIMIT),
            ));
        }

        let idle_secs =
            parse_var("SESSION_IDLE_TIMEOUT_SECS", DEFAULT_SESSION_IDLE_TIMEOUT_SECS)?;
        if idle_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "SESSION_IDLE_TIMEOUT_SECS".to_string(),
                "must be greater than zero".to_string(),
            ));
        }
        let session_idle_timeout = Duration::from_secs(idle_secs);

        let default_language = std::env::var("DEFAULT_LANGUAGE")
            .unwrap_or_else(|_| parley_core::DEFAULT_LANGUAGE.to_string());
        let tts_base_url = std::env::var("TTS_BASE_URL")
            .unwrap_or_else(|_| parley_core::speech::DEFAULT_TTS_BASE_URL.to_string());
        let tts_slow = parse_var("TTS_SLOW", false)?;

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let prompts_path = std::env::var("PROMPTS_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./prompts"));

        match provider {
            Provider::Gemini => {
                if gemini_api_key.is_none() {
                    return Err(ConfigError::MissingVar(
                        "GEMINI_API_KEY must be set for 'gemini' provider".to_string(),
                    ));
                }
            }
            Provider::OpenAI => {
                if openai_api_key.is_none() {
                    return Err(ConfigError::MissingVar(
                        "OPENAI_API_KEY must be set for 'openai' provider".to_string(),
                    ));
                }
            }
            Provider::Echo => {}
        }

        Ok(Self {
            bind_address,
            provider,
            gemini_api_key,
            openai_api_key,
            chat_model,
            temperature,
            top_p,
            top_k,
            max_output_tokens,
            transcript_limit,
            session_idle_timeout,
            default_language,
            tts_base_url,
            tts_slow,
            log_level,
            prompts_path,
        })
    }

    /// Sampling settings for the language model, with the loaded persona.
    pub fn generation_settings(&self, system_instruction: String) -> GenerationSettings {
        GenerationSettings {
            model: self.chat_model.clone(),
            system_instruction,
            temperature: self.temperature,
            top_p: self.top_p,
            top_k: self.top_k,
            max_output_tokens: self.max_output_tokens,
        }
    }
}
