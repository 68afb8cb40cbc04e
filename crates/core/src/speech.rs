//! Text-to-speech for bot replies.

use crate::error::SynthesisError;
use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use reqwest::Client;
use tracing::debug;

pub const DEFAULT_TTS_BASE_URL: &str = "https://translate.google.com";

/// Longest text the translate TTS endpoint accepts in one request.
pub const MAX_CHARS_PER_REQUEST: usize = 100;

/// Language codes the translate TTS endpoint can voice.
const SUPPORTED_LANGUAGES: &[&str] = &[
    "af", "ar", "bg", "bn", "bs", "ca", "cs", "cy", "da", "de", "el", "en", "eo", "es", "et",
    "fi", "fr", "gu", "hi", "hr", "hu", "hy", "id", "is", "it", "iw", "ja", "jw", "km", "kn",
    "ko", "la", "lv", "mk", "ml", "mr", "ms", "my", "ne", "nl", "no", "pl", "pt", "ro", "ru",
    "si", "sk", "sq", "sr", "su", "sv", "sw", "ta", "te", "th", "tl", "tr", "uk", "ur", "vi",
    "zh", "zh-CN", "zh-TW",
];

/// Characters after which text may be split between requests.
const BREAK_CHARS: &[char] = &[
    '.', '!', '?', ';', ':', ',', '\n', '。', '！', '？', '；', '，', '、',
];

/// A synthesized, compressed audio artifact held in memory.
///
/// Owned by the turn that produced it and dropped once delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioClip {
    pub mime_type: String,
    pub data: Bytes,
}

impl AudioClip {
    pub fn mp3(data: impl Into<Bytes>) -> Self {
        Self {
            mime_type: "audio/mpeg".to_string(),
            data: data.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Renders text as speech in a given language.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, text: &str, language: &str) -> Result<AudioClip, SynthesisError>;
}

/// Speech synthesizer backed by the Google Translate TTS endpoint.
pub struct GoogleTranslateTts {
    client: Client,
    base_url: String,
    slow: bool,
}

impl Default for GoogleTranslateTts {
    fn default() -> Self {
        Self::new(DEFAULT_TTS_BASE_URL, false)
    }
}

impl GoogleTranslateTts {
    pub fn new(base_url: impl Into<String>, slow: bool) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            slow,
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/translate_tts", self.base_url.trim_end_matches('/'))
    }

    async fn fetch_chunk(
        &self,
        chunk: &str,
        language: &str,
        idx: usize,
        total: usize,
    ) -> Result<Bytes, SynthesisError> {
        let speed = if self.slow { "0.3" } else { "1" };
        let total = total.to_string();
        let idx = idx.to_string();
        let textlen = chunk.chars().count().to_string();
        let response = self
            .client
            .get(self.endpoint())
            .query(&[
                ("ie", "UTF-8"),
                ("client", "tw-ob"),
                ("tl", language),
                ("q", chunk),
                ("ttsspeed", speed),
                ("total", total.as_str()),
                ("idx", idx.as_str()),
                ("textlen", textlen.as_str()),
            ])
            .send()
            .await
            .map_err(|e| SynthesisError::Unavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SynthesisError::Rejected {
                status: status.as_u16(),
            });
        }
        response
            .bytes()
            .await
            .map_err(|e| SynthesisError::Unavailable(e.to_string()))
    }
}

#[async_trait]
impl SpeechSynthesizer for GoogleTranslateTts {
    async fn synthesize(&self, text: &str, language: &str) -> Result<AudioClip, SynthesisError> {
        let language = supported_language(language)
            .ok_or_else(|| SynthesisError::UnsupportedLanguage(language.to_string()))?;
        let chunks = split_text(text, MAX_CHARS_PER_REQUEST);
        if chunks.is_empty() {
            return Err(SynthesisError::EmptyText);
        }

        debug!(language, chunks = chunks.len(), "Synthesizing reply audio");
        let mut audio = BytesMut::new();
        for (idx, chunk) in chunks.iter().enumerate() {
            let frames = self.fetch_chunk(chunk, language, idx, chunks.len()).await?;
            audio.extend_from_slice(&frames);
        }
        Ok(AudioClip::mp3(audio.freeze()))
    }
}

/// ISO-639-1 codes the endpoint only accepts under an older spelling.
const LANGUAGE_ALIASES: &[(&str, &str)] = &[("he", "iw"), ("jv", "jw")];

/// Returns the canonical spelling of `language` if the endpoint supports it.
pub fn supported_language(language: &str) -> Option<&'static str> {
    let language = LANGUAGE_ALIASES
        .iter()
        .find(|(iso, _)| iso.eq_ignore_ascii_case(language))
        .map_or(language, |(_, alias)| *alias);
    SUPPORTED_LANGUAGES
        .iter()
        .copied()
        .find(|code| code.eq_ignore_ascii_case(language))
}

/// Splits text into request-sized chunks of at most `max_chars` characters.
///
/// Sentences and clauses are kept whole when they fit; longer ones are split
/// at whitespace, and single words longer than the limit are cut.
pub fn split_text(text: &str, max_chars: usize) -> Vec<String> {
    let mut units: Vec<String> = Vec::new();
    for segment in text.split_inclusive(BREAK_CHARS) {
        let segment = segment.trim();
        if segment.is_empty() || segment.chars().all(|c| BREAK_CHARS.contains(&c)) {
            continue;
        }
        if segment.chars().count() <= max_chars {
            units.push(segment.to_string());
            continue;
        }
        for word in segment.split_whitespace() {
            let chars: Vec<char> = word.chars().collect();
            units.extend(chars.chunks(max_chars).map(|c| c.iter().collect::<String>()));
        }
    }

    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;
    for unit in units {
        let unit_len = unit.chars().count();
        if current.is_empty() {
            current = unit;
            current_len = unit_len;
        } else if current_len + 1 + unit_len <= max_chars {
            current.push(' ');
            current.push_str(&unit);
            current_len += 1 + unit_len;
        } else {
            chunks.push(std::mem::replace(&mut current, unit));
            current_len = unit_len;
        }
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}
