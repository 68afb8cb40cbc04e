//! Language detection for user input.

use crate::error::DetectionError;
use tracing::debug;

/// Tags a piece of text with a short (ISO-639-1 style) language code.
#[cfg_attr(test, mockall::automock)]
pub trait LanguageDetector: Send + Sync {
    fn detect(&self, text: &str) -> Result<String, DetectionError>;
}

/// Offline detector backed by `whatlang` trigram models.
#[derive(Debug, Default, Clone, Copy)]
pub struct WhatlangDetector;

impl LanguageDetector for WhatlangDetector {
    fn detect(&self, text: &str) -> Result<String, DetectionError> {
        let info = whatlang::detect(text).ok_or(DetectionError::Undetermined)?;
        let long_code = info.lang().code();
        let code = short_code(long_code)
            .ok_or_else(|| DetectionError::Unmapped(long_code.to_string()))?;
        debug!(
            language = code,
            confidence = info.confidence(),
            reliable = info.is_reliable(),
            "Detected input language"
        );
        Ok(code.to_string())
    }
}

/// `whatlang` ISO-639-3 codes and the short codes speech services expect.
const SHORT_CODES: &[(&str, &str)] = &[
    ("afr", "af"), ("aka", "ak"), ("amh", "am"), ("ara", "ar"), ("aze", "az"), ("bel", "be"),
    ("ben", "bn"), ("bul", "bg"), ("cat", "ca"), ("ces", "cs"), ("cmn", "zh-CN"), ("dan", "da"),
    ("deu", "de"), ("ell", "el"), ("eng", "en"), ("epo", "eo"), ("est", "et"), ("fin", "fi"),
    ("fra", "fr"), ("guj", "gu"), ("heb", "he"), ("hin", "hi"), ("hrv", "hr"), ("hun", "hu"),
    ("hye", "hy"), ("ind", "id"), ("ita", "it"), ("jav", "jv"), ("jpn", "ja"), ("kan", "kn"),
    ("kat", "ka"), ("khm", "km"), ("kor", "ko"), ("lat", "la"), ("lav", "lv"), ("lit", "lt"),
    ("mal", "ml"), ("mar", "mr"), ("mkd", "mk"), ("mya", "my"), ("nep", "ne"), ("nld", "nl"),
    ("nob", "no"), ("ori", "or"), ("pan", "pa"), ("pes", "fa"), ("pol", "pl"), ("por", "pt"),
    ("ron", "ro"), ("rus", "ru"), ("sin", "si"), ("slk", "sk"), ("slv", "sl"), ("sna", "sn"),
    ("spa", "es"), ("srp", "sr"), ("swe", "sv"), ("tam", "ta"), ("tel", "te"), ("tgl", "tl"),
    ("tha", "th"), ("tuk", "tk"), ("tur", "tr"), ("ukr", "uk"), ("urd", "ur"), ("uzb", "uz"),
    ("vie", "vi"), ("yid", "yi"), ("zul", "zu"),
];

/// Maps a `whatlang` ISO-639-3 code to its short code.
fn short_code(iso639_3: &str) -> Option<&'static str> {
    SHORT_CODES
        .iter()
        .find(|(long, _)| *long == iso639_3)
        .map(|(_, short)| *short)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detects_english() {
        let code = WhatlangDetector
            .detect("The quick brown fox jumps over the lazy dog and runs into the forest.")
            .unwrap();
        assert_eq!(code, "en");
    }

    #[test]
    fn test_detects_french() {
        let code = WhatlangDetector
            .detect("Bonjour, je voudrais réserver une table pour deux personnes ce soir, s'il vous plaît.")
            .unwrap();
        assert_eq!(code, "fr");
    }

    #[test]
    fn test_detects_japanese_by_script() {
        let code = WhatlangDetector
            .detect("こんにちは、今日はとても良い天気ですね。")
            .unwrap();
        assert_eq!(code, "ja");
    }

    #[test]
    fn test_text_without_letters_is_undetermined() {
        let err = WhatlangDetector.detect("12345 !!! ???").unwrap_err();
        assert_eq!(err, DetectionError::Undetermined);
    }

    #[test]
    fn test_empty_text_is_undetermined() {
        assert_eq!(
            WhatlangDetector.detect("").unwrap_err(),
            DetectionError::Undetermined
        );
    }

    #[test]
    fn test_short_code_mapping() {
        assert_eq!(short_code("eng"), Some("en"));
        assert_eq!(short_code("cmn"), Some("zh-CN"));
        assert_eq!(short_code("pes"), Some("fa"));
        assert_eq!(short_code("xyz"), None);
    }

    #[test]
    fn test_hebrew_is_voiced_under_its_translate_spelling() {
        let code = WhatlangDetector
            .detect("שלום, מה שלומך היום? אני רוצה להזמין שולחן לשני אנשים הערב.")
            .unwrap();
        assert_eq!(code, "he");
        assert_eq!(crate::speech::supported_language(&code), Some("iw"));
    }

    #[test]
    fn test_every_short_code_is_voiced_or_known_unvoiced() {
        // Detectable, but the translate TTS endpoint has no voice for them.
        const UNVOICED: &[&str] = &[
            "ak", "am", "az", "be", "ka", "or", "pa", "sn", "tk", "uz", "yi", "zu", "lt", "sl",
            "fa",
        ];
        for (long, short) in SHORT_CODES {
            let voiced = crate::speech::supported_language(short).is_some();
            assert_eq!(
                voiced,
                !UNVOICED.contains(short),
                "{long} -> {short}: voiced = {voiced}"
            );
        }
    }
}
