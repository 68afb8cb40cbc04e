//! Encoding of synthesized reply audio for JSON transports.

use crate::models::AudioPayload;
use base64::Engine;
use parley_core::speech::AudioClip;

/// Consumes a clip and encodes it for delivery; the raw buffer is released.
pub fn encode_clip(clip: AudioClip) -> AudioPayload {
    AudioPayload {
        data: base64::engine::general_purpose::STANDARD.encode(&clip.data),
        mime_type: clip.mime_type,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_clip() {
        let payload = encode_clip(AudioClip::mp3(vec![0xFF, 0xFB, 0x90, 0x00]));
        assert_eq!(payload.mime_type, "audio/mpeg");
        assert_eq!(payload.data, "//uQAA==");
    }

    #[test]
    fn test_encode_empty_clip() {
        let payload = encode_clip(AudioClip::mp3(Vec::new()));
        assert!(payload.data.is_empty());
    }
}
