//! The `data:<mime>;base64,<payload>` convention for inline assets.
//!
//! Reference images travel to providers inline-encoded, and the synchronous
//! image provider returns its result the same way. The framing here must
//! stay bit-for-bit compatible with what the providers emit and accept.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

use crate::error::CoreError;

/// Scheme prefix shared by all inline payloads.
pub const DATA_URL_PREFIX: &str = "data:";

/// Encode raw bytes as a `data:<mime>;base64,<payload>` string.
pub fn encode(mime_type: &str, bytes: &[u8]) -> String {
    format!("{DATA_URL_PREFIX}{mime_type};base64,{}", BASE64.encode(bytes))
}

/// True if `value` uses the data-URL scheme.
pub fn is_data_url(value: &str) -> bool {
    value.starts_with(DATA_URL_PREFIX)
}

/// Split a data URL into `(mime_type, base64_payload)` without decoding.
///
/// Adapters that forward the payload base64-encoded anyway use this to avoid
/// a decode/re-encode round trip.
pub fn split(data_url: &str) -> Result<(&str, &str), CoreError> {
    if !is_data_url(data_url) {
        return Err(CoreError::Validation("Not a data URL".to_string()));
    }
    let (header, payload) = data_url
        .split_once(',')
        .ok_or_else(|| CoreError::Validation("Malformed data URL: missing payload".to_string()))?;
    let mime_type = header
        .trim_start_matches(DATA_URL_PREFIX)
        .trim_end_matches(";base64");
    Ok((mime_type, payload))
}

/// Decode a data URL into `(mime_type, bytes)`.
pub fn decode(data_url: &str) -> Result<(String, Vec<u8>), CoreError> {
    let (mime_type, payload) = split(data_url)?;
    let bytes = BASE64
        .decode(payload)
        .map_err(|e| CoreError::Validation(format!("Invalid base64 payload: {e}")))?;
    Ok((mime_type.to_string(), bytes))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_decode_round_trip_is_byte_identical() {
        let original: Vec<u8> = (0u8..=255).collect();
        let url = encode("image/png", &original);
        let (mime, bytes) = decode(&url).unwrap();
        assert_eq!(mime, "image/png");
        assert_eq!(bytes, original);
    }

    #[test]
    fn split_keeps_payload_encoded() {
        let url = encode("image/jpeg", b"hello");
        let (mime, payload) = split(&url).unwrap();
        assert_eq!(mime, "image/jpeg");
        assert_eq!(payload, BASE64.encode(b"hello"));
    }

    #[test]
    fn decode_rejects_non_data_url() {
        assert!(decode("https://example.com/image.png").is_err());
    }

    #[test]
    fn decode_rejects_missing_payload() {
        assert!(decode("data:image/png;base64").is_err());
    }

    #[test]
    fn decode_rejects_invalid_base64() {
        assert!(decode("data:image/png;base64,!!!not-base64!!!").is_err());
    }

    #[test]
    fn is_data_url_discriminates() {
        assert!(is_data_url("data:image/png;base64,AAAA"));
        assert!(!is_data_url("http://example.com/a.png"));
    }
}
