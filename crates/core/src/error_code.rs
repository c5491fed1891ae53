//! Closed taxonomy of generation failure codes and the free-text classifier.
//!
//! Providers report failures as free text. The classifier maps that text to
//! exactly one code by testing substrings in a fixed priority order; the
//! first matching category wins.

// ---------------------------------------------------------------------------
// Taxonomy
// ---------------------------------------------------------------------------

/// Why a generation failed. Every failed job carries exactly one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationErrorCode {
    /// The provider account is out of quota or balance.
    InsufficientQuota,
    /// The API key was rejected.
    InvalidApiKey,
    /// The provider or the poll budget timed out.
    Timeout,
    /// Transport-level failure (DNS, connect, reset).
    NetworkError,
    /// The provider rejected the request as malformed.
    InvalidRequest,
    /// The provider reported an internal / upstream error.
    ApiError,
    /// The selected provider cannot perform the requested kind of work.
    UnsupportedFeature,
    /// Nothing in the message matched a known category.
    Unknown,
}

impl GenerationErrorCode {
    /// Database / wire value.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InsufficientQuota => "insufficient_quota",
            Self::InvalidApiKey => "invalid_api_key",
            Self::Timeout => "timeout",
            Self::NetworkError => "network_error",
            Self::InvalidRequest => "invalid_request",
            Self::ApiError => "api_error",
            Self::UnsupportedFeature => "unsupported_feature",
            Self::Unknown => "unknown",
        }
    }

    /// All taxonomy values, in classifier priority order.
    pub const ALL: [GenerationErrorCode; 8] = [
        Self::InsufficientQuota,
        Self::InvalidApiKey,
        Self::Timeout,
        Self::NetworkError,
        Self::InvalidRequest,
        Self::ApiError,
        Self::UnsupportedFeature,
        Self::Unknown,
    ];
}

// ---------------------------------------------------------------------------
// Classifier
// ---------------------------------------------------------------------------

/// Substring sets per category, tested against the lowercased message.
/// Order matters: the first category with a hit wins.
const QUOTA_MARKERS: &[&str] = &["insufficient quota", "quota failed", "quota exceeded", "balance"];
const KEY_MARKERS: &[&str] = &["invalid api key", "unauthorized", "401", "authentication failed"];
const TIMEOUT_MARKERS: &[&str] = &["timeout", "timed out", "deadline exceeded"];
const NETWORK_MARKERS: &[&str] = &["network", "connection", "dns", "dial"];
const REQUEST_MARKERS: &[&str] = &["invalid request", "invalid url", "bad request", "400"];
const API_MARKERS: &[&str] = &["api error", "internal error", "500", "502", "503"];
const UNSUPPORTED_MARKERS: &[&str] = &["not supported", "unsupported"];

/// Map a provider error message to a [`GenerationErrorCode`].
pub fn classify_error(message: &str) -> GenerationErrorCode {
    let lower = message.to_lowercase();
    let has = |markers: &[&str]| markers.iter().any(|m| lower.contains(m));

    if has(QUOTA_MARKERS) {
        GenerationErrorCode::InsufficientQuota
    } else if has(KEY_MARKERS) {
        GenerationErrorCode::InvalidApiKey
    } else if has(TIMEOUT_MARKERS) {
        GenerationErrorCode::Timeout
    } else if has(NETWORK_MARKERS) {
        GenerationErrorCode::NetworkError
    } else if has(REQUEST_MARKERS) {
        GenerationErrorCode::InvalidRequest
    } else if has(API_MARKERS) {
        GenerationErrorCode::ApiError
    } else if has(UNSUPPORTED_MARKERS) {
        GenerationErrorCode::UnsupportedFeature
    } else {
        GenerationErrorCode::Unknown
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_invalid_key() {
        assert_eq!(classify_error("Invalid API Key"), GenerationErrorCode::InvalidApiKey);
        assert_eq!(classify_error("HTTP 401 Unauthorized"), GenerationErrorCode::InvalidApiKey);
    }

    #[test]
    fn classify_quota() {
        assert_eq!(
            classify_error("insufficient quota for this account"),
            GenerationErrorCode::InsufficientQuota
        );
    }

    #[test]
    fn classify_timeout() {
        assert_eq!(classify_error("request timed out"), GenerationErrorCode::Timeout);
    }

    #[test]
    fn classify_network() {
        assert_eq!(classify_error("connection refused"), GenerationErrorCode::NetworkError);
        assert_eq!(classify_error("dns lookup failed"), GenerationErrorCode::NetworkError);
    }

    #[test]
    fn classify_invalid_request() {
        assert_eq!(classify_error("Bad Request"), GenerationErrorCode::InvalidRequest);
    }

    #[test]
    fn classify_api_error() {
        assert_eq!(classify_error("HTTP 503"), GenerationErrorCode::ApiError);
        assert_eq!(classify_error("internal error"), GenerationErrorCode::ApiError);
    }

    #[test]
    fn classify_unsupported() {
        assert_eq!(
            classify_error("video generation is not supported"),
            GenerationErrorCode::UnsupportedFeature
        );
    }

    #[test]
    fn classify_unknown_fallback() {
        assert_eq!(classify_error("something inexplicable"), GenerationErrorCode::Unknown);
    }

    #[test]
    fn classify_is_case_insensitive() {
        assert_eq!(classify_error("CONNECTION RESET"), GenerationErrorCode::NetworkError);
    }

    #[test]
    fn priority_quota_beats_api_error() {
        // "quota failed (HTTP 500)" matches both categories; quota is
        // earlier in the priority order and must win.
        assert_eq!(
            classify_error("quota failed (HTTP 500)"),
            GenerationErrorCode::InsufficientQuota
        );
    }

    #[test]
    fn priority_timeout_beats_network() {
        assert_eq!(
            classify_error("connection timed out"),
            GenerationErrorCode::Timeout
        );
    }

    #[test]
    fn codes_are_stable_strings() {
        let expected = [
            "insufficient_quota",
            "invalid_api_key",
            "timeout",
            "network_error",
            "invalid_request",
            "api_error",
            "unsupported_feature",
            "unknown",
        ];
        for (code, s) in GenerationErrorCode::ALL.iter().zip(expected) {
            assert_eq!(code.as_str(), s);
        }
    }
}
