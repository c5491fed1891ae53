//! Adapter for the synchronous, image-only provider.
//!
//! One POST carries the prompt plus inline base64 reference images and the
//! response carries the generated asset directly, so [`submit`] always
//! resolves to [`SubmitOutcome::Completed`] and polling never happens.
//!
//! [`submit`]: SyncImageProvider::submit

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use lumen_core::data_url;
use lumen_core::error_code::GenerationErrorCode;
use lumen_core::generation::GenerationKind;

use crate::provider::{
    GenerationProvider, GenerationRequest, ProviderError, SubmitOutcome, TaskSnapshot, TaskState,
};

/// Aspect ratio used when the request carries none (or the `auto` marker,
/// which this provider does not understand).
const DEFAULT_ASPECT_RATIO: &str = "16:9";

/// Image size class used when the request carries none.
const DEFAULT_IMAGE_SIZE: &str = "1K";

/// HTTP client for the synchronous image API.
pub struct SyncImageProvider {
    client: reqwest::Client,
    host: String,
    api_key: String,
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct ImageGenerationRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
}

#[derive(Debug, Serialize, Deserialize)]
struct InlineData {
    mime_type: String,
    /// Base64 payload without the data-URL prefix.
    data: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    #[serde(rename = "responseModalities")]
    response_modalities: Vec<&'static str>,
    #[serde(rename = "imageConfig")]
    image_config: ImageConfig,
}

#[derive(Debug, Serialize)]
struct ImageConfig {
    #[serde(rename = "aspectRatio")]
    aspect_ratio: String,
    #[serde(rename = "imageSize")]
    image_size: String,
}

#[derive(Debug, Default, Deserialize)]
struct ImageGenerationResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Default, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Content,
}

// ---------------------------------------------------------------------------
// Adapter
// ---------------------------------------------------------------------------

impl SyncImageProvider {
    /// Create an adapter for one host/key pair. `timeout` bounds every
    /// HTTP call this adapter makes.
    pub fn new(
        host: &str,
        api_key: &str,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::new(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            host: host.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    /// Build the wire request from a generic one. Only `data:` references
    /// can be inlined; anything else is skipped with a warning.
    fn build_request(request: &GenerationRequest) -> ImageGenerationRequest {
        let mut parts = vec![Part {
            text: Some(request.prompt.clone()),
            inline_data: None,
        }];

        for reference in &request.references {
            match data_url::split(reference) {
                Ok((mime_type, payload)) => parts.push(Part {
                    text: None,
                    inline_data: Some(InlineData {
                        mime_type: mime_type.to_string(),
                        data: payload.to_string(),
                    }),
                }),
                Err(e) => {
                    tracing::warn!(error = %e, "Skipping reference that is not an inline payload");
                }
            }
        }

        let aspect_ratio = request
            .aspect_ratio
            .as_deref()
            .filter(|a| !a.is_empty() && *a != "auto")
            .unwrap_or(DEFAULT_ASPECT_RATIO)
            .to_string();

        let image_size = request
            .image_size
            .as_deref()
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_IMAGE_SIZE)
            .to_string();

        ImageGenerationRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts,
            }],
            generation_config: GenerationConfig {
                response_modalities: vec!["TEXT", "IMAGE"],
                image_config: ImageConfig {
                    aspect_ratio,
                    image_size,
                },
            },
        }
    }

    /// First decodable image across all candidates and parts, re-framed as
    /// a data URL.
    fn extract_image(response: &ImageGenerationResponse) -> Option<String> {
        response
            .candidates
            .iter()
            .flat_map(|c| c.content.parts.iter())
            .filter_map(|p| p.inline_data.as_ref())
            .find(|d| !d.data.is_empty())
            .map(|d| format!("{}{};base64,{}", data_url::DATA_URL_PREFIX, d.mime_type, d.data))
    }
}

#[async_trait]
impl GenerationProvider for SyncImageProvider {
    async fn submit(&self, request: &GenerationRequest) -> Result<SubmitOutcome, ProviderError> {
        // Refuse video before touching the network.
        if request.kind != GenerationKind::Image {
            return Err(ProviderError::with_code(
                GenerationErrorCode::UnsupportedFeature,
                "The configured provider does not support video generation",
            ));
        }

        let body = Self::build_request(request);
        let url = format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.host, request.model, self.api_key
        );

        tracing::debug!(model = %request.model, references = request.references.len(), "Submitting image generation");

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::new(format!("request failed: {e}")))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ProviderError::new(format!("failed to read provider response: {e}")))?;

        if !status.is_success() {
            return Err(ProviderError::new(format!(
                "API error (HTTP {}): {}",
                status.as_u16(),
                text
            )));
        }

        let parsed: ImageGenerationResponse = serde_json::from_str(&text)
            .map_err(|e| ProviderError::new(format!("failed to parse provider response: {e}")))?;

        let image = Self::extract_image(&parsed).ok_or_else(|| {
            ProviderError::with_code(
                GenerationErrorCode::ApiError,
                "The provider returned no image data",
            )
        })?;

        Ok(SubmitOutcome::Completed(TaskSnapshot {
            task_id: None,
            state: TaskState::Succeeded,
            progress: None,
            result_urls: vec![image],
            error: None,
            message: None,
        }))
    }

    async fn fetch_result(&self, _task_id: &str) -> Result<TaskSnapshot, ProviderError> {
        // Submission is fully synchronous; there is never a task to poll.
        Err(ProviderError::with_code(
            GenerationErrorCode::InvalidRequest,
            "The synchronous image provider does not expose task polling",
        ))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn request(kind: GenerationKind) -> GenerationRequest {
        GenerationRequest {
            kind,
            model: "imagen-pro".to_string(),
            prompt: "a lighthouse at dusk".to_string(),
            aspect_ratio: None,
            image_size: None,
            video_size: None,
            duration_secs: None,
            references: Vec::new(),
        }
    }

    #[tokio::test]
    async fn video_request_fails_without_network() {
        // The host is unroutable on purpose: if the adapter tried the
        // network the error text would mention the transport, not support.
        let provider =
            SyncImageProvider::new("http://invalid.test", "key", Duration::from_secs(1)).unwrap();
        let err = provider.submit(&request(GenerationKind::Video)).await.unwrap_err();
        assert_eq!(err.code, Some(GenerationErrorCode::UnsupportedFeature));
    }

    #[tokio::test]
    async fn fetch_result_is_never_supported() {
        let provider =
            SyncImageProvider::new("http://invalid.test", "key", Duration::from_secs(1)).unwrap();
        let err = provider.fetch_result("task-1").await.unwrap_err();
        assert_eq!(err.code, Some(GenerationErrorCode::InvalidRequest));
    }

    #[test]
    fn build_request_inlines_data_url_references() {
        let mut req = request(GenerationKind::Image);
        req.references = vec![
            lumen_core::data_url::encode("image/png", b"ref-bytes"),
            "https://example.com/not-inline.png".to_string(),
        ];

        let wire = SyncImageProvider::build_request(&req);
        let parts = &wire.contents[0].parts;

        // Prompt text plus exactly one inlined reference; the plain URL is
        // dropped because this provider only accepts inline payloads.
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].text.as_deref(), Some("a lighthouse at dusk"));
        let inline = parts[1].inline_data.as_ref().unwrap();
        assert_eq!(inline.mime_type, "image/png");
    }

    #[test]
    fn build_request_defaults_aspect_and_size() {
        let wire = SyncImageProvider::build_request(&request(GenerationKind::Image));
        assert_eq!(wire.generation_config.image_config.aspect_ratio, DEFAULT_ASPECT_RATIO);
        assert_eq!(wire.generation_config.image_config.image_size, DEFAULT_IMAGE_SIZE);
    }

    #[test]
    fn auto_aspect_ratio_is_replaced_by_default() {
        let mut req = request(GenerationKind::Image);
        req.aspect_ratio = Some("auto".to_string());
        let wire = SyncImageProvider::build_request(&req);
        assert_eq!(wire.generation_config.image_config.aspect_ratio, DEFAULT_ASPECT_RATIO);
    }

    #[test]
    fn extract_image_finds_first_non_empty_inline_part() {
        let response: ImageGenerationResponse = serde_json::from_value(serde_json::json!({
            "candidates": [
                { "content": { "parts": [ { "text": "here you go" } ] } },
                { "content": { "parts": [
                    { "inline_data": { "mime_type": "image/png", "data": "" } },
                    { "inline_data": { "mime_type": "image/webp", "data": "QUJD" } }
                ] } }
            ]
        }))
        .unwrap();

        let url = SyncImageProvider::extract_image(&response).unwrap();
        assert_eq!(url, "data:image/webp;base64,QUJD");
    }

    #[test]
    fn extract_image_empty_response_yields_none() {
        let response = ImageGenerationResponse::default();
        assert_matches!(SyncImageProvider::extract_image(&response), None);
    }
}
