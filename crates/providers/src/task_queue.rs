//! Adapter for the asynchronous task-queue provider.
//!
//! Submission returns either an opaque task ID to poll or, occasionally, a
//! terminal result embedded straight in the submission response. Responses
//! arrive as plain JSON or as an SSE-framed stream (see [`crate::sse`]);
//! shapes vary enough (payload nested under `data`, ids at either level)
//! that parsing goes through `serde_json::Value` navigation rather than
//! rigid structs.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use lumen_core::generation::GenerationKind;

use crate::provider::{
    GenerationProvider, GenerationRequest, ProviderError, SubmitOutcome, TaskSnapshot, TaskState,
};
use crate::sse;

/// Image task submission endpoint.
const IMAGE_ENDPOINT: &str = "/v1/draw/nano-banana";

/// Video task submission endpoint.
const VIDEO_ENDPOINT: &str = "/v1/video/sora-video";

/// Poll endpoint, shared by both kinds.
const RESULT_ENDPOINT: &str = "/v1/draw/result";

/// Webhook sentinel asking the provider for polling mode (return the task
/// ID immediately instead of pushing a callback).
const WEBHOOK_POLLING_MODE: &str = "-1";

/// Fallback message for non-2xx responses that carry no message field.
const GENERIC_API_FAILURE: &str = "Provider API call failed";

/// HTTP client for the task-queue API.
pub struct TaskQueueProvider {
    client: reqwest::Client,
    host: String,
    api_key: String,
}

// ---------------------------------------------------------------------------
// Wire types (requests only; responses are navigated as values)
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct ImageTaskRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    #[serde(rename = "aspectRatio")]
    aspect_ratio: &'a str,
    #[serde(rename = "imageSize", skip_serializing_if = "Option::is_none")]
    image_size: Option<&'a str>,
    urls: &'a [String],
    #[serde(rename = "webHook")]
    web_hook: &'a str,
    #[serde(rename = "shutProgress")]
    shut_progress: bool,
}

#[derive(Debug, Serialize)]
struct VideoTaskRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    url: Option<&'a str>,
    #[serde(rename = "aspectRatio")]
    aspect_ratio: &'a str,
    duration: i32,
    size: &'a str,
    #[serde(rename = "shutProgress")]
    shut_progress: bool,
}

// ---------------------------------------------------------------------------
// Adapter
// ---------------------------------------------------------------------------

impl TaskQueueProvider {
    /// Create an adapter for one host/key pair. `timeout` bounds every
    /// HTTP call this adapter makes.
    pub fn new(host: &str, api_key: &str, timeout: Duration) -> Result<Self, ProviderError> {
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

    /// POST a JSON body and normalize the response into a value, replaying
    /// SSE framing when present. Non-2xx statuses become a [`ProviderError`]
    /// carrying the provider's best-effort message.
    async fn post_json<B: Serialize>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> Result<Value, ProviderError> {
        let url = format!("{}{}", self.host, endpoint);
        tracing::debug!(%url, "POST to task-queue provider");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| ProviderError::new(format!("request failed: {e}")))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ProviderError::new(format!("failed to read provider response: {e}")))?;

        let parsed: Option<Value> = if sse::is_event_stream(&text) {
            sse::replay(&text)
        } else {
            serde_json::from_str(&text).ok()
        };

        if !status.is_success() {
            let message = parsed
                .as_ref()
                .and_then(best_effort_message)
                .unwrap_or_else(|| GENERIC_API_FAILURE.to_string());
            return Err(ProviderError::new(format!(
                "{message} (HTTP {})",
                status.as_u16()
            )));
        }

        parsed.ok_or_else(|| ProviderError::new("unexpected provider response format"))
    }
}

#[async_trait]
impl GenerationProvider for TaskQueueProvider {
    async fn submit(&self, request: &GenerationRequest) -> Result<SubmitOutcome, ProviderError> {
        let response = match request.kind {
            GenerationKind::Image => {
                let body = ImageTaskRequest {
                    model: &request.model,
                    prompt: &request.prompt,
                    aspect_ratio: request.aspect_ratio.as_deref().unwrap_or("auto"),
                    image_size: request.image_size.as_deref().filter(|s| !s.is_empty()),
                    urls: &request.references,
                    web_hook: WEBHOOK_POLLING_MODE,
                    shut_progress: false,
                };
                tracing::debug!(
                    model = %request.model,
                    references = request.references.len(),
                    "Submitting image task"
                );
                self.post_json(IMAGE_ENDPOINT, &body).await?
            }
            GenerationKind::Video => {
                let body = VideoTaskRequest {
                    model: &request.model,
                    prompt: &request.prompt,
                    url: request.references.first().map(String::as_str),
                    aspect_ratio: request.aspect_ratio.as_deref().unwrap_or("9:16"),
                    duration: request.duration_secs.unwrap_or(10),
                    size: request.video_size.as_deref().unwrap_or("small"),
                    shut_progress: false,
                };
                tracing::debug!(model = %request.model, "Submitting video task");
                self.post_json(VIDEO_ENDPOINT, &body).await?
            }
        };

        parse_submit_response(&response)
    }

    async fn fetch_result(&self, task_id: &str) -> Result<TaskSnapshot, ProviderError> {
        let response = self
            .post_json(RESULT_ENDPOINT, &serde_json::json!({ "id": task_id }))
            .await?;

        // The payload may sit under `data` or at the root.
        let data = response.get("data").filter(|d| d.is_object()).unwrap_or(&response);
        Ok(parse_snapshot(data))
    }
}

// ---------------------------------------------------------------------------
// Response parsing
// ---------------------------------------------------------------------------

/// Message fields probed in priority order on error payloads.
fn best_effort_message(value: &Value) -> Option<String> {
    ["message", "error", "msg"]
        .iter()
        .filter_map(|key| value[*key].as_str())
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

/// Interpret a submission response: embedded business error, immediate
/// terminal result, or a task ID to poll.
fn parse_submit_response(response: &Value) -> Result<SubmitOutcome, ProviderError> {
    // Business-level error embedded with a 2xx transport status.
    if let Some(code) = response["code"].as_i64() {
        if code != 0 {
            let message = response["msg"]
                .as_str()
                .filter(|s| !s.is_empty())
                .or_else(|| response["message"].as_str().filter(|s| !s.is_empty()))
                .unwrap_or(GENERIC_API_FAILURE);
            return Err(ProviderError::new(message));
        }
    }

    let task_id = response["data"]["id"]
        .as_str()
        .or_else(|| response["id"].as_str())
        .unwrap_or_default()
        .to_string();

    // Immediate-completion short-circuit: a status plus results means the
    // work already finished inside the submission call.
    let has_status = response["status"].as_str().is_some_and(|s| !s.is_empty());
    let has_results = response["results"].as_array().is_some_and(|r| !r.is_empty());
    if has_status && has_results {
        return Ok(SubmitOutcome::Completed(parse_snapshot(response)));
    }

    if task_id.is_empty() {
        return Err(ProviderError::new("provider response carried no task id"));
    }

    Ok(SubmitOutcome::Queued(task_id))
}

/// Extract a [`TaskSnapshot`] from a result payload.
fn parse_snapshot(data: &Value) -> TaskSnapshot {
    let state = match data["status"].as_str() {
        Some("succeeded") => TaskState::Succeeded,
        Some("failed") => TaskState::Failed,
        _ => TaskState::InProgress,
    };

    let result_urls = data["results"]
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item["url"].as_str())
                .filter(|url| !url.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    TaskSnapshot {
        task_id: data["id"].as_str().map(str::to_string),
        state,
        progress: data["progress"].as_f64(),
        result_urls,
        error: data["error"].as_str().map(str::to_string),
        message: data["message"].as_str().map(str::to_string),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;

    #[test]
    fn submit_response_with_nested_task_id_is_queued() {
        let outcome = parse_submit_response(&json!({ "data": { "id": "task-42" } })).unwrap();
        assert_matches!(outcome, SubmitOutcome::Queued(id) if id == "task-42");
    }

    #[test]
    fn submit_response_with_root_task_id_is_queued() {
        let outcome = parse_submit_response(&json!({ "id": "task-7" })).unwrap();
        assert_matches!(outcome, SubmitOutcome::Queued(id) if id == "task-7");
    }

    #[test]
    fn submit_response_immediate_completion_short_circuits() {
        let outcome = parse_submit_response(&json!({
            "id": "task-9",
            "status": "succeeded",
            "results": [ { "url": "https://cdn/out.mp4" } ]
        }))
        .unwrap();

        assert_matches!(outcome, SubmitOutcome::Completed(snapshot) => {
            assert_eq!(snapshot.state, TaskState::Succeeded);
            assert_eq!(snapshot.first_result_url(), Some("https://cdn/out.mp4"));
        });
    }

    #[test]
    fn submit_response_business_error_code_fails() {
        let err = parse_submit_response(&json!({
            "code": 1001,
            "msg": "insufficient quota"
        }))
        .unwrap_err();
        assert_eq!(err.message, "insufficient quota");
    }

    #[test]
    fn submit_response_zero_code_is_not_an_error() {
        let outcome = parse_submit_response(&json!({ "code": 0, "id": "task-3" })).unwrap();
        assert_matches!(outcome, SubmitOutcome::Queued(_));
    }

    #[test]
    fn submit_response_without_task_id_fails() {
        let err = parse_submit_response(&json!({ "status": "" })).unwrap_err();
        assert!(err.message.contains("task id"));
    }

    #[test]
    fn snapshot_parses_progress_and_results() {
        let snapshot = parse_snapshot(&json!({
            "id": "task-1",
            "status": "running",
            "progress": 37.5,
            "results": [ { "url": "" }, { "url": "https://cdn/a.png" } ]
        }));

        assert_eq!(snapshot.state, TaskState::InProgress);
        assert_eq!(snapshot.progress, Some(37.5));
        assert_eq!(snapshot.first_result_url(), Some("https://cdn/a.png"));
    }

    #[test]
    fn snapshot_failed_state_carries_error_fields() {
        let snapshot = parse_snapshot(&json!({
            "status": "failed",
            "error": "model exploded",
            "message": "secondary text"
        }));

        assert_eq!(snapshot.state, TaskState::Failed);
        assert_eq!(snapshot.failure_message(), "model exploded");
    }

    #[test]
    fn snapshot_unknown_status_is_in_progress() {
        let snapshot = parse_snapshot(&json!({ "status": "warming-up" }));
        assert_eq!(snapshot.state, TaskState::InProgress);
    }

    #[test]
    fn best_effort_message_priority_order() {
        let value = json!({ "msg": "from msg", "error": "from error", "message": "from message" });
        assert_eq!(best_effort_message(&value).as_deref(), Some("from message"));

        let value = json!({ "msg": "from msg", "error": "from error" });
        assert_eq!(best_effort_message(&value).as_deref(), Some("from error"));

        let value = json!({ "msg": "from msg" });
        assert_eq!(best_effort_message(&value).as_deref(), Some("from msg"));

        assert_eq!(best_effort_message(&json!({})), None);
    }
}
