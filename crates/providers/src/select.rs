//! Provider selection.
//!
//! The deployment configures a provider by host URL only, so the adapter
//! variant is inferred from the host string. The substring heuristic is
//! confined to [`ProviderKind::from_host`] -- everything downstream
//! dispatches on the enum, and a host pattern change touches exactly one
//! list.

use std::time::Duration;

use crate::provider::{GenerationProvider, ProviderError};
use crate::sync_image::SyncImageProvider;
use crate::task_queue::TaskQueueProvider;

/// Host substrings that select the synchronous image adapter. Anything
/// else talks the task-queue protocol.
const SYNC_IMAGE_HOST_MARKERS: &[&str] = &["gemini", "google", "yunwu.ai", "modelverse.cn"];

/// Which wire protocol a configured host speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    /// Image-only, result embedded in the submission response.
    SyncImage,
    /// Submit-then-poll task queue; images and video.
    TaskQueue,
}

impl ProviderKind {
    /// Infer the wire protocol from the configured host.
    pub fn from_host(host: &str) -> Self {
        let lower = host.to_lowercase();
        if SYNC_IMAGE_HOST_MARKERS.iter().any(|m| lower.contains(m)) {
            Self::SyncImage
        } else {
            Self::TaskQueue
        }
    }
}

/// Build the adapter for a resolved host/key pair. `timeout` bounds every
/// HTTP call the adapter makes.
pub fn build_provider(
    host: &str,
    api_key: &str,
    timeout: Duration,
) -> Result<Box<dyn GenerationProvider>, ProviderError> {
    match ProviderKind::from_host(host) {
        ProviderKind::SyncImage => {
            Ok(Box::new(SyncImageProvider::new(host, api_key, timeout)?))
        }
        ProviderKind::TaskQueue => {
            Ok(Box::new(TaskQueueProvider::new(host, api_key, timeout)?))
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
