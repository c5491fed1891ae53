//! Provider adapters for generative-media HTTP APIs.
//!
//! Two wire styles hide behind one [`provider::GenerationProvider`] trait:
//! a synchronous image-only API that returns the asset in the submission
//! response, and an asynchronous task-queue API that hands back a task ID
//! to poll. The protocol engine in the jobs crate drives either through
//! the same call sites.

pub mod provider;
pub mod select;
pub mod sse;
pub mod sync_image;
pub mod task_queue;

pub use provider::{
    GenerationProvider, GenerationRequest, ProviderError, SubmitOutcome, TaskSnapshot, TaskState,
};
pub use select::{build_provider, ProviderKind};
