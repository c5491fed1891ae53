//! File-storage collaborator: durable bytes on disk plus a `files` row.
//!
//! The orchestrator hands generated assets (and reads reference uploads)
//! through [`FileStorage`]; nothing else in the workspace touches the
//! storage root directly.

pub mod mime;
pub mod store;

pub use store::{FileStorage, StorageError};
