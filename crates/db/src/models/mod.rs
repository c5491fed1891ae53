//! Domain model structs and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` + `Serialize` entity struct matching the database row
//! - A `Deserialize` create DTO for inserts
//! - A typed patch struct (all `Option` fields) for partial updates

pub mod file;
pub mod generation;
pub mod provider;
pub mod settings;
