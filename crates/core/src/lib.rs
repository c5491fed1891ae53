//! Pure domain logic for the lumen generation platform.
//!
//! Everything in this crate is synchronous and free of I/O so that the
//! orchestration rules (status transitions, error classification, poll
//! budgets, inline payload framing) can be tested without a database or
//! network.

pub mod data_url;
pub mod error;
pub mod error_code;
pub mod generation;
pub mod timeout;
pub mod types;
