//! `va-common` — Shared types and errors for hardware video contexts.
//!
//! This crate is the vocabulary the context crate is built on:
//!
//! - **Codec**: `Profile`, `Entrypoint`, `RateControl`, `ChromaType` with their driver codes
//! - **Types**: `VaId`, `Resolution`, `ConfigAttrib` (newtypes for safety)
//! - **Config**: `ContextInfo`, the session descriptor (serde-enabled)
//! - **Status**: driver status codes, `status_result` and `check_status`
//! - **Errors**: `ContextError` (thiserror-based)

pub mod codec;
pub mod config;
pub mod error;
pub mod status;
pub mod types;

// Re-export commonly used items at crate root
pub use codec::{ChromaType, Entrypoint, Profile, RateControl, VaEntrypoint, VaProfile};
pub use config::ContextInfo;
pub use error::{ContextError, ContextResult};
pub use status::{check_status, status_name, status_result, VaStatus, VA_STATUS_SUCCESS};
pub use types::{ConfigAttrib, ConfigAttribType, Resolution, VaId, VA_ATTRIB_NOT_SUPPORTED};
