//! Central error types for context management (thiserror-based).

use thiserror::Error;

use crate::status::{status_name, VaStatus};

/// Errors produced while creating, resetting or querying a hardware context.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContextError {
    /// Descriptor rejected before any hardware work.
    #[error("Invalid context descriptor: {0}")]
    InvalidDescriptor(String),

    /// A surface, id array or pool slot could not be allocated.
    #[error("Allocation failed: {what}")]
    AllocationFailure { what: String },

    /// The driver does not advertise a required capability.
    #[error("Unsupported {value} {capability}")]
    CapabilityUnsupported {
        capability: &'static str,
        value: String,
    },

    /// A driver entry point returned a non-success status.
    #[error("{call} failed with status {status} ({status_name})")]
    HardwareCall {
        call: &'static str,
        status: VaStatus,
        status_name: &'static str,
    },

    /// The overlay extension refused a lifecycle transition.
    #[error("Overlay state error: {0}")]
    Overlay(String),

    /// The driver library could not be loaded.
    #[error("Driver load failed: {0}")]
    DriverLoad(String),
}

impl ContextError {
    pub fn hardware(call: &'static str, status: VaStatus) -> Self {
        Self::HardwareCall {
            call,
            status,
            status_name: status_name(status),
        }
    }

    pub fn allocation(what: impl Into<String>) -> Self {
        Self::AllocationFailure { what: what.into() }
    }
}

/// Convenience Result type for context operations.
pub type ContextResult<T> = Result<T, ContextError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::VA_STATUS_ERROR_ALLOCATION_FAILED;

    #[test]
    fn hardware_error_names_call_and_status() {
        let err = ContextError::hardware("vaCreateConfig()", VA_STATUS_ERROR_ALLOCATION_FAILED);
        let msg = err.to_string();
        assert!(msg.contains("vaCreateConfig()"));
        assert!(msg.contains("allocation failed"));
    }

    #[test]
    fn capability_error_names_value() {
        let err = ContextError::CapabilityUnsupported {
            capability: "rate control",
            value: "CBR".to_string(),
        };
        assert_eq!(err.to_string(), "Unsupported CBR rate control");
    }

    #[test]
    fn invalid_descriptor_display() {
        let err = ContextError::InvalidDescriptor("width must be > 0".to_string());
        assert!(err.to_string().contains("width must be > 0"));
    }
}
