//! Driver status codes (`VAStatus`) and conversion helpers.

use crate::error::{ContextError, ContextResult};

/// Driver return code.
pub type VaStatus = i32;

pub const VA_STATUS_SUCCESS: VaStatus = 0x0000_0000;
pub const VA_STATUS_ERROR_OPERATION_FAILED: VaStatus = 0x0000_0001;
pub const VA_STATUS_ERROR_ALLOCATION_FAILED: VaStatus = 0x0000_0002;
pub const VA_STATUS_ERROR_INVALID_DISPLAY: VaStatus = 0x0000_0003;
pub const VA_STATUS_ERROR_INVALID_CONFIG: VaStatus = 0x0000_0004;
pub const VA_STATUS_ERROR_INVALID_CONTEXT: VaStatus = 0x0000_0005;
pub const VA_STATUS_ERROR_INVALID_SURFACE: VaStatus = 0x0000_0006;
pub const VA_STATUS_ERROR_ATTR_NOT_SUPPORTED: VaStatus = 0x0000_000A;
pub const VA_STATUS_ERROR_MAX_NUM_EXCEEDED: VaStatus = 0x0000_000B;
pub const VA_STATUS_ERROR_UNSUPPORTED_PROFILE: VaStatus = 0x0000_000C;
pub const VA_STATUS_ERROR_UNSUPPORTED_ENTRYPOINT: VaStatus = 0x0000_000D;
pub const VA_STATUS_ERROR_UNSUPPORTED_RT_FORMAT: VaStatus = 0x0000_000E;
pub const VA_STATUS_ERROR_INVALID_PARAMETER: VaStatus = 0x0000_0012;
pub const VA_STATUS_ERROR_RESOLUTION_NOT_SUPPORTED: VaStatus = 0x0000_0013;
pub const VA_STATUS_ERROR_UNKNOWN: VaStatus = 0xFFFF_FFFFu32 as VaStatus;

/// Split a raw return code into success or the failing status.
pub fn status_result(status: VaStatus) -> Result<(), VaStatus> {
    if status == VA_STATUS_SUCCESS {
        Ok(())
    } else {
        Err(status)
    }
}

/// Convert a driver call's outcome into a `ContextResult`, naming the call.
pub fn check_status<T>(result: Result<T, VaStatus>, call: &'static str) -> ContextResult<T> {
    result.map_err(|status| ContextError::hardware(call, status))
}

/// Human-readable name for a driver status code.
pub fn status_name(status: VaStatus) -> &'static str {
    match status {
        VA_STATUS_SUCCESS => "success",
        VA_STATUS_ERROR_OPERATION_FAILED => "operation failed",
        VA_STATUS_ERROR_ALLOCATION_FAILED => "resource allocation failed",
        VA_STATUS_ERROR_INVALID_DISPLAY => "invalid VADisplay",
        VA_STATUS_ERROR_INVALID_CONFIG => "invalid VAConfigID",
        VA_STATUS_ERROR_INVALID_CONTEXT => "invalid VAContextID",
        VA_STATUS_ERROR_INVALID_SURFACE => "invalid VASurfaceID",
        VA_STATUS_ERROR_ATTR_NOT_SUPPORTED => "attribute not supported",
        VA_STATUS_ERROR_MAX_NUM_EXCEEDED => "list argument exceeds maximum number",
        VA_STATUS_ERROR_UNSUPPORTED_PROFILE => "the requested VAProfile is not supported",
        VA_STATUS_ERROR_UNSUPPORTED_ENTRYPOINT => {
            "the requested VAEntryPoint is not supported"
        }
        VA_STATUS_ERROR_UNSUPPORTED_RT_FORMAT => "the requested RT Format is not supported",
        VA_STATUS_ERROR_INVALID_PARAMETER => "invalid parameter",
        VA_STATUS_ERROR_RESOLUTION_NOT_SUPPORTED => "resolution not supported",
        _ => "unknown libva error",
    }
}
