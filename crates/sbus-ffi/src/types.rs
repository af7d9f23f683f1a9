use std::ffi::c_void;
use std::os::raw::c_int;

#[cfg(unix)]
use sbus_transport::{Channel, LogContext};

#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SbusResult {
    Ok = 0,
    InvalidArgument = 1,
    ResourceUnavailable = 2,
    BindFailure = 3,
    PermissionFailure = 4,
    TransportFailure = 5,
    ProtocolViolation = 6,
    AllocationFailure = 7,
    Truncation = 8,
    Internal = 99,
}

#[allow(dead_code)]
pub const SBUS_OK: SbusResult = SbusResult::Ok;
#[allow(dead_code)]
pub const SBUS_ERR_INVALID_ARGUMENT: SbusResult = SbusResult::InvalidArgument;
#[allow(dead_code)]
pub const SBUS_ERR_RESOURCE_UNAVAILABLE: SbusResult = SbusResult::ResourceUnavailable;
#[allow(dead_code)]
pub const SBUS_ERR_BIND_FAILURE: SbusResult = SbusResult::BindFailure;
#[allow(dead_code)]
pub const SBUS_ERR_PERMISSION_FAILURE: SbusResult = SbusResult::PermissionFailure;
#[allow(dead_code)]
pub const SBUS_ERR_TRANSPORT_FAILURE: SbusResult = SbusResult::TransportFailure;
#[allow(dead_code)]
pub const SBUS_ERR_PROTOCOL_VIOLATION: SbusResult = SbusResult::ProtocolViolation;
#[allow(dead_code)]
pub const SBUS_ERR_ALLOCATION_FAILURE: SbusResult = SbusResult::AllocationFailure;
#[allow(dead_code)]
pub const SBUS_ERR_TRUNCATION: SbusResult = SbusResult::Truncation;
#[allow(dead_code)]
pub const SBUS_ERR_INTERNAL: SbusResult = SbusResult::Internal;

pub const SBUS_MAX_FDS: usize = sbus_frame::MAX_FDS;
pub const SBUS_MAX_MSG_LENGTH: usize = sbus_frame::MAX_MSG_LENGTH;

/// A received message as seen from C.
///
/// Filled by `sbus_recv_msg`; the arrays are released with `sbus_message_free`.
/// The descriptors in `files` belong to the caller and are not closed by the free.
#[repr(C)]
#[derive(Debug)]
pub struct SbusMessage {
    pub files: *mut c_int,
    pub n_files: usize,
    pub metadata: *mut u8,
    pub metadata_len: usize,
    pub payload: *mut u8,
    pub payload_len: usize,
}

impl Default for SbusMessage {
    fn default() -> Self {
        Self {
            files: std::ptr::null_mut(),
            n_files: 0,
            metadata: std::ptr::null_mut(),
            metadata_len: 0,
            payload: std::ptr::null_mut(),
            payload_len: 0,
        }
    }
}

pub type SbusLoggerHandle = *mut c_void;
pub type SbusChannelHandle = *mut c_void;

#[cfg(unix)]
pub(crate) struct LoggerHandle {
    pub(crate) log: LogContext,
}

#[cfg(unix)]
pub(crate) struct ChannelHandle {
    pub(crate) channel: Option<Channel>,
}
