use std::fmt;
use std::io;

use sbus_transport::{ErrorKind, SbusError};

// Exit code constants.
pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

/// Map a local file failure. Socket failures go through [`sbus_error`].
pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::NotFound => FAILURE,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn sbus_error(context: &str, err: SbusError) -> CliError {
    let denied = err
        .io_error()
        .is_some_and(|source| source.kind() == io::ErrorKind::PermissionDenied);

    let code = match err.kind() {
        _ if denied => PERMISSION_DENIED,
        ErrorKind::PermissionFailure => PERMISSION_DENIED,
        ErrorKind::BindFailure | ErrorKind::TransportFailure => TRANSPORT_ERROR,
        ErrorKind::ProtocolViolation | ErrorKind::Truncation => DATA_INVALID,
        ErrorKind::ResourceUnavailable => FAILURE,
        ErrorKind::AllocationFailure => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}
