use std::os::raw::c_char;

use sbus_transport::{LogContext, LogLevel};

use crate::args;
use crate::error;
use crate::types::{LoggerHandle, SbusLoggerHandle};

/// The context carried by `logger`, or a disabled one for a null handle.
///
/// # Safety
/// `logger` must be null or a live handle from `sbus_start_logger`.
pub(crate) unsafe fn context_of(logger: SbusLoggerHandle) -> LogContext {
    if logger.is_null() {
        return LogContext::disabled();
    }
    // SAFETY: Pointer validity is guaranteed by the caller.
    let handle = unsafe { &*(logger as *const LoggerHandle) };
    handle.log.clone()
}

/// Start a logging context.
///
/// `level` is one of `DEBUG`, `INFO`, `WARNING`, `CRITICAL`, `ERROR`, `OFF`; null or an
/// unknown name selects `ERROR`. Pass the handle to `sbus_create` and `sbus_send_msg`.
///
/// # Safety
/// `level` must be null or a valid NUL-terminated C string. `container_id` must be a
/// non-null pointer to a valid UTF-8, NUL-terminated C string.
#[no_mangle]
pub unsafe extern "C" fn sbus_start_logger(
    level: *const c_char,
    container_id: *const c_char,
) -> SbusLoggerHandle {
    crate::ffi_boundary(std::ptr::null_mut(), || {
        error::clear_error_state();

        let level = {
            // SAFETY: We validate null and UTF-8 in helper.
            match unsafe { args::optional_str_arg(level, "level") } {
                Ok(v) => v.map(LogLevel::from_name).unwrap_or(LogLevel::Error),
                Err(()) => return std::ptr::null_mut(),
            }
        };
        let container_id = {
            // SAFETY: We validate null and UTF-8 in helper.
            match unsafe { args::required_str_arg(container_id, "container_id") } {
                Some(v) => v,
                None => return std::ptr::null_mut(),
            }
        };

        let handle = LoggerHandle {
            log: LogContext::start(level, container_id),
        };
        Box::into_raw(Box::new(handle)) as SbusLoggerHandle
    })
}

/// Stop a logging context and free its handle.
///
/// Channels created with this logger stay usable but no longer emit events.
///
/// # Safety
/// `logger` must be null or a handle returned by `sbus_start_logger`, not yet stopped.
#[no_mangle]
pub unsafe extern "C" fn sbus_stop_logger(logger: SbusLoggerHandle) {
    crate::ffi_boundary((), || {
        if logger.is_null() {
            return;
        }

        // SAFETY: Caller guarantees this handle was allocated by sbus_start_logger.
        let handle = unsafe { Box::from_raw(logger as *mut LoggerHandle) };
        handle.log.stop();
    });
}

#[cfg(test)]
mod tests {
    use std::ffi::CString;

    use super::*;

    #[test]
    fn start_and_stop_logger() {
        let level = CString::new("DEBUG").unwrap();
        let id = CString::new("abc123").unwrap();

        // SAFETY: Both strings are live and NUL-terminated.
        let logger = unsafe { sbus_start_logger(level.as_ptr(), id.as_ptr()) };
        assert!(!logger.is_null());

        // SAFETY: `logger` is live until the stop below.
        let ctx = unsafe { context_of(logger) };
        assert_eq!(ctx.label(), "CONT #abc123: sbus");
        assert_eq!(ctx.level(), LogLevel::Debug);

        // SAFETY: `logger` came from sbus_start_logger.
        unsafe { sbus_stop_logger(logger) };
        assert!(ctx.is_stopped());
    }

    #[test]
    fn null_level_defaults_to_error() {
        let id = CString::new("x").unwrap();
        // SAFETY: `id` is live; null level is accepted.
        let logger = unsafe { sbus_start_logger(std::ptr::null(), id.as_ptr()) };
        // SAFETY: `logger` is live.
        assert_eq!(unsafe { context_of(logger) }.level(), LogLevel::Error);
        // SAFETY: `logger` came from sbus_start_logger.
        unsafe { sbus_stop_logger(logger) };
    }

    #[test]
    fn missing_container_id_is_rejected() {
        // SAFETY: Null inputs are accepted and rejected.
        let logger = unsafe { sbus_start_logger(std::ptr::null(), std::ptr::null()) };
        assert!(logger.is_null());
    }

    #[test]
    fn null_handle_is_disabled_context() {
        // SAFETY: Null is an accepted input.
        let ctx = unsafe { context_of(std::ptr::null_mut()) };
        assert_eq!(ctx.level(), LogLevel::Off);
    }
}
