//! sbus-ffi: C-ABI exports for the sbus channel.
//!
//! Handles are opaque pointers. Every call clears the thread-local last error on entry;
//! a failing call sets it and returns an [`SbusResult`] code (or null for constructors).

mod error;
mod types;

#[cfg(unix)]
mod args;
#[cfg(unix)]
mod channel;
#[cfg(unix)]
mod logger;
#[cfg(unix)]
mod message;
#[cfg(unix)]
mod send;

use std::panic::AssertUnwindSafe;

#[cfg(unix)]
pub use channel::{sbus_channel_free, sbus_channel_remove, sbus_create, sbus_listen, sbus_recv_msg};
#[cfg(unix)]
pub use logger::{sbus_start_logger, sbus_stop_logger};
#[cfg(unix)]
pub use message::sbus_message_free;
#[cfg(unix)]
pub use send::sbus_send_msg;
pub use types::{
    SbusChannelHandle, SbusLoggerHandle, SbusMessage, SbusResult, SBUS_ERR_ALLOCATION_FAILURE,
    SBUS_ERR_BIND_FAILURE, SBUS_ERR_INTERNAL, SBUS_ERR_INVALID_ARGUMENT,
    SBUS_ERR_PERMISSION_FAILURE, SBUS_ERR_PROTOCOL_VIOLATION, SBUS_ERR_RESOURCE_UNAVAILABLE,
    SBUS_ERR_TRANSPORT_FAILURE, SBUS_ERR_TRUNCATION, SBUS_MAX_FDS, SBUS_MAX_MSG_LENGTH, SBUS_OK,
};

fn ffi_boundary<T>(on_panic: T, f: impl FnOnce() -> T) -> T {
    match std::panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(value) => value,
        Err(_) => {
            error::set_panic_error();
            on_panic
        }
    }
}

/// Message of the last failed call on this thread, or an empty string.
///
/// The pointer stays valid until the next sbus call on the same thread.
#[no_mangle]
pub extern "C" fn sbus_last_error() -> *const std::os::raw::c_char {
    ffi_boundary(std::ptr::null(), error::last_error_ptr)
}

#[cfg(test)]
mod tests {
    use std::ffi::CStr;

    use super::*;

    #[test]
    fn last_error_returns_non_null_pointer() {
        error::clear_error_state();
        let ptr = sbus_last_error();
        assert!(!ptr.is_null());

        // SAFETY: sbus_last_error returns a pointer to a thread-local CString.
        let text = unsafe { CStr::from_ptr(ptr).to_str().unwrap() };
        assert!(text.is_empty());
    }

    #[test]
    fn panics_are_caught_at_the_boundary() {
        let result = ffi_boundary(SbusResult::Internal, || -> SbusResult {
            panic!("boom");
        });
        assert_eq!(result, SbusResult::Internal);

        // SAFETY: sbus_last_error returns a pointer to a thread-local CString.
        let text = unsafe { CStr::from_ptr(sbus_last_error()) };
        assert_eq!(text.to_str().unwrap(), "panic across FFI boundary");
    }

    #[test]
    fn result_codes_are_stable() {
        assert_eq!(SBUS_OK as i32, 0);
        assert_eq!(SBUS_ERR_TRUNCATION as i32, 8);
        assert_eq!(SBUS_ERR_INTERNAL as i32, 99);
        assert_eq!(SBUS_MAX_FDS, 4096);
    }
}
