use std::cell::RefCell;
use std::ffi::CString;
use std::os::raw::c_char;

use sbus_transport::{ErrorKind, SbusError};

use crate::types::SbusResult;

thread_local! {
    static LAST_ERROR: RefCell<CString> = RefCell::new(CString::default());
}

pub(crate) fn clear_error_state() {
    LAST_ERROR.with(|state| {
        *state.borrow_mut() = CString::default();
    });
}

pub(crate) fn set_error_message(message: impl Into<String>) {
    let sanitized = message.into().replace('\0', "?");
    LAST_ERROR.with(|state| {
        *state.borrow_mut() = CString::new(sanitized).unwrap_or_default();
    });
}

pub(crate) fn set_invalid_argument(message: impl Into<String>) -> SbusResult {
    set_error_message(message);
    SbusResult::InvalidArgument
}

pub(crate) fn set_panic_error() {
    set_error_message("panic across FFI boundary");
}

pub(crate) fn map_sbus_error(err: &SbusError) -> SbusResult {
    set_error_message(err.to_string());
    match err.kind() {
        ErrorKind::ResourceUnavailable => SbusResult::ResourceUnavailable,
        ErrorKind::BindFailure => SbusResult::BindFailure,
        ErrorKind::PermissionFailure => SbusResult::PermissionFailure,
        ErrorKind::TransportFailure => SbusResult::TransportFailure,
        ErrorKind::ProtocolViolation => SbusResult::ProtocolViolation,
        ErrorKind::AllocationFailure => SbusResult::AllocationFailure,
        ErrorKind::Truncation => SbusResult::Truncation,
    }
}

pub(crate) fn last_error_ptr() -> *const c_char {
    LAST_ERROR.with(|state| state.borrow().as_ptr())
}

#[cfg(test)]
mod tests {
    use std::ffi::CStr;

    use super::*;

    fn last_error() -> String {
        // SAFETY: The pointer refers to the thread-local CString, alive for this call.
        unsafe { CStr::from_ptr(last_error_ptr()) }
            .to_string_lossy()
            .into_owned()
    }

    #[test]
    fn interior_nul_is_sanitized() {
        set_error_message("bad\0path");
        assert_eq!(last_error(), "bad?path");
        clear_error_state();
        assert!(last_error().is_empty());
    }

    #[test]
    fn errors_map_onto_result_codes() {
        let err = SbusError::Truncation { capacity: 4096 };
        assert_eq!(map_sbus_error(&err), SbusResult::Truncation);
        assert!(last_error().contains("4096"));

        let err = SbusError::Protocol("ancillary data truncated".into());
        assert_eq!(map_sbus_error(&err), SbusResult::ProtocolViolation);
    }
}
