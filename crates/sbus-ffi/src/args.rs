use std::ffi::CStr;
use std::os::fd::BorrowedFd;
use std::os::raw::{c_char, c_int};

use crate::error;

/// Convert a required C string argument into UTF-8 `&str`.
///
/// # Safety
/// `value` must be null or point to a valid NUL-terminated C string.
pub(crate) unsafe fn required_str_arg<'a>(value: *const c_char, name: &str) -> Option<&'a str> {
    if value.is_null() {
        let _ = error::set_invalid_argument(format!("{name} cannot be null"));
        return None;
    }

    let as_cstr = {
        // SAFETY: The caller guarantees `value` points to a valid NUL-terminated C string.
        unsafe { CStr::from_ptr(value) }
    };

    match as_cstr.to_str() {
        Ok(v) => Some(v),
        Err(_) => {
            let _ = error::set_invalid_argument(format!("{name} must be valid UTF-8"));
            None
        }
    }
}

/// Like [`required_str_arg`], but null yields `None` without recording an error.
///
/// # Safety
/// `value` must be null or point to a valid NUL-terminated C string.
pub(crate) unsafe fn optional_str_arg<'a>(
    value: *const c_char,
    name: &str,
) -> Result<Option<&'a str>, ()> {
    if value.is_null() {
        return Ok(None);
    }
    // SAFETY: Forwarded caller guarantee.
    unsafe { required_str_arg(value, name) }
        .map(Some)
        .ok_or(())
}

/// Convert an optional byte pointer + length into a slice.
///
/// # Safety
/// If `len > 0`, `data` must be non-null and readable for `len` bytes.
pub(crate) unsafe fn bytes_arg<'a>(data: *const u8, len: usize, name: &str) -> Option<&'a [u8]> {
    if len == 0 {
        return Some(&[]);
    }
    if data.is_null() {
        let _ = error::set_invalid_argument(format!("{name} cannot be null when len > 0"));
        return None;
    }

    // SAFETY: Pointer and length are validated above and owned by caller for the call duration.
    Some(unsafe { std::slice::from_raw_parts(data, len) })
}

/// Borrow a caller-owned descriptor array.
///
/// # Safety
/// If `n_files > 0`, `files` must be non-null and readable for `n_files` elements, and each
/// element must be an open descriptor for the duration of the call.
pub(crate) unsafe fn fds_arg<'a>(files: *const c_int, n_files: usize) -> Option<Vec<BorrowedFd<'a>>> {
    if n_files == 0 {
        return Some(Vec::new());
    }
    if files.is_null() {
        let _ = error::set_invalid_argument("files cannot be null when n_files > 0");
        return None;
    }

    // SAFETY: Pointer and length are validated above and owned by caller for the call duration.
    let raw = unsafe { std::slice::from_raw_parts(files, n_files) };
    if let Some(bad) = raw.iter().find(|fd| **fd < 0) {
        let _ = error::set_invalid_argument(format!("invalid descriptor {bad}"));
        return None;
    }

    Some(
        raw.iter()
            // SAFETY: Non-negative and kept open by the caller for the call duration.
            .map(|fd| unsafe { BorrowedFd::borrow_raw(*fd) })
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use std::ffi::CString;

    use super::*;

    #[test]
    fn null_required_string_is_rejected() {
        // SAFETY: Null is an accepted input.
        assert!(unsafe { required_str_arg(std::ptr::null(), "path") }.is_none());
    }

    #[test]
    fn optional_string_accepts_null() {
        // SAFETY: Null is an accepted input.
        assert_eq!(
            unsafe { optional_str_arg(std::ptr::null(), "level") },
            Ok(None)
        );
        let level = CString::new("DEBUG").unwrap();
        // SAFETY: `level` is a live NUL-terminated string.
        assert_eq!(
            unsafe { optional_str_arg(level.as_ptr(), "level") },
            Ok(Some("DEBUG"))
        );
    }

    #[test]
    fn empty_byte_argument_may_be_null() {
        // SAFETY: Zero length never dereferences the pointer.
        assert_eq!(
            unsafe { bytes_arg(std::ptr::null(), 0, "metadata") },
            Some(&[][..])
        );
        // SAFETY: Null with a non-zero length is rejected before any read.
        assert!(unsafe { bytes_arg(std::ptr::null(), 3, "metadata") }.is_none());
    }

    #[test]
    fn negative_descriptor_is_rejected() {
        let files: [c_int; 2] = [0, -1];
        // SAFETY: `files` is readable for two elements.
        assert!(unsafe { fds_arg(files.as_ptr(), files.len()) }.is_none());
    }
}
