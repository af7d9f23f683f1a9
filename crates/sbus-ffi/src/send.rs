use std::os::raw::{c_char, c_int};

use sbus_transport::Sender;

use crate::args;
use crate::error;
use crate::logger;
use crate::types::{SbusLoggerHandle, SbusResult};

/// Send one message to the channel bound at `path`.
///
/// The descriptors in `files` stay open and owned by the caller. `logger` may be null.
///
/// # Safety
/// `path` must be a non-null pointer to a valid UTF-8, NUL-terminated C string. Each
/// pointer/length pair must describe a readable buffer (a pointer may be null when its
/// length is 0), and every entry of `files` must be an open descriptor. `logger` must
/// be null or a live handle from `sbus_start_logger`.
#[no_mangle]
#[allow(clippy::too_many_arguments)]
pub unsafe extern "C" fn sbus_send_msg(
    path: *const c_char,
    files: *const c_int,
    n_files: usize,
    metadata: *const u8,
    metadata_len: usize,
    payload: *const u8,
    payload_len: usize,
    logger: SbusLoggerHandle,
) -> SbusResult {
    crate::ffi_boundary(SbusResult::Internal, || {
        error::clear_error_state();

        let path = {
            // SAFETY: We validate null and UTF-8 in helper.
            match unsafe { args::required_str_arg(path, "path") } {
                Some(v) => v,
                None => return SbusResult::InvalidArgument,
            }
        };
        let descriptors = {
            // SAFETY: We validate pointer/length pairing in helper.
            match unsafe { args::fds_arg(files, n_files) } {
                Some(v) => v,
                None => return SbusResult::InvalidArgument,
            }
        };
        let metadata = {
            // SAFETY: We validate pointer/length pairing in helper.
            match unsafe { args::bytes_arg(metadata, metadata_len, "metadata") } {
                Some(v) => v,
                None => return SbusResult::InvalidArgument,
            }
        };
        let payload = {
            // SAFETY: We validate pointer/length pairing in helper.
            match unsafe { args::bytes_arg(payload, payload_len, "payload") } {
                Some(v) => v,
                None => return SbusResult::InvalidArgument,
            }
        };
        // SAFETY: Forwarded caller guarantee.
        let log = unsafe { logger::context_of(logger) };

        match Sender::new(log).send(path, descriptors.as_slice(), metadata, payload) {
            Ok(()) => SbusResult::Ok,
            Err(err) => error::map_sbus_error(&err),
        }
    })
}
