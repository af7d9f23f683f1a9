use std::os::raw::c_char;

use sbus_transport::Channel;

use crate::args;
use crate::error;
use crate::logger;
use crate::message::fill_message;
use crate::types::{ChannelHandle, SbusChannelHandle, SbusLoggerHandle, SbusMessage, SbusResult};

fn with_channel_mut<T>(
    handle: SbusChannelHandle,
    on_error: T,
    f: impl FnOnce(&mut ChannelHandle) -> T,
) -> T {
    if handle.is_null() {
        let _ = error::set_invalid_argument("channel handle cannot be null");
        return on_error;
    }

    let channel_handle = {
        // SAFETY: Pointer validity is guaranteed by the caller.
        unsafe { &mut *(handle as *mut ChannelHandle) }
    };

    f(channel_handle)
}

/// Create a channel bound at `path`.
///
/// Returns null on failure; `sbus_last_error` describes why. `logger` may be null.
///
/// # Safety
/// `path` must be a non-null pointer to a valid UTF-8, NUL-terminated C string.
/// `logger` must be null or a live handle from `sbus_start_logger`.
#[no_mangle]
pub unsafe extern "C" fn sbus_create(
    path: *const c_char,
    logger: SbusLoggerHandle,
) -> SbusChannelHandle {
    crate::ffi_boundary(std::ptr::null_mut(), || {
        error::clear_error_state();

        let path = {
            // SAFETY: We validate null and UTF-8 in helper.
            match unsafe { args::required_str_arg(path, "path") } {
                Some(v) => v,
                None => return std::ptr::null_mut(),
            }
        };
        // SAFETY: Forwarded caller guarantee.
        let log = unsafe { logger::context_of(logger) };

        match Channel::create(path, log) {
            Ok(channel) => {
                let handle = ChannelHandle {
                    channel: Some(channel),
                };
                Box::into_raw(Box::new(handle)) as SbusChannelHandle
            }
            Err(err) => {
                let _ = error::map_sbus_error(&err);
                std::ptr::null_mut()
            }
        }
    })
}

/// Block until the channel has a message.
///
/// # Safety
/// `channel` must be a valid handle returned by `sbus_create`.
#[no_mangle]
pub unsafe extern "C" fn sbus_listen(channel: SbusChannelHandle) -> SbusResult {
    crate::ffi_boundary(SbusResult::Internal, || {
        error::clear_error_state();

        with_channel_mut(channel, SbusResult::InvalidArgument, |channel_handle| {
            let channel = match channel_handle.channel.as_ref() {
                Some(channel) => channel,
                None => return error::set_invalid_argument("channel has been removed"),
            };

            match channel.wait_readable() {
                Ok(()) => SbusResult::Ok,
                Err(err) => error::map_sbus_error(&err),
            }
        })
    })
}

/// Receive one message into `out_msg`.
///
/// On success the caller owns the descriptors in `out_msg->files` and must release
/// the arrays with `sbus_message_free`.
///
/// # Safety
/// `channel` must be a valid handle and `out_msg` a valid writable pointer. If
/// `out_msg` already holds arrays from an earlier receive, they are freed first.
#[no_mangle]
pub unsafe extern "C" fn sbus_recv_msg(
    channel: SbusChannelHandle,
    out_msg: *mut SbusMessage,
) -> SbusResult {
    crate::ffi_boundary(SbusResult::Internal, || {
        error::clear_error_state();

        if out_msg.is_null() {
            return error::set_invalid_argument("out_msg cannot be null");
        }

        with_channel_mut(channel, SbusResult::InvalidArgument, |channel_handle| {
            let channel = match channel_handle.channel.as_mut() {
                Some(channel) => channel,
                None => return error::set_invalid_argument("channel has been removed"),
            };

            match channel.recv() {
                Ok(message) => {
                    // SAFETY: Checked for null above; prior arrays come from this library.
                    unsafe { fill_message(&mut *out_msg, message) };
                    SbusResult::Ok
                }
                Err(err) => error::map_sbus_error(&err),
            }
        })
    })
}

/// Close the channel and delete its socket file.
///
/// The handle must still be released with `sbus_channel_free`.
///
/// # Safety
/// `channel` must be a valid handle returned by `sbus_create`.
#[no_mangle]
pub unsafe extern "C" fn sbus_channel_remove(channel: SbusChannelHandle) -> SbusResult {
    crate::ffi_boundary(SbusResult::Internal, || {
        error::clear_error_state();

        with_channel_mut(channel, SbusResult::InvalidArgument, |channel_handle| {
            let channel = match channel_handle.channel.take() {
                Some(channel) => channel,
                None => return error::set_invalid_argument("channel has been removed"),
            };

            match channel.remove() {
                Ok(_) => SbusResult::Ok,
                Err(err) => error::map_sbus_error(&err),
            }
        })
    })
}

/// Free a channel handle. The socket file is left in place.
///
/// # Safety
/// `channel` must be null or a handle returned by `sbus_create`.
#[no_mangle]
pub unsafe extern "C" fn sbus_channel_free(channel: SbusChannelHandle) {
    crate::ffi_boundary((), || {
        if channel.is_null() {
            return;
        }

        // SAFETY: Caller guarantees this handle was allocated by sbus_create.
        unsafe {
            drop(Box::from_raw(channel as *mut ChannelHandle));
        }
    });
}
