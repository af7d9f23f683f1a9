use std::os::fd::IntoRawFd;
use std::os::raw::c_int;
use std::ptr;

use sbus_transport::Message;

use crate::types::SbusMessage;

fn into_raw_parts<T>(boxed: Box<[T]>) -> (*mut T, usize) {
    let len = boxed.len();
    if len == 0 {
        (ptr::null_mut(), 0)
    } else {
        (Box::into_raw(boxed) as *mut T, len)
    }
}

/// # Safety
/// Non-null pointers in `msg` must have been produced by [`fill_message`].
unsafe fn release(msg: &mut SbusMessage) {
    // SAFETY: Each array was leaked from a `Box<[T]>` of exactly the recorded length.
    unsafe {
        if !msg.files.is_null() {
            drop(Box::from_raw(ptr::slice_from_raw_parts_mut(msg.files, msg.n_files)));
        }
        if !msg.metadata.is_null() {
            drop(Box::from_raw(ptr::slice_from_raw_parts_mut(
                msg.metadata,
                msg.metadata_len,
            )));
        }
        if !msg.payload.is_null() {
            drop(Box::from_raw(ptr::slice_from_raw_parts_mut(
                msg.payload,
                msg.payload_len,
            )));
        }
    }
    *msg = SbusMessage::default();
}

/// Move a received message into C-visible storage.
///
/// Descriptor ownership passes to the C caller. Arrays from a previous fill are
/// released first.
///
/// # Safety
/// `out` must hold either null pointers or arrays from an earlier fill.
pub(crate) unsafe fn fill_message(out: &mut SbusMessage, message: Message) {
    // SAFETY: Forwarded caller guarantee.
    unsafe { release(out) };

    let (descriptors, metadata, payload) = message.into_parts();
    let files: Box<[c_int]> = descriptors.into_iter().map(IntoRawFd::into_raw_fd).collect();

    (out.files, out.n_files) = into_raw_parts(files);
    (out.metadata, out.metadata_len) = into_raw_parts(Box::<[u8]>::from(metadata.as_ref()));
    (out.payload, out.payload_len) = into_raw_parts(Box::<[u8]>::from(payload.as_ref()));
}

/// Free the arrays held by an [`SbusMessage`] filled by `sbus_recv_msg`.
///
/// Descriptors listed in `files` are not closed; they belong to the caller.
///
/// # Safety
/// `msg` must be null or a valid pointer to an `SbusMessage` whose non-null arrays
/// originated from this library.
#[no_mangle]
pub unsafe extern "C" fn sbus_message_free(msg: *mut SbusMessage) {
    crate::ffi_boundary((), || {
        if msg.is_null() {
            return;
        }

        let msg_ref = {
            // SAFETY: Pointer validity is guaranteed by the caller.
            unsafe { &mut *msg }
        };
        // SAFETY: Arrays originate from `fill_message` per the caller contract.
        unsafe { release(msg_ref) };
    });
}

#[cfg(test)]
mod tests {
    use std::os::fd::{FromRawFd, OwnedFd};

    use super::*;

    fn message(descriptors: Vec<OwnedFd>, metadata: &[u8], payload: &[u8]) -> Message {
        Message {
            descriptors,
            metadata: metadata.to_vec().into(),
            payload: payload.to_vec().into(),
        }
    }

    #[test]
    fn fill_and_free_message() {
        let fd = OwnedFd::from(std::fs::File::open("/dev/null").unwrap());
        let mut out = SbusMessage::default();

        // SAFETY: `out` starts empty.
        unsafe { fill_message(&mut out, message(vec![fd], b"meta", b"payload")) };
        assert_eq!(out.n_files, 1);
        assert_eq!(out.metadata_len, 4);
        assert_eq!(out.payload_len, 7);

        // SAFETY: `files` holds one descriptor now owned by this test.
        let raw = unsafe { *out.files };
        assert!(raw >= 0);

        // SAFETY: `out` was filled by `fill_message`.
        unsafe { sbus_message_free(&mut out) };
        assert!(out.files.is_null());
        assert_eq!(out.n_files, 0);

        // The descriptor outlives the free.
        // SAFETY: `raw` came from `into_raw_fd` and has not been closed.
        drop(unsafe { OwnedFd::from_raw_fd(raw) });
    }

    #[test]
    fn refill_releases_previous_arrays() {
        let mut out = SbusMessage::default();
        // SAFETY: `out` starts empty and is only touched through these helpers.
        unsafe {
            fill_message(&mut out, message(Vec::new(), b"old", b"old"));
            fill_message(&mut out, message(Vec::new(), b"", b"newer"));
        }
        assert!(out.files.is_null());
        assert!(out.metadata.is_null());
        assert_eq!(out.payload_len, 5);

        // SAFETY: `out` was filled by `fill_message`.
        unsafe { sbus_message_free(&mut out) };
    }

    #[test]
    fn free_accepts_null() {
        // SAFETY: Null is an accepted input.
        unsafe { sbus_message_free(std::ptr::null_mut()) };
    }
}
