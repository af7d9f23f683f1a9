//! Wire frame codec for the sbus datagram bus.
//!
//! Every sbus datagram carries one frame:
//! - three native-endian `i32` fields: descriptor count, metadata length, payload length
//! - the metadata bytes
//! - the payload bytes
//!
//! The descriptors themselves never appear in the frame. They travel next to it as
//! `SCM_RIGHTS` ancillary data, which is the transport crate's business. This crate
//! does no I/O.

pub mod codec;
pub mod error;

pub use codec::{
    decode_frame, encode_frame, FrameHeader, FrameView, WireFrame, HEADER_SIZE, INT_SIZE,
    MAX_FDS, MAX_MSG_LENGTH,
};
pub use error::{FrameError, Result};
