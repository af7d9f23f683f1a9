use bytes::{Buf, BufMut, Bytes};

use crate::error::{FrameError, Result};

/// Size of one header field on the wire.
pub const INT_SIZE: usize = std::mem::size_of::<i32>();

/// Frame header: descriptor count + metadata length + payload length = 12 bytes.
pub const HEADER_SIZE: usize = 3 * INT_SIZE;

/// Maximum number of descriptors a single message may carry.
pub const MAX_FDS: usize = 4096;

/// Default receive capacity for a whole frame (header included).
pub const MAX_MSG_LENGTH: usize = 4096;

/// The three leading fields of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    /// Number of descriptors travelling as ancillary data.
    pub n_files: usize,
    /// Length of the metadata section.
    pub metadata_len: usize,
    /// Length of the payload section.
    pub payload_len: usize,
}

impl FrameHeader {
    /// The total wire size implied by this header.
    ///
    /// Returns `None` if the sum overflows `usize`.
    pub fn wire_size(&self) -> Option<usize> {
        HEADER_SIZE
            .checked_add(self.metadata_len)?
            .checked_add(self.payload_len)
    }
}

/// An encoded frame, ready to be handed to a single datagram send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireFrame {
    bytes: Bytes,
}

impl WireFrame {
    /// The encoded bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Length of the encoded frame in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the frame holds no bytes.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Consume the frame and return its bytes.
    pub fn into_bytes(self) -> Bytes {
        self.bytes
    }
}

impl AsRef<[u8]> for WireFrame {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

/// A decoded frame borrowing its sections from the receive buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameView<'a> {
    pub header: FrameHeader,
    pub metadata: &'a [u8],
    pub payload: &'a [u8],
}

/// Encode a message header and its two byte sections.
///
/// Wire format (native byte order, no padding, no terminator):
/// ```text
/// ┌───────────┬──────────────┬─────────────┬──────────────┬─────────────┐
/// │ n_files   │ metadata_len │ payload_len │ metadata     │ payload     │
/// │ (i32)     │ (i32)        │ (i32)       │ (len bytes)  │ (len bytes) │
/// └───────────┴──────────────┴─────────────┴──────────────┴─────────────┘
/// ```
pub fn encode_frame(n_files: usize, metadata: &[u8], payload: &[u8]) -> Result<WireFrame> {
    if n_files > MAX_FDS {
        return Err(FrameError::TooManyDescriptors {
            count: n_files,
            max: MAX_FDS,
        });
    }
    let metadata_len = wire_len("metadata", metadata.len())?;
    let payload_len = wire_len("payload", payload.len())?;

    let header = FrameHeader {
        n_files,
        metadata_len: metadata.len(),
        payload_len: payload.len(),
    };
    let total = header
        .wire_size()
        .ok_or(FrameError::Allocation { size: usize::MAX })?;

    let mut buf: Vec<u8> = Vec::new();
    buf.try_reserve_exact(total)
        .map_err(|_| FrameError::Allocation { size: total })?;

    buf.put_i32_ne(n_files as i32);
    buf.put_i32_ne(metadata_len);
    buf.put_i32_ne(payload_len);
    buf.put_slice(metadata);
    buf.put_slice(payload);

    Ok(WireFrame {
        bytes: Bytes::from(buf),
    })
}

/// Decode a frame from the bytes of one received datagram.
///
/// Every declared length is checked against `src.len()` before any slicing, so a
/// malformed or hostile header yields an error instead of an out-of-bounds read.
/// Bytes past the declared sections are ignored.
pub fn decode_frame(src: &[u8]) -> Result<FrameView<'_>> {
    if src.len() < HEADER_SIZE {
        return Err(FrameError::TruncatedHeader {
            received: src.len(),
            needed: HEADER_SIZE,
        });
    }

    let mut fields = &src[..HEADER_SIZE];
    let n_files = non_negative("descriptor count", fields.get_i32_ne())?;
    let metadata_len = non_negative("metadata length", fields.get_i32_ne())?;
    let payload_len = non_negative("payload length", fields.get_i32_ne())?;

    if n_files > MAX_FDS {
        return Err(FrameError::TooManyDescriptors {
            count: n_files,
            max: MAX_FDS,
        });
    }

    let header = FrameHeader {
        n_files,
        metadata_len,
        payload_len,
    };
    let declared = header.wire_size().unwrap_or(usize::MAX);
    if declared > src.len() {
        return Err(FrameError::LengthMismatch {
            declared,
            received: src.len(),
        });
    }

    let body = &src[HEADER_SIZE..declared];
    let (metadata, payload) = body.split_at(metadata_len);

    Ok(FrameView {
        header,
        metadata,
        payload,
    })
}

fn wire_len(field: &'static str, len: usize) -> Result<i32> {
    i32::try_from(len).map_err(|_| FrameError::FieldOverflow { field, len })
}

fn non_negative(field: &'static str, value: i32) -> Result<usize> {
    usize::try_from(value).map_err(|_| FrameError::NegativeField { field, value })
}
