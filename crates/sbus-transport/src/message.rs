use std::os::fd::OwnedFd;

use bytes::Bytes;

/// A message dequeued from a channel.
///
/// The caller owns everything in it. Descriptors are closed when dropped; use
/// [`Message::into_parts`] or take `descriptors` to keep them alive.
#[derive(Debug)]
pub struct Message {
    /// Descriptors in the order the sender attached them.
    pub descriptors: Vec<OwnedFd>,
    /// Opaque metadata bytes (conventionally JSON).
    pub metadata: Bytes,
    /// Opaque payload bytes (conventionally JSON command parameters).
    pub payload: Bytes,
}

impl Message {
    /// Number of descriptors carried.
    pub fn n_files(&self) -> usize {
        self.descriptors.len()
    }

    /// Split into descriptors, metadata and payload.
    pub fn into_parts(self) -> (Vec<OwnedFd>, Bytes, Bytes) {
        (self.descriptors, self.metadata, self.payload)
    }
}
