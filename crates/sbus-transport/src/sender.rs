use std::os::fd::{AsFd, AsRawFd, RawFd};
use std::os::unix::net::UnixDatagram;
use std::path::Path;

use sbus_frame::encode_frame;

use crate::ancillary::send_with_rights;
use crate::diag::{sbus_log, LogContext};
use crate::error::{Result, SbusError};
use crate::sys;

/// Pushes messages into channels from any process.
///
/// A sender holds no socket between calls. Every [`Sender::send`] opens a fresh
/// unbound datagram socket, sends one frame and closes it again.
#[derive(Debug, Clone, Default)]
pub struct Sender {
    log: LogContext,
}

impl Sender {
    pub fn new(log: LogContext) -> Self {
        Self { log }
    }

    pub fn log(&self) -> &LogContext {
        &self.log
    }

    /// Send one message to the channel bound at `path`.
    ///
    /// The descriptors stay owned by the caller; the receiver gets duplicates in
    /// the same order. The message is never partially delivered: either the whole
    /// frame is queued on the channel or an error is returned.
    pub fn send<F: AsFd>(
        &self,
        path: impl AsRef<Path>,
        descriptors: &[F],
        metadata: &[u8],
        payload: &[u8],
    ) -> Result<()> {
        let path = path.as_ref();
        let log = &self.log;

        let socket = UnixDatagram::unbound().map_err(|source| {
            log.report(
                "send",
                SbusError::Resource {
                    op: "create socket",
                    source,
                },
            )
        })?;

        let frame = encode_frame(descriptors.len(), metadata, payload)
            .map_err(|err| log.report("send", err.into()))?;

        let transport = |source: std::io::Error| {
            log.report(
                "send",
                SbusError::Transport {
                    op: "send",
                    path: path.to_path_buf(),
                    source,
                },
            )
        };

        let (addr, addr_len) = sys::sockaddr_un(path).map_err(transport)?;
        let fds: Vec<RawFd> = descriptors
            .iter()
            .map(|fd| fd.as_fd().as_raw_fd())
            .collect();

        sbus_log!(
            log,
            Debug,
            ?path,
            n_files = fds.len(),
            metadata_len = metadata.len(),
            payload_len = payload.len(),
            "sending message"
        );

        let sent = send_with_rights(socket.as_raw_fd(), &addr, addr_len, frame.as_bytes(), &fds)
            .map_err(transport)?;
        if sent != frame.len() {
            return Err(log.report(
                "send",
                SbusError::ShortSend {
                    path: path.to_path_buf(),
                    sent,
                    expected: frame.len(),
                },
            ));
        }

        sbus_log!(log, Debug, ?path, bytes = sent, "message sent");
        Ok(())
    }
}

/// Send one message to the channel at `path` without a logging context.
///
/// Shorthand for `Sender::default().send(..)`.
pub fn send<F: AsFd>(
    path: impl AsRef<Path>,
    descriptors: &[F],
    metadata: &[u8],
    payload: &[u8],
) -> Result<()> {
    Sender::default().send(path, descriptors, metadata, payload)
}
