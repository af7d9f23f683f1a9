use std::io::ErrorKind;
use std::os::fd::{AsRawFd, OwnedFd};
use std::os::unix::net::UnixDatagram;
use std::path::Path;

use bytes::Bytes;
use sbus_frame::decode_frame;

use crate::ancillary::{recv_with_rights, ControlBuffer, ReceivedControl};
use crate::channel::ChannelConfig;
use crate::diag::{sbus_log, LogContext};
use crate::error::{Result, SbusError};
use crate::message::Message;

/// Fixed-capacity buffers reused by every receive on a channel.
pub(crate) struct RecvBuffers {
    data: Box<[u8]>,
    control: ControlBuffer,
}

impl RecvBuffers {
    pub(crate) fn new(config: &ChannelConfig) -> Self {
        Self {
            data: vec![0u8; config.recv_capacity].into_boxed_slice(),
            control: ControlBuffer::for_descriptors(config.max_descriptors),
        }
    }

    /// Perform one receive on `socket` and assemble an owned [`Message`].
    ///
    /// Descriptors are owned from the moment the kernel hands them over, so every
    /// error return below closes them.
    pub(crate) fn recv(
        &mut self,
        socket: &UnixDatagram,
        path: &Path,
        log: &LogContext,
    ) -> Result<Message> {
        let received = loop {
            match recv_with_rights(socket.as_raw_fd(), &mut self.data, &mut self.control) {
                Ok(received) => break received,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(source) => {
                    return Err(log.report(
                        "receive",
                        SbusError::Transport {
                            op: "receive",
                            path: path.to_path_buf(),
                            source,
                        },
                    ))
                }
            }
        };

        if received.data_truncated {
            return Err(log.report(
                "receive",
                SbusError::Truncation {
                    capacity: self.data.len(),
                },
            ));
        }
        if received.control_truncated {
            return Err(log.report(
                "receive",
                SbusError::Protocol("ancillary data truncated".to_string()),
            ));
        }

        let frame = decode_frame(&self.data[..received.len])
            .map_err(|err| log.report("receive", err.into()))?;
        let n_files = frame.header.n_files;

        let descriptors = if n_files > 0 {
            take_descriptors(n_files, received.control)
                .map_err(|reason| log.report("receive", SbusError::Protocol(reason)))?
        } else {
            let stray = received.control.fds.len();
            if stray > 0 {
                sbus_log!(
                    log,
                    Warning,
                    ?path,
                    stray,
                    "closing descriptors sent with a zero-descriptor header"
                );
            }
            Vec::new()
        };

        let message = Message {
            descriptors,
            metadata: Bytes::copy_from_slice(frame.metadata),
            payload: Bytes::copy_from_slice(frame.payload),
        };

        sbus_log!(
            log,
            Debug,
            ?path,
            n_files,
            metadata_len = message.metadata.len(),
            payload_len = message.payload.len(),
            "message received"
        );

        Ok(message)
    }
}

/// Check the control data against the header count and hand the descriptors out.
fn take_descriptors(
    expected: usize,
    control: ReceivedControl,
) -> std::result::Result<Vec<OwnedFd>, String> {
    let Some((level, kind)) = control.first else {
        return Err(format!(
            "header declares {expected} descriptors but no ancillary data arrived"
        ));
    };
    if kind != libc::SCM_RIGHTS {
        return Err(format!("ancillary message with wrong type {kind}"));
    }
    if level != libc::SOL_SOCKET {
        return Err(format!("ancillary message with wrong level {level}"));
    }
    if let Some((level, kind)) = control.unexpected {
        return Err(format!(
            "unexpected ancillary message (level {level}, type {kind})"
        ));
    }
    if control.fds.len() != expected {
        return Err(format!(
            "incompatible number of descriptors: expected {expected}, found {}",
            control.fds.len()
        ));
    }
    Ok(control.fds)
}
