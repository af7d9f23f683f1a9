use std::fmt;
use std::path::PathBuf;

use sbus_frame::FrameError;

/// Coarse failure classes reported across the channel boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A socket or other kernel resource could not be created or configured.
    ResourceUnavailable,
    /// The channel socket could not be bound to its path.
    BindFailure,
    /// The permission bits of the channel path could not be set.
    PermissionFailure,
    /// A send, receive or readiness syscall failed.
    TransportFailure,
    /// Ancillary data or frame header inconsistent with the protocol.
    ProtocolViolation,
    /// A frame buffer could not be allocated.
    AllocationFailure,
    /// The datagram did not fit the fixed receive capacity.
    Truncation,
}

impl ErrorKind {
    /// Stable upper-case name used in logs and foreign bindings.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::ResourceUnavailable => "RESOURCE_UNAVAILABLE",
            ErrorKind::BindFailure => "BIND_FAILURE",
            ErrorKind::PermissionFailure => "PERMISSION_FAILURE",
            ErrorKind::TransportFailure => "TRANSPORT_FAILURE",
            ErrorKind::ProtocolViolation => "PROTOCOL_VIOLATION",
            ErrorKind::AllocationFailure => "ALLOCATION_FAILURE",
            ErrorKind::Truncation => "TRUNCATION",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that can occur in channel, send and receive operations.
#[derive(Debug, thiserror::Error)]
pub enum SbusError {
    /// A socket could not be created or a socket option could not be set.
    #[error("failed to {op}: {source}")]
    Resource {
        op: &'static str,
        source: std::io::Error,
    },

    /// Failed to bind the channel socket to its path.
    #[error("failed to bind to {path}: {source}")]
    Bind {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to set the permission bits of the channel path.
    #[error("failed to set permissions on {path}: {source}")]
    Permission {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A send, receive or readiness syscall failed.
    #[error("failed to {op} on {path}: {source}")]
    Transport {
        op: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },

    /// The kernel accepted fewer bytes than the frame holds.
    #[error("short send to {path} ({sent} of {expected} bytes)")]
    ShortSend {
        path: PathBuf,
        sent: usize,
        expected: usize,
    },

    /// Ancillary data missing, of the wrong kind, or not matching the header.
    #[error("protocol violation: {0}")]
    Protocol(String),

    /// Frame encode/decode error.
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    /// The datagram was larger than the receive buffer.
    #[error("datagram truncated (receive capacity {capacity} bytes)")]
    Truncation { capacity: usize },
}

impl SbusError {
    /// The failure class of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            SbusError::Resource { .. } => ErrorKind::ResourceUnavailable,
            SbusError::Bind { .. } => ErrorKind::BindFailure,
            SbusError::Permission { .. } => ErrorKind::PermissionFailure,
            SbusError::Transport { .. } | SbusError::ShortSend { .. } => {
                ErrorKind::TransportFailure
            }
            SbusError::Protocol(_) => ErrorKind::ProtocolViolation,
            SbusError::Frame(err) if err.is_malformed() => ErrorKind::ProtocolViolation,
            SbusError::Frame(_) => ErrorKind::AllocationFailure,
            SbusError::Truncation { .. } => ErrorKind::Truncation,
        }
    }

    /// The underlying OS error, if this failure came from a syscall.
    pub fn io_error(&self) -> Option<&std::io::Error> {
        match self {
            SbusError::Resource { source, .. }
            | SbusError::Bind { source, .. }
            | SbusError::Permission { source, .. }
            | SbusError::Transport { source, .. } => Some(source),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, SbusError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_errors_map_to_protocol_or_allocation() {
        let malformed = SbusError::from(FrameError::LengthMismatch {
            declared: 10,
            received: 4,
        });
        assert_eq!(malformed.kind(), ErrorKind::ProtocolViolation);

        let alloc = SbusError::from(FrameError::Allocation { size: 64 });
        assert_eq!(alloc.kind(), ErrorKind::AllocationFailure);
    }

    #[test]
    fn kind_names_are_stable() {
        assert_eq!(ErrorKind::Truncation.to_string(), "TRUNCATION");
        assert_eq!(
            SbusError::Truncation { capacity: 4096 }.kind().as_str(),
            "TRUNCATION"
        );
        assert_eq!(
            SbusError::Protocol("x".into()).kind(),
            ErrorKind::ProtocolViolation
        );
    }

    #[test]
    fn io_error_is_exposed_for_syscall_failures() {
        let err = SbusError::Transport {
            op: "send",
            path: PathBuf::from("/tmp/x.sbus"),
            source: std::io::Error::from(std::io::ErrorKind::ConnectionRefused),
        };
        assert_eq!(
            err.io_error().map(std::io::Error::kind),
            Some(std::io::ErrorKind::ConnectionRefused)
        );
        assert!(SbusError::Protocol("x".into()).io_error().is_none());
    }
}
