//! Unix datagram bus that carries open file descriptors with each message.
//!
//! A receiving process binds a [`Channel`](transport::Channel) to a filesystem path and
//! loops on wait/receive. Unrelated processes send it messages made of descriptors,
//! opaque metadata and an opaque payload, one datagram per message.
//!
//! # Crate Structure
//!
//! - [`frame`]: Wire frame codec (header, metadata, payload)
//! - [`transport`]: Channel, sender, receiver and the logging context

/// Re-export frame types.
pub mod frame {
    pub use sbus_frame::*;
}

/// Re-export transport types.
pub mod transport {
    pub use sbus_transport::*;
}
