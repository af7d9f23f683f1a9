//! Unix datagram channel with descriptor passing.
//!
//! A receiving process creates one [`Channel`] bound to a filesystem path and loops
//! on [`Channel::wait_readable`] / [`Channel::recv`]. Any number of independent
//! processes push messages into it with [`send`] (or a [`Sender`] carrying a
//! [`LogContext`]). Each message is one datagram: a frame from `sbus-frame` plus
//! the descriptors as `SCM_RIGHTS` ancillary data.
//!
//! There is no session state, no retry, and no user-space queue. The kernel socket
//! buffer of the bound channel is the only queue.

pub mod diag;
pub mod error;

#[cfg(unix)]
mod ancillary;
#[cfg(unix)]
pub mod channel;
#[cfg(unix)]
pub mod message;
#[cfg(unix)]
mod receiver;
#[cfg(unix)]
pub mod sender;
#[cfg(unix)]
mod sys;

pub use diag::{LogContext, LogLevel};
pub use error::{ErrorKind, Result, SbusError};

#[cfg(unix)]
pub use channel::{Channel, ChannelConfig};
#[cfg(unix)]
pub use message::Message;
#[cfg(unix)]
pub use sender::{send, Sender};
