use std::os::fd::{AsFd, AsRawFd, BorrowedFd, RawFd};
use std::os::unix::fs::{MetadataExt, PermissionsExt};
use std::os::unix::net::UnixDatagram;
use std::path::{Path, PathBuf};

use sbus_frame::{MAX_FDS, MAX_MSG_LENGTH};

use crate::diag::{sbus_log, LogContext};
use crate::error::{Result, SbusError};
use crate::message::Message;
use crate::receiver::RecvBuffers;
use crate::sys;

/// Configuration for a receiving channel.
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// Permission bits applied to the socket path. Default: `0o777`.
    pub mode: u32,
    /// Receive buffer size for one whole frame. Default: 4096 bytes.
    pub recv_capacity: usize,
    /// Largest descriptor count the control buffer can hold. Default: 4096.
    pub max_descriptors: usize,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            mode: Channel::DEFAULT_SOCKET_MODE,
            recv_capacity: MAX_MSG_LENGTH,
            max_descriptors: MAX_FDS,
        }
    }
}

/// The receiving end of the bus: one datagram socket bound to a filesystem path.
///
/// Dropping a channel closes the socket but leaves the socket file in place;
/// [`Channel::remove`] deletes it.
pub struct Channel {
    socket: UnixDatagram,
    path: PathBuf,
    created_inode: (u64, u64),
    config: ChannelConfig,
    buffers: RecvBuffers,
    log: LogContext,
}

impl Channel {
    /// Default permission mode: writable by every user, so senders inside a
    /// container running under another uid can still reach the channel.
    pub const DEFAULT_SOCKET_MODE: u32 = 0o777;

    /// Create a channel at `path` with the default configuration.
    ///
    /// Any existing file at `path` is removed first.
    pub fn create(path: impl AsRef<Path>, log: LogContext) -> Result<Self> {
        Self::create_with_config(path, ChannelConfig::default(), log)
    }

    /// Create a channel at `path` with explicit configuration.
    ///
    /// Stops at the first failing step. On failure the socket is closed and a
    /// socket file this call bound is removed again.
    pub fn create_with_config(
        path: impl AsRef<Path>,
        config: ChannelConfig,
        log: LogContext,
    ) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let socket = UnixDatagram::unbound().map_err(|source| {
            log.report(
                "create",
                SbusError::Resource {
                    op: "create socket",
                    source,
                },
            )
        })?;

        remove_stale(&path, &log);

        sys::bind(socket.as_raw_fd(), &path).map_err(|source| {
            log.report(
                "create",
                SbusError::Bind {
                    path: path.clone(),
                    source,
                },
            )
        })?;
        let bound = BoundPath::new(&path);

        let metadata = std::fs::symlink_metadata(&path).map_err(|source| {
            log.report(
                "create",
                SbusError::Bind {
                    path: path.clone(),
                    source,
                },
            )
        })?;

        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(config.mode)).map_err(
            |source| {
                log.report(
                    "create",
                    SbusError::Permission {
                        path: path.clone(),
                        source,
                    },
                )
            },
        )?;

        sys::set_reuse_addr(socket.as_raw_fd()).map_err(|source| {
            log.report(
                "create",
                SbusError::Resource {
                    op: "set SO_REUSEADDR",
                    source,
                },
            )
        })?;

        bound.disarm();
        sbus_log!(log, Debug, ?path, mode = %format!("{:o}", config.mode), "channel created");

        Ok(Self {
            socket,
            path,
            created_inode: (metadata.dev(), metadata.ino()),
            buffers: RecvBuffers::new(&config),
            config,
            log,
        })
    }

    /// Block until the channel has a datagram to read.
    ///
    /// There is no timeout. This only checks readiness; [`Channel::recv`] dequeues.
    pub fn wait_readable(&self) -> Result<()> {
        sbus_log!(self.log, Debug, path = ?self.path, "waiting for message");

        loop {
            match sys::poll_readable(self.socket.as_raw_fd()) {
                Ok(revents) if revents & libc::POLLIN != 0 => return Ok(()),
                Ok(revents) => {
                    let source = std::io::Error::other(format!(
                        "channel socket not readable (revents {revents:#x})"
                    ));
                    return Err(self.log.report(
                        "wait",
                        SbusError::Transport {
                            op: "wait for readiness",
                            path: self.path.clone(),
                            source,
                        },
                    ));
                }
                Err(err) if err.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(source) => {
                    return Err(self.log.report(
                        "wait",
                        SbusError::Transport {
                            op: "wait for readiness",
                            path: self.path.clone(),
                            source,
                        },
                    ))
                }
            }
        }
    }

    /// Dequeue exactly one message.
    ///
    /// Call after [`Channel::wait_readable`], or block here until a datagram arrives.
    /// Descriptors and byte buffers in the returned message belong to the caller.
    pub fn recv(&mut self) -> Result<Message> {
        self.buffers.recv(&self.socket, &self.path, &self.log)
    }

    /// Close the channel and delete its socket file.
    ///
    /// Returns `Ok(false)` without touching the filesystem if the path no longer
    /// refers to the socket this channel created.
    pub fn remove(self) -> Result<bool> {
        let (expected_dev, expected_ino) = self.created_inode;
        let metadata = match std::fs::symlink_metadata(&self.path) {
            Ok(metadata) => metadata,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(false),
            Err(source) => {
                return Err(self.log.report(
                    "remove",
                    SbusError::Resource {
                        op: "inspect socket file",
                        source,
                    },
                ))
            }
        };

        if metadata.dev() != expected_dev || metadata.ino() != expected_ino {
            sbus_log!(
                self.log,
                Debug,
                path = ?self.path,
                "socket path identity changed; skipping removal"
            );
            return Ok(false);
        }

        std::fs::remove_file(&self.path).map_err(|source| {
            self.log.report(
                "remove",
                SbusError::Resource {
                    op: "remove socket file",
                    source,
                },
            )
        })?;
        sbus_log!(self.log, Debug, path = ?self.path, "socket file removed");
        Ok(true)
    }

    /// The path this channel is bound to.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The configuration the channel was created with.
    pub fn config(&self) -> &ChannelConfig {
        &self.config
    }

    /// The logging context events are routed through.
    pub fn log(&self) -> &LogContext {
        &self.log
    }
}

impl AsFd for Channel {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.socket.as_fd()
    }
}

impl AsRawFd for Channel {
    fn as_raw_fd(&self) -> RawFd {
        self.socket.as_raw_fd()
    }
}

impl std::fmt::Debug for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Channel")
            .field("path", &self.path)
            .field("fd", &self.socket.as_raw_fd())
            .field("config", &self.config)
            .finish()
    }
}

/// Remove whatever sits at `path`. A missing path is fine; other failures are
/// left for `bind` to report.
fn remove_stale(path: &Path, log: &LogContext) {
    match std::fs::remove_file(path) {
        Ok(()) => sbus_log!(log, Debug, ?path, "removed stale socket file"),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
        Err(err) => sbus_log!(log, Warning, ?path, error = %err, "could not remove existing path"),
    }
}

/// Unlinks a freshly bound path unless creation completes.
struct BoundPath<'a> {
    path: &'a Path,
    armed: bool,
}

impl<'a> BoundPath<'a> {
    fn new(path: &'a Path) -> Self {
        Self { path, armed: true }
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for BoundPath<'_> {
    fn drop(&mut self) {
        if self.armed {
            let _ = std::fs::remove_file(self.path);
        }
    }
}
