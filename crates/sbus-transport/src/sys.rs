//! Thin libc wrappers for the socket calls std does not expose.

use std::io;
use std::os::fd::RawFd;
use std::os::unix::ffi::OsStrExt;
use std::path::Path;

/// Build a `sockaddr_un` for a filesystem path.
///
/// Returns the address and the length to pass alongside it.
pub(crate) fn sockaddr_un(path: &Path) -> io::Result<(libc::sockaddr_un, libc::socklen_t)> {
    // SAFETY: `sockaddr_un` is a plain C struct for which all-zero bytes are valid.
    let mut addr: libc::sockaddr_un = unsafe { std::mem::zeroed() };
    addr.sun_family = libc::AF_UNIX as libc::sa_family_t;

    let bytes = path.as_os_str().as_bytes();
    if bytes.is_empty() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "socket path is empty",
        ));
    }
    if bytes.contains(&0) {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "socket path contains an interior NUL byte",
        ));
    }
    // One byte is kept for the terminating NUL.
    let max = addr.sun_path.len() - 1;
    if bytes.len() > max {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("socket path too long ({} bytes, max {max})", bytes.len()),
        ));
    }

    for (dst, src) in addr.sun_path.iter_mut().zip(bytes) {
        *dst = *src as libc::c_char;
    }

    let base = std::ptr::addr_of!(addr) as usize;
    let path_offset = addr.sun_path.as_ptr() as usize - base;
    let len = path_offset + bytes.len() + 1;

    Ok((addr, len as libc::socklen_t))
}

/// Bind `fd` to a filesystem path.
pub(crate) fn bind(fd: RawFd, path: &Path) -> io::Result<()> {
    let (addr, len) = sockaddr_un(path)?;

    // SAFETY: `addr` is a valid, initialized `sockaddr_un` and `len` does not exceed its size.
    let rc = unsafe {
        libc::bind(
            fd,
            std::ptr::addr_of!(addr).cast::<libc::sockaddr>(),
            len,
        )
    };
    if rc == -1 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

/// Enable `SO_REUSEADDR` on `fd`.
pub(crate) fn set_reuse_addr(fd: RawFd) -> io::Result<()> {
    let enable: libc::c_int = 1;

    // SAFETY: The option value points to a live `c_int` and the length matches it.
    let rc = unsafe {
        libc::setsockopt(
            fd,
            libc::SOL_SOCKET,
            libc::SO_REUSEADDR,
            std::ptr::addr_of!(enable).cast::<libc::c_void>(),
            std::mem::size_of::<libc::c_int>() as libc::socklen_t,
        )
    };
    if rc == -1 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

/// Block until `fd` reports an event. Returns the `revents` mask.
pub(crate) fn poll_readable(fd: RawFd) -> io::Result<libc::c_short> {
    let mut pfd = libc::pollfd {
        fd,
        events: libc::POLLIN,
        revents: 0,
    };

    // SAFETY: `pfd` is a valid array of one `pollfd` for the duration of the call.
    let rc = unsafe { libc::poll(&mut pfd, 1, -1) };
    if rc < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(pfd.revents)
}
