//! `SCM_RIGHTS` send/receive over `sendmsg`/`recvmsg`.

use std::io;
use std::os::fd::{FromRawFd, OwnedFd, RawFd};

const FD_SIZE: usize = std::mem::size_of::<RawFd>();

#[cfg(any(target_os = "linux", target_os = "android"))]
const RECV_FLAGS: libc::c_int = libc::MSG_CMSG_CLOEXEC;
#[cfg(not(any(target_os = "linux", target_os = "android")))]
const RECV_FLAGS: libc::c_int = 0;

/// Control-message storage aligned for `cmsghdr`.
pub(crate) struct ControlBuffer {
    words: Vec<u64>,
    len: usize,
}

impl ControlBuffer {
    /// Storage large enough for one `SCM_RIGHTS` message carrying `n_fds` descriptors.
    pub(crate) fn for_descriptors(n_fds: usize) -> Self {
        let len = space_for(n_fds);
        Self {
            words: vec![0; len.div_ceil(std::mem::size_of::<u64>())],
            len,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    fn as_mut_ptr(&mut self) -> *mut libc::c_void {
        self.words.as_mut_ptr().cast()
    }
}

fn space_for(n_fds: usize) -> usize {
    // SAFETY: CMSG_SPACE is pure arithmetic on its argument.
    unsafe { libc::CMSG_SPACE((n_fds * FD_SIZE) as libc::c_uint) as usize }
}

/// What one `recvmsg` produced.
pub(crate) struct Received {
    /// Bytes written into the data buffer.
    pub(crate) len: usize,
    /// The datagram was larger than the data buffer.
    pub(crate) data_truncated: bool,
    /// Control data did not fit the control buffer.
    pub(crate) control_truncated: bool,
    pub(crate) control: ReceivedControl,
}

/// Control messages of one datagram, with every descriptor already owned.
#[derive(Default)]
pub(crate) struct ReceivedControl {
    /// Descriptors from every `SCM_RIGHTS` message, in order.
    pub(crate) fds: Vec<OwnedFd>,
    /// `(level, type)` of the first control message, if any.
    pub(crate) first: Option<(libc::c_int, libc::c_int)>,
    /// `(level, type)` of the first control message that is not `SCM_RIGHTS`.
    pub(crate) unexpected: Option<(libc::c_int, libc::c_int)>,
}

/// Send `data` to `addr` with `fds` attached as one `SCM_RIGHTS` message.
///
/// No control message is attached when `fds` is empty.
pub(crate) fn send_with_rights(
    socket: RawFd,
    addr: &libc::sockaddr_un,
    addr_len: libc::socklen_t,
    data: &[u8],
    fds: &[RawFd],
) -> io::Result<usize> {
    let mut iov = libc::iovec {
        iov_base: data.as_ptr() as *mut libc::c_void,
        iov_len: data.len(),
    };

    // SAFETY: `msghdr` is a plain C struct for which all-zero bytes are valid.
    let mut msg: libc::msghdr = unsafe { std::mem::zeroed() };
    msg.msg_name = (addr as *const libc::sockaddr_un).cast_mut().cast();
    msg.msg_namelen = addr_len;
    msg.msg_iov = &mut iov;
    msg.msg_iovlen = 1;

    let mut control = ControlBuffer::for_descriptors(fds.len());
    if !fds.is_empty() {
        msg.msg_control = control.as_mut_ptr();
        msg.msg_controllen = control.len() as _;

        // SAFETY: `msg_control` points to `control`, which is aligned for `cmsghdr` and
        // sized by CMSG_SPACE for `fds.len()` descriptors, so the first header and its
        // data area are in bounds.
        unsafe {
            let cmsg = libc::CMSG_FIRSTHDR(&msg);
            (*cmsg).cmsg_level = libc::SOL_SOCKET;
            (*cmsg).cmsg_type = libc::SCM_RIGHTS;
            (*cmsg).cmsg_len = libc::CMSG_LEN((fds.len() * FD_SIZE) as libc::c_uint) as _;
            let data = libc::CMSG_DATA(cmsg).cast::<RawFd>();
            for (i, fd) in fds.iter().enumerate() {
                data.add(i).write_unaligned(*fd);
            }
        }
    }

    loop {
        // SAFETY: Every pointer in `msg` refers to locals that outlive the call.
        let sent = unsafe { libc::sendmsg(socket, &msg, 0) };
        if sent >= 0 {
            return Ok(sent as usize);
        }
        let err = io::Error::last_os_error();
        if err.kind() != io::ErrorKind::Interrupted {
            return Err(err);
        }
    }
}

/// Receive one datagram into `data`, collecting control messages into owned values.
pub(crate) fn recv_with_rights(
    socket: RawFd,
    data: &mut [u8],
    control: &mut ControlBuffer,
) -> io::Result<Received> {
    let mut iov = libc::iovec {
        iov_base: data.as_mut_ptr().cast(),
        iov_len: data.len(),
    };

    // SAFETY: `msghdr` is a plain C struct for which all-zero bytes are valid.
    let mut msg: libc::msghdr = unsafe { std::mem::zeroed() };
    msg.msg_iov = &mut iov;
    msg.msg_iovlen = 1;
    msg.msg_control = control.as_mut_ptr();
    msg.msg_controllen = control.len() as _;

    // SAFETY: `iov` and `control` are valid writable buffers of the advertised sizes.
    let received = unsafe { libc::recvmsg(socket, &mut msg, RECV_FLAGS) };
    if received < 0 {
        return Err(io::Error::last_os_error());
    }

    // SAFETY: The kernel has just filled `msg_control` and updated `msg_controllen`.
    let collected = unsafe { collect_control(&msg) };

    Ok(Received {
        len: (received as usize).min(data.len()),
        data_truncated: msg.msg_flags & libc::MSG_TRUNC != 0,
        control_truncated: msg.msg_flags & libc::MSG_CTRUNC != 0,
        control: collected,
    })
}

/// Walk the control messages of a received `msghdr`.
///
/// # Safety
/// `msg` must describe a control buffer just filled by a successful `recvmsg`.
unsafe fn collect_control(msg: &libc::msghdr) -> ReceivedControl {
    let mut out = ReceivedControl::default();
    if msg.msg_control.is_null() {
        return out;
    }

    // SAFETY: Guaranteed by the caller; CMSG_* only walk within `msg_controllen`.
    unsafe {
        let header_len = libc::CMSG_LEN(0) as usize;
        let mut cmsg = libc::CMSG_FIRSTHDR(msg);
        while !cmsg.is_null() {
            let level = (*cmsg).cmsg_level;
            let kind = (*cmsg).cmsg_type;
            out.first.get_or_insert((level, kind));

            if level == libc::SOL_SOCKET && kind == libc::SCM_RIGHTS {
                let count = ((*cmsg).cmsg_len as usize).saturating_sub(header_len) / FD_SIZE;
                let data = libc::CMSG_DATA(cmsg).cast::<RawFd>();
                for i in 0..count {
                    // The kernel installed these descriptors for us; nothing else owns them.
                    out.fds
                        .push(OwnedFd::from_raw_fd(data.add(i).read_unaligned()));
                }
            } else if out.unexpected.is_none() {
                out.unexpected = Some((level, kind));
            }

            cmsg = libc::CMSG_NXTHDR(msg, cmsg);
        }
    }

    out
}
