//! Thin `libc` wrappers for the evdev and uinput control calls.
//!
//! Every call returns `io::Result` built from `errno`; callers attach the
//! call name when they turn it into a [`RelayError`](crate::application::error::RelayError).
//! All `unsafe` blocks are annotated with `// SAFETY:` comments.

use std::ffi::CStr;
use std::io;
use std::os::fd::RawFd;
use std::time::Duration;

/// `ioctl` that fills `buf` (`EVIOCGNAME`, `EVIOCGBIT`, `EVIOCGABS`, ...).
/// Returns the kernel's non-negative result.
pub fn ioctl_read(fd: RawFd, request: u32, buf: &mut [u8]) -> io::Result<i32> {
    // SAFETY: `buf` is a live, writable buffer and every request passed here
    // encodes a size no larger than `buf.len()`.
    let rc = unsafe { libc::ioctl(fd, request as _, buf.as_mut_ptr()) };
    if rc < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(rc)
}

/// `ioctl` taking a plain integer argument (`EVIOCGRAB`, `UI_SET_*BIT`).
pub fn ioctl_int(fd: RawFd, request: u32, value: libc::c_int) -> io::Result<()> {
    // SAFETY: the request takes its argument by value; no memory is shared.
    let rc = unsafe { libc::ioctl(fd, request as _, value) };
    if rc < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

/// `ioctl` without an argument (`UI_DEV_CREATE`, `UI_DEV_DESTROY`).
pub fn ioctl_none(fd: RawFd, request: u32) -> io::Result<()> {
    // SAFETY: the request ignores its argument.
    let rc = unsafe { libc::ioctl(fd, request as _, 0) };
    if rc < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

/// `ioctl` taking a NUL-terminated string (`UI_SET_PHYS`).
pub fn ioctl_str(fd: RawFd, request: u32, value: &CStr) -> io::Result<()> {
    // SAFETY: `value` is NUL-terminated and outlives the call; the kernel
    // copies the string before returning.
    let rc = unsafe { libc::ioctl(fd, request as _, value.as_ptr()) };
    if rc < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

/// Waits up to `timeout` for `fd` to become readable.
///
/// `EINTR` counts as "not readable yet".  A hang-up or error condition is
/// reported as readable so the following `read` surfaces the error.
pub fn poll_readable(fd: RawFd, timeout: Duration) -> io::Result<bool> {
    let mut pollfd = libc::pollfd {
        fd,
        events: libc::POLLIN,
        revents: 0,
    };
    let millis = libc::c_int::try_from(timeout.as_millis()).unwrap_or(libc::c_int::MAX);
    // SAFETY: `pollfd` is a single valid entry on the stack.
    let rc = unsafe { libc::poll(&mut pollfd, 1, millis) };
    if rc < 0 {
        let err = io::Error::last_os_error();
        if err.kind() == io::ErrorKind::Interrupted {
            return Ok(false);
        }
        return Err(err);
    }
    Ok(rc > 0 && pollfd.revents != 0)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
