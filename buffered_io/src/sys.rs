//! `Result`-returning wrappers around [`FdRuntime`] primitives.
//!
//! `EINTR` is retried here and never reaches callers.

use core::ffi::c_int;
use fd_runtime::{FdRuntime, Syscall, Whence};
use tracing::trace;

use crate::error::BufferedError;

fn last_error<R: FdRuntime>(rt: &R, op: Syscall) -> BufferedError {
    BufferedError::io(op, rt.get_errno())
}

fn interrupted<R: FdRuntime>(rt: &R) -> bool {
    rt.get_errno() == libc::EINTR
}

pub(crate) fn seek<R: FdRuntime>(
    rt: &R,
    fd: c_int,
    offset: u64,
    whence: Whence,
) -> Result<u64, BufferedError> {
    let offset = i64::try_from(offset).map_err(|_| BufferedError::io(Syscall::Seek, libc::EOVERFLOW))?;
    let position = rt.lseek(fd, offset, whence);
    u64::try_from(position).map_err(|_| last_error(rt, Syscall::Seek))
}

/// One read, retried only when interrupted. `Ok(0)` is end of stream.
pub(crate) fn read_once<R: FdRuntime>(
    rt: &R,
    fd: c_int,
    buf: &mut [u8],
) -> Result<usize, BufferedError> {
    loop {
        let n = rt.read(fd, buf);
        if let Ok(n) = usize::try_from(n) {
            return Ok(n);
        }
        if !interrupted(rt) {
            return Err(last_error(rt, Syscall::Read));
        }
        trace!(fd = fd, "read interrupted, retrying");
    }
}

/// Read until `buf` is full or the stream ends, returning the byte count.
pub(crate) fn read_full<R: FdRuntime>(
    rt: &R,
    fd: c_int,
    buf: &mut [u8],
) -> Result<usize, BufferedError> {
    let mut total = 0;
    while total < buf.len() {
        let n = read_once(rt, fd, &mut buf[total..])?;
        if n == 0 {
            break;
        }
        total += n;
    }
    Ok(total)
}

/// Write every byte of `buf`, looping over short writes.
pub(crate) fn write_all<R: FdRuntime>(
    rt: &R,
    fd: c_int,
    buf: &[u8],
) -> Result<(), BufferedError> {
    let mut written = 0;
    while written < buf.len() {
        let n = rt.write(fd, &buf[written..]);
        match usize::try_from(n) {
            Ok(0) => return Err(BufferedError::WriteZero { op: Syscall::Write }),
            Ok(n) => written += n,
            Err(_) if interrupted(rt) => trace!(fd = fd, "write interrupted, retrying"),
            Err(_) => return Err(last_error(rt, Syscall::Write)),
        }
    }
    Ok(())
}
