//! Insert-at-front flush.
//!
//! The file is rewritten in place as `pending ++ previous content`. The
//! rewrite is not atomic: a failure after step (3) leaves the file partially
//! overwritten, and a concurrent writer changing the file between the size
//! probe and the rewrite races with us. Neither case is detected.

use core::ffi::c_int;
use fd_runtime::{FdRuntime, Whence};
use tracing::trace;

use crate::buffer::alloc_zeroed;
use crate::error::BufferedError;
use crate::sys;

/// Make `pending` the new prefix of the file behind `fd`, then park the
/// cursor at `logical_offset + pending.len()`.
pub(crate) fn flush_to_front<R: FdRuntime>(
    rt: &R,
    fd: c_int,
    pending: &[u8],
    logical_offset: u64,
) -> Result<(), BufferedError> {
    // (1) current size
    let size = sys::seek(rt, fd, 0, Whence::End)?;

    // (2) save what is there
    let old = if size > 0 {
        let len = usize::try_from(size).map_err(|_| BufferedError::OutOfMemory)?;
        let mut old = alloc_zeroed(len)?;
        sys::seek(rt, fd, 0, Whence::Start)?;
        let n = sys::read_full(rt, fd, &mut old)?;
        old.truncate(n);
        old
    } else {
        Vec::new()
    };

    // (3)-(5) new bytes first, old content after them
    sys::seek(rt, fd, 0, Whence::Start)?;
    sys::write_all(rt, fd, pending)?;
    sys::write_all(rt, fd, &old)?;

    // (6) keep the OS cursor in line with the logical position
    let cursor = logical_offset + pending.len() as u64;
    sys::seek(rt, fd, cursor, Whence::Start)?;

    trace!(
        fd = fd,
        inserted = pending.len(),
        relocated = old.len(),
        cursor = cursor,
        "preappend flush"
    );
    Ok(())
}
