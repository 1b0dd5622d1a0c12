//! Advisory lock built on exclusive file creation.
//!
//! Whoever creates the lock path with `O_CREAT | O_EXCL` holds the lock.
//! [`LockFile`] is the held lock: dropping it closes the descriptor and
//! removes the path.
//!
//! # Example
//!
//! ```no_run
//! use buffered_io::{LockFile, DEFAULT_POLL_INTERVAL};
//! use fd_runtime::LibcRuntime;
//!
//! let lock = LockFile::acquire(LibcRuntime::new(), "app.lock", DEFAULT_POLL_INTERVAL).unwrap();
//! // ... exclusive section ...
//! lock.release().unwrap();
//! ```

use core::ffi::c_int;
use fd_runtime::{FdRuntime, LibcRuntime, Syscall};
use std::ffi::CString;
use std::os::unix::ffi::OsStrExt;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, trace, warn};

use crate::error::BufferedError;

/// Pause between attempts in [`LockFile::acquire`].
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_micros(100);

const LOCK_MODE: u32 = 0o666;

pub struct LockFile<R: FdRuntime = LibcRuntime> {
    runtime: R,
    path: CString,
    fd: Option<c_int>,
}

impl<R: FdRuntime> LockFile<R> {
    /// Take the lock if nobody holds it.
    ///
    /// # Errors
    /// Returns an error if the path is invalid or creation fails for any
    /// reason other than the lock being held.
    pub fn try_acquire(runtime: R, path: impl AsRef<Path>) -> Result<Option<Self>, BufferedError> {
        let path = lock_path(path.as_ref())?;
        Ok(attempt(&runtime, &path)?.map(|fd| Self {
            runtime,
            path,
            fd: Some(fd),
        }))
    }

    /// Wait until the lock is free, checking every `poll`.
    ///
    /// # Errors
    /// Returns an error if the path is invalid or creation fails for any
    /// reason other than the lock being held.
    pub fn acquire(
        runtime: R,
        path: impl AsRef<Path>,
        poll: Duration,
    ) -> Result<Self, BufferedError> {
        let path = lock_path(path.as_ref())?;
        loop {
            if let Some(fd) = attempt(&runtime, &path)? {
                return Ok(Self {
                    runtime,
                    path,
                    fd: Some(fd),
                });
            }
            trace!(path = ?path, "lock busy, waiting");
            std::thread::sleep(poll);
        }
    }

    /// Release the lock now and report failures that `drop` would only log.
    ///
    /// # Errors
    /// Returns the close error if closing failed, else the unlink error.
    pub fn release(mut self) -> Result<(), BufferedError> {
        self.release_inner()
    }

    fn release_inner(&mut self) -> Result<(), BufferedError> {
        let Some(fd) = self.fd.take() else {
            return Ok(());
        };
        let closed = if self.runtime.close(fd) < 0 {
            Err(BufferedError::io(Syscall::Close, self.runtime.get_errno()))
        } else {
            Ok(())
        };
        let unlinked = if self.runtime.unlink(&self.path) < 0 {
            Err(BufferedError::io(Syscall::Unlink, self.runtime.get_errno()))
        } else {
            Ok(())
        };
        debug!(path = ?self.path, "lock released");
        closed.and(unlinked)
    }
}

impl<R: FdRuntime> Drop for LockFile<R> {
    fn drop(&mut self) {
        if let Err(err) = self.release_inner() {
            warn!(path = ?self.path, error = %err, "releasing lock on drop failed");
        }
    }
}

impl<R: FdRuntime> core::fmt::Debug for LockFile<R> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("LockFile")
            .field("path", &self.path)
            .field("fd", &self.fd)
            .finish()
    }
}

fn lock_path(path: &Path) -> Result<CString, BufferedError> {
    CString::new(path.as_os_str().as_bytes())
        .map_err(|_| BufferedError::InvalidArgument("path contains a NUL byte"))
}

/// One exclusive-create attempt; `Ok(None)` when the lock is held.
fn attempt<R: FdRuntime>(runtime: &R, path: &CString) -> Result<Option<c_int>, BufferedError> {
    let flags = libc::O_CREAT | libc::O_EXCL | libc::O_WRONLY;
    let fd = runtime.open(path, flags, LOCK_MODE);
    if fd >= 0 {
        debug!(path = ?path, fd = fd, "lock acquired");
        return Ok(Some(fd));
    }
    match runtime.get_errno() {
        libc::EEXIST | libc::EINTR => Ok(None),
        errno => Err(BufferedError::io(Syscall::Open, errno)),
    }
}
