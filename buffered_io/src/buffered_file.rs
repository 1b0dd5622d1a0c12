//! Buffered reads and writes over a raw descriptor.
//!
//! # Example
//!
//! ```no_run
//! use buffered_io::{BufferedFile, OpenFlags};
//!
//! let mut file = BufferedFile::open(
//!     "notes.txt",
//!     OpenFlags::RDWR | OpenFlags::CREAT | OpenFlags::TRUNC,
//! )
//! .unwrap();
//! file.write(b"Hello, world!").unwrap();
//! file.close().unwrap();
//! ```
//!
//! One handle owns one descriptor plus a read buffer and a write buffer of
//! `N` bytes each. At most one of the buffers holds live data; see [`Mode`].
//! A handle is not synchronized: wrap it in a mutex to share it.

use core::ffi::c_int;
use fd_runtime::{FdRuntime, LibcRuntime, Syscall, Whence};
use std::ffi::CString;
use std::os::unix::ffi::OsStrExt;
use std::path::Path;
use tracing::{debug, trace, warn};

use crate::buffer::{ReadBuffer, WriteBuffer};
use crate::error::BufferedError;
use crate::flags::OpenFlags;
use crate::{preappend, sys};

/// Capacity of each buffer unless a handle picks another one.
pub const BUFFER_SIZE: usize = 4096;

/// Permission bits used by [`BufferedFile::open`] when it creates a file.
pub const DEFAULT_MODE: u32 = 0o666;

/// Which buffer currently holds meaningful state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Nothing read or written yet
    Unset,
    /// The read buffer may hold bytes the caller has not consumed
    Reading,
    /// The write buffer may hold bytes not yet flushed
    Writing,
}

/// Resources released together on close
struct OpenState {
    fd: c_int,
    read_buf: ReadBuffer,
    write_buf: WriteBuffer,
}

pub struct BufferedFile<R: FdRuntime = LibcRuntime, const N: usize = BUFFER_SIZE> {
    runtime: R,
    state: Option<OpenState>,
    mode: Mode,
    preappend: bool,
    logical_offset: u64,
}

impl BufferedFile {
    /// Open `path` on the real file system. Created files get [`DEFAULT_MODE`]
    /// (filtered by the process umask).
    ///
    /// # Errors
    /// Returns an error if the buffers cannot be allocated or `open(2)` fails.
    pub fn open(path: impl AsRef<Path>, flags: OpenFlags) -> Result<Self, BufferedError> {
        Self::open_with_mode(path, flags, DEFAULT_MODE)
    }

    /// Like [`BufferedFile::open`] with explicit permission bits for `CREAT`.
    ///
    /// # Errors
    /// Returns an error if the buffers cannot be allocated or `open(2)` fails.
    pub fn open_with_mode(
        path: impl AsRef<Path>,
        flags: OpenFlags,
        mode: u32,
    ) -> Result<Self, BufferedError> {
        Self::open_in(LibcRuntime::new(), path, flags, mode)
    }
}

impl<R: FdRuntime, const N: usize> BufferedFile<R, N> {
    /// Open `path` through `runtime`.
    ///
    /// Both buffers are allocated before the descriptor is opened, so a
    /// failed allocation never leaks a descriptor.
    ///
    /// # Errors
    /// - `InvalidArgument` if `N` is zero or the path contains a NUL byte
    /// - `OutOfMemory` if a buffer cannot be allocated
    /// - `Io { op: Open, .. }` if the descriptor cannot be opened
    pub fn open_in(
        runtime: R,
        path: impl AsRef<Path>,
        flags: OpenFlags,
        mode: u32,
    ) -> Result<Self, BufferedError> {
        let path = path.as_ref();
        let c_path = CString::new(path.as_os_str().as_bytes())
            .map_err(|_| BufferedError::InvalidArgument("path contains a NUL byte"))?;
        let (read_buf, write_buf) = Self::alloc_buffers()?;

        let fd = runtime.open(&c_path, flags.os_flags(), mode);
        if fd < 0 {
            let err = BufferedError::io(Syscall::Open, runtime.get_errno());
            debug!(path = %path.display(), error = %err, "open failed");
            return Err(err);
        }
        debug!(
            fd = fd,
            path = %path.display(),
            preappend = flags.is_preappend(),
            capacity = N,
            "opened buffered file"
        );

        Ok(Self::with_state(
            runtime,
            OpenState {
                fd,
                read_buf,
                write_buf,
            },
            flags.is_preappend(),
        ))
    }

    /// Adopt an already open descriptor, such as stdout.
    /// The descriptor is closed when the handle is closed or dropped.
    ///
    /// # Errors
    /// Returns an error if `fd` is negative or the buffers cannot be allocated.
    pub fn from_fd(runtime: R, fd: c_int, preappend: bool) -> Result<Self, BufferedError> {
        if fd < 0 {
            return Err(BufferedError::InvalidArgument("negative descriptor"));
        }
        let (read_buf, write_buf) = Self::alloc_buffers()?;
        Ok(Self::with_state(
            runtime,
            OpenState {
                fd,
                read_buf,
                write_buf,
            },
            preappend,
        ))
    }

    fn alloc_buffers() -> Result<(ReadBuffer, WriteBuffer), BufferedError> {
        if N == 0 {
            return Err(BufferedError::InvalidArgument("buffer capacity is zero"));
        }
        Ok((ReadBuffer::with_capacity(N)?, WriteBuffer::with_capacity(N)?))
    }

    fn with_state(runtime: R, state: OpenState, preappend: bool) -> Self {
        Self {
            runtime,
            state: Some(state),
            mode: Mode::Unset,
            preappend,
            logical_offset: 0,
        }
    }

    /// The underlying descriptor, `None` after close.
    #[must_use]
    pub fn fd(&self) -> Option<c_int> {
        self.state.as_ref().map(|s| s.fd)
    }

    /// `false` once the handle has been closed.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.state.is_some()
    }

    /// Whether flushes insert at the front of the file.
    #[must_use]
    pub fn is_preappend(&self) -> bool {
        self.preappend
    }

    /// Which buffer currently holds live data.
    #[must_use]
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Offset of the next byte from the caller's point of view.
    #[must_use]
    pub fn logical_offset(&self) -> u64 {
        self.logical_offset
    }

    /// Size of each buffer in bytes.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Bytes written but not yet flushed.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.state.as_ref().map_or(0, |s| s.write_buf.len())
    }

    fn state_mut(&mut self) -> Result<&mut OpenState, BufferedError> {
        self.state
            .as_mut()
            .ok_or(BufferedError::InvalidArgument("file is closed"))
    }

    /// The only place where the mode changes.
    ///
    /// - Writing -> Reading: pending bytes are flushed first.
    /// - Reading -> Writing: read-ahead is dropped and the descriptor is moved
    ///   back to the logical offset, because read-ahead moved it further.
    fn switch_mode(&mut self, target: Mode) -> Result<(), BufferedError> {
        match (self.mode, target) {
            (Mode::Writing, Mode::Reading) => {
                debug!(fd = ?self.fd(), "switching from writing to reading");
                self.flush_pending()?;
            }
            (Mode::Reading, Mode::Writing) => {
                let offset = self.logical_offset;
                let Some(state) = self.state.as_mut() else {
                    return Err(BufferedError::InvalidArgument("file is closed"));
                };
                debug!(fd = state.fd, offset = offset, "switching from reading to writing");
                sys::seek(&self.runtime, state.fd, offset, Whence::Start)?;
                state.read_buf.discard();
            }
            _ => {}
        }
        self.mode = target;
        Ok(())
    }

    /// Read up to `buf.len()` bytes.
    ///
    /// Returns fewer bytes only at end of stream, or when the descriptor
    /// fails after some bytes were already produced. `Ok(0)` for a non-empty
    /// `buf` means end of stream.
    ///
    /// # Errors
    /// Returns an error if switching from writing fails, or if the first
    /// refill fails.
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize, BufferedError> {
        if buf.is_empty() {
            return Ok(0);
        }
        self.state_mut()?;
        self.switch_mode(Mode::Reading)?;
        let Some(state) = self.state.as_mut() else {
            return Err(BufferedError::InvalidArgument("file is closed"));
        };

        let mut produced = 0;
        while produced < buf.len() {
            if state.read_buf.is_exhausted() {
                match sys::read_once(&self.runtime, state.fd, state.read_buf.spare()) {
                    Ok(0) => break,
                    Ok(n) => {
                        trace!(fd = state.fd, bytes = n, "refilled read buffer");
                        state.read_buf.filled(n);
                    }
                    Err(err) if produced == 0 => return Err(err),
                    Err(err) => {
                        warn!(
                            fd = state.fd,
                            produced = produced,
                            error = %err,
                            "read failed after progress, returning short count"
                        );
                        break;
                    }
                }
            }
            let n = state.read_buf.take(&mut buf[produced..]);
            produced += n;
            self.logical_offset += n as u64;
        }
        Ok(produced)
    }

    /// Buffer `buf`, flushing whenever the write buffer fills up.
    ///
    /// Bytes may stay buffered until the next flush, mode switch or close.
    ///
    /// # Errors
    /// Returns an error if switching from reading fails, or if a flush fails
    /// before any byte of `buf` was buffered. A flush failure after progress
    /// yields the short count instead.
    pub fn write(&mut self, buf: &[u8]) -> Result<usize, BufferedError> {
        if buf.is_empty() {
            return Ok(0);
        }
        self.state_mut()?;
        self.switch_mode(Mode::Writing)?;

        let mut consumed = 0;
        while consumed < buf.len() {
            if self.state_mut()?.write_buf.is_full() {
                if let Err(err) = self.flush_pending() {
                    if consumed == 0 {
                        return Err(err);
                    }
                    warn!(
                        fd = ?self.fd(),
                        consumed = consumed,
                        error = %err,
                        "flush failed after progress, returning short count"
                    );
                    return Ok(consumed);
                }
            }
            consumed += self.state_mut()?.write_buf.put(&buf[consumed..]);
        }
        Ok(consumed)
    }

    /// Push buffered bytes to the descriptor.
    ///
    /// In preappend mode the bytes become the new beginning of the file.
    ///
    /// # Errors
    /// Returns an error if the handle is closed or the descriptor fails; the
    /// buffered bytes are kept in that case.
    pub fn flush(&mut self) -> Result<(), BufferedError> {
        self.state_mut()?;
        self.flush_pending()
    }

    fn flush_pending(&mut self) -> Result<(), BufferedError> {
        let Some(state) = self.state.as_mut() else {
            return Err(BufferedError::InvalidArgument("file is closed"));
        };
        if state.write_buf.is_empty() {
            return Ok(());
        }

        let pending = state.write_buf.pending();
        if self.preappend {
            preappend::flush_to_front(&self.runtime, state.fd, pending, self.logical_offset)?;
        } else {
            sys::write_all(&self.runtime, state.fd, pending)?;
        }
        trace!(fd = state.fd, bytes = pending.len(), "flushed write buffer");

        self.logical_offset += pending.len() as u64;
        state.write_buf.clear();
        Ok(())
    }

    /// Flush, then close the descriptor and release both buffers.
    ///
    /// Resources are released even when the flush or the close fails.
    /// Closing an already closed handle is a no-op.
    ///
    /// # Errors
    /// Returns the flush error if flushing failed, else the close error.
    pub fn close(&mut self) -> Result<(), BufferedError> {
        if self.state.is_none() {
            return Ok(());
        }
        let flushed = self.flush_pending();

        let Some(state) = self.state.take() else {
            return flushed;
        };
        let closed = if self.runtime.close(state.fd) < 0 {
            Err(BufferedError::io(Syscall::Close, self.runtime.get_errno()))
        } else {
            Ok(())
        };
        self.mode = Mode::Unset;
        debug!(fd = state.fd, "closed buffered file");
        drop(state);

        flushed.and(closed)
    }
}

impl<R: FdRuntime, const N: usize> Drop for BufferedFile<R, N> {
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            warn!(error = %err, "close on drop failed");
        }
    }
}

impl<R: FdRuntime, const N: usize> embedded_io::ErrorType for BufferedFile<R, N> {
    type Error = BufferedError;
}

impl<R: FdRuntime, const N: usize> embedded_io::Read for BufferedFile<R, N> {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        BufferedFile::read(self, buf)
    }
}

impl<R: FdRuntime, const N: usize> embedded_io::Write for BufferedFile<R, N> {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        BufferedFile::write(self, buf)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        BufferedFile::flush(self)
    }
}

impl<R: FdRuntime, const N: usize> core::fmt::Debug for BufferedFile<R, N> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("BufferedFile")
            .field("fd", &self.fd())
            .field("mode", &self.mode)
            .field("preappend", &self.preappend)
            .field("logical_offset", &self.logical_offset)
            .field("pending", &self.pending())
            .finish()
    }
}
