use std::ffi::CStr;
use std::os::raw::c_int;
use std::rc::Rc;
use std::sync::Arc;

use crate::Whence;

/// Trait for raw descriptor operations.
/// Provides an abstraction layer over the underlying open/read/write/seek/close functions.
/// Return values follow POSIX: a negative result means failure and `get_errno` tells why.
pub trait FdRuntime {
    /// Get the errno of the last failed call
    fn get_errno(&self) -> c_int;

    /// Open a file, returning a descriptor
    fn open(&self, path: &CStr, flags: c_int, mode: u32) -> c_int;

    /// Read from a descriptor into the provided buffer, 0 at end of stream
    fn read(&self, fd: c_int, buffer: &mut [u8]) -> isize;

    /// Write from the provided buffer to a descriptor
    fn write(&self, fd: c_int, buffer: &[u8]) -> isize;

    /// Move the descriptor cursor, returning the new offset
    fn lseek(&self, fd: c_int, offset: i64, whence: Whence) -> i64;

    /// Close a descriptor
    fn close(&self, fd: c_int) -> c_int;

    /// Remove a name from the file system
    fn unlink(&self, path: &CStr) -> c_int;
}

macro_rules! forward_fd_runtime {
    ($($ptr:ty),*) => {$(
        impl<T: FdRuntime + ?Sized> FdRuntime for $ptr {
            fn get_errno(&self) -> c_int {
                (**self).get_errno()
            }

            fn open(&self, path: &CStr, flags: c_int, mode: u32) -> c_int {
                (**self).open(path, flags, mode)
            }

            fn read(&self, fd: c_int, buffer: &mut [u8]) -> isize {
                (**self).read(fd, buffer)
            }

            fn write(&self, fd: c_int, buffer: &[u8]) -> isize {
                (**self).write(fd, buffer)
            }

            fn lseek(&self, fd: c_int, offset: i64, whence: Whence) -> i64 {
                (**self).lseek(fd, offset, whence)
            }

            fn close(&self, fd: c_int) -> c_int {
                (**self).close(fd)
            }

            fn unlink(&self, path: &CStr) -> c_int {
                (**self).unlink(path)
            }
        }
    )*};
}

forward_fd_runtime!(&T, Rc<T>, Arc<T>);
