use std::ffi::CStr;
use std::os::raw::c_int;
use std::sync::atomic::{AtomicI32, Ordering};

use crate::runtime_trait::FdRuntime;
use crate::Whence;

/// `libc`-based implementation of `FdRuntime`.
///
/// errno is captured right after a failing call, so `get_errno` still
/// reports it after the caller has done other work (logging, allocation).
#[derive(Debug, Default)]
pub struct LibcRuntime {
    errno: AtomicI32,
}

impl LibcRuntime {
    #[must_use]
    pub fn new() -> Self {
        Self {
            errno: AtomicI32::new(0),
        }
    }

    fn capture_errno(&self) {
        let errno = std::io::Error::last_os_error()
            .raw_os_error()
            .unwrap_or(libc::EIO);
        self.errno.store(errno, Ordering::Relaxed);
    }

    fn check_int(&self, result: c_int) -> c_int {
        if result < 0 {
            self.capture_errno();
        }
        result
    }

    fn check_size(&self, result: isize) -> isize {
        if result < 0 {
            self.capture_errno();
        }
        result
    }
}

impl FdRuntime for LibcRuntime {
    fn get_errno(&self) -> c_int {
        self.errno.load(Ordering::Relaxed)
    }

    fn open(&self, path: &CStr, flags: c_int, mode: u32) -> c_int {
        let fd = unsafe { libc::open(path.as_ptr(), flags, libc::c_uint::from(mode)) };
        self.check_int(fd)
    }

    fn read(&self, fd: c_int, buffer: &mut [u8]) -> isize {
        let n = unsafe { libc::read(fd, buffer.as_mut_ptr().cast(), buffer.len()) };
        self.check_size(n)
    }

    fn write(&self, fd: c_int, buffer: &[u8]) -> isize {
        let n = unsafe { libc::write(fd, buffer.as_ptr().cast(), buffer.len()) };
        self.check_size(n)
    }

    fn lseek(&self, fd: c_int, offset: i64, whence: Whence) -> i64 {
        let Ok(offset) = libc::off_t::try_from(offset) else {
            self.errno.store(libc::EOVERFLOW, Ordering::Relaxed);
            return -1;
        };
        let position = unsafe { libc::lseek(fd, offset, whence.to_raw()) };
        if position < 0 {
            self.capture_errno();
            return -1;
        }
        i64::from(position)
    }

    fn close(&self, fd: c_int) -> c_int {
        let result = unsafe { libc::close(fd) };
        self.check_int(result)
    }

    fn unlink(&self, path: &CStr) -> c_int {
        let result = unsafe { libc::unlink(path.as_ptr()) };
        self.check_int(result)
    }
}
