//! Error mapping utilities for converting between error types.
//!
//! This module provides functions to convert errno values to `embedded_io::ErrorKind`
//! and to convert error kinds to human-readable static strings.

use core::ffi::c_int;

/// Convert errno to `embedded_io::ErrorKind`
#[must_use]
#[allow(clippy::match_same_arms)] // We explicitly list common errno values for documentation
pub fn errno_to_error_kind(errno: c_int) -> embedded_io::ErrorKind {
    match errno {
        libc::EPERM | libc::EACCES | libc::EROFS => embedded_io::ErrorKind::PermissionDenied,
        libc::ENOENT => embedded_io::ErrorKind::NotFound,
        libc::EEXIST => embedded_io::ErrorKind::AlreadyExists,
        libc::EBADF | libc::EINVAL | libc::ESPIPE | libc::EISDIR => {
            embedded_io::ErrorKind::InvalidInput
        }
        libc::ENOMEM | libc::ENOSPC => embedded_io::ErrorKind::OutOfMemory,
        libc::EINTR => embedded_io::ErrorKind::Interrupted,
        libc::EPIPE => embedded_io::ErrorKind::BrokenPipe,
        libc::EMFILE | libc::ENFILE | libc::EOVERFLOW => embedded_io::ErrorKind::Unsupported,
        libc::EIO | libc::EAGAIN => embedded_io::ErrorKind::Other,
        _ => embedded_io::ErrorKind::Other,
    }
}

/// Convert error kind to a static string description
#[must_use]
pub fn error_kind_to_str(kind: embedded_io::ErrorKind) -> &'static str {
    match kind {
        embedded_io::ErrorKind::NotFound => "not found",
        embedded_io::ErrorKind::PermissionDenied => "permission denied",
        embedded_io::ErrorKind::BrokenPipe => "broken pipe",
        embedded_io::ErrorKind::AlreadyExists => "already exists",
        embedded_io::ErrorKind::InvalidInput => "invalid input",
        embedded_io::ErrorKind::InvalidData => "invalid data",
        embedded_io::ErrorKind::Interrupted => "interrupted",
        embedded_io::ErrorKind::Unsupported => "unsupported",
        embedded_io::ErrorKind::OutOfMemory => "out of memory",
        embedded_io::ErrorKind::Other => "other error",
        _ => "unknown error",
    }
}
