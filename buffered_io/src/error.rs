//! Error type for buffered file operations

use core::ffi::c_int;
use fd_runtime::Syscall;

use crate::error_mapping::{errno_to_error_kind, error_kind_to_str};

/// Errors reported by [`crate::BufferedFile`] and [`crate::LockFile`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BufferedError {
    /// A buffer could not be allocated
    OutOfMemory,
    /// The call cannot be served: bad path, zero capacity, or handle already closed
    InvalidArgument(&'static str),
    /// A descriptor primitive failed
    Io { op: Syscall, errno: c_int },
    /// A write primitive accepted no bytes for a non-empty request
    WriteZero { op: Syscall },
}

impl BufferedError {
    #[must_use]
    pub fn io(op: Syscall, errno: c_int) -> Self {
        Self::Io { op, errno }
    }

    /// The primitive that failed, if any
    #[must_use]
    pub fn syscall(&self) -> Option<Syscall> {
        match self {
            Self::Io { op, .. } | Self::WriteZero { op } => Some(*op),
            Self::OutOfMemory | Self::InvalidArgument(_) => None,
        }
    }

    #[must_use]
    pub fn raw_os_error(&self) -> Option<c_int> {
        match self {
            Self::Io { errno, .. } => Some(*errno),
            Self::OutOfMemory => Some(libc::ENOMEM),
            Self::InvalidArgument(_) => Some(libc::EINVAL),
            Self::WriteZero { .. } => None,
        }
    }
}

impl std::fmt::Display for BufferedError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OutOfMemory => write!(f, "buffer allocation failed"),
            Self::InvalidArgument(what) => write!(f, "invalid argument: {what}"),
            Self::Io { op, errno } => {
                let kind = error_kind_to_str(errno_to_error_kind(*errno));
                write!(f, "{op} failed: {kind} (errno {errno})")
            }
            Self::WriteZero { op } => write!(f, "{op} made no progress"),
        }
    }
}

impl std::error::Error for BufferedError {}

impl embedded_io::Error for BufferedError {
    fn kind(&self) -> embedded_io::ErrorKind {
        match self {
            Self::OutOfMemory => embedded_io::ErrorKind::OutOfMemory,
            Self::InvalidArgument(_) => embedded_io::ErrorKind::InvalidInput,
            Self::Io { errno, .. } => errno_to_error_kind(*errno),
            Self::WriteZero { .. } => embedded_io::ErrorKind::Other,
        }
    }
}

impl From<BufferedError> for std::io::Error {
    fn from(err: BufferedError) -> Self {
        match err {
            BufferedError::Io { errno, .. } => std::io::Error::from_raw_os_error(errno),
            BufferedError::WriteZero { .. } => {
                std::io::Error::new(std::io::ErrorKind::WriteZero, err)
            }
            BufferedError::OutOfMemory => std::io::Error::new(std::io::ErrorKind::OutOfMemory, err),
            BufferedError::InvalidArgument(_) => {
                std::io::Error::new(std::io::ErrorKind::InvalidInput, err)
            }
        }
    }
}
