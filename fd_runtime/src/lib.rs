//! Raw descriptor primitives.
//!
//! [`FdRuntime`] is the seam between the buffered layer and the operating
//! system. [`LibcRuntime`] is the real implementation; tests substitute an
//! in-memory one.

mod libc_runtime;
mod runtime_trait;

pub use libc_runtime::LibcRuntime;
pub use runtime_trait::FdRuntime;

/// The primitive an operation was issued with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Syscall {
    Open,
    Read,
    Write,
    Seek,
    Close,
    Unlink,
}

impl Syscall {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Read => "read",
            Self::Write => "write",
            Self::Seek => "lseek",
            Self::Close => "close",
            Self::Unlink => "unlink",
        }
    }
}

impl std::fmt::Display for Syscall {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Reference point for [`FdRuntime::lseek`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Whence {
    Start,
    Current,
    End,
}

impl Whence {
    #[must_use]
    pub fn to_raw(self) -> std::os::raw::c_int {
        match self {
            Self::Start => libc::SEEK_SET,
            Self::Current => libc::SEEK_CUR,
            Self::End => libc::SEEK_END,
        }
    }
}
