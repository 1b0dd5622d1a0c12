//! Open flags for [`crate::BufferedFile`].
//!
//! The OS bits are passed to `open(2)` unchanged. `PREAPPEND` has no OS
//! counterpart: it is kept in a separate field and never reaches the kernel.

use core::ffi::c_int;
use std::ops::BitOr;

/// Bit accepted by [`OpenFlags::from_bits`] to request preappend mode.
/// Not a valid `open(2)` flag; it is stripped before the descriptor is opened.
pub const O_PREAPPEND: c_int = 0x4000_0000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OpenFlags {
    os: c_int,
    preappend: bool,
}

impl OpenFlags {
    pub const RDONLY: Self = Self::os(libc::O_RDONLY);
    pub const WRONLY: Self = Self::os(libc::O_WRONLY);
    pub const RDWR: Self = Self::os(libc::O_RDWR);
    pub const CREAT: Self = Self::os(libc::O_CREAT);
    pub const TRUNC: Self = Self::os(libc::O_TRUNC);
    pub const EXCL: Self = Self::os(libc::O_EXCL);
    pub const APPEND: Self = Self::os(libc::O_APPEND);
    /// Every flush inserts the buffered bytes at the front of the file.
    /// Needs a readable descriptor (`RDWR`); does not work together with
    /// `APPEND`, which forces every write to the end.
    pub const PREAPPEND: Self = Self {
        os: 0,
        preappend: true,
    };

    const fn os(bits: c_int) -> Self {
        Self {
            os: bits,
            preappend: false,
        }
    }

    /// Build from raw `open(2)` flags, honouring [`O_PREAPPEND`].
    #[must_use]
    pub const fn from_bits(bits: c_int) -> Self {
        Self {
            os: bits & !O_PREAPPEND,
            preappend: bits & O_PREAPPEND != 0,
        }
    }

    /// Flags to hand to `open(2)`.
    #[must_use]
    pub const fn os_flags(self) -> c_int {
        self.os
    }

    #[must_use]
    pub const fn is_preappend(self) -> bool {
        self.preappend
    }
}

impl BitOr for OpenFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self {
            os: self.os | rhs.os,
            preappend: self.preappend || rhs.preappend,
        }
    }
}
