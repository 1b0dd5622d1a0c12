//! Buffered I/O over raw file descriptors.
//!
//! [`BufferedFile`] batches small reads and writes into fixed-size buffers,
//! keeps the descriptor cursor consistent when a handle alternates between
//! reading and writing, and offers a preappend mode in which every flush
//! inserts the buffered bytes at the front of the file.

mod buffer;
pub mod buffered_file;
mod error;
mod error_mapping;
pub mod flags;
pub mod lockfile;
mod preappend;
mod sys;

pub use buffered_file::{BufferedFile, Mode, BUFFER_SIZE, DEFAULT_MODE};
pub use error::BufferedError;
pub use error_mapping::{errno_to_error_kind, error_kind_to_str};
pub use flags::{OpenFlags, O_PREAPPEND};
pub use lockfile::{LockFile, DEFAULT_POLL_INTERVAL};
