pub mod vfs;

pub use vfs::{Vfs, IO_INTERRUPT, WANT_ERROR};
