/// Mocked descriptor runtime over a virtual file system.
///
/// - `clear_mocks` clears files, handles, queued faults and call counters.
/// - `add_file` adds (or replaces) a file in the virtual file system.
/// - `get_file` gets the content of a file from the virtual file system.
/// - `fail_next` makes the next call of a primitive fail with the given errno.
/// - `calls` tells how many times a primitive was invoked.
/// - `WANT_ERROR` is a byte that can be used to simulate an I/O error.
/// - `IO_INTERRUPT` is a byte that can be used to simulate a short transfer.
///
/// `open(name, flags, mode)`:
/// - honours the access mode, `O_CREAT`, `O_EXCL`, `O_TRUNC` and `O_APPEND`.
/// - returns an error if `name` contains `WANT_ERROR`.
///
/// `read`, `write`:
/// - stop after transferring `IO_INTERRUPT`.
/// - return an error when `WANT_ERROR` is encountered; bytes before it are
///   already transferred.
use fd_runtime::{FdRuntime, Syscall, Whence};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::ffi::CStr;
use std::os::raw::c_int;
use std::sync::atomic::{AtomicI32, Ordering};

pub const WANT_ERROR: char = '\u{0001}';
pub const IO_INTERRUPT: char = '\n';

const FIRST_FD: usize = 3;

struct VfsFile {
    name: Option<String>,
    buffer: Vec<u8>,
}

struct FileHandle {
    vfs_index: usize,
    pos: usize,
    readable: bool,
    writable: bool,
    append: bool,
    closed: bool,
}

#[derive(Default)]
struct VfsState {
    files: Vec<VfsFile>,
    handles: Vec<FileHandle>,
    faults: VecDeque<(Syscall, c_int)>,
    calls: HashMap<Syscall, usize>,
}

impl VfsState {
    fn enter(&mut self, op: Syscall) -> Option<c_int> {
        *self.calls.entry(op).or_insert(0) += 1;
        let index = self.faults.iter().position(|(fault_op, _)| *fault_op == op)?;
        self.faults.remove(index).map(|(_, errno)| errno)
    }

    fn find_file(&self, name: &str) -> Option<usize> {
        self.files
            .iter()
            .position(|f| f.name.as_deref() == Some(name))
    }

    fn open_handle(&mut self, fd: c_int) -> Option<&mut FileHandle> {
        let index = usize::try_from(fd).ok()?.checked_sub(FIRST_FD)?;
        self.handles.get_mut(index).filter(|h| !h.closed)
    }
}

pub struct Vfs {
    state: Mutex<VfsState>,
    io_errno: AtomicI32,
}

impl Default for Vfs {
    fn default() -> Self {
        Self::new()
    }
}

impl Vfs {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(VfsState::default()),
            io_errno: AtomicI32::new(0),
        }
    }

    pub fn clear_mocks(&self) {
        self.io_errno.store(0, Ordering::Relaxed);
        *self.state.lock() = VfsState::default();
    }

    pub fn add_file(&self, name: &str, buffer: Vec<u8>) {
        let mut state = self.state.lock();
        if let Some(index) = state.find_file(name) {
            if let Some(file) = state.files.get_mut(index) {
                file.buffer = buffer;
            }
        } else {
            state.files.push(VfsFile {
                name: Some(name.to_string()),
                buffer,
            });
        }
    }

    #[must_use]
    pub fn get_file(&self, name: &str) -> Option<Vec<u8>> {
        let state = self.state.lock();
        state
            .find_file(name)
            .and_then(|index| state.files.get(index))
            .map(|f| f.buffer.clone())
    }

    /// Queue a failure for the next call of `op`.
    pub fn fail_next(&self, op: Syscall, errno: c_int) {
        self.state.lock().faults.push_back((op, errno));
    }

    #[must_use]
    pub fn calls(&self, op: Syscall) -> usize {
        self.state.lock().calls.get(&op).copied().unwrap_or(0)
    }

    /// Number of descriptors opened and not yet closed.
    #[must_use]
    pub fn open_handles(&self) -> usize {
        self.state.lock().handles.iter().filter(|h| !h.closed).count()
    }

    fn fail(&self, errno: c_int) -> c_int {
        self.io_errno.store(errno, Ordering::Relaxed);
        -1
    }
}

impl FdRuntime for Vfs {
    fn get_errno(&self) -> c_int {
        self.io_errno.load(Ordering::Relaxed)
    }

    fn open(&self, path: &CStr, flags: c_int, _mode: u32) -> c_int {
        let mut state = self.state.lock();
        if let Some(errno) = state.enter(Syscall::Open) {
            return self.fail(errno);
        }

        let name = path.to_string_lossy().to_string();
        if name.contains(WANT_ERROR) {
            return self.fail(libc::EINVAL);
        }

        let vfs_index = match state.find_file(&name) {
            Some(_) if flags & libc::O_CREAT != 0 && flags & libc::O_EXCL != 0 => {
                return self.fail(libc::EEXIST);
            }
            Some(index) => index,
            None if flags & libc::O_CREAT != 0 => {
                state.files.push(VfsFile {
                    name: Some(name),
                    buffer: Vec::new(),
                });
                state.files.len() - 1
            }
            None => return self.fail(libc::ENOENT),
        };

        let access = flags & libc::O_ACCMODE;
        let readable = access == libc::O_RDONLY || access == libc::O_RDWR;
        let writable = access == libc::O_WRONLY || access == libc::O_RDWR;
        if flags & libc::O_TRUNC != 0 && writable {
            if let Some(file) = state.files.get_mut(vfs_index) {
                file.buffer.clear();
            }
        }

        state.handles.push(FileHandle {
            vfs_index,
            pos: 0,
            readable,
            writable,
            append: flags & libc::O_APPEND != 0,
            closed: false,
        });
        c_int::try_from(state.handles.len() - 1 + FIRST_FD).unwrap_or_else(|_| self.fail(libc::EMFILE))
    }

    fn read(&self, fd: c_int, buffer: &mut [u8]) -> isize {
        let mut state = self.state.lock();
        if let Some(errno) = state.enter(Syscall::Read) {
            return self.fail(errno) as isize;
        }
        let Some(handle) = state.open_handle(fd) else {
            return self.fail(libc::EBADF) as isize;
        };
        if !handle.readable {
            return self.fail(libc::EBADF) as isize;
        }
        let (vfs_index, pos_before) = (handle.vfs_index, handle.pos);
        let Some(file) = state.files.get(vfs_index) else {
            return self.fail(libc::EBADF) as isize;
        };

        let available = file.buffer.get(pos_before..).unwrap_or_default();
        let mut n = 0;
        let mut failed = false;
        for (dst, &ch) in buffer.iter_mut().zip(available) {
            if ch == WANT_ERROR as u8 {
                failed = true;
                break;
            }
            *dst = ch;
            n += 1;
            if ch == IO_INTERRUPT as u8 {
                break;
            }
        }

        if let Some(handle) = state.open_handle(fd) {
            handle.pos = pos_before + n;
        }
        if failed {
            return self.fail(libc::EIO) as isize;
        }
        isize::try_from(n).unwrap_or(isize::MAX)
    }

    fn write(&self, fd: c_int, buffer: &[u8]) -> isize {
        let mut state = self.state.lock();
        if let Some(errno) = state.enter(Syscall::Write) {
            return self.fail(errno) as isize;
        }
        let Some(handle) = state.open_handle(fd) else {
            return self.fail(libc::EBADF) as isize;
        };
        if !handle.writable {
            return self.fail(libc::EBADF) as isize;
        }
        let (vfs_index, pos, append) = (handle.vfs_index, handle.pos, handle.append);
        let Some(file) = state.files.get_mut(vfs_index) else {
            return self.fail(libc::EBADF) as isize;
        };

        let mut pos = if append { file.buffer.len() } else { pos };
        if pos > file.buffer.len() {
            file.buffer.resize(pos, 0);
        }
        let start = pos;
        let mut failed = false;
        for &ch in buffer {
            if ch == WANT_ERROR as u8 {
                failed = true;
                break;
            }
            if let Some(slot) = file.buffer.get_mut(pos) {
                *slot = ch;
            } else {
                file.buffer.push(ch);
            }
            pos += 1;
            if ch == IO_INTERRUPT as u8 {
                break;
            }
        }

        if let Some(handle) = state.open_handle(fd) {
            handle.pos = pos;
        }
        if failed {
            return self.fail(libc::EIO) as isize;
        }
        isize::try_from(pos - start).unwrap_or(isize::MAX)
    }

    fn lseek(&self, fd: c_int, offset: i64, whence: Whence) -> i64 {
        let mut state = self.state.lock();
        if let Some(errno) = state.enter(Syscall::Seek) {
            return i64::from(self.fail(errno));
        }
        let Some(handle) = state.open_handle(fd) else {
            return i64::from(self.fail(libc::EBADF));
        };
        let (vfs_index, pos) = (handle.vfs_index, handle.pos);
        let len = state.files.get(vfs_index).map_or(0, |f| f.buffer.len());

        let base = match whence {
            Whence::Start => 0,
            Whence::Current => pos,
            Whence::End => len,
        };
        let target = i64::try_from(base).ok().and_then(|b| b.checked_add(offset));
        let Some(new_pos) = target.and_then(|t| usize::try_from(t).ok()) else {
            return i64::from(self.fail(libc::EINVAL));
        };

        if let Some(handle) = state.open_handle(fd) {
            handle.pos = new_pos;
        }
        i64::try_from(new_pos).unwrap_or(i64::MAX)
    }

    fn close(&self, fd: c_int) -> c_int {
        let mut state = self.state.lock();
        let fault = state.enter(Syscall::Close);
        let Some(handle) = state.open_handle(fd) else {
            return self.fail(libc::EBADF);
        };
        // A failing close still releases the descriptor, as on Linux.
        handle.closed = true;
        match fault {
            Some(errno) => self.fail(errno),
            None => 0,
        }
    }

    fn unlink(&self, path: &CStr) -> c_int {
        let mut state = self.state.lock();
        if let Some(errno) = state.enter(Syscall::Unlink) {
            return self.fail(errno);
        }
        let name = path.to_string_lossy();
        let Some(index) = state.find_file(&name) else {
            return self.fail(libc::ENOENT);
        };
        if let Some(file) = state.files.get_mut(index) {
            file.name = None;
        }
        0
    }
}
