//! Integration tests against the real file system

use buffered_io::{BufferedError, BufferedFile, OpenFlags, BUFFER_SIZE};
use fd_runtime::Syscall;
use std::path::Path;

fn pattern(size: usize) -> Vec<u8> {
    (0..size).map(|i| b'0' + (i % 10) as u8).collect()
}

fn read_all(path: &Path) -> Vec<u8> {
    let mut file = BufferedFile::open(path, OpenFlags::RDONLY).expect("Should open for reading");
    let mut out = Vec::new();
    let mut chunk = [0u8; 1000];
    loop {
        let n = file.read(&mut chunk).unwrap();
        if n == 0 {
            break;
        }
        out.extend_from_slice(&chunk[..n]);
    }
    file.close().unwrap();
    out
}

#[test]
fn write_close_reopen_read_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("test_output.txt");

    let mut file = BufferedFile::open_with_mode(
        &path,
        OpenFlags::WRONLY | OpenFlags::CREAT,
        0o644,
    )
    .expect("Should create file");
    assert_eq!(file.write(b"AAAABBBBCCCC").unwrap(), 12);
    file.close().unwrap();

    let mut file = BufferedFile::open(&path, OpenFlags::RDONLY).unwrap();
    let mut buf = [0u8; 12];
    assert_eq!(file.read(&mut buf).unwrap(), 12);
    assert_eq!(&buf, b"AAAABBBBCCCC");

    let mut more = [0u8; 64];
    assert_eq!(file.read(&mut more).unwrap(), 0);
    file.close().unwrap();
}

#[test]
fn multiple_flush_cycles_preserve_content() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("large.txt");
    let mut data = pattern(BUFFER_SIZE * 3 + 1);
    if let Some(last) = data.last_mut() {
        *last = b'X';
    }

    let mut file = BufferedFile::open(&path, OpenFlags::WRONLY | OpenFlags::CREAT).unwrap();
    assert_eq!(file.write(&data).unwrap(), data.len());
    file.close().unwrap();

    assert_eq!(std::fs::read(&path).unwrap(), data);
    assert_eq!(read_all(&path), data);
}

#[test]
fn large_read_spans_several_refills() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("input.txt");
    std::fs::write(&path, pattern(10_000)).unwrap();

    let mut file = BufferedFile::open(&path, OpenFlags::RDONLY).unwrap();
    let mut buf = vec![0u8; BUFFER_SIZE * 2 + 100];
    assert_eq!(file.read(&mut buf).unwrap(), buf.len());
    assert_eq!(buf, pattern(BUFFER_SIZE * 2 + 100));
    assert_eq!(file.logical_offset(), buf.len() as u64);
}

#[test]
fn write_after_read_overwrites_at_read_position() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("switch.txt");
    std::fs::write(&path, b"OLD CONTENT").unwrap();

    let mut file = BufferedFile::open(&path, OpenFlags::RDWR).unwrap();
    let mut buf = [0u8; 5];
    assert_eq!(file.read(&mut buf).unwrap(), 5);
    assert_eq!(&buf, b"OLD C");
    file.write(b"NEW APPEND").unwrap();
    file.close().unwrap();

    assert_eq!(std::fs::read(&path).unwrap(), b"OLD CNEW APPEND");
}

#[test]
fn read_after_write_on_same_handle() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mixed.txt");
    std::fs::write(&path, b"0123456789").unwrap();

    let mut file = BufferedFile::open(&path, OpenFlags::RDWR).unwrap();
    file.write(b"ab").unwrap();
    assert_eq!(std::fs::read(&path).unwrap(), b"0123456789");

    let mut buf = [0u8; 3];
    assert_eq!(file.read(&mut buf).unwrap(), 3);
    assert_eq!(std::fs::read(&path).unwrap(), b"ab23456789");
    assert_eq!(&buf, b"234");
    file.close().unwrap();
}

#[test]
fn preappend_builds_reverse_chronological_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("log.txt");
    std::fs::write(&path, b"OLD").unwrap();

    let mut file =
        BufferedFile::open(&path, OpenFlags::RDWR | OpenFlags::PREAPPEND).unwrap();
    file.write(b"NEW").unwrap();
    file.flush().unwrap();
    assert_eq!(std::fs::read(&path).unwrap(), b"NEWOLD");

    file.write(b"X").unwrap();
    file.flush().unwrap();
    file.close().unwrap();

    assert_eq!(std::fs::read(&path).unwrap(), b"XNEWOLD");
}

#[test]
fn preappend_large_content_is_relocated_intact() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("big_log.txt");
    let old = pattern(BUFFER_SIZE * 2 + 7);
    std::fs::write(&path, &old).unwrap();

    let mut file =
        BufferedFile::open(&path, OpenFlags::RDWR | OpenFlags::PREAPPEND).unwrap();
    file.write(b"head:").unwrap();
    file.close().unwrap();

    let mut expected = b"head:".to_vec();
    expected.extend_from_slice(&old);
    assert_eq!(std::fs::read(&path).unwrap(), expected);
}

#[test]
fn reading_a_write_only_handle_fails() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("wo.txt");

    let mut file = BufferedFile::open(&path, OpenFlags::WRONLY | OpenFlags::CREAT).unwrap();
    let mut buf = [0u8; 4];
    let err = file.read(&mut buf).unwrap_err();

    assert_eq!(err, BufferedError::io(Syscall::Read, libc::EBADF));
}

#[test]
fn opening_missing_file_reports_enoent() {
    let dir = tempfile::tempdir().unwrap();

    let err = BufferedFile::open(dir.path().join("nope"), OpenFlags::RDONLY).unwrap_err();

    assert_eq!(err, BufferedError::io(Syscall::Open, libc::ENOENT));
    assert_eq!(err.raw_os_error(), Some(libc::ENOENT));
}

#[test]
fn truncate_discards_previous_content() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("trunc.txt");
    std::fs::write(&path, b"a long previous content").unwrap();

    let mut file =
        BufferedFile::open(&path, OpenFlags::WRONLY | OpenFlags::TRUNC).unwrap();
    file.write(b"short").unwrap();
    drop(file);

    assert_eq!(std::fs::read(&path).unwrap(), b"short");
}
