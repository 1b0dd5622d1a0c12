//! Children print their messages to stdout one at a time under a lock file.
//!
//! Every message argument gets its own child process. A child holds
//! `lockfile.lock` while it prints its message `count` times, pausing a random
//! 0 to 99 ms after each line, so the output of different children never
//! interleaves.

use bufio_cli::{
    finish, init_tracing, parse_count, random_delay, spawn_child, wait_all, CliError, CHILD_ROLE,
};
use buffered_io::{BufferedFile, LockFile, DEFAULT_POLL_INTERVAL};
use embedded_io::Write;
use fd_runtime::LibcRuntime;
use std::os::unix::io::AsRawFd;
use std::process::ExitCode;
use tracing::{debug, info};

const LOCK_PATH: &str = "lockfile.lock";

fn parent(args: &[String]) -> Result<(), CliError> {
    let prog = args.first().map_or("locked_writers", String::as_str);
    let usage = format!("{prog} <message1> <message2> ... <count>");
    if args.len() <= 4 {
        return Err(CliError::Usage(usage));
    }
    let (count, messages) = match args[1..].split_last() {
        Some((count, messages)) => (count, messages),
        None => return Err(CliError::Usage(usage)),
    };
    parse_count(count, &usage)?;

    let children = messages
        .iter()
        .map(|message| spawn_child([message.as_str(), count.as_str()]))
        .collect::<Result<Vec<_>, _>>()?;
    info!(children = children.len(), "waiting for children");
    wait_all(children);
    Ok(())
}

fn child(args: &[String]) -> Result<(), CliError> {
    let usage = format!("{CHILD_ROLE} <message> <count>");
    let [message, count] = args else {
        return Err(CliError::Usage(usage));
    };
    let count = parse_count(count, &usage)?;

    let lock = LockFile::acquire(LibcRuntime::new(), LOCK_PATH, DEFAULT_POLL_INTERVAL)?;
    debug!(pid = std::process::id(), "holding lock");

    let mut stdout: BufferedFile =
        BufferedFile::from_fd(LibcRuntime::new(), std::io::stdout().as_raw_fd(), false)?;
    for _ in 0..count {
        stdout.write_all(message.as_bytes())?;
        stdout.write_all(b"\n")?;
        stdout.flush()?;
        std::thread::sleep(random_delay()?);
    }
    stdout.close()?;

    lock.release()?;
    Ok(())
}

fn main() -> ExitCode {
    init_tracing();

    let args: Vec<String> = std::env::args().collect();
    let result = match args.get(1).map(String::as_str) {
        Some(CHILD_ROLE) => child(&args[2..]),
        _ => parent(&args),
    };
    finish(result)
}
