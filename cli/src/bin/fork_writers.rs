//! Two children and their parent take turns writing to one shared descriptor.
//!
//! The parent truncates `output.txt` and hands its descriptor to both
//! children. Child 1 writes after one second, child 2 after three, and the
//! parent writes last, once both have exited. Because the three processes
//! share one file offset, the messages end up in that order.

use bufio_cli::{finish, init_tracing, parse_count, spawn_child, wait_all, CliError, CHILD_ROLE};
use buffered_io::{BufferedError, BufferedFile, OpenFlags};
use embedded_io::Write;
use fd_runtime::LibcRuntime;
use std::os::raw::c_int;
use std::process::ExitCode;
use std::time::Duration;
use tracing::{debug, info};

const OUTPUT_PATH: &str = "output.txt";
const CHILD1_DELAY: Duration = Duration::from_secs(1);
const CHILD2_DELAY: Duration = Duration::from_secs(3);

fn usage(prog: &str) -> String {
    format!("{prog} <parent_message> <child1_message> <child2_message> <count>")
}

fn write_times(
    file: &mut BufferedFile,
    message: &str,
    count: usize,
) -> Result<(), BufferedError> {
    for _ in 0..count {
        file.write_all(message.as_bytes())?;
    }
    Ok(())
}

fn parent(args: &[String]) -> Result<(), CliError> {
    let prog = args.first().map_or("fork_writers", String::as_str);
    let [_, parent_message, child1_message, child2_message, count] = args else {
        return Err(CliError::Usage(usage(prog)));
    };
    let count = parse_count(count, &usage(prog))?;

    let mut output = BufferedFile::open(
        OUTPUT_PATH,
        OpenFlags::RDWR | OpenFlags::CREAT | OpenFlags::TRUNC,
    )?;
    let fd = output
        .fd()
        .ok_or(BufferedError::InvalidArgument("output handle is closed"))?;
    let spawn_writer = |delay: Duration, message: &str| {
        spawn_child([
            fd.to_string(),
            delay.as_secs().to_string(),
            message.to_string(),
            count.to_string(),
        ])
    };
    let children = vec![
        spawn_writer(CHILD1_DELAY, child1_message)?,
        spawn_writer(CHILD2_DELAY, child2_message)?,
    ];
    info!(fd = fd, children = children.len(), "waiting for children");
    wait_all(children);

    write_times(&mut output, parent_message, count)?;
    output.close()?;
    info!(path = OUTPUT_PATH, "parent finished");
    Ok(())
}

fn child(args: &[String]) -> Result<(), CliError> {
    let usage = format!("{CHILD_ROLE} <fd> <delay_secs> <message> <count>");
    let [fd, delay, message, count] = args else {
        return Err(CliError::Usage(usage));
    };
    let fd: c_int = fd.parse().map_err(|_| CliError::Usage(usage.clone()))?;
    let delay: u64 = delay.parse().map_err(|_| CliError::Usage(usage.clone()))?;
    let count = parse_count(count, &usage)?;

    std::thread::sleep(Duration::from_secs(delay));
    debug!(fd = fd, delay = delay, "child writing");

    let mut output = BufferedFile::from_fd(LibcRuntime::new(), fd, false)?;
    write_times(&mut output, message, count)?;
    output.close()?;
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
