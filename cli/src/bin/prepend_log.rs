//! Add entries to the front of a log file, newest first.
//!
//! Each entry is flushed on its own, so after
//! `prepend_log log.txt one two` the file starts with `two\none\n`.

use bufio_cli::{finish, init_tracing, CliError};
use buffered_io::{BufferedFile, OpenFlags};
use embedded_io::Write;
use std::process::ExitCode;
use tracing::info;

fn run(args: &[String]) -> Result<(), CliError> {
    let prog = args.first().map_or("prepend_log", String::as_str);
    let Some((path, entries)) = args.get(1..).and_then(<[String]>::split_first) else {
        return Err(CliError::Usage(format!("{prog} <file> <entry>...")));
    };
    if entries.is_empty() {
        return Err(CliError::Usage(format!("{prog} <file> <entry>...")));
    }

    let mut log = BufferedFile::open(
        path,
        OpenFlags::RDWR | OpenFlags::CREAT | OpenFlags::PREAPPEND,
    )?;
    for entry in entries {
        log.write_all(entry.as_bytes())?;
        log.write_all(b"\n")?;
        log.flush()?;
    }
    log.close()?;

    info!(path = %path, entries = entries.len(), "entries prepended");
    Ok(())
}

fn main() -> ExitCode {
    init_tracing();

    let args: Vec<String> = std::env::args().collect();
    finish(run(&args))
}
