//! Shared plumbing for the demonstration binaries.
//!
//! Child processes are started by re-running the current executable with
//! [`CHILD_ROLE`] as the first argument, so every binary is both the parent
//! and the child of its own demo.

use buffered_io::BufferedError;
use std::process::{Child, Command, ExitCode};
use std::time::Duration;
use tracing::{error, warn};

/// First argument that switches a binary into its child role.
pub const CHILD_ROLE: &str = "--child";

/// Upper bound (exclusive) of [`random_delay`], in milliseconds.
pub const MAX_DELAY_MS: u64 = 100;

#[derive(Debug)]
pub enum CliError {
    /// Bad command line; carries the usage line.
    Usage(String),
    Io(BufferedError),
    Spawn(std::io::Error),
    Random(getrandom::Error),
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::Usage(usage) => write!(f, "Usage: {usage}"),
            CliError::Io(err) => write!(f, "{err}"),
            CliError::Spawn(err) => write!(f, "cannot start child process: {err}"),
            CliError::Random(err) => write!(f, "cannot get random bytes: {err}"),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Io(err) => Some(err),
            CliError::Spawn(err) => Some(err),
            CliError::Usage(_) | CliError::Random(_) => None,
        }
    }
}

impl From<BufferedError> for CliError {
    fn from(err: BufferedError) -> Self {
        CliError::Io(err)
    }
}

/// Install the `RUST_LOG`-driven subscriber, defaulting to `info`.
/// Logs go to stderr so they never mix with program output.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// Map the outcome of a demo to the process exit status.
#[must_use]
pub fn finish(result: Result<(), CliError>) -> ExitCode {
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err @ CliError::Usage(_)) => {
            eprintln!("{err}");
            ExitCode::from(1)
        }
        Err(err) => {
            error!(error = %err, "demo failed");
            ExitCode::FAILURE
        }
    }
}

/// Parse a repetition count.
///
/// # Errors
/// Returns `CliError::Usage` with `usage` if `arg` is not a non-negative integer.
pub fn parse_count(arg: &str, usage: &str) -> Result<usize, CliError> {
    arg.trim()
        .parse()
        .map_err(|_| CliError::Usage(usage.to_string()))
}

/// Start a copy of the current executable in its child role.
///
/// # Errors
/// Returns `CliError::Spawn` if the executable cannot be located or started.
pub fn spawn_child<I, S>(args: I) -> Result<Child, CliError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<std::ffi::OsStr>,
{
    let exe = std::env::current_exe().map_err(CliError::Spawn)?;
    Command::new(exe)
        .arg(CHILD_ROLE)
        .args(args)
        .spawn()
        .map_err(CliError::Spawn)
}

/// Wait for every child. A child that fails or cannot be waited for is
/// logged and does not stop the wait for the others.
pub fn wait_all(children: Vec<Child>) {
    for mut child in children {
        let pid = child.id();
        match child.wait() {
            Ok(status) if status.success() => {}
            Ok(status) => warn!(pid = pid, status = %status, "child exited with failure"),
            Err(err) => warn!(pid = pid, error = %err, "waiting for child failed"),
        }
    }
}

/// A random pause in `0..MAX_DELAY_MS` milliseconds.
///
/// # Errors
/// Returns `CliError::Random` if the system random source is unavailable.
pub fn random_delay() -> Result<Duration, CliError> {
    let mut bytes = [0u8; 8];
    getrandom::getrandom(&mut bytes).map_err(CliError::Random)?;
    Ok(Duration::from_millis(u64::from_ne_bytes(bytes) % MAX_DELAY_MS))
}
