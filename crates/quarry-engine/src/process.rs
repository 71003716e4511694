//! Sandboxed process execution.
//!
//! A process runs in a fresh temporary directory holding only what its
//! request asked for: a materialized snapshot plus any empty directories.
//! Output is captured to files inside the sandbox, so a wedged process
//! can be killed on timeout without pipe juggling.

use std::path::Path;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use quarry_source::Snapshot;

use crate::error::EngineError;

/// Poll interval while waiting on a deadline-bound process.
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// A request to run one command in a sandbox.
#[derive(Debug, Clone, Default)]
pub struct ProcessRequest {
    /// Program and arguments. Must be non-empty.
    pub argv: Vec<String>,
    /// Extra environment variables set for the process.
    pub env: Vec<(String, String)>,
    /// Files checked out into the sandbox before the process starts.
    pub snapshot: Option<Snapshot>,
    /// Empty directories created inside the sandbox, relative paths.
    pub dirs_to_create: Vec<String>,
    /// Kill the process after this long. `None` waits forever.
    pub timeout: Option<Duration>,
}

/// What a sandboxed process did.
#[derive(Debug)]
pub struct ProcessResult {
    pub stdout: String,
    pub stderr: String,
    /// `None` when the process was killed by a signal, including our own
    /// timeout kill.
    pub exit_code: Option<i32>,
    pub timed_out: bool,
    pub duration: Duration,
}

impl ProcessResult {
    pub fn success(&self) -> bool {
        !self.timed_out && self.exit_code == Some(0)
    }
}

/// Run `request` in a fresh sandbox. Snapshot files are materialized from
/// `workspace_root`. The sandbox is removed when the call returns.
///
/// A non-zero exit is not an error; callers inspect [`ProcessResult`].
///
/// # Errors
/// Returns an error if the sandbox cannot be prepared or the process
/// cannot be spawned.
pub fn execute(workspace_root: &Path, request: &ProcessRequest) -> Result<ProcessResult, EngineError> {
    let program = request.argv.first().ok_or(EngineError::EmptyArgv)?;

    let sandbox = tempfile::Builder::new()
        .prefix("quarry-sandbox-")
        .tempdir()
        .map_err(|source| EngineError::Io {
            path: "sandbox".to_owned(),
            source,
        })?;

    // The process sees only `work/`; capture files live beside it.
    let workdir = sandbox.path().join("work");
    quarry_util::fs::ensure_dir(&workdir)?;

    if let Some(snapshot) = &request.snapshot {
        snapshot.materialize(workspace_root, &workdir)?;
    }
    for dir in &request.dirs_to_create {
        quarry_util::fs::ensure_dir(&workdir.join(dir))?;
    }

    let stdout_path = sandbox.path().join("stdout");
    let stderr_path = sandbox.path().join("stderr");
    let stdout_file = std::fs::File::create(&stdout_path).map_err(|source| EngineError::Io {
        path: stdout_path.display().to_string(),
        source,
    })?;
    let stderr_file = std::fs::File::create(&stderr_path).map_err(|source| EngineError::Io {
        path: stderr_path.display().to_string(),
        source,
    })?;

    let mut command = Command::new(program);
    command
        .args(request.argv.get(1..).unwrap_or(&[]))
        .current_dir(&workdir)
        .stdin(Stdio::null())
        .stdout(Stdio::from(stdout_file))
        .stderr(Stdio::from(stderr_file));
    for (key, value) in &request.env {
        command.env(key, value);
    }

    let start = Instant::now();
    let mut child = command.spawn().map_err(|source| EngineError::Spawn {
        program: program.clone(),
        source,
    })?;

    let io_err = |source| EngineError::Io {
        path: program.clone(),
        source,
    };

    let mut timed_out = false;
    let status = match request.timeout {
        None => child.wait().map_err(io_err)?,
        Some(limit) => loop {
            if let Some(status) = child.try_wait().map_err(io_err)? {
                break status;
            }
            if start.elapsed() >= limit {
                timed_out = true;
                // Kill may race a natural exit; wait() reaps either way.
                let _ = child.kill();
                break child.wait().map_err(io_err)?;
            }
            std::thread::sleep(POLL_INTERVAL);
        },
    };
    let duration = start.elapsed();

    let stdout = read_capture(&stdout_path)?;
    let stderr = read_capture(&stderr_path)?;

    Ok(ProcessResult {
        stdout,
        stderr,
        exit_code: if timed_out { None } else { status.code() },
        timed_out,
        duration,
    })
}

fn read_capture(path: &Path) -> Result<String, EngineError> {
    let bytes = std::fs::read(path).map_err(|source| EngineError::Io {
        path: path.display().to_string(),
        source,
    })?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
