//! Shell subprocess execution with output capture and cancellation.
//!
//! The child's stdout and stderr are redirected to files under the sandbox
//! `tmp/` directory and read back once it exits, so no reader threads are
//! needed. While the child runs, the cancel predicate is polled and the child
//! is killed as soon as it fires.

use crate::error::{PsykerError, Result};
use std::fs::File;
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::debug;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x0800_0000;

static CAPTURE_SEQ: AtomicU64 = AtomicU64::new(0);

/// What a finished (or cancelled) command produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CommandOutput {
    /// `None` if the child was killed or terminated by a signal.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub cancelled: bool,
}

impl CommandOutput {
    pub fn is_success(&self) -> bool {
        !self.cancelled && self.exit_code == Some(0)
    }
}

/// Run `command` through `launcher` (e.g. `["cmd", "/c"]`) in `cwd`.
pub(crate) fn run_shell(
    launcher: &[String],
    command: &str,
    cwd: &Path,
    capture_dir: &Path,
    cancel: &dyn Fn() -> bool,
) -> Result<CommandOutput> {
    let Some((program, launcher_args)) = launcher.split_first() else {
        return Err(PsykerError::exec("shell launcher is empty")
            .with_hint("Set shell.powershell and shell.cmd in psyker.yaml."));
    };

    std::fs::create_dir_all(capture_dir).map_err(|e| {
        PsykerError::exec(format!(
            "failed to create capture directory '{}': {}",
            capture_dir.display(),
            e
        ))
    })?;

    let seq = CAPTURE_SEQ.fetch_add(1, Ordering::Relaxed);
    let stem = format!(".exec-{}-{}", std::process::id(), seq);
    let stdout_path = capture_dir.join(format!("{}.out", stem));
    let stderr_path = capture_dir.join(format!("{}.err", stem));

    let outcome = spawn_and_wait(
        program,
        launcher_args,
        command,
        cwd,
        &stdout_path,
        &stderr_path,
        cancel,
    );

    let stdout = read_capture(&stdout_path);
    let stderr = read_capture(&stderr_path);
    let _ = std::fs::remove_file(&stdout_path);
    let _ = std::fs::remove_file(&stderr_path);

    let status = outcome?;
    Ok(CommandOutput {
        exit_code: status.and_then(|s| s.code()),
        stdout,
        stderr,
        cancelled: status.is_none(),
    })
}

/// Returns `None` when the child was killed because of cancellation.
fn spawn_and_wait(
    program: &str,
    launcher_args: &[String],
    command: &str,
    cwd: &Path,
    stdout_path: &Path,
    stderr_path: &Path,
    cancel: &dyn Fn() -> bool,
) -> Result<Option<ExitStatus>> {
    let stdout_file = create_capture(stdout_path)?;
    let stderr_file = create_capture(stderr_path)?;

    let mut cmd = Command::new(program);
    cmd.args(launcher_args)
        .arg(command)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::from(stdout_file))
        .stderr(Stdio::from(stderr_file));

    #[cfg(windows)]
    {
        use std::os::windows::process::CommandExt;
        cmd.creation_flags(CREATE_NO_WINDOW);
    }

    let mut child = cmd.spawn().map_err(|e| {
        PsykerError::exec(format!("Failed to launch '{}': {}", program, e))
            .with_hint("Check that the shell is installed and on PATH, or configure it in psyker.yaml.")
    })?;
    debug!(program, pid = child.id(), cwd = %cwd.display(), "spawned command");

    wait_or_cancel(&mut child, cancel)
}

/// Poll the child until it exits or `cancel` fires.
fn wait_or_cancel(child: &mut Child, cancel: &dyn Fn() -> bool) -> Result<Option<ExitStatus>> {
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Ok(Some(status)),
            Ok(None) => {
                if cancel() {
                    kill_process(child);
                    return Ok(None);
                }
                std::thread::sleep(POLL_INTERVAL);
            }
            Err(e) => {
                kill_process(child);
                return Err(PsykerError::exec(format!(
                    "failed to check process status: {}",
                    e
                )));
            }
        }
    }
}

/// Kill a process and wait for it to terminate.
fn kill_process(child: &mut Child) {
    // On Unix this is SIGKILL; on Windows it is TerminateProcess.
    let _ = child.kill();
    let _ = child.wait();
}

fn create_capture(path: &Path) -> Result<File> {
    File::create(path).map_err(|e| {
        PsykerError::exec(format!(
            "failed to create output capture '{}': {}",
            path.display(),
            e
        ))
    })
}

fn read_capture(path: &Path) -> String {
    std::fs::read(path)
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
        .unwrap_or_default()
}
