//! Running an external engine as a child process with a deadline

use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::process::Command;

/// Captured result of a finished child process
pub(crate) struct ProcessOutput {
    pub status: ExitStatus,
    pub stdout: Vec<u8>,
    pub stderr: String,
}

pub(crate) enum ProcessError {
    /// The program could not be found on PATH
    NotFound(std::io::Error),
    Io(std::io::Error),
    TimedOut,
}

/// Spawn `cmd`, collect its output, and kill it if it outlives `timeout`
pub(crate) async fn run(
    mut cmd: Command,
    timeout: Duration,
) -> Result<ProcessOutput, ProcessError> {
    cmd.kill_on_drop(true)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    tracing::debug!("Running {:?}", cmd.as_std());

    let child = cmd.spawn().map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ProcessError::NotFound(e)
        } else {
            ProcessError::Io(e)
        }
    })?;

    // Dropping the wait future on timeout drops the child, which kills it.
    match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(Ok(output)) => Ok(ProcessOutput {
            status: output.status,
            stdout: output.stdout,
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        }),
        Ok(Err(e)) => Err(ProcessError::Io(e)),
        Err(_) => Err(ProcessError::TimedOut),
    }
}

/// Human-readable exit status ("exit code 2", "signal")
pub(crate) fn describe_status(status: &ExitStatus) -> String {
    match status.code() {
        Some(code) => format!("exit code {}", code),
        None => "termination by signal".to_string(),
    }
}
