//! Shared subprocess plumbing for engine-backed capabilities.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tokio::time::{timeout, Duration};
use tracing::debug;

use super::error::CapabilityError;

/// Keep engine stderr in errors readable.
const STDERR_LIMIT: usize = 2000;

#[derive(Debug)]
pub(crate) struct EngineOutput {
    #[allow(dead_code)]
    pub stdout: String,
    pub stderr: String,
}

/// Runs an engine command to completion, killing it at the deadline.
pub(crate) async fn run_engine(
    engine: &str,
    mut cmd: Command,
    deadline: Duration,
) -> Result<EngineOutput, CapabilityError> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    debug!(engine, ?deadline, "invoking engine");
    let output = match timeout(deadline, cmd.output()).await {
        Ok(Ok(output)) => output,
        Ok(Err(e)) => {
            return Err(CapabilityError::engine_failed(
                format!("failed to launch {}: {}", engine, e),
                None,
            ))
        }
        Err(_) => {
            return Err(CapabilityError::Timeout {
                timeout_secs: deadline.as_secs(),
            })
        }
    };

    let stderr = truncate(&String::from_utf8_lossy(&output.stderr));
    if output.status.success() {
        Ok(EngineOutput {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr,
        })
    } else if output.status.code().is_none() {
        Err(CapabilityError::EngineCrashed {
            reason: format!("{} was killed by a signal", engine),
        })
    } else {
        Err(CapabilityError::engine_failed(
            format!("{} exited with {}", engine, output.status),
            Some(stderr),
        ))
    }
}

fn truncate(s: &str) -> String {
    let s = s.trim();
    if s.len() <= STDERR_LIMIT {
        return s.to_string();
    }
    let mut end = STDERR_LIMIT;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}…", &s[..end])
}

/// Finds the single file with the given extension in a directory.
/// Engines that choose their own output names (soffice, pdftoppm)
/// write into a scratch dir and we pick the result up from there.
pub(crate) async fn find_output_file(
    dir: &Path,
    extension: &str,
) -> Result<PathBuf, CapabilityError> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.is_file()
            && path
                .extension()
                .is_some_and(|e| e.eq_ignore_ascii_case(extension))
        {
            return Ok(path);
        }
    }
    Err(CapabilityError::OutputMissing {
        expected: format!("*.{} in {}", extension, dir.display()),
    })
}

/// Moves an engine-produced file into its reserved artifact path.
/// Rename when possible, copy across filesystems.
pub(crate) async fn place_output(from: &Path, to: &Path) -> Result<(), CapabilityError> {
    match tokio::fs::rename(from, to).await {
        Ok(()) => Ok(()),
        Err(_) => {
            tokio::fs::copy(from, to).await?;
            let _ = tokio::fs::remove_file(from).await;
            Ok(())
        }
    }
}
