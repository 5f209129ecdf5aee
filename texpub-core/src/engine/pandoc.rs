//! Pandoc-backed conversion engine

use super::process::{self, ProcessError};
use super::{ConversionEngine, EngineRequest};
use crate::error::ConversionFailure;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::process::Command;

/// Converts documents by running `pandoc <input> -t html5`.
///
/// The process runs inside the document's directory so that relative
/// `\includegraphics` paths resolve the way they do for LaTeX itself.
#[derive(Debug, Clone)]
pub struct PandocEngine {
    program: PathBuf,
}

impl PandocEngine {
    pub fn new() -> Self {
        Self {
            program: PathBuf::from("pandoc"),
        }
    }

    /// Use a specific pandoc binary
    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    fn command(&self, request: &EngineRequest<'_>) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.arg(request.input).args(["-t", "html5"]);
        if let Some(template) = request.template {
            cmd.arg("--template").arg(template);
        }
        if let Some(media_dir) = request.media_dir {
            cmd.arg("--extract-media").arg(media_dir);
        }
        if let Some(dir) = request.input.parent().filter(|d| !d.as_os_str().is_empty()) {
            cmd.current_dir(dir);
        }
        cmd
    }
}

impl Default for PandocEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ConversionEngine for PandocEngine {
    fn name(&self) -> &str {
        "pandoc"
    }

    async fn convert(&self, request: EngineRequest<'_>) -> Result<String, ConversionFailure> {
        let input = request.input.to_path_buf();
        let output = process::run(self.command(&request), request.timeout)
            .await
            .map_err(|e| failure(self.name(), &input, request.timeout, e))?;

        if !output.status.success() {
            return Err(ConversionFailure::EngineFailed {
                engine: self.name().to_string(),
                path: input,
                status: process::describe_status(&output.status),
                stderr: output.stderr,
            });
        }
        if !output.stderr.is_empty() {
            tracing::warn!("pandoc on {}: {}", input.display(), output.stderr);
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

fn failure(
    engine: &str,
    path: &Path,
    timeout: std::time::Duration,
    error: ProcessError,
) -> ConversionFailure {
    match error {
        ProcessError::NotFound(e) => ConversionFailure::EngineNotFound {
            engine: engine.to_string(),
            detail: e.to_string(),
        },
        ProcessError::Io(source) => ConversionFailure::Io {
            path: path.to_path_buf(),
            source,
        },
        ProcessError::TimedOut => ConversionFailure::Timeout {
            engine: engine.to_string(),
            path: path.to_path_buf(),
            timeout,
        },
    }
}
