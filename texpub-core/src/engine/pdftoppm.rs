//! pdftoppm-backed rasterization engine (poppler-utils)

use super::process::{self, ProcessError};
use super::{RasterEngine, RasterFormat, RasterRequest};
use crate::error::RasterizationFailure;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::process::Command;

/// Prefix pdftoppm writes pages under: `page-1.png`, `page-01.png`, ...
const PAGE_PREFIX: &str = "page";

/// Renders pages by running `pdftoppm -png -r <dpi> <pdf> <out_dir>/page`.
#[derive(Debug, Clone)]
pub struct PdftoppmEngine {
    program: PathBuf,
}

impl PdftoppmEngine {
    pub fn new() -> Self {
        Self {
            program: PathBuf::from("pdftoppm"),
        }
    }

    /// Use a specific pdftoppm binary
    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    fn command(&self, request: &RasterRequest<'_>) -> Command {
        let mut cmd = Command::new(&self.program);
        let format_flag = match request.format {
            RasterFormat::Png => "-png",
            RasterFormat::Jpeg => "-jpeg",
        };
        cmd.arg(format_flag)
            .arg("-r")
            .arg(request.dpi.to_string())
            .arg(request.input)
            .arg(request.out_dir.join(PAGE_PREFIX));
        cmd
    }
}

impl Default for PdftoppmEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RasterEngine for PdftoppmEngine {
    fn name(&self) -> &str {
        "pdftoppm"
    }

    async fn rasterize(
        &self,
        request: RasterRequest<'_>,
    ) -> Result<Vec<PathBuf>, RasterizationFailure> {
        let input = request.input.to_path_buf();
        let output = process::run(self.command(&request), request.timeout)
            .await
            .map_err(|e| match e {
                ProcessError::NotFound(e) => RasterizationFailure::EngineNotFound {
                    engine: self.name().to_string(),
                    detail: e.to_string(),
                },
                ProcessError::Io(source) => RasterizationFailure::Io {
                    path: input.clone(),
                    source,
                },
                ProcessError::TimedOut => RasterizationFailure::Timeout {
                    engine: self.name().to_string(),
                    path: input.clone(),
                    timeout: request.timeout,
                },
            })?;

        if !output.status.success() {
            return Err(RasterizationFailure::EngineFailed {
                engine: self.name().to_string(),
                path: input,
                status: process::describe_status(&output.status),
                stderr: output.stderr,
            });
        }

        let mut entries = std::fs::read_dir(request.out_dir)
            .map_err(|source| RasterizationFailure::Io {
                path: request.out_dir.to_path_buf(),
                source,
            })?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter_map(|p| page_number(&p, request.format).map(|n| (n, p)))
            .collect::<Vec<_>>();
        entries.sort_by_key(|(n, _)| *n);

        Ok(entries.into_iter().map(|(_, p)| p).collect())
    }
}

/// Page number encoded in a pdftoppm output name (`page-007.png` -> 7)
fn page_number(path: &Path, format: RasterFormat) -> Option<usize> {
    if path.extension()?.to_str()? != format.extension() {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    let digits = stem.strip_prefix(PAGE_PREFIX)?.strip_prefix('-')?;
    digits.parse().ok()
}
