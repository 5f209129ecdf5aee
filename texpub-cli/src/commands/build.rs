//! Build command implementation

use anyhow::{bail, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use texpub_core::engine::{PandocEngine, PdftoppmEngine, RasterFormat};
use texpub_core::{JobConfig, Pipeline};

/// Command-line overrides for the job configuration
pub struct BuildOptions {
    pub output: Option<PathBuf>,
    pub debug: bool,
    pub extract_media: bool,
    pub jobs: Option<usize>,
    pub pandoc: PathBuf,
    pub pdftoppm: PathBuf,
    pub page_format: String,
    pub scratch_dir: Option<PathBuf>,
}

/// Build an EPUB from a job configuration
pub async fn build(config_path: Option<PathBuf>, options: BuildOptions) -> Result<()> {
    let config_path = match config_path {
        Some(path) => path,
        None => prompt_for_config()?,
    };
    let cwd = std::env::current_dir().context("Could not determine the current directory")?;

    let mut config = JobConfig::from_json_file(&config_path)
        .with_context(|| format!("Failed to load configuration: {}", config_path.display()))?;
    if let Some(output) = options.output {
        config.output = Some(cwd.join(output));
    }
    config.debug |= options.debug;
    config.extract_media |= options.extract_media;
    if let Some(jobs) = options.jobs {
        config.jobs = jobs;
    }

    let job = config
        .into_job(&cwd)
        .with_context(|| format!("Invalid configuration: {}", config_path.display()))?;

    let page_format: RasterFormat = options.page_format.parse().map_err(anyhow::Error::msg)?;

    let mut pipeline = Pipeline::new(
        Arc::new(PandocEngine::new().with_program(program_path(&cwd, options.pandoc))),
        Arc::new(PdftoppmEngine::new().with_program(program_path(&cwd, options.pdftoppm))),
    )
    .with_raster_format(page_format);
    if let Some(dir) = options.scratch_dir {
        pipeline = pipeline.with_scratch_root(cwd.join(dir));
    }

    // Set up progress spinner
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    pb.enable_steady_tick(Duration::from_millis(100));
    pb.set_message(format!(
        "Converting {} documents into '{}'...",
        job.documents.len(),
        job.metadata.title
    ));

    let report = match pipeline.run_to_file(&job).await {
        Ok(report) => report,
        Err(e) => {
            pb.finish_and_clear();
            return Err(e).with_context(|| format!("Failed to build {}", job.output.display()));
        }
    };
    pb.finish_with_message(report.summary());

    for dropped in &report.dropped_assets {
        tracing::warn!(
            "{}: dropped '{}': {}",
            dropped.document.display(),
            dropped.reference,
            dropped.reason
        );
    }
    for failure in &report.failed {
        tracing::error!("Failed to convert {}: {}", failure.path.display(), failure.error);
    }
    if job.debug {
        println!("Diagnostics written to {}", job.debug_dir.display());
    }

    report.ensure_complete()?;
    Ok(())
}

/// Ask for the configuration path on stdin
fn prompt_for_config() -> Result<PathBuf> {
    eprint!("Path to the job configuration: ");
    io::stderr().flush()?;

    let mut line = String::new();
    io::stdin()
        .read_line(&mut line)
        .context("Failed to read the configuration path")?;
    let path = line.trim();
    if path.is_empty() {
        bail!("No configuration file given");
    }
    Ok(PathBuf::from(path))
}

/// Engines run inside each document's directory, so a relative path to a
/// binary has to be made absolute first. Bare names are left for `PATH`.
fn program_path(cwd: &Path, program: PathBuf) -> PathBuf {
    if program.is_relative() && program.components().count() > 1 {
        cwd.join(program)
    } else {
        program
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_program_path() {
        let cwd = Path::new("/work");
        assert_eq!(program_path(cwd, "pandoc".into()), PathBuf::from("pandoc"));
        assert_eq!(
            program_path(cwd, "bin/pandoc".into()),
            PathBuf::from("/work/bin/pandoc")
        );
        assert_eq!(
            program_path(cwd, "/usr/bin/pandoc".into()),
            PathBuf::from("/usr/bin/pandoc")
        );
    }
}
