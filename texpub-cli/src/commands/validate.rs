//! Validate command implementation

use anyhow::{bail, Context, Result};
use std::path::Path;
use texpub_core::JobConfig;

/// Check that a job configuration loads and that every file it names exists
pub fn validate(config_path: &Path) -> Result<()> {
    let config = JobConfig::from_json_file(config_path)
        .with_context(|| format!("Failed to load configuration: {}", config_path.display()))?;
    let cwd = std::env::current_dir().context("Could not determine the current directory")?;
    let job = config
        .into_job(&cwd)
        .with_context(|| format!("Invalid configuration: {}", config_path.display()))?;

    let mut problems = Vec::new();
    for document in &job.documents {
        if !document.absolute.is_file() {
            problems.push(format!("material not found: {}", document.path.display()));
        }
    }
    if let Some(cover) = &job.cover {
        if !cover.is_file() {
            problems.push(format!("cover not found: {}", cover.display()));
        }
    }
    if let Some(template) = &job.template {
        if !template.is_file() {
            problems.push(format!("template not found: {}", template.display()));
        }
    }

    if !problems.is_empty() {
        for problem in &problems {
            eprintln!("  {}", problem);
        }
        bail!(
            "Validation failed for {} ({} problems)",
            config_path.display(),
            problems.len()
        );
    }

    println!("Valid configuration");
    println!("  Title:     {}", job.metadata.title);
    println!("  Materials: {}", job.documents.len());
    println!(
        "  Cover:     {}",
        job.cover
            .as_deref()
            .map(|c| c.display().to_string())
            .unwrap_or_else(|| "none".to_string())
    );
    println!("  Output:    {}", job.output.display());
    Ok(())
}
