//! Pipeline orchestrator
//!
//! Drives one [`ConversionJob`] from source documents to archive bytes:
//!
//! 1. the cover is checked and attached before anything is converted
//! 2. documents are converted, up to `job.jobs` at a time, and yielded back
//!    in material order
//! 3. each result's media references are resolved (and PDFs rasterized)
//!    and the document is handed to the [`PackageAssembler`]
//! 4. the assembler is finalized once every document has been seen
//!
//! Only step 2 runs concurrently. The assembler is touched from this task
//! alone, in material order, so identifiers come out the same on every run.

mod diagnostics;
mod report;

pub use diagnostics::{Decision, Diagnostics, DECISION_LOG};
pub use report::{DocumentFailure, DroppedAsset, JobReport};

use crate::converter::{ConvertOptions, DocumentConverter};
use crate::engine::{ConversionEngine, RasterEngine, RasterFormat};
use crate::error::{Result, TexpubError};
use crate::package::PackageAssembler;
use crate::rasterizer::RasterizerAdapter;
use crate::resolver::AssetResolver;
use crate::types::{ConversionJob, ConversionResult, MediaKind, ResolvedMedia, SourceDocument};
use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Archive bytes plus the report describing how they were produced
#[derive(Debug)]
pub struct JobOutcome {
    pub archive: Vec<u8>,
    pub report: JobReport,
}

/// Name prefix of the per-job scratch directory
pub const SCRATCH_PREFIX: &str = "texpub-";

/// Rasterized pages (or the failure) per PDF, kept for the length of a job
type PageCache = HashMap<PathBuf, std::result::Result<Vec<PathBuf>, String>>;

/// Runs conversion jobs against a pair of engines
pub struct Pipeline {
    converter: DocumentConverter,
    rasterizer: RasterizerAdapter,
    /// Parent of each job's scratch directory; the system temp dir if unset
    scratch_root: Option<PathBuf>,
}

impl Pipeline {
    pub fn new(conversion: Arc<dyn ConversionEngine>, raster: Arc<dyn RasterEngine>) -> Self {
        Self {
            converter: DocumentConverter::new(conversion),
            rasterizer: RasterizerAdapter::new(raster),
            scratch_root: None,
        }
    }

    /// Image format PDF pages are rendered to
    pub fn with_raster_format(mut self, format: RasterFormat) -> Self {
        self.rasterizer = self.rasterizer.with_format(format);
        self
    }

    /// Create job scratch directories below `dir`
    pub fn with_scratch_root(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_root = Some(dir.into());
        self
    }

    /// Run `job` and write the archive to `job.output`
    pub async fn run_to_file(&self, job: &ConversionJob) -> Result<JobReport> {
        let JobOutcome {
            archive,
            mut report,
        } = self.run(job).await?;

        if let Some(parent) = job.output.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&job.output, &archive).await?;
        tracing::info!("Wrote {} ({} bytes)", job.output.display(), archive.len());

        report.output = Some(job.output.clone());
        Ok(report)
    }

    /// Run `job` and return the archive in memory.
    ///
    /// Per-document and per-asset failures end up in the report. Errors are
    /// returned only for a missing cover, an empty package or a failure to
    /// write the archive itself.
    pub async fn run(&self, job: &ConversionJob) -> Result<JobOutcome> {
        tracing::info!(
            "Converting {} documents with {} ({} at a time)",
            job.documents.len(),
            self.converter.engine_name(),
            job.jobs
        );

        let mut diagnostics = if job.debug {
            Diagnostics::create(&job.debug_dir).unwrap_or_else(|e| {
                tracing::warn!(
                    "Diagnostics disabled, cannot write to {}: {}",
                    job.debug_dir.display(),
                    e
                );
                Diagnostics::disabled()
            })
        } else {
            Diagnostics::disabled()
        };

        let mut assembler = PackageAssembler::new(job.metadata.clone());
        let mut report = JobReport::default();

        if let Some(cover) = &job.cover {
            assembler.set_cover(cover)?;
            diagnostics.record(&Decision::Cover {
                path: cover.clone(),
            });
            report.cover = Some(cover.clone());
        }

        // Removed when this function returns, whichever way it returns
        let mut builder = tempfile::Builder::new();
        builder.prefix(SCRATCH_PREFIX);
        let scratch = match &self.scratch_root {
            Some(root) => builder.tempdir_in(root)?,
            None => builder.tempdir()?,
        };
        let work_dir = match diagnostics.dir() {
            Some(dir) => fresh_dir(&dir.join("work")).await?,
            None => scratch.path().to_path_buf(),
        };
        let media_dir = work_dir.join("media");
        let pages_dir = work_dir.join("pages");

        let options = ConvertOptions {
            template: job.template.as_deref(),
            extract_media: job.extract_media,
            media_dir: &media_dir,
            timeout: job.engine_timeout,
        };
        let converter = &self.converter;
        let mut conversions = stream::iter(job.documents.iter())
            .map(move |document| async move {
                let result = converter.convert(document, &options).await;
                (document, result)
            })
            .buffered(job.jobs);

        let resolver = AssetResolver::new(&job.working_dir);
        let mut pages = PageCache::new();

        while let Some((document, converted)) = conversions.next().await {
            let result = match converted {
                Ok(result) => result,
                Err(e) => {
                    tracing::warn!("Failed to convert {}: {}", document.path.display(), e);
                    diagnostics.record(&Decision::ConversionFailed {
                        position: document.position,
                        document: document.path.clone(),
                        error: e.to_string(),
                    });
                    report.record_failure(document, e);
                    continue;
                }
            };

            diagnostics.markup(document, &result.markup);
            diagnostics.record(&Decision::Converted {
                position: document.position,
                document: document.path.clone(),
                engine: converter.engine_name().to_string(),
                markup_bytes: result.markup.len(),
                media: result.media.clone(),
            });

            let media = self
                .resolve_media(
                    &result,
                    &resolver,
                    &pages_dir,
                    job,
                    &mut pages,
                    &mut report,
                    &mut diagnostics,
                )
                .await;

            let packaged = assembler.add_document(result, document.position, &media)?;
            tracing::info!(
                "Packaged {} as {} '{}'",
                document.path.display(),
                packaged.href,
                packaged.title
            );
            diagnostics.record(&Decision::Packaged {
                position: packaged.position,
                id: packaged.id.clone(),
                href: packaged.href.clone(),
                title: packaged.title.clone(),
                media: packaged.media.clone(),
            });
            report.record_success(document);
        }
        drop(conversions);

        if report.succeeded.is_empty() {
            return Err(TexpubError::EmptyPackage {
                failed: report.failed.len(),
            });
        }

        // Media files are read from the work directory here, so it must
        // still exist
        let archive = assembler.finalize()?;
        report.media_assets = assembler.media().len();
        diagnostics.flush();
        drop(scratch);

        if report.is_complete() {
            tracing::info!("{}", report.summary());
        } else {
            tracing::warn!("{}", report.summary());
        }
        Ok(JobOutcome { archive, report })
    }

    /// Turn a result's media references into files, dropping whatever
    /// cannot be resolved or rasterized
    #[allow(clippy::too_many_arguments)]
    async fn resolve_media(
        &self,
        result: &ConversionResult,
        resolver: &AssetResolver,
        pages_dir: &Path,
        job: &ConversionJob,
        pages: &mut PageCache,
        report: &mut JobReport,
        diagnostics: &mut Diagnostics,
    ) -> Vec<ResolvedMedia> {
        let document = &result.document;
        let mut resolved = Vec::with_capacity(result.media.len());

        for reference in &result.media {
            let path = match resolver.resolve(reference, document.base_dir()) {
                Ok(path) => path,
                Err(e) => {
                    drop_asset(document, reference, e, report, diagnostics);
                    continue;
                }
            };
            diagnostics.record(&Decision::Resolved {
                document: document.path.clone(),
                reference: reference.clone(),
                path: path.clone(),
            });

            if MediaKind::of(&path) != Some(MediaKind::Paged) {
                resolved.push(ResolvedMedia::image(reference.clone(), path));
                continue;
            }

            if !pages.contains_key(&path) {
                let rendered = self
                    .rasterizer
                    .rasterize(&path, pages_dir, job.dpi, job.engine_timeout)
                    .await
                    .map_err(|e| e.to_string());
                if let Ok(files) = &rendered {
                    diagnostics.record(&Decision::Rasterized {
                        source: path.clone(),
                        pages: files.len(),
                    });
                }
                pages.insert(path.clone(), rendered);
            }

            match pages.get(&path) {
                Some(Ok(files)) => {
                    resolved.push(ResolvedMedia::pages(reference.clone(), files.clone()))
                }
                Some(Err(reason)) => {
                    drop_asset(document, reference, reason, report, diagnostics)
                }
                None => {}
            }
        }
        resolved
    }
}

fn drop_asset(
    document: &SourceDocument,
    reference: &str,
    reason: impl ToString,
    report: &mut JobReport,
    diagnostics: &mut Diagnostics,
) {
    let reason = reason.to_string();
    tracing::warn!(
        "Dropping '{}' from {}: {}",
        reference,
        document.path.display(),
        reason
    );
    diagnostics.record(&Decision::Dropped {
        document: document.path.clone(),
        reference: reference.to_string(),
        reason: reason.clone(),
    });
    report.record_dropped(document, reference, reason);
}

/// Empty `dir`, creating it if needed
async fn fresh_dir(dir: &Path) -> Result<PathBuf> {
    if tokio::fs::metadata(dir).await.is_ok() {
        tokio::fs::remove_dir_all(dir).await?;
    }
    tokio::fs::create_dir_all(dir).await?;
    Ok(dir.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{EngineRequest, RasterRequest};
    use crate::error::{ConversionFailure, RasterizationFailure};
    use crate::types::JobConfig;
    use async_trait::async_trait;
    use tempfile::TempDir;

    struct EchoEngine;

    #[async_trait]
    impl ConversionEngine for EchoEngine {
        fn name(&self) -> &str {
            "echo"
        }

        async fn convert(
            &self,
            request: EngineRequest<'_>,
        ) -> std::result::Result<String, ConversionFailure> {
            tokio::fs::read_to_string(request.input)
                .await
                .map_err(|source| ConversionFailure::Io {
                    path: request.input.to_path_buf(),
                    source,
                })
        }
    }

    struct NoRaster;

    #[async_trait]
    impl RasterEngine for NoRaster {
        fn name(&self) -> &str {
            "none"
        }

        async fn rasterize(
            &self,
            request: RasterRequest<'_>,
        ) -> std::result::Result<Vec<PathBuf>, RasterizationFailure> {
            Err(RasterizationFailure::NoPages {
                engine: "none".to_string(),
                path: request.input.to_path_buf(),
            })
        }
    }

    fn pipeline() -> Pipeline {
        Pipeline::new(Arc::new(EchoEngine), Arc::new(NoRaster))
    }

    #[tokio::test]
    async fn test_missing_cover_aborts_before_conversion() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.tex"), "<p>a</p>").unwrap();
        let config = JobConfig {
            materials: vec!["a.tex".into()],
            cover: Some("missing.jpg".into()),
            ..Default::default()
        };
        let job = config.into_job(dir.path()).unwrap();

        let err = pipeline().run(&job).await.unwrap_err();
        assert!(matches!(err, TexpubError::MissingCover { .. }));
    }

    #[tokio::test]
    async fn test_debug_writes_markup_and_decisions() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.tex"), "<h1>A</h1>").unwrap();
        let config = JobConfig {
            materials: vec!["a.tex".into()],
            debug: true,
            ..Default::default()
        };
        let job = config.into_job(dir.path()).unwrap();

        let outcome = pipeline().run(&job).await.unwrap();
        assert!(outcome.report.is_complete());
        assert!(job.debug_dir.join("001-a.html").is_file());

        let log = std::fs::read_to_string(job.debug_dir.join(DECISION_LOG)).unwrap();
        let events: Vec<String> = log
            .lines()
            .map(|l| serde_json::from_str::<serde_json::Value>(l).unwrap()["event"].to_string())
            .collect();
        assert_eq!(events, vec!["\"converted\"", "\"packaged\""]);
    }

    fn scratch_dirs(root: &Path) -> Vec<PathBuf> {
        std::fs::read_dir(root)
            .unwrap()
            .map(|e| e.unwrap().path())
            .filter(|p| {
                p.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with(SCRATCH_PREFIX))
            })
            .collect()
    }

    #[tokio::test]
    async fn test_scratch_dir_removed_after_success_and_failure() {
        let dir = TempDir::new().unwrap();
        let scratch = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.tex"), "<p>a</p>").unwrap();
        let pipeline = pipeline().with_scratch_root(scratch.path());

        let ok = JobConfig {
            materials: vec!["a.tex".into()],
            extract_media: true,
            ..Default::default()
        }
        .into_job(dir.path())
        .unwrap();
        pipeline.run(&ok).await.unwrap();
        assert!(scratch_dirs(scratch.path()).is_empty());

        let failing = JobConfig {
            materials: vec!["missing.tex".into()],
            extract_media: true,
            ..Default::default()
        }
        .into_job(dir.path())
        .unwrap();
        let err = pipeline.run(&failing).await.unwrap_err();
        assert!(matches!(err, TexpubError::EmptyPackage { failed: 1 }));
        assert!(scratch_dirs(scratch.path()).is_empty());
    }

    #[tokio::test]
    async fn test_scratch_dir_exists_while_converting() {
        struct RecordingEngine(std::sync::Mutex<Option<PathBuf>>);

        #[async_trait]
        impl ConversionEngine for RecordingEngine {
            fn name(&self) -> &str {
                "media-dir"
            }

            async fn convert(
                &self,
                request: EngineRequest<'_>,
            ) -> std::result::Result<String, ConversionFailure> {
                *self.0.lock().unwrap() = request.media_dir.map(Path::to_path_buf);
                Ok("<p>a</p>".to_string())
            }
        }

        let dir = TempDir::new().unwrap();
        let scratch = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.tex"), "").unwrap();
        let engine = Arc::new(RecordingEngine(std::sync::Mutex::new(None)));
        let pipeline = Pipeline::new(engine.clone(), Arc::new(NoRaster))
            .with_scratch_root(scratch.path());
        let job = JobConfig {
            materials: vec!["a.tex".into()],
            extract_media: true,
            ..Default::default()
        }
        .into_job(dir.path())
        .unwrap();

        pipeline.run(&job).await.unwrap();
        let media_dir = engine.0.lock().unwrap().clone().unwrap();
        assert!(media_dir.starts_with(scratch.path()));
        assert!(!media_dir.exists());
    }

    #[tokio::test]
    async fn test_debug_does_not_change_archive() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("fig.png"), b"png").unwrap();
        std::fs::write(
            dir.path().join("a.tex"),
            r#"<h1>A</h1><img src="fig.png" />"#,
        )
        .unwrap();
        std::fs::write(dir.path().join("b.tex"), "<h2>B</h2>").unwrap();
        let job = |debug: bool| {
            JobConfig {
                materials: vec!["a.tex".into(), "b.tex".into()],
                extract_media: true,
                debug,
                ..Default::default()
            }
            .into_job(dir.path())
            .unwrap()
        };

        let plain = pipeline().run(&job(false)).await.unwrap();
        let debug_job = job(true);
        let debugged = pipeline().run(&debug_job).await.unwrap();

        assert!(debug_job.debug_dir.join(DECISION_LOG).is_file());
        assert_eq!(plain.report.media_assets, 1);
        assert_eq!(plain.archive, debugged.archive);
    }

    #[tokio::test]
    async fn test_failed_rasterization_is_cached_and_dropped() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("plot.pdf"), b"%PDF-1.4").unwrap();
        std::fs::write(
            dir.path().join("a.tex"),
            r#"<embed src="plot.pdf" /><img src="plot.pdf" />"#,
        )
        .unwrap();
        let config = JobConfig {
            materials: vec!["a.tex".into()],
            extract_media: true,
            ..Default::default()
        };
        let job = config.into_job(dir.path()).unwrap();

        let outcome = pipeline().run(&job).await.unwrap();
        // One distinct reference, dropped once
        assert_eq!(outcome.report.dropped_assets.len(), 1);
        assert_eq!(outcome.report.media_assets, 0);
    }
}
