//! Rasterizer adapter: a paged document in, one image file per page out
//!
//! Pages are renamed to `<stem>-page-<n>.<ext>` (1-indexed) after the engine
//! has written them, so identical input always yields identical names no
//! matter how a particular engine pads its page numbers.

use crate::engine::{RasterEngine, RasterFormat, RasterRequest};
use crate::error::RasterizationFailure;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncReadExt;

const PDF_MAGIC: &[u8; 4] = b"%PDF";

/// Wraps a [`RasterEngine`] with input validation and stable page naming
pub struct RasterizerAdapter {
    engine: Arc<dyn RasterEngine>,
    format: RasterFormat,
    /// Distinguishes output directories of documents sharing a file stem
    counter: AtomicUsize,
}

impl RasterizerAdapter {
    pub fn new(engine: Arc<dyn RasterEngine>) -> Self {
        Self {
            engine,
            format: RasterFormat::default(),
            counter: AtomicUsize::new(1),
        }
    }

    /// Set the image format pages are rendered to
    pub fn with_format(mut self, format: RasterFormat) -> Self {
        self.format = format;
        self
    }

    pub fn format(&self) -> RasterFormat {
        self.format
    }

    /// Rasterize every page of `pdf` into a fresh directory below `out_root`.
    ///
    /// Every returned path is a complete file on disk, in page order.
    pub async fn rasterize(
        &self,
        pdf: &Path,
        out_root: &Path,
        dpi: u32,
        timeout: Duration,
    ) -> Result<Vec<PathBuf>, RasterizationFailure> {
        check_pdf_magic(pdf).await?;

        let stem = pdf
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document".to_string());
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        let out_dir = out_root.join(format!("{:03}-{}", n, stem));
        let raw_dir = out_dir.join("raw");
        tokio::fs::create_dir_all(&raw_dir)
            .await
            .map_err(|source| RasterizationFailure::Io {
                path: raw_dir.clone(),
                source,
            })?;

        let rendered = self
            .engine
            .rasterize(RasterRequest {
                input: pdf,
                out_dir: &raw_dir,
                format: self.format,
                dpi,
                timeout,
            })
            .await?;

        if rendered.is_empty() {
            return Err(RasterizationFailure::NoPages {
                engine: self.engine.name().to_string(),
                path: pdf.to_path_buf(),
            });
        }

        let mut pages = Vec::with_capacity(rendered.len());
        for (i, page) in rendered.iter().enumerate() {
            let number = i + 1;
            let complete = tokio::fs::metadata(page)
                .await
                .map(|m| m.is_file() && m.len() > 0)
                .unwrap_or(false);
            if !complete {
                return Err(RasterizationFailure::PageMissing {
                    path: pdf.to_path_buf(),
                    page: number,
                });
            }

            let name = format!("{}-page-{}.{}", stem, number, self.format.extension());
            let target = out_dir.join(name);
            tokio::fs::rename(page, &target)
                .await
                .map_err(|source| RasterizationFailure::Io {
                    path: page.clone(),
                    source,
                })?;
            pages.push(target);
        }

        tracing::info!(
            "Rasterized {} into {} page images with {}",
            pdf.display(),
            pages.len(),
            self.engine.name()
        );
        Ok(pages)
    }
}

/// Reject files that are not PDFs before handing them to the engine
async fn check_pdf_magic(path: &Path) -> Result<(), RasterizationFailure> {
    let io_err = |source| RasterizationFailure::Io {
        path: path.to_path_buf(),
        source,
    };
    let mut file = tokio::fs::File::open(path).await.map_err(io_err)?;
    let mut magic = Vec::with_capacity(PDF_MAGIC.len());
    (&mut file)
        .take(PDF_MAGIC.len() as u64)
        .read_to_end(&mut magic)
        .await
        .map_err(io_err)?;

    if magic.as_slice() != PDF_MAGIC {
        return Err(RasterizationFailure::NotAPdf {
            path: path.to_path_buf(),
            magic,
        });
    }
    Ok(())
}
