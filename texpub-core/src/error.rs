//! Error types for Texpub Core
//!
//! Per-document and per-asset failures ([`ConversionFailure`],
//! [`RasterizationFailure`], [`ResolveError`]) are recorded by the pipeline
//! and do not abort a job. The structural variants of [`TexpubError`]
//! (`MissingCover`, `UnsupportedCover`, `EmptyPackage`, `AlreadyFinalized`)
//! abort immediately.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type alias using TexpubError
pub type Result<T> = std::result::Result<T, TexpubError>;

/// Top-level error type for all Texpub operations
#[derive(Debug, Error)]
pub enum TexpubError {
    #[error("Cover image not found: {}", path.display())]
    MissingCover { path: PathBuf },

    #[error("Unsupported cover image type: {}", path.display())]
    UnsupportedCover { path: PathBuf },

    #[error("No document converted successfully ({failed} failed); nothing to package")]
    EmptyPackage { failed: usize },

    #[error("Package has already been finalized")]
    AlreadyFinalized,

    #[error("A document is already registered at position {position}")]
    DuplicateDocument { position: usize },

    #[error("{failed} of {} documents failed to convert", succeeded + failed)]
    PartialFailure { succeeded: usize, failed: usize },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Conversion error: {0}")]
    Conversion(#[from] ConversionFailure),

    #[error("Rasterization error: {0}")]
    Rasterization(#[from] RasterizationFailure),

    #[error("Packaging error: {0}")]
    Package(#[from] PackageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors reported by the document converter for a single document
#[derive(Debug, Error)]
pub enum ConversionFailure {
    #[error("Document not readable: {}", path.display())]
    DocumentNotFound { path: PathBuf },

    #[error("Template not readable: {}", path.display())]
    TemplateNotFound { path: PathBuf },

    #[error("{engine} exited with {status} on {}: {stderr}", path.display())]
    EngineFailed {
        engine: String,
        path: PathBuf,
        status: String,
        stderr: String,
    },

    #[error("{engine} produced no output for {}", path.display())]
    EmptyOutput { engine: String, path: PathBuf },

    #[error("{engine} timed out after {timeout:?} on {}", path.display())]
    Timeout {
        engine: String,
        path: PathBuf,
        timeout: Duration,
    },

    #[error("Conversion engine '{engine}' is not available: {detail}")]
    EngineNotFound { engine: String, detail: String },

    #[error("IO error while converting {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors reported by the rasterizer for a single paged document
#[derive(Debug, Error)]
pub enum RasterizationFailure {
    #[error("Not a PDF document: {} (first bytes: {magic:?})", path.display())]
    NotAPdf { path: PathBuf, magic: Vec<u8> },

    #[error("{engine} exited with {status} on {}: {stderr}", path.display())]
    EngineFailed {
        engine: String,
        path: PathBuf,
        status: String,
        stderr: String,
    },

    #[error("{engine} produced no pages for {}", path.display())]
    NoPages { engine: String, path: PathBuf },

    #[error("Page {page} of {} was not written to disk", path.display())]
    PageMissing { path: PathBuf, page: usize },

    #[error("{engine} timed out after {timeout:?} on {}", path.display())]
    Timeout {
        engine: String,
        path: PathBuf,
        timeout: Duration,
    },

    #[error("Rasterization engine '{engine}' is not available: {detail}")]
    EngineNotFound { engine: String, detail: String },

    #[error("IO error while rasterizing {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors that occur while resolving a media reference
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("Media not found: {reference}")]
    NotFound { reference: String },

    #[error("Unsupported media reference: {reference} ({reason})")]
    Unsupported { reference: String, reason: String },
}

/// Errors that occur while writing the archive
#[derive(Debug, Error)]
pub enum PackageError {
    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Failed to read media {}: {source}", path.display())]
    MediaUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed archive: {0}")]
    Malformed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
