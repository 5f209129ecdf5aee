//! Texpub Core Library
//!
//! This crate turns an ordered list of source documents into a single EPUB.
//! Each document is converted to HTML by an external engine, its media
//! references are resolved (PDF figures are rasterized page by page), and
//! everything is packaged by the [`PackageAssembler`] in material order.
//! The [`Pipeline`] drives all of it for one [`ConversionJob`].

pub mod converter;
pub mod engine;
pub mod error;
pub mod package;
pub mod pipeline;
pub mod rasterizer;
pub mod resolver;
pub mod types;

pub use converter::{ConvertOptions, DocumentConverter};
pub use error::{
    ConversionFailure, PackageError, RasterizationFailure, ResolveError, Result, TexpubError,
};
pub use package::{inspect_archive, ArchiveSummary, AssemblerState, PackageAssembler};
pub use pipeline::{JobOutcome, JobReport, Pipeline};
pub use rasterizer::RasterizerAdapter;
pub use resolver::AssetResolver;
pub use types::{
    ConversionJob, ConversionResult, JobConfig, MediaKind, PackageMetadata, ResolvedMedia,
    SourceDocument,
};
