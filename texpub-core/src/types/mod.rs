//! Core types shared by the conversion pipeline

mod document;
mod job;
mod media;
mod metadata;

pub use document::{ConversionResult, SourceDocument};
pub use job::{ConversionJob, JobConfig};
pub use media::{media_type_for, MediaData, MediaKind, ResolvedMedia};
pub use metadata::PackageMetadata;
