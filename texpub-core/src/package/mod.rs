//! Package assembly: media registry, markup rewriting and the EPUB writer

mod assembler;
mod epub;
mod inspect;
pub mod markup;
mod registry;

pub use assembler::{AssemblerState, PackageAssembler};
pub use inspect::{inspect_archive, ArchiveChapter, ArchiveSummary, ManifestItem};
pub use registry::{MediaAsset, MediaRegistry};

use crate::types::MediaData;
use std::path::PathBuf;

/// A converted document registered with the assembler
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackagedDocument {
    /// Package-internal identifier (`doc-0001`, ...)
    pub id: String,

    /// Registration sequence number, starting at 1
    pub seq: usize,

    /// Position in the job's material list; determines reading order
    pub position: usize,

    /// Source document path as configured
    pub source: PathBuf,

    /// Title used in the table of contents
    pub title: String,

    /// File name inside the package (`chapter_N.xhtml`)
    pub href: String,

    /// Complete XHTML document
    pub xhtml: String,

    /// Ids of the media assets this document references, in order
    pub media: Vec<String>,
}

/// The cover image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverAsset {
    pub source: PathBuf,
    pub href: String,
    pub media_type: String,
    pub data: MediaData,
}
