//! Media kinds and resolved media references

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// What a media file is, judged by its extension
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    /// A still image that can be embedded as is
    Image,

    /// A paged binary document (PDF) that must be rasterized first
    Paged,
}

impl MediaKind {
    /// Classify a path, returning `None` for unsupported types
    pub fn of(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "pdf" => Some(MediaKind::Paged),
            _ if media_type_for(path).is_some() => Some(MediaKind::Image),
            _ => None,
        }
    }
}

/// MIME type for an embeddable image path
pub fn media_type_for(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "svg" => Some("image/svg+xml"),
        "webp" => Some("image/webp"),
        _ => None,
    }
}

/// How media bytes are held until the archive is written
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaData {
    /// Data stored directly in memory
    Inline(Vec<u8>),

    /// Data stored in a file that stays on disk until finalization
    File(PathBuf),
}

impl MediaData {
    /// Get data as bytes (reads the file if needed)
    pub fn as_bytes(&self) -> std::io::Result<Vec<u8>> {
        match self {
            MediaData::Inline(data) => Ok(data.clone()),
            MediaData::File(path) => std::fs::read(path),
        }
    }
}

/// A markup reference together with the files it resolved to.
///
/// An image resolves to one file; a paged document to one file per page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedMedia {
    /// The reference exactly as it appears in the markup
    pub reference: String,

    /// Absolute paths of the files to embed, in page order
    pub files: Vec<PathBuf>,
}

impl ResolvedMedia {
    pub fn image(reference: impl Into<String>, file: impl Into<PathBuf>) -> Self {
        Self {
            reference: reference.into(),
            files: vec![file.into()],
        }
    }

    pub fn pages(reference: impl Into<String>, files: Vec<PathBuf>) -> Self {
        Self {
            reference: reference.into(),
            files,
        }
    }
}
