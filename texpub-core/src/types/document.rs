//! Source documents and their conversion results

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// One input document of a job
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SourceDocument {
    /// Zero-based position in the job's material list
    pub position: usize,

    /// Path as listed in the configuration
    pub path: PathBuf,

    /// Absolute path used for all filesystem access
    pub absolute: PathBuf,
}

impl SourceDocument {
    pub fn new(position: usize, path: impl Into<PathBuf>, absolute: impl Into<PathBuf>) -> Self {
        Self {
            position,
            path: path.into(),
            absolute: absolute.into(),
        }
    }

    /// Directory that relative media references are resolved against first
    pub fn base_dir(&self) -> &Path {
        self.absolute.parent().unwrap_or_else(|| Path::new("."))
    }

    /// File stem, used for diagnostics file names
    pub fn stem(&self) -> String {
        self.absolute
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| format!("document-{}", self.position + 1))
    }
}

/// Output of converting one [`SourceDocument`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionResult {
    /// The document this markup came from
    pub document: SourceDocument,

    /// Normalized markup (an HTML fragment)
    pub markup: String,

    /// Media references found in the markup, in document order, without duplicates.
    /// Always empty when media extraction was disabled.
    pub media: Vec<String>,
}

impl ConversionResult {
    pub fn new(document: SourceDocument, markup: impl Into<String>, media: Vec<String>) -> Self {
        Self {
            document,
            markup: markup.into(),
            media,
        }
    }

    pub fn position(&self) -> usize {
        self.document.position
    }
}
