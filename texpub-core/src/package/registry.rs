//! Append-only media registry indexed by resolved source path

use crate::types::{media_type_for, MediaData};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// A media file registered for embedding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaAsset {
    /// Package-internal identifier (`media-0001`, ...)
    pub id: String,

    /// Registration sequence number, starting at 1
    pub seq: usize,

    /// Canonical source path; the dedupe key
    pub source: PathBuf,

    /// Location inside the package, relative to the OPF
    pub href: String,

    /// MIME type
    pub media_type: String,

    pub data: MediaData,
}

/// Registers each source path at most once and hands out identifiers in
/// strictly increasing order. Identifiers are never reused.
#[derive(Debug, Clone, Default)]
pub struct MediaRegistry {
    assets: Vec<MediaAsset>,
    by_source: HashMap<PathBuf, usize>,
}

impl MediaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `source`, or return the asset already registered for it
    pub fn register(&mut self, source: &Path) -> &MediaAsset {
        if let Some(&index) = self.by_source.get(source) {
            return &self.assets[index];
        }

        let seq = self.assets.len() + 1;
        let file_name = source
            .file_name()
            .map(|n| sanitize_file_name(&n.to_string_lossy()))
            .unwrap_or_else(|| "media".to_string());
        let asset = MediaAsset {
            id: format!("media-{:04}", seq),
            seq,
            source: source.to_path_buf(),
            href: format!("media/{:04}-{}", seq, file_name),
            media_type: media_type_for(source)
                .unwrap_or("application/octet-stream")
                .to_string(),
            data: MediaData::File(source.to_path_buf()),
        };

        self.by_source.insert(source.to_path_buf(), self.assets.len());
        self.assets.push(asset);
        &self.assets[seq - 1]
    }

    /// Look up an asset by its source path
    pub fn get(&self, source: &Path) -> Option<&MediaAsset> {
        self.by_source.get(source).map(|&i| &self.assets[i])
    }

    /// Iterate over all assets in registration order
    pub fn iter(&self) -> impl Iterator<Item = &MediaAsset> {
        self.assets.iter()
    }

    /// Number of registered assets
    pub fn len(&self) -> usize {
        self.assets.len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}

/// Keep file names safe for use inside a zip entry and an XML attribute
fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect()
}
