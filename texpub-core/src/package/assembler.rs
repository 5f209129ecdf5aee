//! Package assembler: the single owner of the in-progress package
//!
//! State machine: `Empty -> Accumulating -> Finalized`. Documents and the
//! cover can be added until the package is finalized; finalizing twice, or
//! adding anything afterwards, fails with `AlreadyFinalized`.

use super::epub::{write_epub, PackageContents};
use super::markup;
use super::{CoverAsset, MediaRegistry, PackagedDocument};
use crate::error::{Result, TexpubError};
use crate::types::{media_type_for, ConversionResult, MediaData, PackageMetadata, ResolvedMedia};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

/// Lifecycle of a [`PackageAssembler`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssemblerState {
    Empty,
    Accumulating,
    Finalized,
}

/// Accumulates converted documents, the cover and media, then writes the archive
#[derive(Debug)]
pub struct PackageAssembler {
    state: AssemblerState,
    metadata: PackageMetadata,
    cover: Option<CoverAsset>,
    /// Keyed by material position, so iteration is reading order
    documents: BTreeMap<usize, PackagedDocument>,
    registry: MediaRegistry,
    next_document: usize,
}

impl PackageAssembler {
    pub fn new(metadata: PackageMetadata) -> Self {
        Self {
            state: AssemblerState::Empty,
            metadata,
            cover: None,
            documents: BTreeMap::new(),
            registry: MediaRegistry::new(),
            next_document: 1,
        }
    }

    pub fn state(&self) -> AssemblerState {
        self.state
    }

    pub fn metadata(&self) -> &PackageMetadata {
        &self.metadata
    }

    /// Registered documents in reading order
    pub fn documents(&self) -> impl Iterator<Item = &PackagedDocument> {
        self.documents.values()
    }

    pub fn document_count(&self) -> usize {
        self.documents.len()
    }

    pub fn media(&self) -> &MediaRegistry {
        &self.registry
    }

    pub fn cover(&self) -> Option<&CoverAsset> {
        self.cover.as_ref()
    }

    fn check_open(&self) -> Result<()> {
        if self.state == AssemblerState::Finalized {
            return Err(TexpubError::AlreadyFinalized);
        }
        Ok(())
    }

    /// Embed `path` as the cover image, replacing any previous cover
    pub fn set_cover(&mut self, path: &Path) -> Result<()> {
        self.check_open()?;
        if !path.is_file() {
            return Err(TexpubError::MissingCover {
                path: path.to_path_buf(),
            });
        }

        let Some(media_type) = media_type_for(path) else {
            return Err(TexpubError::UnsupportedCover {
                path: path.to_path_buf(),
            });
        };
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();
        let href = format!("cover.{}", ext);
        let data = std::fs::read(path)?;

        tracing::info!("Cover image: {} ({})", path.display(), media_type);
        self.cover = Some(CoverAsset {
            source: path.to_path_buf(),
            href,
            media_type: media_type.to_string(),
            data: MediaData::Inline(data),
        });
        self.state = AssemblerState::Accumulating;
        Ok(())
    }

    /// Register a converted document at `position` in the reading order.
    ///
    /// Every file in `media` is registered (once per distinct path) and the
    /// markup is rewritten to point at the packaged copies. References not
    /// listed in `media` are left as they are.
    pub fn add_document(
        &mut self,
        result: ConversionResult,
        position: usize,
        media: &[ResolvedMedia],
    ) -> Result<&PackagedDocument> {
        self.check_open()?;
        if self.documents.contains_key(&position) {
            return Err(TexpubError::DuplicateDocument { position });
        }

        let mut replacements: HashMap<String, Vec<String>> = HashMap::new();
        let mut media_ids: Vec<String> = Vec::new();
        for resolved in media {
            let mut hrefs = Vec::with_capacity(resolved.files.len());
            for file in &resolved.files {
                let asset = self.registry.register(file);
                if !media_ids.contains(&asset.id) {
                    media_ids.push(asset.id.clone());
                }
                hrefs.push(asset.href.clone());
            }
            replacements.insert(resolved.reference.clone(), hrefs);
        }

        let body = markup::rewrite_media(markup::body_fragment(&result.markup), &replacements);
        let title =
            markup::first_heading(&body).unwrap_or_else(|| format!("Chapter {}", position + 1));
        let xhtml = markup::xhtml_document(&title, &self.metadata.language, &body);

        let seq = self.next_document;
        self.next_document += 1;

        let document = PackagedDocument {
            id: format!("doc-{:04}", seq),
            seq,
            position,
            source: result.document.path.clone(),
            title,
            href: format!("chapter_{}.xhtml", position + 1),
            xhtml,
            media: media_ids,
        };
        tracing::debug!(
            "Registered {} as {} ({} media)",
            document.source.display(),
            document.id,
            document.media.len()
        );

        self.state = AssemblerState::Accumulating;
        Ok(self.documents.entry(position).or_insert(document))
    }

    /// Write the archive. Only the first call succeeds.
    pub fn finalize(&mut self) -> Result<Vec<u8>> {
        self.check_open()?;
        if self.documents.is_empty() {
            return Err(TexpubError::EmptyPackage { failed: 0 });
        }
        self.state = AssemblerState::Finalized;

        let contents = PackageContents {
            metadata: &self.metadata,
            cover: self.cover.as_ref(),
            documents: self.documents.values().collect(),
            media: &self.registry,
        };
        let archive = write_epub(&contents)?;

        tracing::info!(
            "Finalized '{}': {} documents, {} media assets, {} bytes",
            self.metadata.title,
            self.documents.len(),
            self.registry.len(),
            archive.len()
        );
        Ok(archive)
    }
}
