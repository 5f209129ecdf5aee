//! Read back the structure of a produced archive

use super::markup::unescape_html;
use crate::error::PackageError;
use ::epub::doc::EpubDoc;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::io::Cursor;
use std::path::Path;
use zip::ZipArchive;

static HTML_TITLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<title>(.*?)</title>").expect("valid regex"));

/// One manifest entry
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ManifestItem {
    pub id: String,
    pub href: String,
    pub media_type: String,
}

/// One content unit in spine order
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ArchiveChapter {
    pub id: String,
    pub href: String,
    pub title: String,
    #[serde(skip)]
    pub xhtml: String,
}

/// What an archive contains
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ArchiveSummary {
    pub title: String,
    pub identifier: String,
    pub language: String,

    /// Directory holding the package document; hrefs are relative to it
    pub root: String,

    /// The cover image, when one was embedded
    pub cover: Option<ManifestItem>,

    /// Content units in reading order (the cover page excluded)
    pub chapters: Vec<ArchiveChapter>,

    /// Embedded media other than the cover image, ordered by href
    pub media: Vec<ManifestItem>,

    /// Every zip entry name, in archive order
    pub entries: Vec<String>,
}

impl ArchiveSummary {
    /// Whether `href` (relative to the package document) names an entry in the archive
    pub fn contains(&self, href: &str) -> bool {
        let full = if self.root.is_empty() {
            href.to_string()
        } else {
            format!("{}/{}", self.root, href)
        };
        self.entries.iter().any(|e| *e == full)
    }
}

/// Parse the package document and content units of an archive
pub fn inspect_archive(bytes: &[u8]) -> Result<ArchiveSummary, PackageError> {
    let entries = entry_names(bytes)?;
    if entries.first().map(String::as_str) != Some("mimetype") {
        return Err(PackageError::Malformed(format!(
            "first entry is '{}', expected 'mimetype'",
            entries.first().map(String::as_str).unwrap_or_default()
        )));
    }

    let mut doc = EpubDoc::from_reader(Cursor::new(bytes.to_vec()))
        .map_err(|e| PackageError::Malformed(e.to_string()))?;

    let meta = |key: &str| {
        doc.mdata(key)
            .map(|item| item.value.trim().to_string())
            .unwrap_or_default()
    };
    let title = meta("title");
    let identifier = meta("identifier");
    let language = meta("language");

    let root = archive_path(&doc.root_base);
    let manifest_item = |doc: &EpubDoc<Cursor<Vec<u8>>>, id: &str| -> Option<ManifestItem> {
        let path = doc.resources.get(id).map(|r| r.path.clone())?;
        let href = path.strip_prefix(&doc.root_base).unwrap_or(&path);
        Some(ManifestItem {
            id: id.to_string(),
            href: archive_path(href),
            media_type: doc.get_resource_mime(id).unwrap_or_default(),
        })
    };

    let cover = doc.get_cover_id().and_then(|id| manifest_item(&doc, &id));

    let mut media: Vec<ManifestItem> = doc
        .resources
        .keys()
        .filter_map(|id| manifest_item(&doc, id))
        .filter(|item| item.media_type.starts_with("image/"))
        .filter(|item| cover.as_ref().map(|c| c.id != item.id).unwrap_or(true))
        .collect();
    media.sort_by(|a, b| a.href.cmp(&b.href));

    let toc: Vec<(String, String)> = doc
        .toc
        .iter()
        .map(|nav| (archive_path(&nav.content), nav.label.trim().to_string()))
        .collect();

    let spine: Vec<String> = doc.spine.iter().map(|item| item.idref.clone()).collect();
    let mut chapters = Vec::new();
    for idref in spine {
        if idref == "cover" {
            continue;
        }
        let item = manifest_item(&doc, &idref).ok_or_else(|| {
            PackageError::Malformed(format!("spine references unknown item '{}'", idref))
        })?;
        let (xhtml, _mime) = doc.get_resource_str(&idref).ok_or_else(|| {
            PackageError::Malformed(format!("content unit '{}' is missing", item.href))
        })?;
        let title = toc
            .iter()
            .find(|(href, _)| Path::new(href).ends_with(&item.href))
            .map(|(_, label)| label.clone())
            .or_else(|| {
                HTML_TITLE
                    .captures(&xhtml)
                    .and_then(|c| c.get(1))
                    .map(|m| unescape_html(m.as_str().trim()))
            })
            .unwrap_or_default();
        chapters.push(ArchiveChapter {
            id: item.id,
            href: item.href,
            title,
            xhtml,
        });
    }

    Ok(ArchiveSummary {
        title,
        identifier,
        language,
        root,
        cover,
        chapters,
        media,
        entries,
    })
}

/// Zip entry names by index, which is the order they were written in
fn entry_names(bytes: &[u8]) -> Result<Vec<String>, PackageError> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;
    let names = (0..archive.len())
        .map(|i| archive.by_index_raw(i).map(|f| f.name().to_string()))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(names)
}

fn archive_path(path: &Path) -> String {
    path.to_string_lossy()
        .replace('\\', "/")
        .trim_end_matches('/')
        .to_string()
}
