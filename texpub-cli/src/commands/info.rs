//! Info command implementation

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;
use texpub_core::package::inspect_archive;

/// Book info output
#[derive(Serialize)]
struct BookInfo {
    title: String,
    identifier: String,
    language: String,
    cover: Option<String>,
    chapters: Vec<ChapterInfo>,
    media: Vec<String>,
}

#[derive(Serialize)]
struct ChapterInfo {
    title: String,
    href: String,
}

/// Display information about a built EPUB
pub fn info(input: &Path, json: bool) -> Result<()> {
    let bytes = std::fs::read(input)
        .with_context(|| format!("Failed to open input file: {}", input.display()))?;
    let summary = inspect_archive(&bytes)
        .with_context(|| format!("Failed to read {}", input.display()))?;

    let info = BookInfo {
        title: summary.title,
        identifier: summary.identifier,
        language: summary.language,
        cover: summary.cover.map(|c| c.href),
        chapters: summary
            .chapters
            .into_iter()
            .map(|c| ChapterInfo {
                title: c.title,
                href: c.href,
            })
            .collect(),
        media: summary.media.into_iter().map(|m| m.href).collect(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&info)?);
    } else {
        println!("Title:       {}", info.title);
        println!("Identifier:  {}", info.identifier);
        println!("Language:    {}", info.language);
        if let Some(cover) = &info.cover {
            println!("Cover:       {}", cover);
        }
        println!("Chapters:    {}", info.chapters.len());
        for (i, chapter) in info.chapters.iter().enumerate() {
            println!("  {:>3}. {} ({})", i + 1, chapter.title, chapter.href);
        }
        println!("Media:       {}", info.media.len());
    }

    Ok(())
}
