//! EPUB 3 container writer (with an NCX for EPUB 2 reading systems)
//!
//! Every entry is written with the same fixed timestamp, so the same
//! package contents always produce the same bytes.

use super::markup::{escape_html, xhtml_document};
use super::{CoverAsset, MediaRegistry, PackagedDocument};
use crate::error::PackageError;
use crate::types::PackageMetadata;
use std::io::{Cursor, Write};
use zip::write::FileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

pub(crate) const OPF_PATH: &str = "OEBPS/content.opf";
const COVER_PAGE: &str = "cover.xhtml";

const CONTAINER_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>"#;

/// Everything that goes into one archive, in reading order
pub(crate) struct PackageContents<'a> {
    pub metadata: &'a PackageMetadata,
    pub cover: Option<&'a CoverAsset>,
    pub documents: Vec<&'a PackagedDocument>,
    pub media: &'a MediaRegistry,
}

/// Write the archive into memory
pub(crate) fn write_epub(contents: &PackageContents<'_>) -> Result<Vec<u8>, PackageError> {
    let stored = FileOptions::default()
        .compression_method(CompressionMethod::Stored)
        .last_modified_time(DateTime::default());
    let deflated = FileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(DateTime::default());

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));

    // mimetype must be first and uncompressed
    zip.start_file("mimetype", stored)?;
    zip.write_all(b"application/epub+zip")?;

    zip.start_file("META-INF/container.xml", deflated)?;
    zip.write_all(CONTAINER_XML.as_bytes())?;

    zip.start_file(OPF_PATH, deflated)?;
    zip.write_all(generate_opf(contents).as_bytes())?;

    zip.start_file("OEBPS/nav.xhtml", deflated)?;
    zip.write_all(generate_nav(contents).as_bytes())?;

    zip.start_file("OEBPS/toc.ncx", deflated)?;
    zip.write_all(generate_ncx(contents).as_bytes())?;

    if let Some(cover) = contents.cover {
        let data = cover
            .data
            .as_bytes()
            .map_err(|source| PackageError::MediaUnreadable {
                path: cover.source.clone(),
                source,
            })?;
        zip.start_file(format!("OEBPS/{}", cover.href), stored)?;
        zip.write_all(&data)?;

        let page = xhtml_document(
            &contents.metadata.title,
            &contents.metadata.language,
            &format!(
                "<div class=\"cover\"><img src=\"{}\" alt=\"Cover\" /></div>",
                escape_html(&cover.href)
            ),
        );
        zip.start_file(format!("OEBPS/{}", COVER_PAGE), deflated)?;
        zip.write_all(page.as_bytes())?;
    }

    for document in &contents.documents {
        zip.start_file(format!("OEBPS/{}", document.href), deflated)?;
        zip.write_all(document.xhtml.as_bytes())?;
    }

    // Images are already compressed
    for asset in contents.media.iter() {
        let data = asset
            .data
            .as_bytes()
            .map_err(|source| PackageError::MediaUnreadable {
                path: asset.source.clone(),
                source,
            })?;
        zip.start_file(format!("OEBPS/{}", asset.href), stored)?;
        zip.write_all(&data)?;
    }

    let cursor = zip.finish()?;
    Ok(cursor.into_inner())
}

fn generate_opf(contents: &PackageContents<'_>) -> String {
    let metadata = contents.metadata;
    let mut opf = String::from(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="3.0" unique-identifier="BookId">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
"#,
    );

    opf.push_str(&format!(
        "    <dc:identifier id=\"BookId\">{}</dc:identifier>\n",
        escape_html(&metadata.identifier)
    ));
    opf.push_str(&format!(
        "    <dc:title>{}</dc:title>\n",
        escape_html(&metadata.title)
    ));
    opf.push_str(&format!(
        "    <dc:language>{}</dc:language>\n",
        escape_html(&metadata.language)
    ));
    for creator in &metadata.creator {
        opf.push_str(&format!(
            "    <dc:creator>{}</dc:creator>\n",
            escape_html(creator)
        ));
    }
    if let Some(publisher) = &metadata.publisher {
        opf.push_str(&format!(
            "    <dc:publisher>{}</dc:publisher>\n",
            escape_html(publisher)
        ));
    }
    if let Some(description) = &metadata.description {
        opf.push_str(&format!(
            "    <dc:description>{}</dc:description>\n",
            escape_html(description)
        ));
    }
    opf.push_str(&format!(
        "    <meta property=\"dcterms:modified\">{}</meta>\n",
        metadata.modified_stamp()
    ));
    if contents.cover.is_some() {
        opf.push_str("    <meta name=\"cover\" content=\"cover-image\"/>\n");
    }

    opf.push_str("  </metadata>\n  <manifest>\n");
    opf.push_str(
        "    <item id=\"nav\" href=\"nav.xhtml\" media-type=\"application/xhtml+xml\" properties=\"nav\"/>\n",
    );
    opf.push_str(
        "    <item id=\"ncx\" href=\"toc.ncx\" media-type=\"application/x-dtbncx+xml\"/>\n",
    );

    if let Some(cover) = contents.cover {
        opf.push_str(&format!(
            "    <item id=\"cover-image\" href=\"{}\" media-type=\"{}\" properties=\"cover-image\"/>\n",
            escape_html(&cover.href),
            escape_html(&cover.media_type)
        ));
        opf.push_str(&format!(
            "    <item id=\"cover\" href=\"{}\" media-type=\"application/xhtml+xml\"/>\n",
            COVER_PAGE
        ));
    }
    for document in &contents.documents {
        opf.push_str(&format!(
            "    <item id=\"{}\" href=\"{}\" media-type=\"application/xhtml+xml\"/>\n",
            document.id,
            escape_html(&document.href)
        ));
    }
    for asset in contents.media.iter() {
        opf.push_str(&format!(
            "    <item id=\"{}\" href=\"{}\" media-type=\"{}\"/>\n",
            asset.id,
            escape_html(&asset.href),
            escape_html(&asset.media_type)
        ));
    }

    opf.push_str("  </manifest>\n  <spine toc=\"ncx\">\n");
    if contents.cover.is_some() {
        opf.push_str("    <itemref idref=\"cover\"/>\n");
    }
    for document in &contents.documents {
        opf.push_str(&format!("    <itemref idref=\"{}\"/>\n", document.id));
    }
    opf.push_str("  </spine>\n</package>\n");
    opf
}

fn generate_nav(contents: &PackageContents<'_>) -> String {
    let mut items = String::new();
    for document in &contents.documents {
        items.push_str(&format!(
            "      <li><a href=\"{}\">{}</a></li>\n",
            escape_html(&document.href),
            escape_html(&document.title)
        ));
    }

    let body = format!(
        "<nav epub:type=\"toc\" id=\"toc\">\n    <h1>Table of Contents</h1>\n    <ol>\n{}    </ol>\n</nav>",
        items
    );
    xhtml_document("Table of Contents", &contents.metadata.language, &body)
}

fn generate_ncx(contents: &PackageContents<'_>) -> String {
    let mut ncx = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<ncx xmlns="http://www.daisy.org/z3986/2005/ncx/" version="2005-1">
  <head>
    <meta name="dtb:uid" content="{}"/>
    <meta name="dtb:depth" content="1"/>
    <meta name="dtb:totalPageCount" content="0"/>
    <meta name="dtb:maxPageNumber" content="0"/>
  </head>
  <docTitle>
    <text>{}</text>
  </docTitle>
  <navMap>
"#,
        escape_html(&contents.metadata.identifier),
        escape_html(&contents.metadata.title)
    );

    for (i, document) in contents.documents.iter().enumerate() {
        let order = i + 1;
        ncx.push_str(&format!(
            "    <navPoint id=\"navpoint-{order}\" playOrder=\"{order}\">\n      <navLabel>\n        <text>{}</text>\n      </navLabel>\n      <content src=\"{}\"/>\n    </navPoint>\n",
            escape_html(&document.title),
            escape_html(&document.href)
        ));
    }

    ncx.push_str("  </navMap>\n</ncx>\n");
    ncx
}
