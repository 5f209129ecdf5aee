//! Markup helpers: media reference scanning, reference rewriting and the
//! XHTML wrapper every content unit is packaged in

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::collections::HashMap;

/// `<img ...>` and `<embed ...>` elements
static MEDIA_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<(img|embed)\b[^>]*>").expect("valid regex"));

static SRC_ATTR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)\bsrc\s*=\s*(?:"([^"]*)"|'([^']*)')"#).expect("valid regex")
});

static ALT_ATTR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)\balt\s*=\s*(?:"([^"]*)"|'([^']*)')"#).expect("valid regex")
});

static BODY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<body\b[^>]*>(.*)</body\s*>").expect("valid regex"));

static HEADING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<h[1-3]\b[^>]*>(.*?)</h[1-3]\s*>").expect("valid regex"));

static TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<[^>]*>").expect("valid regex"));

/// Value of an attribute inside a single tag, unescaped
fn attr(tag: &str, pattern: &Regex) -> Option<String> {
    let caps = pattern.captures(tag)?;
    caps.get(1)
        .or_else(|| caps.get(2))
        .map(|m| unescape_html(m.as_str()))
}

/// Media references (`src` of `<img>`/`<embed>`) in document order, without duplicates
pub fn media_references(markup: &str) -> Vec<String> {
    let mut refs: Vec<String> = Vec::new();
    for tag in MEDIA_TAG.find_iter(markup) {
        if let Some(src) = attr(tag.as_str(), &SRC_ATTR) {
            if !src.is_empty() && !refs.contains(&src) {
                refs.push(src);
            }
        }
    }
    refs
}

/// Point media elements at their packaged files.
///
/// `replacements` maps a reference to the archive-relative hrefs it now
/// stands for. An `<img>` with one target keeps its other attributes; any
/// element with several targets (a rasterized paged document) or an
/// `<embed>` becomes one `<img>` per target, in order. Elements whose
/// reference is not in the map are left untouched.
pub fn rewrite_media(markup: &str, replacements: &HashMap<String, Vec<String>>) -> String {
    MEDIA_TAG
        .replace_all(markup, |caps: &Captures| {
            let tag = &caps[0];
            let element = caps[1].to_ascii_lowercase();
            let targets = match attr(tag, &SRC_ATTR).and_then(|src| replacements.get(&src)) {
                Some(targets) if !targets.is_empty() => targets,
                _ => return tag.to_string(),
            };

            if element == "img" && targets.len() == 1 {
                let src = format!("src=\"{}\"", escape_html(&targets[0]));
                return SRC_ATTR
                    .replace(tag, |_: &Captures| src.clone())
                    .into_owned();
            }

            let alt = attr(tag, &ALT_ATTR).unwrap_or_default();
            targets
                .iter()
                .enumerate()
                .map(|(i, href)| {
                    let page_alt = if targets.len() > 1 {
                        format!("{} (page {})", alt, i + 1).trim_start().to_string()
                    } else {
                        alt.clone()
                    };
                    format!(
                        "<img src=\"{}\" alt=\"{}\" />",
                        escape_html(href),
                        escape_html(&page_alt)
                    )
                })
                .collect::<Vec<_>>()
                .join("\n")
        })
        .into_owned()
}

/// Inner `<body>` of a standalone document, or the markup itself for a fragment
pub fn body_fragment(markup: &str) -> &str {
    BODY.captures(markup)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .unwrap_or(markup)
}

/// Plain text of the first `<h1>`–`<h3>`, used as the content unit title
pub fn first_heading(markup: &str) -> Option<String> {
    let inner = HEADING.captures(markup)?.get(1)?.as_str();
    let text = unescape_html(&TAG.replace_all(inner, ""));
    let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Generate the XHTML document for a content unit
pub fn xhtml_document(title: &str, language: &str, body: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE html>
<html xmlns="http://www.w3.org/1999/xhtml" xmlns:epub="http://www.idpf.org/2007/ops" lang="{lang}" xml:lang="{lang}">
<head>
    <title>{title}</title>
    <meta charset="UTF-8"/>
</head>
<body>
{body}
</body>
</html>"#,
        lang = escape_html(language),
        title = escape_html(title),
        body = body.trim(),
    )
}

/// Escape HTML special characters
pub fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

/// Reverse of [`escape_html`] for the entities markup writers commonly emit
pub fn unescape_html(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}
