//! Asset resolver: media reference -> absolute file on disk

use crate::error::ResolveError;
use crate::types::MediaKind;
use percent_encoding::percent_decode_str;
use std::path::{Path, PathBuf};

/// Extensions tried, in order, for references written without one
/// (`\includegraphics{fig}`), mirroring graphicx's lookup
const IMPLICIT_EXTENSIONS: &[&str] = &["pdf", "png", "jpg", "jpeg"];

/// Resolves references against the owning document's directory first and
/// the job's working directory second.
#[derive(Debug, Clone)]
pub struct AssetResolver {
    working_dir: PathBuf,
}

impl AssetResolver {
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: working_dir.into(),
        }
    }

    /// Resolve `reference` to a canonical absolute path.
    ///
    /// Two references naming the same file (through different relative paths,
    /// `..` segments or symlinks) resolve to the same path.
    pub fn resolve(&self, reference: &str, base_dir: &Path) -> Result<PathBuf, ResolveError> {
        let lowered = reference.to_ascii_lowercase();
        let remote = lowered.contains("://") && !lowered.starts_with("file://");
        if remote || lowered.starts_with("data:") {
            return Err(ResolveError::Unsupported {
                reference: reference.to_string(),
                reason: "remote or inline media is not embedded".to_string(),
            });
        }

        let cleaned = reference.strip_prefix("file://").unwrap_or(reference);
        let cleaned = cleaned.split(['#', '?']).next().unwrap_or(cleaned);
        let decoded = percent_decode_str(cleaned).decode_utf8_lossy().into_owned();
        let relative = Path::new(&decoded);

        let found = self
            .candidates(relative, base_dir)
            .into_iter()
            .find(|p| p.is_file())
            .ok_or_else(|| ResolveError::NotFound {
                reference: reference.to_string(),
            })?;

        let canonical = std::fs::canonicalize(&found).map_err(|_| ResolveError::NotFound {
            reference: reference.to_string(),
        })?;

        if MediaKind::of(&canonical).is_none() {
            return Err(ResolveError::Unsupported {
                reference: reference.to_string(),
                reason: "not an embeddable image or PDF".to_string(),
            });
        }
        Ok(canonical)
    }

    /// Paths to try, in priority order
    fn candidates(&self, relative: &Path, base_dir: &Path) -> Vec<PathBuf> {
        let roots: Vec<PathBuf> = if relative.is_absolute() {
            vec![relative.to_path_buf()]
        } else {
            vec![base_dir.join(relative), self.working_dir.join(relative)]
        };

        let mut out = Vec::new();
        for root in roots {
            if root.extension().is_none() {
                for ext in IMPLICIT_EXTENSIONS {
                    out.push(root.with_extension(ext));
                }
            }
            out.push(root);
        }
        out
    }
}
