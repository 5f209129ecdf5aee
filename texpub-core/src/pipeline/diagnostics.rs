//! Debug output: intermediate markup and a JSON-lines decision log
//!
//! Diagnostics only observe. Failing to write them is logged and otherwise
//! ignored, and nothing written here is ever read back by the pipeline.

use crate::types::SourceDocument;
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

pub const DECISION_LOG: &str = "decisions.jsonl";

/// One record of the decision log
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Decision {
    Cover {
        path: PathBuf,
    },
    Converted {
        position: usize,
        document: PathBuf,
        engine: String,
        markup_bytes: usize,
        media: Vec<String>,
    },
    ConversionFailed {
        position: usize,
        document: PathBuf,
        error: String,
    },
    Resolved {
        document: PathBuf,
        reference: String,
        path: PathBuf,
    },
    Rasterized {
        source: PathBuf,
        pages: usize,
    },
    Dropped {
        document: PathBuf,
        reference: String,
        reason: String,
    },
    Packaged {
        position: usize,
        id: String,
        href: String,
        title: String,
        media: Vec<String>,
    },
}

/// Sink for debug output; a disabled sink accepts everything and writes nothing
#[derive(Debug, Default)]
pub struct Diagnostics {
    dir: Option<PathBuf>,
    log: Option<BufWriter<File>>,
}

impl Diagnostics {
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Start a fresh decision log in `dir`
    pub fn create(dir: &Path) -> std::io::Result<Self> {
        std::fs::create_dir_all(dir)?;
        let log = File::create(dir.join(DECISION_LOG))?;
        Ok(Self {
            dir: Some(dir.to_path_buf()),
            log: Some(BufWriter::new(log)),
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.dir.is_some()
    }

    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }

    pub fn record(&mut self, decision: &Decision) {
        let Some(log) = self.log.as_mut() else {
            return;
        };
        let written = serde_json::to_writer(&mut *log, decision)
            .map_err(std::io::Error::from)
            .and_then(|_| log.write_all(b"\n"));
        if let Err(e) = written {
            tracing::warn!("Failed to write decision log: {}", e);
        }
    }

    /// Persist a document's markup as `NNN-<stem>.html`
    pub fn markup(&self, document: &SourceDocument, markup: &str) {
        let Some(dir) = &self.dir else {
            return;
        };
        let path = dir.join(format!("{:03}-{}.html", document.position + 1, document.stem()));
        match std::fs::write(&path, markup) {
            Ok(()) => tracing::debug!("Wrote intermediate markup to {}", path.display()),
            Err(e) => tracing::warn!("Failed to write {}: {}", path.display(), e),
        }
    }

    pub fn flush(&mut self) {
        if let Some(log) = self.log.as_mut() {
            if let Err(e) = log.flush() {
                tracing::warn!("Failed to flush decision log: {}", e);
            }
        }
    }
}

impl Drop for Diagnostics {
    fn drop(&mut self) {
        self.flush();
    }
}
