//! Final status of a job

use crate::error::{Result, TexpubError};
use crate::types::SourceDocument;
use serde::Serialize;
use std::path::PathBuf;

/// A document that could not be converted
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DocumentFailure {
    pub position: usize,
    pub path: PathBuf,
    pub error: String,
}

/// A media reference left out of the package
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DroppedAsset {
    /// Document whose markup carried the reference
    pub document: PathBuf,
    pub reference: String,
    pub reason: String,
}

/// Counts and details of what a job did
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct JobReport {
    /// Documents packaged, in reading order
    pub succeeded: Vec<PathBuf>,
    pub failed: Vec<DocumentFailure>,
    pub dropped_assets: Vec<DroppedAsset>,

    /// Distinct media assets embedded (the cover excluded)
    pub media_assets: usize,

    pub cover: Option<PathBuf>,

    /// Where the archive was written, once it has been
    pub output: Option<PathBuf>,
}

impl JobReport {
    pub(crate) fn record_success(&mut self, document: &SourceDocument) {
        self.succeeded.push(document.path.clone());
    }

    pub(crate) fn record_failure(&mut self, document: &SourceDocument, error: impl ToString) {
        self.failed.push(DocumentFailure {
            position: document.position,
            path: document.path.clone(),
            error: error.to_string(),
        });
    }

    pub(crate) fn record_dropped(
        &mut self,
        document: &SourceDocument,
        reference: &str,
        reason: impl ToString,
    ) {
        self.dropped_assets.push(DroppedAsset {
            document: document.path.clone(),
            reference: reference.to_string(),
            reason: reason.to_string(),
        });
    }

    /// True when every document was packaged
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    /// Turn document failures into an error. The archive has already been
    /// produced at this point; this only decides the exit status.
    pub fn ensure_complete(&self) -> Result<()> {
        if self.is_complete() {
            Ok(())
        } else {
            Err(TexpubError::PartialFailure {
                succeeded: self.succeeded.len(),
                failed: self.failed.len(),
            })
        }
    }

    /// One line suitable for a terminal
    pub fn summary(&self) -> String {
        let mut line = format!(
            "{} of {} documents packaged, {} media assets",
            self.succeeded.len(),
            self.succeeded.len() + self.failed.len(),
            self.media_assets
        );
        if !self.dropped_assets.is_empty() {
            line.push_str(&format!(", {} dropped", self.dropped_assets.len()));
        }
        if let Some(output) = &self.output {
            line.push_str(&format!(" -> {}", output.display()));
        }
        line
    }
}
