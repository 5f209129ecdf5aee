//! Package metadata (Dublin Core subset written into the OPF)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Metadata for the generated package
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PackageMetadata {
    /// Book title
    pub title: String,

    /// Authors/creators
    pub creator: Vec<String>,

    /// Book description/summary
    pub description: Option<String>,

    /// Publisher name
    pub publisher: Option<String>,

    /// Language code (BCP 47, e.g. "en")
    pub language: String,

    /// Unique identifier written as `dc:identifier`
    pub identifier: String,

    /// Value of `dcterms:modified`
    pub modified: DateTime<Utc>,
}

impl PackageMetadata {
    /// Create new metadata with required fields
    pub fn new(
        title: impl Into<String>,
        language: impl Into<String>,
        identifier: impl Into<String>,
        modified: DateTime<Utc>,
    ) -> Self {
        Self {
            title: title.into(),
            creator: Vec::new(),
            description: None,
            publisher: None,
            language: language.into(),
            identifier: identifier.into(),
            modified,
        }
    }

    /// Add an author/creator
    pub fn with_creator(mut self, creator: impl Into<String>) -> Self {
        self.creator.push(creator.into());
        self
    }

    /// Set description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set publisher
    pub fn with_publisher(mut self, publisher: impl Into<String>) -> Self {
        self.publisher = Some(publisher.into());
        self
    }

    /// `dcterms:modified` in the CCYY-MM-DDThh:mm:ssZ form EPUB requires
    pub fn modified_stamp(&self) -> String {
        self.modified.format("%Y-%m-%dT%H:%M:%SZ").to_string()
    }
}
