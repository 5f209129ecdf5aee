//! Job configuration and the validated conversion job
//!
//! [`JobConfig`] is the serde view of a JSON configuration file. It is turned
//! into an immutable [`ConversionJob`] by [`JobConfig::into_job`], which fills
//! in every default so the pipeline never has to look at optional fields.

use super::{PackageMetadata, SourceDocument};
use crate::error::{Result, TexpubError};
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use uuid::Uuid;

/// Archive written when the configuration does not name one
pub const DEFAULT_OUTPUT: &str = "output.epub";

/// Directory for intermediate markup and decision logs in debug mode
pub const DEFAULT_DEBUG_DIR: &str = "texpub-debug";

/// `dcterms:modified` used when neither the config nor `SOURCE_DATE_EPOCH` sets one
const FALLBACK_EPOCH_SECS: i64 = 946_684_800; // 2000-01-01T00:00:00Z

fn default_jobs() -> usize {
    1
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_dpi() -> u32 {
    150
}

/// Job configuration as read from JSON
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobConfig {
    /// Cover image path
    #[serde(default)]
    pub cover: Option<PathBuf>,

    /// Source documents in reading order
    #[serde(default)]
    pub materials: Vec<PathBuf>,

    /// Template handed to the conversion engine
    #[serde(default)]
    pub template: Option<PathBuf>,

    /// Ask the engine to extract media so it can be embedded
    #[serde(default, alias = "extractMedia")]
    pub extract_media: bool,

    /// Persist intermediate markup and a decision log
    #[serde(default)]
    pub debug: bool,

    #[serde(default)]
    pub title: Option<String>,

    #[serde(default)]
    pub language: Option<String>,

    #[serde(default, alias = "authors")]
    pub author: Vec<String>,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub publisher: Option<String>,

    #[serde(default)]
    pub identifier: Option<String>,

    /// Modification date written into the package
    #[serde(default)]
    pub date: Option<DateTime<Utc>>,

    #[serde(default)]
    pub output: Option<PathBuf>,

    #[serde(default, alias = "debugDir")]
    pub debug_dir: Option<PathBuf>,

    /// Number of documents converted concurrently
    #[serde(default = "default_jobs")]
    pub jobs: usize,

    /// Upper bound for a single external engine call
    #[serde(default = "default_timeout_secs", alias = "engineTimeoutSecs")]
    pub engine_timeout_secs: u64,

    /// Rasterization resolution for paged media
    #[serde(default = "default_dpi")]
    pub dpi: u32,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            cover: None,
            materials: Vec::new(),
            template: None,
            extract_media: false,
            debug: false,
            title: None,
            language: None,
            author: Vec::new(),
            description: None,
            publisher: None,
            identifier: None,
            date: None,
            output: None,
            debug_dir: None,
            jobs: default_jobs(),
            engine_timeout_secs: default_timeout_secs(),
            dpi: default_dpi(),
        }
    }
}

impl JobConfig {
    /// Parse a configuration from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| TexpubError::Config(e.to_string()))
    }

    /// Load a configuration file; relative paths inside it are taken
    /// relative to the file's own directory.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_json(&text)
            .map_err(|e| TexpubError::Config(format!("{}: {}", path.display(), e)))?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        Ok(config.rebased(base))
    }

    /// Make every relative path in the config relative to `base`
    pub fn rebased(mut self, base: &Path) -> Self {
        let rebase = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        self.materials.iter_mut().for_each(rebase);
        self.cover.iter_mut().for_each(rebase);
        self.template.iter_mut().for_each(rebase);
        self.output.iter_mut().for_each(rebase);
        self.debug_dir.iter_mut().for_each(rebase);
        self
    }

    /// Validate the configuration and fill in defaults
    pub fn into_job(self, working_dir: impl Into<PathBuf>) -> Result<ConversionJob> {
        let working_dir = working_dir.into();

        if self.materials.is_empty() {
            return Err(TexpubError::Config(
                "no materials specified in the configuration".to_string(),
            ));
        }
        if self.jobs == 0 {
            return Err(TexpubError::Config("jobs must be at least 1".to_string()));
        }
        if self.dpi == 0 {
            return Err(TexpubError::Config("dpi must be positive".to_string()));
        }

        let absolute = |p: &Path| -> PathBuf {
            if p.is_absolute() {
                p.to_path_buf()
            } else {
                working_dir.join(p)
            }
        };

        let documents = self
            .materials
            .iter()
            .enumerate()
            .map(|(i, p)| SourceDocument::new(i, p, absolute(p)))
            .collect::<Vec<_>>();

        let title = self.title.clone().unwrap_or_else(|| {
            documents
                .first()
                .map(|d| d.stem())
                .unwrap_or_else(|| "Untitled".to_string())
        });
        let identifier = self
            .identifier
            .clone()
            .unwrap_or_else(|| derive_identifier(&title, &self.materials));
        let modified = self.date.unwrap_or_else(default_modified);

        let mut metadata = PackageMetadata::new(
            title,
            self.language.clone().unwrap_or_else(|| "en".to_string()),
            identifier,
            modified,
        );
        for author in &self.author {
            metadata = metadata.with_creator(author);
        }
        if let Some(description) = &self.description {
            metadata = metadata.with_description(description);
        }
        if let Some(publisher) = &self.publisher {
            metadata = metadata.with_publisher(publisher);
        }

        Ok(ConversionJob {
            documents,
            cover: self.cover.as_deref().map(absolute),
            template: self.template.as_deref().map(absolute),
            extract_media: self.extract_media,
            debug: self.debug,
            metadata,
            output: absolute(
                self.output
                    .as_deref()
                    .unwrap_or_else(|| Path::new(DEFAULT_OUTPUT)),
            ),
            debug_dir: absolute(
                self.debug_dir
                    .as_deref()
                    .unwrap_or_else(|| Path::new(DEFAULT_DEBUG_DIR)),
            ),
            jobs: self.jobs,
            engine_timeout: Duration::from_secs(self.engine_timeout_secs),
            dpi: self.dpi,
            working_dir,
        })
    }
}

/// Stable identifier for a job: the same title and material list always
/// yield the same `urn:uuid`.
fn derive_identifier(title: &str, materials: &[PathBuf]) -> String {
    let mut name = title.to_string();
    for material in materials {
        name.push('\n');
        name.push_str(&material.to_string_lossy());
    }
    format!("urn:uuid:{}", Uuid::new_v5(&Uuid::NAMESPACE_URL, name.as_bytes()))
}

fn default_modified() -> DateTime<Utc> {
    let secs = std::env::var("SOURCE_DATE_EPOCH")
        .ok()
        .and_then(|v| v.trim().parse::<i64>().ok())
        .unwrap_or(FALLBACK_EPOCH_SECS);
    Utc.timestamp_opt(secs, 0).single().unwrap_or_default()
}

/// A validated, fully resolved unit of work
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionJob {
    /// Source documents in reading order (never empty)
    pub documents: Vec<SourceDocument>,

    /// Absolute cover image path
    pub cover: Option<PathBuf>,

    /// Absolute template path
    pub template: Option<PathBuf>,

    pub extract_media: bool,

    pub debug: bool,

    pub metadata: PackageMetadata,

    /// Absolute path of the archive to write
    pub output: PathBuf,

    /// Where diagnostics go when `debug` is set
    pub debug_dir: PathBuf,

    /// Fallback directory for media resolution
    pub working_dir: PathBuf,

    pub jobs: usize,

    pub engine_timeout: Duration,

    pub dpi: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_camel_case_fields() {
        let config = JobConfig::from_json(
            r#"{
                "cover": "cover.jpg",
                "materials": ["a.tex", "b.tex"],
                "template": "tpl.html",
                "extractMedia": true
            }"#,
        )
        .unwrap();

        assert_eq!(config.cover, Some(PathBuf::from("cover.jpg")));
        assert_eq!(config.materials.len(), 2);
        assert!(config.extract_media);
        assert!(!config.debug);
        assert_eq!(config.jobs, 1);
        assert_eq!(config.dpi, 150);
    }

    #[test]
    fn test_optional_metadata_carried_into_job() {
        let config = JobConfig::from_json(
            r#"{
                "materials": ["a.tex"],
                "description": "Lecture notes, winter term",
                "publisher": "Faculty Press"
            }"#,
        )
        .unwrap();
        let job = config.into_job("/work").unwrap();

        assert_eq!(
            job.metadata.description.as_deref(),
            Some("Lecture notes, winter term")
        );
        assert_eq!(job.metadata.publisher.as_deref(), Some("Faculty Press"));
    }

    #[test]
    fn test_empty_materials_rejected() {
        let err = JobConfig::default().into_job("/work").unwrap_err();
        assert!(matches!(err, TexpubError::Config(_)));
    }

    #[test]
    fn test_zero_jobs_rejected() {
        let config = JobConfig {
            materials: vec!["a.tex".into()],
            jobs: 0,
            ..Default::default()
        };
        assert!(config.into_job("/work").is_err());
    }

    #[test]
    fn test_defaults_derived_from_job() {
        let config = JobConfig {
            materials: vec!["intro.tex".into(), "/abs/body.tex".into()],
            date: Some(Utc.with_ymd_and_hms(2020, 1, 2, 3, 4, 5).unwrap()),
            ..Default::default()
        };
        let job = config.into_job("/work").unwrap();

        assert_eq!(job.metadata.title, "intro");
        assert_eq!(job.metadata.language, "en");
        assert!(job.metadata.identifier.starts_with("urn:uuid:"));
        assert_eq!(job.documents[0].absolute, PathBuf::from("/work/intro.tex"));
        assert_eq!(job.documents[1].absolute, PathBuf::from("/abs/body.tex"));
        assert_eq!(job.documents[1].position, 1);
        assert_eq!(job.output, PathBuf::from("/work/output.epub"));
    }

    #[test]
    fn test_identifier_is_stable() {
        let make = || JobConfig {
            materials: vec!["a.tex".into(), "b.tex".into()],
            ..Default::default()
        };
        let first = make().into_job("/w").unwrap();
        let second = make().into_job("/w").unwrap();
        assert_eq!(first.metadata.identifier, second.metadata.identifier);

        let reordered = JobConfig {
            materials: vec!["b.tex".into(), "a.tex".into()],
            ..Default::default()
        }
        .into_job("/w")
        .unwrap();
        assert_ne!(first.metadata.identifier, reordered.metadata.identifier);
    }

    #[test]
    fn test_rebase_relative_paths() {
        let config = JobConfig {
            materials: vec!["a.tex".into(), "/abs/b.tex".into()],
            cover: Some("img/cover.jpg".into()),
            ..Default::default()
        }
        .rebased(Path::new("/cfg"));

        assert_eq!(config.materials[0], PathBuf::from("/cfg/a.tex"));
        assert_eq!(config.materials[1], PathBuf::from("/abs/b.tex"));
        assert_eq!(config.cover, Some(PathBuf::from("/cfg/img/cover.jpg")));
    }
}
