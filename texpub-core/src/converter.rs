//! Document converter: one source document in, normalized markup and its
//! media references out

use crate::engine::{ConversionEngine, EngineRequest};
use crate::error::ConversionFailure;
use crate::package::markup;
use crate::types::{ConversionResult, SourceDocument};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Per-job settings passed along with every document
#[derive(Debug, Clone, Copy)]
pub struct ConvertOptions<'a> {
    /// Template the engine renders with
    pub template: Option<&'a Path>,

    /// Whether the engine extracts media so it can be embedded
    pub extract_media: bool,

    /// Job-scoped directory extracted media is written into
    pub media_dir: &'a Path,

    /// Upper bound for the engine call
    pub timeout: Duration,
}

/// Wraps a [`ConversionEngine`] with the checks and media bookkeeping that
/// hold regardless of which engine is used.
#[derive(Clone)]
pub struct DocumentConverter {
    engine: Arc<dyn ConversionEngine>,
}

impl DocumentConverter {
    pub fn new(engine: Arc<dyn ConversionEngine>) -> Self {
        Self { engine }
    }

    pub fn engine_name(&self) -> &str {
        self.engine.name()
    }

    /// Convert a single document.
    ///
    /// With extraction disabled the result never carries media references,
    /// even when the markup contains images: those images are simply not
    /// embedded. This is not a failure.
    pub async fn convert(
        &self,
        document: &SourceDocument,
        options: &ConvertOptions<'_>,
    ) -> Result<ConversionResult, ConversionFailure> {
        if !document.absolute.is_file() {
            return Err(ConversionFailure::DocumentNotFound {
                path: document.absolute.clone(),
            });
        }
        if let Some(template) = options.template {
            if !template.is_file() {
                return Err(ConversionFailure::TemplateNotFound {
                    path: template.to_path_buf(),
                });
            }
        }

        let media_dir = if options.extract_media {
            tokio::fs::create_dir_all(options.media_dir)
                .await
                .map_err(|source| ConversionFailure::Io {
                    path: options.media_dir.to_path_buf(),
                    source,
                })?;
            Some(options.media_dir)
        } else {
            None
        };

        let markup = self
            .engine
            .convert(EngineRequest {
                input: &document.absolute,
                template: options.template,
                media_dir,
                timeout: options.timeout,
            })
            .await?;

        if markup.trim().is_empty() {
            return Err(ConversionFailure::EmptyOutput {
                engine: self.engine.name().to_string(),
                path: document.absolute.clone(),
            });
        }

        let media = if options.extract_media {
            markup::media_references(&markup)
        } else {
            Vec::new()
        };

        tracing::info!(
            "Converted {} ({} bytes of markup, {} media references)",
            document.path.display(),
            markup.len(),
            media.len()
        );

        Ok(ConversionResult::new(document.clone(), markup, media))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Returns fixed markup and remembers whether a media dir was requested
    struct StaticEngine {
        markup: String,
        saw_media_dir: Mutex<Option<bool>>,
    }

    #[async_trait]
    impl ConversionEngine for StaticEngine {
        fn name(&self) -> &str {
            "static"
        }

        async fn convert(&self, request: EngineRequest<'_>) -> Result<String, ConversionFailure> {
            *self.saw_media_dir.lock().unwrap() = Some(request.media_dir.is_some());
            Ok(self.markup.clone())
        }
    }

    fn engine(markup: &str) -> Arc<StaticEngine> {
        Arc::new(StaticEngine {
            markup: markup.to_string(),
            saw_media_dir: Mutex::new(None),
        })
    }

    fn setup() -> (TempDir, SourceDocument) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.tex");
        std::fs::write(&path, "\\section{A}").unwrap();
        let doc = SourceDocument::new(0, "a.tex", &path);
        (dir, doc)
    }

    fn options(dir: &Path, extract_media: bool) -> ConvertOptions<'_> {
        ConvertOptions {
            template: None,
            extract_media,
            media_dir: dir,
            timeout: Duration::from_secs(5),
        }
    }

    #[tokio::test]
    async fn test_extraction_collects_references() {
        let (dir, doc) = setup();
        let media_dir = dir.path().join("media");
        let engine = engine(r#"<img src="fig1.png" /><img src="fig1.png" />"#);
        let converter = DocumentConverter::new(engine.clone());

        let result = converter
            .convert(&doc, &options(&media_dir, true))
            .await
            .unwrap();

        assert_eq!(result.media, vec!["fig1.png"]);
        assert_eq!(*engine.saw_media_dir.lock().unwrap(), Some(true));
        assert!(media_dir.is_dir());
    }

    #[tokio::test]
    async fn test_no_extraction_means_no_media() {
        let (dir, doc) = setup();
        let engine = engine(r#"<img src="fig1.png" />"#);
        let converter = DocumentConverter::new(engine.clone());

        let result = converter
            .convert(&doc, &options(dir.path(), false))
            .await
            .unwrap();

        assert!(result.media.is_empty());
        assert!(result.markup.contains("fig1.png"));
        assert_eq!(*engine.saw_media_dir.lock().unwrap(), Some(false));
    }

    #[tokio::test]
    async fn test_empty_output_is_a_failure() {
        let (dir, doc) = setup();
        let converter = DocumentConverter::new(engine("  \n"));
        let err = converter
            .convert(&doc, &options(dir.path(), false))
            .await
            .unwrap_err();
        assert!(matches!(err, ConversionFailure::EmptyOutput { .. }));
    }

    #[tokio::test]
    async fn test_missing_template_is_a_failure() {
        let (dir, doc) = setup();
        let converter = DocumentConverter::new(engine("<p>x</p>"));
        let template = dir.path().join("missing.html");
        let opts = ConvertOptions {
            template: Some(&template),
            ..options(dir.path(), false)
        };
        let err = converter.convert(&doc, &opts).await.unwrap_err();
        assert!(matches!(err, ConversionFailure::TemplateNotFound { .. }));
    }

    #[tokio::test]
    async fn test_missing_document_is_a_failure() {
        let dir = TempDir::new().unwrap();
        let doc = SourceDocument::new(0, "gone.tex", dir.path().join("gone.tex"));
        let converter = DocumentConverter::new(engine("<p>x</p>"));
        let err = converter
            .convert(&doc, &options(dir.path(), false))
            .await
            .unwrap_err();
        assert!(matches!(err, ConversionFailure::DocumentNotFound { .. }));
    }
}
