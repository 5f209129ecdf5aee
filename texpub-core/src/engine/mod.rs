//! Capability interfaces for the external engines
//!
//! The pipeline only ever talks to a [`ConversionEngine`] and a
//! [`RasterEngine`]. Process-backed implementations for pandoc and pdftoppm
//! live here; tests substitute their own.

mod pandoc;
mod pdftoppm;
mod process;

pub use pandoc::PandocEngine;
pub use pdftoppm::PdftoppmEngine;

use crate::error::{ConversionFailure, RasterizationFailure};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// One call into a conversion engine
#[derive(Debug, Clone, Copy)]
pub struct EngineRequest<'a> {
    /// Absolute path of the source document
    pub input: &'a Path,

    /// Template the engine should render with
    pub template: Option<&'a Path>,

    /// Directory to extract media into; `None` disables extraction
    pub media_dir: Option<&'a Path>,

    pub timeout: Duration,
}

/// Converts a source document into normalized markup (an HTML fragment)
#[async_trait]
pub trait ConversionEngine: Send + Sync {
    /// Engine name used in errors and logs
    fn name(&self) -> &str;

    /// Convert one document, returning the markup text
    async fn convert(&self, request: EngineRequest<'_>) -> Result<String, ConversionFailure>;
}

/// Raster image format produced for paged media
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RasterFormat {
    #[default]
    Png,
    Jpeg,
}

impl RasterFormat {
    /// File extension for this format
    pub fn extension(&self) -> &'static str {
        match self {
            RasterFormat::Png => "png",
            RasterFormat::Jpeg => "jpg",
        }
    }

}

impl FromStr for RasterFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "png" => Ok(RasterFormat::Png),
            "jpg" | "jpeg" => Ok(RasterFormat::Jpeg),
            other => Err(format!(
                "unsupported page format '{}' (expected png or jpeg)",
                other
            )),
        }
    }
}

/// One call into a rasterization engine
#[derive(Debug, Clone, Copy)]
pub struct RasterRequest<'a> {
    /// The paged document
    pub input: &'a Path,

    /// Empty directory the engine writes page images into
    pub out_dir: &'a Path,

    pub format: RasterFormat,

    pub dpi: u32,

    pub timeout: Duration,
}

/// Renders every page of a paged document to an image file
#[async_trait]
pub trait RasterEngine: Send + Sync {
    /// Engine name used in errors and logs
    fn name(&self) -> &str;

    /// Render all pages, returning the written files in page order
    async fn rasterize(&self, request: RasterRequest<'_>)
        -> Result<Vec<PathBuf>, RasterizationFailure>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raster_format_from_str() {
        assert_eq!("png".parse::<RasterFormat>(), Ok(RasterFormat::Png));
        assert_eq!("JPEG".parse::<RasterFormat>(), Ok(RasterFormat::Jpeg));
        assert_eq!("jpg".parse::<RasterFormat>(), Ok(RasterFormat::Jpeg));
        assert!("tiff".parse::<RasterFormat>().unwrap_err().contains("tiff"));
    }
}
