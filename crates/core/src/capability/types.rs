//! Types for converter capabilities.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;

use crate::artifact::Artifact;
use crate::format::DocumentFormat;
use crate::pool::PoolWorker;

use super::error::CapabilityError;

/// Identifier of one concrete conversion strategy.
///
/// The set is closed and enumerated here; the format registry selects
/// among these, never by runtime type inspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapabilityId {
    /// Pooled office engine (LibreOffice headless).
    OfficeEngine,
    /// PDF-to-Word library CLI.
    PdfConvert,
    /// PDF page rasterizer (pdftoppm).
    PdfRender,
    /// ImageMagick.
    ImageMagick,
    /// Pandoc markup converter.
    Pandoc,
    /// Document-to-image via a PDF intermediate.
    DocumentRender,
}

impl CapabilityId {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OfficeEngine => "office_engine",
            Self::PdfConvert => "pdf_convert",
            Self::PdfRender => "pdf_render",
            Self::ImageMagick => "imagemagick",
            Self::Pandoc => "pandoc",
            Self::DocumentRender => "document_render",
        }
    }
}

impl std::fmt::Display for CapabilityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output quality for renders and lossy image targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Quality {
    High,
    Medium,
    Low,
}

impl Quality {
    /// Render resolution in DPI.
    pub fn dpi(&self) -> u32 {
        match self {
            Self::High => 300,
            Self::Medium => 150,
            Self::Low => 96,
        }
    }

    /// JPEG/WebP quality percentage.
    pub fn percent(&self) -> u32 {
        match self {
            Self::High => 92,
            Self::Medium => 80,
            Self::Low => 60,
        }
    }
}

/// Per-request conversion options.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversionOptions {
    /// Output quality for image targets.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality: Option<Quality>,
    /// Page range like "1-5" or "3" (PDF sources).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_range: Option<String>,
    /// OCR language hint, passed through to engines that support it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ocr_language: Option<String>,
    /// Engine-specific passthrough options.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub extra: HashMap<String, String>,
}

impl ConversionOptions {
    /// Parses the page range option, if present.
    pub fn pages(&self) -> Result<Option<PageRange>, CapabilityError> {
        self.page_range
            .as_deref()
            .map(|s| s.parse())
            .transpose()
    }
}

/// An inclusive page range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRange {
    pub first: u32,
    /// None means "through the last page".
    pub last: Option<u32>,
}

impl FromStr for PageRange {
    type Err = CapabilityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || CapabilityError::InvalidOptions {
            reason: format!("invalid page range: {:?}", s),
        };
        let s = s.trim();
        let (first, last) = match s.split_once('-') {
            Some((a, b)) => (
                a.trim().parse::<u32>().map_err(|_| invalid())?,
                Some(b.trim().parse::<u32>().map_err(|_| invalid())?),
            ),
            None => (s.parse::<u32>().map_err(|_| invalid())?, None),
        };
        if first == 0 || last.is_some_and(|l| l < first) {
            return Err(invalid());
        }
        Ok(Self { first, last })
    }
}

/// Everything a capability needs for one invocation.
///
/// Partial results and staging files go into `scratch_dir`, which is
/// discarded after the attempt; only bytes written to `output.path`
/// survive.
pub struct InvokeContext<'a> {
    pub source: DocumentFormat,
    pub target: DocumentFormat,
    pub input: &'a Artifact,
    pub output: &'a Artifact,
    pub options: &'a ConversionOptions,
    pub scratch_dir: &'a Path,
    /// Engine deadline; implementations kill the engine call when it
    /// elapses.
    pub deadline: std::time::Duration,
    /// Checked-out pool worker, present iff the capability declared
    /// `requires_worker()`.
    pub worker: Option<&'a PoolWorker>,
}
