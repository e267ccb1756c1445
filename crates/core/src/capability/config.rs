//! Paths to the external engine binaries.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Locations of the standalone converter binaries.
///
/// The pooled office engine is configured separately in the pool
/// configuration; everything here is invoked per call without a pool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnginesConfig {
    /// PDF-to-Word library CLI.
    #[serde(default = "default_pdf_convert_path")]
    pub pdf_convert_path: PathBuf,

    /// PDF page rasterizer.
    #[serde(default = "default_pdftoppm_path")]
    pub pdftoppm_path: PathBuf,

    /// PDF text extractor, used for PDF-to-markdown.
    #[serde(default = "default_pdftotext_path")]
    pub pdftotext_path: PathBuf,

    /// ImageMagick CLI.
    #[serde(default = "default_magick_path")]
    pub magick_path: PathBuf,

    /// Pandoc markup converter.
    #[serde(default = "default_pandoc_path")]
    pub pandoc_path: PathBuf,
}

fn default_pdf_convert_path() -> PathBuf {
    PathBuf::from("pdf2docx")
}

fn default_pdftoppm_path() -> PathBuf {
    PathBuf::from("pdftoppm")
}

fn default_pdftotext_path() -> PathBuf {
    PathBuf::from("pdftotext")
}

fn default_magick_path() -> PathBuf {
    PathBuf::from("magick")
}

fn default_pandoc_path() -> PathBuf {
    PathBuf::from("pandoc")
}

impl Default for EnginesConfig {
    fn default() -> Self {
        Self {
            pdf_convert_path: default_pdf_convert_path(),
            pdftoppm_path: default_pdftoppm_path(),
            pdftotext_path: default_pdftotext_path(),
            magick_path: default_magick_path(),
            pandoc_path: default_pandoc_path(),
        }
    }
}
