//! Document format definitions.

use serde::{Deserialize, Serialize};

/// A document format the service can accept or produce.
///
/// The set is closed: formats are what the registered engines can
/// actually handle, not a general MIME taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentFormat {
    Pdf,
    Doc,
    Docx,
    Xls,
    Xlsx,
    Ppt,
    Pptx,
    Odt,
    Ods,
    Odp,
    Rtf,
    Txt,
    Html,
    Markdown,
    Jpeg,
    Png,
    Gif,
    Bmp,
    Tiff,
    Webp,
}

/// Broad category of a format, used when deciding which engine family
/// applies to a conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormatKind {
    Pdf,
    /// Office suite documents (word processing, spreadsheets, slides).
    Office,
    Text,
    Html,
    Markdown,
    Image,
}

impl DocumentFormat {
    /// Returns the canonical file extension for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Doc => "doc",
            Self::Docx => "docx",
            Self::Xls => "xls",
            Self::Xlsx => "xlsx",
            Self::Ppt => "ppt",
            Self::Pptx => "pptx",
            Self::Odt => "odt",
            Self::Ods => "ods",
            Self::Odp => "odp",
            Self::Rtf => "rtf",
            Self::Txt => "txt",
            Self::Html => "html",
            Self::Markdown => "md",
            Self::Jpeg => "jpg",
            Self::Png => "png",
            Self::Gif => "gif",
            Self::Bmp => "bmp",
            Self::Tiff => "tiff",
            Self::Webp => "webp",
        }
    }

    /// Parses a file extension (without the dot, any case) into a format.
    ///
    /// Aliases like `jpeg`, `tif` and `markdown` map onto their
    /// canonical variants.
    pub fn from_extension(ext: &str) -> Option<Self> {
        let format = match ext.to_ascii_lowercase().as_str() {
            "pdf" => Self::Pdf,
            "doc" => Self::Doc,
            "docx" => Self::Docx,
            "xls" => Self::Xls,
            "xlsx" => Self::Xlsx,
            "ppt" => Self::Ppt,
            "pptx" => Self::Pptx,
            "odt" => Self::Odt,
            "ods" => Self::Ods,
            "odp" => Self::Odp,
            "rtf" => Self::Rtf,
            "txt" => Self::Txt,
            "html" | "htm" => Self::Html,
            "md" | "markdown" => Self::Markdown,
            "jpg" | "jpeg" => Self::Jpeg,
            "png" => Self::Png,
            "gif" => Self::Gif,
            "bmp" => Self::Bmp,
            "tiff" | "tif" => Self::Tiff,
            "webp" => Self::Webp,
            _ => return None,
        };
        Some(format)
    }

    /// Returns the broad category of this format.
    pub fn kind(&self) -> FormatKind {
        match self {
            Self::Pdf => FormatKind::Pdf,
            Self::Doc
            | Self::Docx
            | Self::Xls
            | Self::Xlsx
            | Self::Ppt
            | Self::Pptx
            | Self::Odt
            | Self::Ods
            | Self::Odp
            | Self::Rtf => FormatKind::Office,
            Self::Txt => FormatKind::Text,
            Self::Html => FormatKind::Html,
            Self::Markdown => FormatKind::Markdown,
            Self::Jpeg | Self::Png | Self::Gif | Self::Bmp | Self::Tiff | Self::Webp => {
                FormatKind::Image
            }
        }
    }

    /// Whether this is a raster image format.
    pub fn is_image(&self) -> bool {
        self.kind() == FormatKind::Image
    }
}

impl std::fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

// Error enums carry a `DocumentFormat` in fields named `source`, which
// thiserror treats as an error source and therefore requires this impl.
impl std::error::Error for DocumentFormat {}

/// A (source, target) format pair.
pub type FormatPair = (DocumentFormat, DocumentFormat);
