//! Format registry configuration.

use serde::{Deserialize, Serialize};

/// Configuration for the format registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Prefer the dedicated PDF-to-Word library over the office engine
    /// for pdf→docx. When false the office engine's import filter is
    /// tried first and the library becomes the fallback.
    #[serde(default = "default_prefer_pdf_library")]
    pub prefer_pdf_library: bool,
}

fn default_prefer_pdf_library() -> bool {
    true
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            prefer_pdf_library: default_prefer_pdf_library(),
        }
    }
}
