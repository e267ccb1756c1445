//! The format registry: which capability chains serve which pairs.

use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use crate::capability::{Capability, CapabilityId};

use super::config::RegistryConfig;
use super::error::RegistryError;
use super::types::{DocumentFormat, FormatPair};

/// One step of a conversion chain.
#[derive(Clone)]
pub struct ChainEntry {
    pub capability: Arc<dyn Capability>,
    pub priority: u8,
}

/// Ordered capability chain for one (source, target) pair.
///
/// The router tries entries front to back; the chain is built once at
/// startup and never mutated.
#[derive(Clone)]
pub struct ConversionChain {
    pub source: DocumentFormat,
    pub target: DocumentFormat,
    pub entries: Vec<ChainEntry>,
}

const WORD: &[DocumentFormat] = &[
    DocumentFormat::Doc,
    DocumentFormat::Docx,
    DocumentFormat::Odt,
    DocumentFormat::Rtf,
];
const SHEET: &[DocumentFormat] = &[
    DocumentFormat::Xls,
    DocumentFormat::Xlsx,
    DocumentFormat::Ods,
];
const SLIDES: &[DocumentFormat] = &[
    DocumentFormat::Ppt,
    DocumentFormat::Pptx,
    DocumentFormat::Odp,
];
const IMAGES: &[DocumentFormat] = &[
    DocumentFormat::Jpeg,
    DocumentFormat::Png,
    DocumentFormat::Gif,
    DocumentFormat::Bmp,
    DocumentFormat::Tiff,
    DocumentFormat::Webp,
];

/// The declarative conversion table.
///
/// Each row is (source, target, capability, priority); lower priority
/// is tried first, equal priorities keep their listed order. The
/// `prefer_pdf_library` toggle decides whether pdf→docx leads with the
/// dedicated library or with the office engine's import filter.
fn conversion_table(config: &RegistryConfig) -> Vec<(DocumentFormat, DocumentFormat, CapabilityId, u8)> {
    use CapabilityId::*;
    use DocumentFormat::*;

    let mut table = Vec::new();
    let office: Vec<DocumentFormat> = WORD
        .iter()
        .chain(SHEET.iter())
        .chain(SLIDES.iter())
        .copied()
        .collect();

    // Office suite conversions within one family.
    for family in [WORD, SHEET, SLIDES] {
        for &source in family {
            for &target in family {
                if source != target {
                    table.push((source, target, OfficeEngine, 0));
                }
            }
        }
    }

    // Office documents to pdf, html, and images.
    for &source in &office {
        table.push((source, Pdf, OfficeEngine, 0));
        table.push((source, Html, OfficeEngine, 0));
        for &image in IMAGES {
            table.push((source, image, DocumentRender, 0));
        }
    }

    // Word-family documents also export plain text.
    for &source in WORD {
        table.push((source, Txt, OfficeEngine, 0));
    }

    // Plain text is opened as a Writer document.
    for target in [Pdf, Docx, Odt, Html] {
        table.push((Txt, target, OfficeEngine, 0));
    }
    for &image in IMAGES {
        table.push((Txt, image, DocumentRender, 0));
    }

    // HTML.
    for target in [Pdf, Docx] {
        table.push((Html, target, OfficeEngine, 0));
    }
    table.push((Html, Markdown, Pandoc, 0));
    for &image in IMAGES {
        table.push((Html, image, DocumentRender, 0));
    }

    // PDF to editable documents.
    let (library, engine) = if config.prefer_pdf_library { (0, 1) } else { (1, 0) };
    table.push((Pdf, Docx, PdfConvert, library));
    table.push((Pdf, Docx, OfficeEngine, engine));
    table.push((Pdf, Xlsx, OfficeEngine, 0));
    table.push((Pdf, Pptx, OfficeEngine, 0));
    table.push((Pdf, Html, OfficeEngine, 0));
    table.push((Pdf, Markdown, PdfConvert, 0));

    // PDF rasterization; the magick path covers formats pdftoppm
    // cannot emit and doubles as a fallback for the ones it can.
    for target in [Png, Jpeg, Tiff] {
        table.push((Pdf, target, PdfRender, 0));
        table.push((Pdf, target, ImageMagick, 1));
    }
    for target in [Gif, Bmp, Webp] {
        table.push((Pdf, target, ImageMagick, 0));
    }

    // Markdown via pandoc.
    for target in [Pdf, Docx, Html, Pptx] {
        table.push((Markdown, target, Pandoc, 0));
    }

    // Raster images.
    for &source in IMAGES {
        for &target in IMAGES {
            if source != target {
                table.push((source, target, ImageMagick, 0));
            }
        }
        table.push((source, Pdf, ImageMagick, 0));
    }

    table
}

/// Immutable map from format pairs to conversion chains.
pub struct FormatRegistry {
    chains: HashMap<FormatPair, ConversionChain>,
}

impl std::fmt::Debug for FormatRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormatRegistry")
            .field("pairs", &self.chains.len())
            .finish_non_exhaustive()
    }
}

impl FormatRegistry {
    /// Builds the registry from the conversion table and the registered
    /// capability instances. Fails if the table references a capability
    /// that was not provided; every advertised pair is guaranteed a
    /// non-empty chain afterwards.
    pub fn new(
        config: &RegistryConfig,
        capabilities: HashMap<CapabilityId, Arc<dyn Capability>>,
    ) -> Result<Self, RegistryError> {
        let mut chains: HashMap<FormatPair, ConversionChain> = HashMap::new();
        for (source, target, capability_id, priority) in conversion_table(config) {
            let capability = capabilities
                .get(&capability_id)
                .ok_or(RegistryError::MissingCapability(capability_id))?
                .clone();
            chains
                .entry((source, target))
                .or_insert_with(|| ConversionChain {
                    source,
                    target,
                    entries: Vec::new(),
                })
                .entries
                .push(ChainEntry { capability, priority });
        }
        for chain in chains.values_mut() {
            // Stable sort keeps insertion order within a priority.
            chain.entries.sort_by_key(|e| e.priority);
        }
        debug!(pairs = chains.len(), "format registry built");
        Ok(Self { chains })
    }

    /// The chain serving a pair, or `None` when the pair is
    /// unsupported.
    pub fn resolve_chain(&self, source: DocumentFormat, target: DocumentFormat) -> Option<&ConversionChain> {
        self.chains.get(&(source, target))
    }

    pub fn is_supported(&self, source: DocumentFormat, target: DocumentFormat) -> bool {
        self.chains.contains_key(&(source, target))
    }

    /// Every supported pair, sorted for stable API output.
    pub fn supported_pairs(&self) -> Vec<FormatPair> {
        let mut pairs: Vec<FormatPair> = self.chains.keys().copied().collect();
        pairs.sort_by_key(|(s, t)| (s.extension(), t.extension()));
        pairs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockCapability;

    fn full_capability_set() -> HashMap<CapabilityId, Arc<dyn Capability>> {
        [
            CapabilityId::OfficeEngine,
            CapabilityId::PdfConvert,
            CapabilityId::PdfRender,
            CapabilityId::ImageMagick,
            CapabilityId::Pandoc,
            CapabilityId::DocumentRender,
        ]
        .into_iter()
        .map(|id| (id, Arc::new(MockCapability::new(id)) as Arc<dyn Capability>))
        .collect()
    }

    fn registry(config: &RegistryConfig) -> FormatRegistry {
        FormatRegistry::new(config, full_capability_set()).unwrap()
    }

    fn chain_ids(registry: &FormatRegistry, source: DocumentFormat, target: DocumentFormat) -> Vec<CapabilityId> {
        registry
            .resolve_chain(source, target)
            .unwrap()
            .entries
            .iter()
            .map(|e| e.capability.id())
            .collect()
    }

    #[test]
    fn test_every_advertised_pair_has_a_nonempty_chain() {
        let registry = registry(&RegistryConfig::default());
        let pairs = registry.supported_pairs();
        assert!(!pairs.is_empty());
        for (source, target) in pairs {
            let chain = registry.resolve_chain(source, target).unwrap();
            assert!(!chain.entries.is_empty(), "{} -> {}", source, target);
            assert_eq!(chain.source, source);
            assert_eq!(chain.target, target);
        }
    }

    #[test]
    fn test_unsupported_pair_resolves_to_none() {
        let registry = registry(&RegistryConfig::default());
        // Cross-family office conversions make no sense.
        assert!(registry
            .resolve_chain(DocumentFormat::Docx, DocumentFormat::Xlsx)
            .is_none());
        assert!(!registry.is_supported(DocumentFormat::Png, DocumentFormat::Docx));
    }

    #[test]
    fn test_pdf_to_docx_prefers_library_by_default() {
        let registry = registry(&RegistryConfig::default());
        assert_eq!(
            chain_ids(&registry, DocumentFormat::Pdf, DocumentFormat::Docx),
            vec![CapabilityId::PdfConvert, CapabilityId::OfficeEngine]
        );
    }

    #[test]
    fn test_pdf_to_docx_toggle_flips_order() {
        let registry = registry(&RegistryConfig {
            prefer_pdf_library: false,
        });
        assert_eq!(
            chain_ids(&registry, DocumentFormat::Pdf, DocumentFormat::Docx),
            vec![CapabilityId::OfficeEngine, CapabilityId::PdfConvert]
        );
    }

    #[test]
    fn test_equal_priorities_keep_insertion_order() {
        let registry = registry(&RegistryConfig::default());
        assert_eq!(
            chain_ids(&registry, DocumentFormat::Pdf, DocumentFormat::Png),
            vec![CapabilityId::PdfRender, CapabilityId::ImageMagick]
        );
    }

    #[test]
    fn test_missing_capability_fails_construction() {
        let mut capabilities = full_capability_set();
        capabilities.remove(&CapabilityId::Pandoc);
        let err = FormatRegistry::new(&RegistryConfig::default(), capabilities).unwrap_err();
        assert!(matches!(
            err,
            RegistryError::MissingCapability(CapabilityId::Pandoc)
        ));
    }

    #[test]
    fn test_family_conversions_use_office_engine() {
        let registry = registry(&RegistryConfig::default());
        assert_eq!(
            chain_ids(&registry, DocumentFormat::Doc, DocumentFormat::Docx),
            vec![CapabilityId::OfficeEngine]
        );
        assert_eq!(
            chain_ids(&registry, DocumentFormat::Xls, DocumentFormat::Ods),
            vec![CapabilityId::OfficeEngine]
        );
    }

    #[test]
    fn test_office_to_image_uses_document_render() {
        let registry = registry(&RegistryConfig::default());
        assert_eq!(
            chain_ids(&registry, DocumentFormat::Pptx, DocumentFormat::Png),
            vec![CapabilityId::DocumentRender]
        );
    }
}
