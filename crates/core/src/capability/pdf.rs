//! PDF-specific conversion strategies.
//!
//! Two capabilities live here. [`PdfConvertCapability`] turns PDFs into
//! editable documents (Word via the pdf2docx CLI, markdown via
//! pdftotext plus light structure recovery). [`PdfRenderCapability`]
//! rasterizes PDF pages with pdftoppm.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::debug;

use crate::format::DocumentFormat;

use super::command::{find_output_file, place_output, run_engine};
use super::config::EnginesConfig;
use super::error::CapabilityError;
use super::traits::Capability;
use super::types::{CapabilityId, InvokeContext, PageRange, Quality};

/// PDF to editable-document conversion.
pub struct PdfConvertCapability {
    pdf_convert_path: PathBuf,
    pdftotext_path: PathBuf,
}

impl PdfConvertCapability {
    pub fn new(config: &EnginesConfig) -> Self {
        Self {
            pdf_convert_path: config.pdf_convert_path.clone(),
            pdftotext_path: config.pdftotext_path.clone(),
        }
    }

    async fn to_docx(&self, ctx: &InvokeContext<'_>) -> Result<(), CapabilityError> {
        let mut cmd = Command::new(&self.pdf_convert_path);
        cmd.arg("convert").arg(&ctx.input.path).arg(&ctx.output.path);
        // pdf2docx counts pages from zero and treats end as exclusive.
        if let Some(range) = ctx.options.pages()? {
            cmd.arg(format!("--start={}", range.first - 1));
            if let Some(last) = range.last {
                cmd.arg(format!("--end={}", last));
            }
        }

        run_engine("pdf2docx", cmd, ctx.deadline).await?;
        if !tokio::fs::try_exists(&ctx.output.path).await? {
            return Err(CapabilityError::OutputMissing {
                expected: ctx.output.path.display().to_string(),
            });
        }
        Ok(())
    }

    async fn to_markdown(&self, ctx: &InvokeContext<'_>) -> Result<(), CapabilityError> {
        let text_path = ctx.scratch_dir.join("extracted.txt");
        let mut cmd = Command::new(&self.pdftotext_path);
        cmd.arg("-layout");
        if let Some(range) = ctx.options.pages()? {
            cmd.args(["-f", &range.first.to_string()]);
            if let Some(last) = range.last {
                cmd.args(["-l", &last.to_string()]);
            }
        }
        cmd.arg(&ctx.input.path).arg(&text_path);

        run_engine("pdftotext", cmd, ctx.deadline).await?;
        let text = tokio::fs::read_to_string(&text_path).await.map_err(|_| {
            CapabilityError::OutputMissing {
                expected: text_path.display().to_string(),
            }
        })?;
        tokio::fs::write(&ctx.output.path, text_to_markdown(&text)).await?;
        Ok(())
    }
}

#[async_trait]
impl Capability for PdfConvertCapability {
    fn id(&self) -> CapabilityId {
        CapabilityId::PdfConvert
    }

    async fn invoke(&self, ctx: InvokeContext<'_>) -> Result<(), CapabilityError> {
        match (ctx.source, ctx.target) {
            (DocumentFormat::Pdf, DocumentFormat::Docx) => self.to_docx(&ctx).await,
            (DocumentFormat::Pdf, DocumentFormat::Markdown) => self.to_markdown(&ctx).await,
            (source, target) => Err(CapabilityError::UnsupportedPair { source, target }),
        }
    }
}

/// Recovers markdown structure from extracted PDF text.
///
/// A line standing alone between blank lines, short and without
/// terminal punctuation, is treated as a heading. Form feeds separate
/// pages and become horizontal rules.
pub(crate) fn text_to_markdown(text: &str) -> String {
    const HEADING_MAX_LEN: usize = 64;

    let mut out = String::new();
    for (page_idx, page) in text.split('\u{c}').enumerate() {
        if page_idx > 0 {
            out.push_str("\n---\n\n");
        }
        let lines: Vec<&str> = page.lines().map(str::trim).collect();
        let mut i = 0;
        while i < lines.len() {
            if lines[i].is_empty() {
                i += 1;
                continue;
            }
            // Collect one block of consecutive non-empty lines.
            let start = i;
            while i < lines.len() && !lines[i].is_empty() {
                i += 1;
            }
            let block = &lines[start..i];
            if block.len() == 1 && looks_like_heading(block[0], HEADING_MAX_LEN) {
                out.push_str("## ");
                out.push_str(block[0]);
            } else {
                out.push_str(&block.join(" "));
            }
            out.push_str("\n\n");
        }
    }
    out.trim_end().to_string() + "\n"
}

fn looks_like_heading(line: &str, max_len: usize) -> bool {
    line.len() <= max_len
        && line.chars().any(|c| c.is_alphabetic())
        && !line.ends_with(['.', ',', ';', ':'])
}

/// PDF page rasterization via pdftoppm.
pub struct PdfRenderCapability {
    pdftoppm_path: PathBuf,
}

impl PdfRenderCapability {
    pub fn new(config: &EnginesConfig) -> Self {
        Self {
            pdftoppm_path: config.pdftoppm_path.clone(),
        }
    }
}

/// pdftoppm's format flag and the extension it writes with.
pub(crate) fn pdftoppm_format(
    target: DocumentFormat,
) -> Result<(&'static str, &'static str), CapabilityError> {
    match target {
        DocumentFormat::Png => Ok(("-png", "png")),
        DocumentFormat::Jpeg => Ok(("-jpeg", "jpg")),
        DocumentFormat::Tiff => Ok(("-tiff", "tif")),
        _ => Err(CapabilityError::UnsupportedPair {
            source: DocumentFormat::Pdf,
            target,
        }),
    }
}

/// Renders exactly one page (the first requested page) into a single
/// image file under the output prefix.
pub(crate) fn pdftoppm_args(
    format_flag: &str,
    dpi: u32,
    page: u32,
    input: &Path,
    out_prefix: &Path,
) -> Vec<String> {
    vec![
        format_flag.to_string(),
        "-r".to_string(),
        dpi.to_string(),
        "-f".to_string(),
        page.to_string(),
        "-l".to_string(),
        page.to_string(),
        "-singlefile".to_string(),
        input.to_string_lossy().to_string(),
        out_prefix.to_string_lossy().to_string(),
    ]
}

#[async_trait]
impl Capability for PdfRenderCapability {
    fn id(&self) -> CapabilityId {
        CapabilityId::PdfRender
    }

    async fn invoke(&self, ctx: InvokeContext<'_>) -> Result<(), CapabilityError> {
        if ctx.source != DocumentFormat::Pdf {
            return Err(CapabilityError::UnsupportedPair {
                source: ctx.source,
                target: ctx.target,
            });
        }
        let (format_flag, produced_ext) = pdftoppm_format(ctx.target)?;
        let dpi = ctx.options.quality.unwrap_or(Quality::Medium).dpi();
        let page = ctx
            .options
            .pages()?
            .map(|r: PageRange| r.first)
            .unwrap_or(1);
        debug!(target = %ctx.target, dpi, page, "rendering pdf page");

        let prefix = ctx.scratch_dir.join("page");
        let mut cmd = Command::new(&self.pdftoppm_path);
        cmd.args(pdftoppm_args(format_flag, dpi, page, &ctx.input.path, &prefix));
        run_engine("pdftoppm", cmd, ctx.deadline).await?;

        let produced = find_output_file(ctx.scratch_dir, produced_ext).await?;
        place_output(&produced, &ctx.output.path).await
    }
}
