//! Markup conversion via pandoc.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::process::Command;

use crate::format::DocumentFormat;

use super::command::run_engine;
use super::config::EnginesConfig;
use super::error::CapabilityError;
use super::traits::Capability;
use super::types::{CapabilityId, InvokeContext};

/// Markdown and HTML conversion through pandoc.
pub struct PandocCapability {
    pandoc_path: PathBuf,
}

impl PandocCapability {
    pub fn new(config: &EnginesConfig) -> Self {
        Self {
            pandoc_path: config.pandoc_path.clone(),
        }
    }
}

/// Pandoc reader/writer name for a format, if pandoc handles it.
pub(crate) fn pandoc_format(format: DocumentFormat) -> Option<&'static str> {
    match format {
        DocumentFormat::Markdown => Some("markdown"),
        DocumentFormat::Html => Some("html"),
        DocumentFormat::Docx => Some("docx"),
        DocumentFormat::Pptx => Some("pptx"),
        DocumentFormat::Pdf => Some("pdf"),
        _ => None,
    }
}

pub(crate) fn pandoc_args(
    source: DocumentFormat,
    target: DocumentFormat,
    input: &Path,
    output: &Path,
) -> Result<Vec<String>, CapabilityError> {
    let unsupported = || CapabilityError::UnsupportedPair { source, target };
    let from = pandoc_format(source).ok_or_else(unsupported)?;
    let to = pandoc_format(target).ok_or_else(unsupported)?;
    // Pandoc reads PDFs from nobody.
    if source == DocumentFormat::Pdf {
        return Err(unsupported());
    }

    let mut args = vec![
        "--from".to_string(),
        from.to_string(),
        "--to".to_string(),
        to.to_string(),
        "--standalone".to_string(),
    ];
    if target == DocumentFormat::Pdf {
        // PDF output goes through a LaTeX engine; pick one that is
        // commonly installed alongside pandoc.
        args.extend(["--pdf-engine".to_string(), "pdflatex".to_string()]);
    }
    args.extend([
        "--output".to_string(),
        output.to_string_lossy().to_string(),
        input.to_string_lossy().to_string(),
    ]);
    Ok(args)
}

#[async_trait]
impl Capability for PandocCapability {
    fn id(&self) -> CapabilityId {
        CapabilityId::Pandoc
    }

    async fn invoke(&self, ctx: InvokeContext<'_>) -> Result<(), CapabilityError> {
        let args = pandoc_args(ctx.source, ctx.target, &ctx.input.path, &ctx.output.path)?;
        let mut cmd = Command::new(&self.pandoc_path);
        cmd.args(&args);
        run_engine("pandoc", cmd, ctx.deadline).await?;

        if !tokio::fs::try_exists(&ctx.output.path).await? {
            return Err(CapabilityError::OutputMissing {
                expected: ctx.output.path.display().to_string(),
            });
        }
        Ok(())
    }
}
