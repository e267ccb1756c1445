//! Raster image conversion via ImageMagick.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::process::Command;

use crate::format::DocumentFormat;

use super::command::run_engine;
use super::config::EnginesConfig;
use super::error::CapabilityError;
use super::traits::Capability;
use super::types::{CapabilityId, InvokeContext, Quality};

/// Image format conversion, image-to-PDF wrapping, and a PDF
/// rasterization fallback for targets pdftoppm cannot emit.
pub struct ImageMagickCapability {
    magick_path: PathBuf,
}

impl ImageMagickCapability {
    pub fn new(config: &EnginesConfig) -> Self {
        Self {
            magick_path: config.magick_path.clone(),
        }
    }
}

fn is_lossy(format: DocumentFormat) -> bool {
    matches!(format, DocumentFormat::Jpeg | DocumentFormat::Webp)
}

pub(crate) fn magick_args(
    source: DocumentFormat,
    target: DocumentFormat,
    input: &Path,
    output: &Path,
    quality: Quality,
    page: u32,
) -> Vec<String> {
    let mut args = Vec::new();

    let input_arg = if source == DocumentFormat::Pdf {
        // Density must precede the input to affect PDF rasterization;
        // the bracket suffix picks a single page (zero-based).
        args.extend(["-density".to_string(), quality.dpi().to_string()]);
        format!("{}[{}]", input.display(), page - 1)
    } else {
        input.to_string_lossy().to_string()
    };
    args.push(input_arg);

    if source == DocumentFormat::Pdf {
        // PDFs render with transparency; flatten onto white so formats
        // without an alpha channel stay legible.
        args.extend([
            "-background".to_string(),
            "white".to_string(),
            "-alpha".to_string(),
            "remove".to_string(),
        ]);
    }

    if is_lossy(target) {
        args.extend(["-quality".to_string(), quality.percent().to_string()]);
    }

    args.push(output.to_string_lossy().to_string());
    args
}

#[async_trait]
impl Capability for ImageMagickCapability {
    fn id(&self) -> CapabilityId {
        CapabilityId::ImageMagick
    }

    async fn invoke(&self, ctx: InvokeContext<'_>) -> Result<(), CapabilityError> {
        let supported = (ctx.source.is_image()
            && (ctx.target.is_image() || ctx.target == DocumentFormat::Pdf))
            || (ctx.source == DocumentFormat::Pdf && ctx.target.is_image());
        if !supported {
            return Err(CapabilityError::UnsupportedPair {
                source: ctx.source,
                target: ctx.target,
            });
        }

        let quality = ctx.options.quality.unwrap_or(Quality::Medium);
        let page = ctx.options.pages()?.map(|r| r.first).unwrap_or(1);

        let mut cmd = Command::new(&self.magick_path);
        cmd.args(magick_args(
            ctx.source,
            ctx.target,
            &ctx.input.path,
            &ctx.output.path,
            quality,
            page,
        ));
        run_engine("magick", cmd, ctx.deadline).await?;

        if !tokio::fs::try_exists(&ctx.output.path).await? {
            return Err(CapabilityError::OutputMissing {
                expected: ctx.output.path.display().to_string(),
            });
        }
        Ok(())
    }
}
