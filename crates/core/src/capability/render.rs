//! Document-to-image rendering via a PDF intermediate.

use async_trait::async_trait;
use std::path::PathBuf;
use tokio::process::Command;
use tracing::debug;

use crate::format::DocumentFormat;
use crate::pool::PoolConfig;

use super::command::{find_output_file, place_output, run_engine};
use super::config::EnginesConfig;
use super::error::CapabilityError;
use super::image::magick_args;
use super::office::soffice_convert_args;
use super::pdf::{pdftoppm_args, pdftoppm_format};
use super::traits::Capability;
use super::types::{CapabilityId, InvokeContext, Quality};

/// Renders office, text and HTML documents to a raster image.
///
/// There is no direct path; the document is first exported to PDF by
/// the pooled office engine, then the PDF is rasterized. Both stages
/// work entirely inside the scratch directory.
pub struct DocumentRenderCapability {
    soffice_path: PathBuf,
    pdftoppm_path: PathBuf,
    magick_path: PathBuf,
}

impl DocumentRenderCapability {
    pub fn new(pool: &PoolConfig, engines: &EnginesConfig) -> Self {
        Self {
            soffice_path: pool.soffice_path.clone(),
            pdftoppm_path: engines.pdftoppm_path.clone(),
            magick_path: engines.magick_path.clone(),
        }
    }
}

#[async_trait]
impl Capability for DocumentRenderCapability {
    fn id(&self) -> CapabilityId {
        CapabilityId::DocumentRender
    }

    fn requires_worker(&self) -> bool {
        true
    }

    async fn invoke(&self, ctx: InvokeContext<'_>) -> Result<(), CapabilityError> {
        let worker = ctx.worker.ok_or(CapabilityError::WorkerRequired)?;
        if !ctx.target.is_image() {
            return Err(CapabilityError::UnsupportedPair {
                source: ctx.source,
                target: ctx.target,
            });
        }

        // Stage 1: export to PDF.
        let mut cmd = Command::new(&self.soffice_path);
        cmd.args(soffice_convert_args(
            ctx.source,
            DocumentFormat::Pdf,
            &ctx.input.path,
            ctx.scratch_dir,
            &worker.workspace(),
        ));
        run_engine("soffice", cmd, ctx.deadline).await?;
        let pdf = find_output_file(ctx.scratch_dir, "pdf").await?;
        debug!(slot = worker.slot(), target = %ctx.target, "document exported, rasterizing");

        // Stage 2: rasterize the intermediate.
        let quality = ctx.options.quality.unwrap_or(Quality::Medium);
        let page = ctx.options.pages()?.map(|r| r.first).unwrap_or(1);
        match pdftoppm_format(ctx.target) {
            Ok((format_flag, produced_ext)) => {
                let prefix = ctx.scratch_dir.join("page");
                let mut cmd = Command::new(&self.pdftoppm_path);
                cmd.args(pdftoppm_args(format_flag, quality.dpi(), page, &pdf, &prefix));
                run_engine("pdftoppm", cmd, ctx.deadline).await?;
                let produced = find_output_file(ctx.scratch_dir, produced_ext).await?;
                place_output(&produced, &ctx.output.path).await
            }
            Err(_) => {
                let mut cmd = Command::new(&self.magick_path);
                cmd.args(magick_args(
                    DocumentFormat::Pdf,
                    ctx.target,
                    &pdf,
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
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::{Artifact, ArtifactId, ArtifactKind};
    use crate::capability::ConversionOptions;
    use chrono::Utc;
    use std::time::Duration;

    fn artifact(path: &str) -> Artifact {
        Artifact {
            id: ArtifactId::generate(),
            kind: ArtifactKind::Input,
            path: path.into(),
            original_name: None,
            created_at: Utc::now(),
            expires_at: Utc::now() + chrono::Duration::hours(1),
        }
    }

    #[tokio::test]
    async fn test_requires_checked_out_worker() {
        let capability =
            DocumentRenderCapability::new(&PoolConfig::default(), &EnginesConfig::default());
        assert!(capability.requires_worker());

        let input = artifact("/tmp/in.docx");
        let output = artifact("/tmp/out.png");
        let options = ConversionOptions::default();
        let ctx = InvokeContext {
            source: DocumentFormat::Docx,
            target: DocumentFormat::Png,
            input: &input,
            output: &output,
            options: &options,
            scratch_dir: std::path::Path::new("/tmp"),
            deadline: Duration::from_secs(5),
            worker: None,
        };
        let err = capability.invoke(ctx).await.unwrap_err();
        assert!(matches!(err, CapabilityError::WorkerRequired));
    }
}
