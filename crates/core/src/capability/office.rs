//! Office document conversion through the pooled LibreOffice engine.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::debug;

use crate::format::{DocumentFormat, FormatKind};
use crate::pool::{PoolConfig, SofficeEngine};

use super::command::{find_output_file, place_output, run_engine};
use super::error::CapabilityError;
use super::traits::Capability;
use super::types::{CapabilityId, InvokeContext};

/// Converts office, text and HTML documents via LibreOffice headless.
///
/// Each invocation holds a checked-out pool worker and reuses that
/// worker's profile directory, so concurrent conversions never share a
/// LibreOffice profile. The engine picks its own output file name; the
/// result is collected from the scratch directory afterwards.
pub struct OfficeEngineCapability {
    soffice_path: PathBuf,
}

impl OfficeEngineCapability {
    pub fn new(config: &PoolConfig) -> Self {
        Self {
            soffice_path: config.soffice_path.clone(),
        }
    }
}

/// The `--convert-to` argument for a source/target pair.
///
/// Most targets are addressed by bare extension; exporting a PDF to
/// Word needs the explicit OOXML filter or soffice falls back to the
/// legacy binary format.
pub(crate) fn convert_to_spec(source: DocumentFormat, target: DocumentFormat) -> String {
    match (source, target) {
        (DocumentFormat::Pdf, DocumentFormat::Docx) => "docx:MS Word 2007 XML".to_string(),
        (DocumentFormat::Pdf, DocumentFormat::Xlsx) => "xlsx:Calc MS Excel 2007 XML".to_string(),
        (DocumentFormat::Pdf, DocumentFormat::Pptx) => {
            "pptx:Impress MS PowerPoint 2007 XML".to_string()
        }
        (_, target) => target.extension().to_string(),
    }
}

pub(crate) fn soffice_convert_args(
    source: DocumentFormat,
    target: DocumentFormat,
    input: &Path,
    outdir: &Path,
    workspace: &Path,
) -> Vec<String> {
    let mut args = vec![
        "--headless".to_string(),
        "--norestore".to_string(),
        SofficeEngine::user_installation_arg(workspace),
    ];

    // PDF sources need the import filter or soffice opens them in Draw.
    if source == DocumentFormat::Pdf && target.kind() != FormatKind::Image {
        args.push("--infilter=writer_pdf_import".to_string());
    }

    args.extend([
        "--convert-to".to_string(),
        convert_to_spec(source, target),
        "--outdir".to_string(),
        outdir.to_string_lossy().to_string(),
        input.to_string_lossy().to_string(),
    ]);

    args
}

#[async_trait]
impl Capability for OfficeEngineCapability {
    fn id(&self) -> CapabilityId {
        CapabilityId::OfficeEngine
    }

    fn requires_worker(&self) -> bool {
        true
    }

    async fn invoke(&self, ctx: InvokeContext<'_>) -> Result<(), CapabilityError> {
        let worker = ctx.worker.ok_or(CapabilityError::WorkerRequired)?;

        let args = soffice_convert_args(
            ctx.source,
            ctx.target,
            &ctx.input.path,
            ctx.scratch_dir,
            &worker.workspace(),
        );
        debug!(
            slot = worker.slot(),
            source = %ctx.source,
            target = %ctx.target,
            "office engine conversion"
        );

        let mut cmd = Command::new(&self.soffice_path);
        cmd.args(&args);
        run_engine("soffice", cmd, ctx.deadline).await?;

        let produced = find_output_file(ctx.scratch_dir, ctx.target.extension()).await?;
        place_output(&produced, &ctx.output.path).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convert_args_docx_to_pdf() {
        let args = soffice_convert_args(
            DocumentFormat::Docx,
            DocumentFormat::Pdf,
            Path::new("/data/inputs/a.docx"),
            Path::new("/data/work/s1"),
            Path::new("/tmp/profile-0"),
        );

        assert!(args.contains(&"--headless".to_string()));
        assert!(args.contains(&"-env:UserInstallation=file:///tmp/profile-0".to_string()));
        assert!(args.contains(&"--convert-to".to_string()));
        assert!(args.contains(&"pdf".to_string()));
        assert!(args.contains(&"--outdir".to_string()));
        assert!(args.contains(&"/data/work/s1".to_string()));
        assert_eq!(args.last().unwrap(), "/data/inputs/a.docx");
        // Import filter only applies to PDF sources.
        assert!(!args.iter().any(|a| a.contains("writer_pdf_import")));
    }

    #[test]
    fn test_convert_args_pdf_to_docx_uses_import_filter() {
        let args = soffice_convert_args(
            DocumentFormat::Pdf,
            DocumentFormat::Docx,
            Path::new("/data/inputs/a.pdf"),
            Path::new("/data/work/s2"),
            Path::new("/tmp/profile-1"),
        );

        assert!(args.contains(&"--infilter=writer_pdf_import".to_string()));
        assert!(args.contains(&"docx:MS Word 2007 XML".to_string()));
    }

    #[test]
    fn test_convert_to_spec_plain_targets() {
        assert_eq!(
            convert_to_spec(DocumentFormat::Odt, DocumentFormat::Pdf),
            "pdf"
        );
        assert_eq!(
            convert_to_spec(DocumentFormat::Xls, DocumentFormat::Xlsx),
            "xlsx"
        );
    }
}
