//! PdfText extraction adapter - extracts text from PDFs using `pdftotext` (poppler-utils).

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use docweave_core::defaults::{EXTRACTION_CMD_TIMEOUT_SECS, EXTRACTION_MAX_OUTPUT_BYTES};
use docweave_core::{Error, Result};

use super::{run_cmd_with_timeout, spill_to_tempfile, ExtractionAdapter};

/// Adapter for extracting the text layer of PDF files.
///
/// Scanned PDFs without a text layer yield (near) empty text; no OCR is
/// attempted.
pub struct PdfTextAdapter;

#[async_trait]
impl ExtractionAdapter for PdfTextAdapter {
    fn name(&self) -> &str {
        "pdf_text"
    }

    async fn extract(&self, data: &[u8], filename: &str) -> Result<String> {
        if !data.starts_with(b"%PDF") {
            return Err(Error::InvalidInput(format!(
                "File '{}' is not a valid PDF (missing %PDF header)",
                filename
            )));
        }

        let tmpfile = spill_to_tempfile(data, ".pdf")?;
        let text = run_cmd_with_timeout(
            Command::new("pdftotext")
                .arg("-enc")
                .arg("UTF-8")
                .arg(tmpfile.path())
                .arg("-"),
            EXTRACTION_CMD_TIMEOUT_SECS,
            EXTRACTION_MAX_OUTPUT_BYTES,
        )
        .await?;

        debug!(filename, chars = text.chars().count(), "pdftotext finished");
        Ok(text)
    }

    async fn health_check(&self) -> bool {
        match Command::new("pdftotext").arg("-v").output().await {
            // pdftotext -v exits with 0 or 99 depending on the version.
            Ok(output) => output.status.success() || output.status.code() == Some(99),
            Err(_) => false,
        }
    }
}
