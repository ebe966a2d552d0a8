//! OfficeConvertAdapter - converts office documents to plain text using pandoc.
//!
//! Supports: docx, pptx, xlsx, odt, rtf, epub, html, markdown-family text.
//! Legacy binary formats (doc, xls, ppt) have no pandoc reader; see
//! [`super::LegacyOfficeAdapter`].

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use docweave_core::defaults::{EXTRACTION_CMD_TIMEOUT_SECS, EXTRACTION_MAX_OUTPUT_BYTES};
use docweave_core::{Error, Result};

use super::{run_cmd_with_timeout, spill_to_tempfile, ExtractionAdapter};

pub struct OfficeConvertAdapter;

/// Determine the pandoc input format from filename extension.
pub fn pandoc_input_format(filename: &str) -> Option<&'static str> {
    let (_, ext) = filename.rsplit_once('.')?;
    match ext.to_ascii_lowercase().as_str() {
        "docx" => Some("docx"),
        "pptx" => Some("pptx"),
        "xlsx" => Some("xlsx"),
        "odt" => Some("odt"),
        "rtf" => Some("rtf"),
        "epub" => Some("epub"),
        "html" | "htm" => Some("html"),
        _ => None,
    }
}

/// Determine the pandoc input format from MIME type.
pub fn pandoc_format_from_mime(mime_type: &str) -> Option<&'static str> {
    match mime_type {
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => Some("docx"),
        "application/vnd.openxmlformats-officedocument.presentationml.presentation" => Some("pptx"),
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet" => Some("xlsx"),
        "application/vnd.oasis.opendocument.text" => Some("odt"),
        "application/rtf" | "text/rtf" => Some("rtf"),
        "application/epub+zip" => Some("epub"),
        "text/html" => Some("html"),
        _ => None,
    }
}

#[async_trait]
impl ExtractionAdapter for OfficeConvertAdapter {
    fn name(&self) -> &str {
        "office_convert"
    }

    async fn extract(&self, data: &[u8], filename: &str) -> Result<String> {
        let format = pandoc_input_format(filename)
            .or_else(|| infer::get(data).and_then(|kind| pandoc_format_from_mime(kind.mime_type())))
            .or_else(|| data.starts_with(b"{\\rtf").then_some("rtf"))
            .ok_or_else(|| {
                Error::InvalidInput(format!("No pandoc reader for file '{}'", filename))
            })?;

        let tmpfile = spill_to_tempfile(data, &format!(".{}", format))?;
        let text = run_cmd_with_timeout(
            Command::new("pandoc")
                .arg("--from")
                .arg(format)
                .arg("--to")
                .arg("plain")
                .arg("--wrap=none")
                .arg(tmpfile.path()),
            EXTRACTION_CMD_TIMEOUT_SECS,
            EXTRACTION_MAX_OUTPUT_BYTES,
        )
        .await?;

        debug!(filename, format, chars = text.chars().count(), "pandoc finished");
        Ok(text)
    }

    async fn health_check(&self) -> bool {
        Command::new("pandoc")
            .arg("--version")
            .output()
            .await
            .map(|o| o.status.success())
            .unwrap_or(false)
    }
}
