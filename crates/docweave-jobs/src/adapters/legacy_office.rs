//! LegacyOfficeAdapter - text from OLE2 Word, Excel and PowerPoint files.
//!
//! Uses the catdoc tool family: `catdoc` for Word, `xls2csv` for Excel and
//! `catppt` for PowerPoint. The tool is chosen from the file extension, and
//! from the stream names inside the compound file when the name says nothing.

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use docweave_core::defaults::{EXTRACTION_CMD_TIMEOUT_SECS, EXTRACTION_MAX_OUTPUT_BYTES};
use docweave_core::{Error, Result};

use super::{run_cmd_with_timeout, spill_to_tempfile, ExtractionAdapter};

/// Compound File Binary signature shared by doc, xls and ppt.
pub const OLE2_MAGIC: [u8; 8] = [0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];

/// Which legacy application wrote the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegacyKind {
    Word,
    Excel,
    PowerPoint,
}

impl LegacyKind {
    /// Classify by extension, then by the directory stream names.
    pub fn detect(data: &[u8], filename: &str) -> Self {
        Self::from_extension(filename)
            .or_else(|| Self::from_stream_names(data))
            .unwrap_or(LegacyKind::Word)
    }

    fn from_extension(filename: &str) -> Option<Self> {
        let (_, ext) = filename.rsplit_once('.')?;
        match ext.to_ascii_lowercase().as_str() {
            "doc" | "dot" => Some(LegacyKind::Word),
            "xls" | "xlt" => Some(LegacyKind::Excel),
            "ppt" | "pps" | "pot" => Some(LegacyKind::PowerPoint),
            _ => None,
        }
    }

    /// Directory entries store their names as UTF-16LE.
    fn from_stream_names(data: &[u8]) -> Option<Self> {
        let contains = |name: &str| {
            let needle: Vec<u8> = name.encode_utf16().flat_map(u16::to_le_bytes).collect();
            data.windows(needle.len()).any(|w| w == needle.as_slice())
        };
        if contains("WordDocument") {
            Some(LegacyKind::Word)
        } else if contains("Workbook") || contains("Book") {
            Some(LegacyKind::Excel)
        } else if contains("PowerPoint Document") {
            Some(LegacyKind::PowerPoint)
        } else {
            None
        }
    }

    /// The converter binary for this kind.
    pub fn tool(self) -> &'static str {
        match self {
            LegacyKind::Word => "catdoc",
            LegacyKind::Excel => "xls2csv",
            LegacyKind::PowerPoint => "catppt",
        }
    }

    fn suffix(self) -> &'static str {
        match self {
            LegacyKind::Word => ".doc",
            LegacyKind::Excel => ".xls",
            LegacyKind::PowerPoint => ".ppt",
        }
    }
}

pub struct LegacyOfficeAdapter;

#[async_trait]
impl ExtractionAdapter for LegacyOfficeAdapter {
    fn name(&self) -> &str {
        "legacy_office"
    }

    async fn extract(&self, data: &[u8], filename: &str) -> Result<String> {
        if !data.starts_with(&OLE2_MAGIC) {
            return Err(Error::InvalidInput(format!(
                "File '{}' is not an OLE2 compound document",
                filename
            )));
        }

        let kind = LegacyKind::detect(data, filename);
        let tmpfile = spill_to_tempfile(data, kind.suffix())?;
        let text = run_cmd_with_timeout(
            Command::new(kind.tool())
                .arg("-d")
                .arg("utf-8")
                .arg(tmpfile.path()),
            EXTRACTION_CMD_TIMEOUT_SECS,
            EXTRACTION_MAX_OUTPUT_BYTES,
        )
        .await?;

        debug!(
            filename,
            tool = kind.tool(),
            chars = text.chars().count(),
            "legacy conversion finished"
        );
        Ok(text)
    }

    async fn health_check(&self) -> bool {
        // catdoc has no reliable exit code for -V; being able to spawn it is enough.
        Command::new(LegacyKind::Word.tool())
            .arg("-V")
            .output()
            .await
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ole2_with(stream: &str) -> Vec<u8> {
        let mut data = OLE2_MAGIC.to_vec();
        data.extend_from_slice(&[0u8; 32]);
        data.extend(stream.encode_utf16().flat_map(u16::to_le_bytes));
        data
    }

    #[test]
    fn test_kind_from_extension() {
        assert_eq!(LegacyKind::detect(&OLE2_MAGIC, "Memo.DOC"), LegacyKind::Word);
        assert_eq!(LegacyKind::detect(&OLE2_MAGIC, "budget.xls"), LegacyKind::Excel);
        assert_eq!(LegacyKind::detect(&OLE2_MAGIC, "deck.ppt"), LegacyKind::PowerPoint);
    }

    #[test]
    fn test_kind_from_stream_names() {
        assert_eq!(
            LegacyKind::detect(&ole2_with("Workbook"), "upload"),
            LegacyKind::Excel
        );
        assert_eq!(
            LegacyKind::detect(&ole2_with("PowerPoint Document"), "upload"),
            LegacyKind::PowerPoint
        );
        assert_eq!(
            LegacyKind::detect(&ole2_with("WordDocument"), "upload.bin"),
            LegacyKind::Word
        );
        assert_eq!(LegacyKind::detect(&OLE2_MAGIC, "upload"), LegacyKind::Word);
    }

    #[test]
    fn test_tools() {
        assert_eq!(LegacyKind::Word.tool(), "catdoc");
        assert_eq!(LegacyKind::Excel.tool(), "xls2csv");
        assert_eq!(LegacyKind::PowerPoint.tool(), "catppt");
    }

    #[tokio::test]
    async fn test_rejects_non_ole2() {
        let err = LegacyOfficeAdapter
            .extract(b"plain words", "memo.doc")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_truncated_compound_file_does_not_panic() {
        // Whether catdoc is installed or not, a broken container either fails
        // or yields whatever text catdoc salvaged.
        let mut data = OLE2_MAGIC.to_vec();
        data.extend_from_slice(b"Quarterly revenue grew by ten percent.");
        if let Err(e) = LegacyOfficeAdapter.extract(&data, "report.doc").await {
            assert!(matches!(e, Error::Internal(_)), "{}", e);
        }
    }
}
