//! Best-effort text extraction with per-format adapters.
//!
//! The service detects the format of the bytes it is given, dispatches to an
//! adapter and caps the result at [`MAX_EXTRACTED_CHARS`]. Any adapter
//! failure (corrupt file, missing tool, timeout) is logged and yields an
//! empty string.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use docweave_core::defaults::MAX_EXTRACTED_CHARS;
use docweave_core::TextExtractor;

use crate::adapters::legacy_office::OLE2_MAGIC;
use crate::adapters::{
    office_convert, text_native, ExtractionAdapter, LegacyOfficeAdapter, OfficeConvertAdapter,
    PdfTextAdapter, TextNativeAdapter,
};

/// Content types text can be extracted from.
///
/// Broader than the upload allowlist; the two are independent.
pub const EXTRACTABLE_TYPES: &[&str] = &[
    "application/pdf",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "application/vnd.ms-excel",
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    "application/vnd.ms-powerpoint",
    "application/vnd.openxmlformats-officedocument.presentationml.presentation",
    "application/rtf",
];

/// Format family detected from the bytes and file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectedFormat {
    Pdf,
    /// Anything pandoc reads (OOXML, ODT, RTF, EPUB, HTML).
    Office,
    PlainText,
    /// Legacy OLE2 documents (doc, xls, ppt), read with the catdoc tools.
    LegacyOffice,
    Unknown,
}

/// Classify `data`, preferring magic bytes over the file name.
pub fn detect_format(data: &[u8], filename: &str) -> DetectedFormat {
    if data.starts_with(b"%PDF") {
        return DetectedFormat::Pdf;
    }
    if data.starts_with(b"{\\rtf") {
        return DetectedFormat::Office;
    }
    if data.starts_with(&OLE2_MAGIC) {
        return DetectedFormat::LegacyOffice;
    }
    // UTF-16 text is full of NULs, so it has to be claimed before the binary check.
    if text_native::has_utf16_bom(data) {
        return DetectedFormat::PlainText;
    }
    if let Some(kind) = infer::get(data) {
        if office_convert::pandoc_format_from_mime(kind.mime_type()).is_some() {
            return DetectedFormat::Office;
        }
    }
    // Extension wins over the text check: html is text but pandoc renders it better.
    if office_convert::pandoc_input_format(filename).is_some() {
        return DetectedFormat::Office;
    }
    if !looks_binary(data) {
        return DetectedFormat::PlainText;
    }
    DetectedFormat::Unknown
}

/// NUL bytes in the first few KiB mark a file as binary.
fn looks_binary(data: &[u8]) -> bool {
    data.iter().take(8192).any(|b| *b == 0)
}

/// Truncate to at most `max` characters, on a character boundary.
pub fn cap_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Text extractor dispatching to format adapters.
#[derive(Clone)]
pub struct TextExtractionService {
    pdf: Arc<dyn ExtractionAdapter>,
    office: Arc<dyn ExtractionAdapter>,
    legacy: Arc<dyn ExtractionAdapter>,
    text: Arc<dyn ExtractionAdapter>,
    max_chars: usize,
}

impl Default for TextExtractionService {
    fn default() -> Self {
        Self::new()
    }
}

impl TextExtractionService {
    /// Service with the built-in adapters (pdftotext, pandoc, catdoc, native text).
    pub fn new() -> Self {
        Self {
            pdf: Arc::new(PdfTextAdapter),
            office: Arc::new(OfficeConvertAdapter),
            legacy: Arc::new(LegacyOfficeAdapter),
            text: Arc::new(TextNativeAdapter),
            max_chars: MAX_EXTRACTED_CHARS,
        }
    }

    /// Override the character cap.
    pub fn with_max_chars(mut self, max_chars: usize) -> Self {
        self.max_chars = max_chars;
        self
    }

    /// Replace the adapter used for OLE2 documents.
    pub fn with_legacy_adapter(mut self, adapter: Arc<dyn ExtractionAdapter>) -> Self {
        self.legacy = adapter;
        self
    }

    /// Report which external tools are available.
    pub async fn health_check_all(&self) -> Vec<(String, bool)> {
        let mut results = Vec::new();
        for adapter in [&self.pdf, &self.office, &self.legacy, &self.text] {
            results.push((adapter.name().to_string(), adapter.health_check().await));
        }
        results
    }

    fn adapter_for(&self, format: DetectedFormat) -> Option<&Arc<dyn ExtractionAdapter>> {
        match format {
            DetectedFormat::Pdf => Some(&self.pdf),
            DetectedFormat::Office => Some(&self.office),
            DetectedFormat::LegacyOffice => Some(&self.legacy),
            DetectedFormat::PlainText => Some(&self.text),
            DetectedFormat::Unknown => None,
        }
    }
}

#[async_trait]
impl TextExtractor for TextExtractionService {
    fn is_supported(&self, content_type: &str) -> bool {
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        essence.starts_with("text/") || EXTRACTABLE_TYPES.contains(&essence.as_str())
    }

    async fn extract_text(&self, data: &[u8], filename: &str) -> String {
        let start = Instant::now();
        let format = detect_format(data, filename);

        let Some(adapter) = self.adapter_for(format) else {
            warn!(
                subsystem = "jobs",
                component = "extraction",
                filename,
                format = ?format,
                "No extractor for this format, returning empty text"
            );
            return String::new();
        };

        match adapter.extract(data, filename).await {
            Ok(text) => {
                let text = cap_chars(text.trim(), self.max_chars).to_string();
                info!(
                    subsystem = "jobs",
                    component = "extraction",
                    adapter = adapter.name(),
                    filename,
                    text_len = text.chars().count(),
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Extracted text"
                );
                text
            }
            Err(e) => {
                warn!(
                    subsystem = "jobs",
                    component = "extraction",
                    adapter = adapter.name(),
                    filename,
                    error = %e,
                    "Extraction failed, returning empty text"
                );
                debug!(format = ?format, size_bytes = data.len(), "Failed extraction input");
                String::new()
            }
        }
    }
}
