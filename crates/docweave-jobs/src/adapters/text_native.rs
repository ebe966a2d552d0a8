//! TextNative extraction adapter - handles plain text files.

use async_trait::async_trait;

use docweave_core::Result;

use super::ExtractionAdapter;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";
const UTF16LE_BOM: &[u8] = b"\xFF\xFE";
const UTF16BE_BOM: &[u8] = b"\xFE\xFF";

/// Whether `data` opens with a UTF-16 byte order mark.
pub fn has_utf16_bom(data: &[u8]) -> bool {
    data.starts_with(UTF16LE_BOM) || data.starts_with(UTF16BE_BOM)
}

/// Decode text bytes: BOM-marked UTF-16 in either byte order, otherwise
/// UTF-8. Invalid sequences become U+FFFD and the BOM is dropped.
pub fn decode_text(data: &[u8]) -> String {
    if let Some(body) = data.strip_prefix(UTF16LE_BOM) {
        return decode_utf16(body, u16::from_le_bytes);
    }
    if let Some(body) = data.strip_prefix(UTF16BE_BOM) {
        return decode_utf16(body, u16::from_be_bytes);
    }
    let data = data.strip_prefix(UTF8_BOM).unwrap_or(data);
    String::from_utf8_lossy(data).into_owned()
}

fn decode_utf16(body: &[u8], unit: fn([u8; 2]) -> u16) -> String {
    // A dangling odd byte is dropped.
    let units: Vec<u16> = body
        .chunks_exact(2)
        .map(|pair| unit([pair[0], pair[1]]))
        .collect();
    String::from_utf16_lossy(&units)
}

/// Reads bytes as text, replacing invalid sequences and dropping a BOM.
pub struct TextNativeAdapter;

#[async_trait]
impl ExtractionAdapter for TextNativeAdapter {
    fn name(&self) -> &str {
        "text_native"
    }

    async fn extract(&self, data: &[u8], _filename: &str) -> Result<String> {
        Ok(decode_text(data))
    }

    async fn health_check(&self) -> bool {
        true // No external dependencies
    }
}
