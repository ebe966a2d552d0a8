//! Extraction adapter implementations.
//!
//! Each adapter turns one family of formats into plain text. Adapters may
//! fail; [`crate::TextExtractionService`] turns every failure into an empty
//! string.

pub mod legacy_office;
pub mod office_convert;
pub mod pdf_text;
pub mod text_native;

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tracing::debug;

use docweave_core::{Error, Result};

pub use legacy_office::LegacyOfficeAdapter;
pub use office_convert::OfficeConvertAdapter;
pub use pdf_text::PdfTextAdapter;
pub use text_native::TextNativeAdapter;

/// Stderr kept for the error message of a failed command.
const STDERR_KEEP_BYTES: u64 = 4 * 1024;

/// Converts bytes of one format family to text.
#[async_trait]
pub trait ExtractionAdapter: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    /// Extract the full text. Length capping happens in the caller.
    async fn extract(&self, data: &[u8], filename: &str) -> Result<String>;

    /// Whether the adapter's external tools are available.
    async fn health_check(&self) -> bool;
}

/// Run a command with a timeout, returning at most `max_bytes` of its stdout.
///
/// Stdout is read incrementally. Once `max_bytes` have arrived the child is
/// killed and the prefix is returned as a success, whatever the exit status.
pub(crate) async fn run_cmd_with_timeout(
    cmd: &mut Command,
    timeout_secs: u64,
    max_bytes: usize,
) -> Result<String> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = cmd
        .spawn()
        .map_err(|e| Error::Internal(format!("Failed to execute command: {}", e)))?;
    let mut stdout = child
        .stdout
        .take()
        .ok_or_else(|| Error::Internal("Command stdout was not captured".to_string()))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| Error::Internal("Command stderr was not captured".to_string()))?;

    // Drained on its own task so a chatty stderr cannot block stdout.
    let stderr_task = tokio::spawn(drain_keeping_prefix(stderr));

    let run = async {
        let (out, truncated) = read_capped(&mut stdout, max_bytes)
            .await
            .map_err(|e| Error::Internal(format!("Failed to read command output: {}", e)))?;
        drop(stdout);
        if truncated {
            // Already exited is fine.
            let _ = child.start_kill();
        }
        let status = child
            .wait()
            .await
            .map_err(|e| Error::Internal(format!("Failed to wait for command: {}", e)))?;
        Ok::<_, Error>((out, truncated, status))
    };

    let (out, truncated, status) = tokio::time::timeout(Duration::from_secs(timeout_secs), run)
        .await
        .map_err(|_| {
            Error::Internal(format!(
                "External command timed out after {}s",
                timeout_secs
            ))
        })??;

    if truncated {
        debug!(max_bytes, "Command output reached the cap, child stopped");
        let text = String::from_utf8_lossy(&out);
        // The cut may land inside a multi-byte character.
        return Ok(text.trim_end_matches('\u{FFFD}').to_string());
    }

    if !status.success() {
        let stderr = stderr_task.await.unwrap_or_default();
        return Err(Error::Internal(format!(
            "Command failed (exit {}): {}",
            status,
            String::from_utf8_lossy(&stderr).trim()
        )));
    }

    Ok(String::from_utf8_lossy(&out).into_owned())
}

/// Read until EOF or until `max_bytes` are buffered. The flag reports a cut.
async fn read_capped<R: AsyncRead + Unpin>(
    reader: &mut R,
    max_bytes: usize,
) -> std::io::Result<(Vec<u8>, bool)> {
    let mut out = Vec::new();
    let mut chunk = [0u8; 8 * 1024];
    loop {
        let n = reader.read(&mut chunk).await?;
        if n == 0 {
            return Ok((out, false));
        }
        let room = max_bytes - out.len();
        if n >= room {
            out.extend_from_slice(&chunk[..room]);
            return Ok((out, true));
        }
        out.extend_from_slice(&chunk[..n]);
    }
}

async fn drain_keeping_prefix<R: AsyncRead + Unpin>(mut reader: R) -> Vec<u8> {
    let mut kept = Vec::new();
    let _ = (&mut reader).take(STDERR_KEEP_BYTES).read_to_end(&mut kept).await;
    let _ = tokio::io::copy(&mut reader, &mut tokio::io::sink()).await;
    kept
}

/// Write `data` to a named temp file carrying `suffix`, for tools that read paths.
pub(crate) fn spill_to_tempfile(data: &[u8], suffix: &str) -> Result<tempfile::NamedTempFile> {
    use std::io::Write;

    let mut file = tempfile::Builder::new()
        .prefix("docweave-extract-")
        .suffix(suffix)
        .tempfile()
        .map_err(|e| Error::Internal(format!("Failed to create temp file: {}", e)))?;
    file.write_all(data)
        .and_then(|_| file.flush())
        .map_err(|e| Error::Internal(format!("Failed to write temp file: {}", e)))?;
    Ok(file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    fn sh(script: &str) -> Command {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(script);
        cmd
    }

    #[tokio::test]
    async fn test_command_output_returned() {
        let text = run_cmd_with_timeout(&mut sh("printf 'two words'"), 10, 1024)
            .await
            .unwrap();
        assert_eq!(text, "two words");
    }

    #[tokio::test]
    async fn test_unbounded_output_is_cut_at_cap() {
        let start = Instant::now();
        let text = run_cmd_with_timeout(&mut sh("yes line"), 10, 1000)
            .await
            .unwrap();
        assert_eq!(text.len(), 1000);
        assert!(text.starts_with("line\nline\n"));
        assert!(start.elapsed() < Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_failed_command_reports_stderr() {
        let err = run_cmd_with_timeout(&mut sh("echo broken input >&2; exit 3"), 10, 1024)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("broken input"), "{}", err);
    }

    #[tokio::test]
    async fn test_slow_command_times_out() {
        let err = run_cmd_with_timeout(&mut sh("sleep 5"), 1, 1024)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("timed out"), "{}", err);
    }

    #[tokio::test]
    async fn test_missing_binary_is_error() {
        let mut cmd = Command::new("docweave-no-such-tool");
        assert!(run_cmd_with_timeout(&mut cmd, 10, 1024).await.is_err());
    }

    #[tokio::test]
    async fn test_read_capped_stops_inside_chunk() {
        let mut data: &[u8] = b"abcdefgh";
        let (out, truncated) = read_capped(&mut data, 3).await.unwrap();
        assert_eq!(out, b"abc");
        assert!(truncated);

        let mut data: &[u8] = b"abc";
        let (out, truncated) = read_capped(&mut data, 10).await.unwrap();
        assert_eq!(out, b"abc");
        assert!(!truncated);
    }
}
