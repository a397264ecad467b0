use std::ffi::OsStr;
use std::path::Path;
use std::time::Duration;

use crate::config::settings::MediaConfig;
use crate::media::run_tool;

const PDFTOTEXT_TIMEOUT: Duration = Duration::from_secs(60);

/// Text of a MER document with its layout preserved.
///
/// Extraction failures are logged and yield an empty string; the form
/// comparison then simply has nothing to match against.
pub async fn extract_text(config: &MediaConfig, pdf: &Path) -> String {
    let args = [
        OsStr::new("-layout"),
        pdf.as_os_str(),
        OsStr::new("-"),
    ];

    match run_tool(&config.pdftotext_path, args, PDFTOTEXT_TIMEOUT).await {
        Ok(output) if output.status.success() => {
            let text = String::from_utf8_lossy(&output.stdout).to_string();
            tracing::info!("MER extracted: {} chars from {}", text.len(), pdf.display());
            text
        }
        Ok(output) => {
            tracing::warn!(
                "pdftotext failed for {}: {}",
                pdf.display(),
                String::from_utf8_lossy(&output.stderr).trim()
            );
            String::new()
        }
        Err(e) => {
            tracing::warn!("MER extraction failed for {}: {}", pdf.display(), e);
            String::new()
        }
    }
}
