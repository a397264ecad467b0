pub mod audibility;
pub mod frames;

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use std::time::Duration;
use tokio::process::Command;

use crate::config::settings::MediaConfig;
use crate::error::{MerqaError, Result};

/// Extensions accepted as call recordings.
pub const MEDIA_EXTENSIONS: [&str; 8] = ["mp3", "wav", "m4a", "webm", "ogg", "mp4", "flac", "mov"];

/// Extensions treated as video (audio is extracted, frames are sampled).
pub const VIDEO_EXTENSIONS: [&str; 3] = ["mp4", "webm", "mov"];

const PROBE_TIMEOUT: Duration = Duration::from_secs(30);
const CONVERT_TIMEOUT: Duration = Duration::from_secs(600);

fn extension(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default()
}

pub fn is_media(path: &Path) -> bool {
    MEDIA_EXTENSIONS.contains(&extension(path).as_str())
}

pub fn is_video(path: &Path) -> bool {
    VIDEO_EXTENSIONS.contains(&extension(path).as_str())
}

/// Run a media tool to completion, capturing stdout and stderr.
pub(crate) async fn run_tool<I, S>(program: &str, args: I, timeout: Duration) -> Result<Output>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| MerqaError::Media(format!("Failed to run {}: {}", program, e)))?;

    match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(output) => output.map_err(|e| MerqaError::Media(format!("{} process failed: {}", program, e))),
        Err(_) => Err(MerqaError::Media(format!(
            "{} timed out after {}s",
            program,
            timeout.as_secs()
        ))),
    }
}

fn parse_duration(stdout: &[u8]) -> Option<f64> {
    let secs: f64 = String::from_utf8_lossy(stdout).trim().parse().ok()?;
    (secs.is_finite() && secs > 0.0).then_some(secs)
}

/// Duration of a WAV file from its header.
pub fn wav_duration(path: &Path) -> Option<f64> {
    let reader = hound::WavReader::open(path).ok()?;
    let rate = reader.spec().sample_rate;
    if rate == 0 {
        return None;
    }
    let secs = reader.duration() as f64 / rate as f64;
    (secs > 0.0).then_some(secs)
}

/// Media duration in seconds, or `None` when it cannot be determined.
pub async fn probe_duration(config: &MediaConfig, path: &Path) -> Option<f64> {
    let args = [
        OsStr::new("-v"),
        OsStr::new("error"),
        OsStr::new("-show_entries"),
        OsStr::new("format=duration"),
        OsStr::new("-of"),
        OsStr::new("default=noprint_wrappers=1:nokey=1"),
        path.as_os_str(),
    ];

    match run_tool(&config.ffprobe_path, args, PROBE_TIMEOUT).await {
        Ok(output) if output.status.success() => {
            if let Some(secs) = parse_duration(&output.stdout) {
                return Some(secs);
            }
        }
        Ok(output) => {
            tracing::debug!(
                "ffprobe failed for {}: {}",
                path.display(),
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Err(e) => tracing::debug!("{}", e),
    }

    if extension(path) == "wav" {
        return wav_duration(path);
    }
    tracing::warn!("Could not determine duration of {}", path.display());
    None
}

/// Extract the audio track of a video into an mp3 at `output`.
pub async fn extract_audio(config: &MediaConfig, video: &Path, output: &Path) -> Result<()> {
    tracing::info!("Extracting audio from {}", video.display());
    let args = [
        OsStr::new("-y"),
        OsStr::new("-hide_banner"),
        OsStr::new("-loglevel"),
        OsStr::new("error"),
        OsStr::new("-i"),
        video.as_os_str(),
        OsStr::new("-vn"),
        OsStr::new("-acodec"),
        OsStr::new("libmp3lame"),
        OsStr::new("-q:a"),
        OsStr::new("2"),
        output.as_os_str(),
    ];
    let result = run_tool(&config.ffmpeg_path, args, CONVERT_TIMEOUT).await?;

    if !result.status.success() || !output.exists() {
        return Err(MerqaError::Media(format!(
            "Audio extraction failed for {}: {}",
            video.display(),
            String::from_utf8_lossy(&result.stderr).trim()
        )));
    }
    Ok(())
}

fn is_chunk_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.starts_with("chunk_") && n.ends_with(".mp3"))
        .unwrap_or(false)
}

/// Chunk files already present in `dir`, sorted by name.
pub fn list_chunks(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut chunks: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && is_chunk_file(p))
        .collect();
    chunks.sort();
    Ok(chunks)
}

/// Split `input` into fixed-length mp3 chunks `chunk_000.mp3`, `chunk_001.mp3`, ...
/// inside `out_dir`. Chunks left over from a previous split are removed first.
pub async fn split_into_chunks(
    config: &MediaConfig,
    input: &Path,
    out_dir: &Path,
    chunk_seconds: u64,
) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(out_dir)?;
    for stale in list_chunks(out_dir)? {
        std::fs::remove_file(stale)?;
    }

    let segment_time = chunk_seconds.max(1).to_string();
    let pattern = out_dir.join("chunk_%03d.mp3");
    let args = [
        OsStr::new("-y"),
        OsStr::new("-hide_banner"),
        OsStr::new("-loglevel"),
        OsStr::new("error"),
        OsStr::new("-i"),
        input.as_os_str(),
        OsStr::new("-vn"),
        OsStr::new("-acodec"),
        OsStr::new("libmp3lame"),
        OsStr::new("-q:a"),
        OsStr::new("2"),
        OsStr::new("-f"),
        OsStr::new("segment"),
        OsStr::new("-segment_time"),
        OsStr::new(&segment_time),
        OsStr::new("-reset_timestamps"),
        OsStr::new("1"),
        pattern.as_os_str(),
    ];
    let output = run_tool(&config.ffmpeg_path, args, CONVERT_TIMEOUT).await?;
    if !output.status.success() {
        return Err(MerqaError::Media(format!(
            "Splitting {} failed: {}",
            input.display(),
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    let chunks = list_chunks(out_dir)?;
    tracing::info!("Split {} into {} chunk(s)", input.display(), chunks.len());
    Ok(chunks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_media_extensions() {
        assert!(is_media(Path::new("R1_call.MP3")));
        assert!(is_media(Path::new("R1_video.mov")));
        assert!(!is_media(Path::new("R1_MER.pdf")));
        assert!(!is_media(Path::new("R1")));

        assert!(is_video(Path::new("a.webm")));
        assert!(is_video(Path::new("a.MP4")));
        assert!(!is_video(Path::new("a.wav")));
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration(b"612.480000\n"), Some(612.48));
        assert_eq!(parse_duration(b"N/A\n"), None);
        assert_eq!(parse_duration(b"0.000"), None);
        assert_eq!(parse_duration(b""), None);
    }

    #[test]
    fn test_wav_duration() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tone.wav");
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 8000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        for _ in 0..16000 {
            writer.write_sample(0i16).unwrap();
        }
        writer.finalize().unwrap();

        assert_eq!(wav_duration(&path), Some(2.0));
        assert_eq!(wav_duration(&dir.path().join("missing.wav")), None);
    }

    #[tokio::test]
    async fn test_probe_falls_back_to_wav_header() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("call.wav");
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: 16000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        for _ in 0..(16000 * 2 * 3) {
            writer.write_sample(0i16).unwrap();
        }
        writer.finalize().unwrap();

        let config = MediaConfig {
            ffprobe_path: "merqa-no-such-ffprobe".to_string(),
            ..MediaConfig::default()
        };
        assert_eq!(probe_duration(&config, &path).await, Some(3.0));
        assert_eq!(
            probe_duration(&config, &dir.path().join("call.mp3")).await,
            None
        );
    }

    #[test]
    fn test_list_chunks_sorted_and_filtered() {
        let dir = TempDir::new().unwrap();
        for name in ["chunk_002.mp3", "chunk_000.mp3", "notes.txt", "chunk_001.mp3"] {
            std::fs::write(dir.path().join(name), b"").unwrap();
        }
        let names: Vec<String> = list_chunks(dir.path())
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["chunk_000.mp3", "chunk_001.mp3", "chunk_002.mp3"]);
        assert!(list_chunks(&dir.path().join("absent")).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_tool_is_media_error() {
        let result = run_tool("merqa-no-such-tool", ["-version"], Duration::from_secs(5)).await;
        assert!(matches!(result, Err(MerqaError::Media(_))));
    }
}
