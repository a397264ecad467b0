use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::run_tool;
use crate::config::settings::MediaConfig;

const FRAME_POSITIONS: [f64; 3] = [0.2, 0.5, 0.8];
const FRAME_TIMEOUT: Duration = Duration::from_secs(60);

/// Whole-second offsets at which frames are sampled, never earlier than 1s.
pub fn frame_offsets(duration: f64) -> Vec<u64> {
    if !duration.is_finite() || duration <= 0.0 {
        return Vec::new();
    }
    FRAME_POSITIONS
        .iter()
        .map(|p| ((duration * p).floor() as u64).max(1))
        .collect()
}

pub fn frame_path(dir: &Path, index: usize) -> PathBuf {
    dir.join(format!("frame_{:02}.jpg", index))
}

/// Grab stills from a video call into `out_dir` as `frame_01.jpg`, ...
///
/// Frames ffmpeg fails to produce are skipped; the returned paths all exist.
pub async fn extract_screenshots(
    config: &MediaConfig,
    video: &Path,
    duration: Option<f64>,
    out_dir: &Path,
) -> Vec<PathBuf> {
    let offsets = frame_offsets(duration.unwrap_or(0.0));
    if offsets.is_empty() {
        tracing::warn!("No duration for {}; skipping screenshots", video.display());
        return Vec::new();
    }
    if let Err(e) = std::fs::create_dir_all(out_dir) {
        tracing::warn!("Cannot create {}: {}", out_dir.display(), e);
        return Vec::new();
    }

    let mut shots = Vec::new();
    for (i, secs) in offsets.iter().enumerate() {
        let out = frame_path(out_dir, i + 1);
        let seek = secs.to_string();
        let args = [
            OsStr::new("-y"),
            OsStr::new("-hide_banner"),
            OsStr::new("-loglevel"),
            OsStr::new("error"),
            OsStr::new("-ss"),
            OsStr::new(&seek),
            OsStr::new("-i"),
            video.as_os_str(),
            OsStr::new("-frames:v"),
            OsStr::new("1"),
            OsStr::new("-q:v"),
            OsStr::new("2"),
            out.as_os_str(),
        ];
        if let Err(e) = run_tool(&config.ffmpeg_path, args, FRAME_TIMEOUT).await {
            tracing::warn!("Screenshot at {}s failed: {}", secs, e);
        }
        if out.exists() {
            shots.push(out);
        }
    }
    tracing::info!("Captured {} screenshot(s) from {}", shots.len(), video.display());
    shots
}
