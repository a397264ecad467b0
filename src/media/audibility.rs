use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Map;
use std::ffi::OsStr;
use std::path::Path;
use std::time::Duration;

use super::run_tool;
use crate::analysis::lenient;
use crate::analysis::report::TechnicalStatus;
use crate::config::settings::MediaConfig;

pub const AUDIBLE: &str = "audible";
pub const NOT_AUDIBLE: &str = "not_audible";
pub const UNKNOWN: &str = "unknown";

const LOUDNORM_TIMEOUT: Duration = Duration::from_secs(120);
const VOLUMEDETECT_TIMEOUT: Duration = Duration::from_secs(60);

static MEAN_VOLUME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"mean_volume:\s*(-?[\d.]+) dB").expect("Invalid regex"));

/// `input_i` from ffmpeg's loudnorm JSON report. The value may be quoted.
pub fn parse_loudnorm_input_i(output: &str) -> Option<f64> {
    let report = output
        .rfind("[Parsed_loudnorm")
        .map_or(output, |start| &output[start..]);
    let value = lenient::extract_json(report)?;
    value.get("input_i").and_then(lenient::to_f64)
}

/// `mean_volume` from ffmpeg's volumedetect filter output.
pub fn parse_mean_volume(output: &str) -> Option<f64> {
    MEAN_VOLUME_RE
        .captures(output)
        .and_then(|caps| caps[1].parse().ok())
}

pub fn classify(level: Option<f64>, threshold: f64) -> &'static str {
    match level {
        None => UNKNOWN,
        Some(db) if db < threshold => NOT_AUDIBLE,
        Some(_) => AUDIBLE,
    }
}

fn status(exists: bool, level: &str, avg_dbfs: Option<f64>) -> TechnicalStatus {
    TechnicalStatus {
        recording_exists: Some(exists),
        audibility_level: Some(level.to_string()),
        avg_dbfs,
        extra: Map::new(),
    }
}

async fn ffmpeg_report(config: &MediaConfig, path: &Path, filter: &[&str], timeout: Duration) -> Option<String> {
    let mut args: Vec<&OsStr> = vec![OsStr::new("-hide_banner"), OsStr::new("-i"), path.as_os_str()];
    args.extend(filter.iter().map(OsStr::new));
    args.extend([OsStr::new("-f"), OsStr::new("null"), OsStr::new("-")]);

    match run_tool(&config.ffmpeg_path, args, timeout).await {
        Ok(output) => Some(format!(
            "{}\n{}",
            String::from_utf8_lossy(&output.stderr),
            String::from_utf8_lossy(&output.stdout)
        )),
        Err(e) => {
            tracing::warn!("Audibility check failed for {}: {}", path.display(), e);
            None
        }
    }
}

/// Measure integrated loudness of a recording.
///
/// A missing file is reported as not audible; a file ffmpeg cannot measure
/// exists with unknown audibility.
pub async fn analyze(config: &MediaConfig, path: &Path) -> TechnicalStatus {
    if !path.exists() {
        return status(false, NOT_AUDIBLE, None);
    }

    let mut level = None;
    if let Some(report) = ffmpeg_report(
        config,
        path,
        &["-filter_complex", "loudnorm=I=-23:TP=-1.5:LRA=11:print_format=json"],
        LOUDNORM_TIMEOUT,
    )
    .await
    {
        level = parse_loudnorm_input_i(&report);
    }

    if level.is_none() {
        if let Some(report) = ffmpeg_report(config, path, &["-af", "volumedetect"], VOLUMEDETECT_TIMEOUT).await {
            level = parse_mean_volume(&report);
        }
    }

    let audibility = classify(level, config.audible_threshold_dbfs);
    tracing::debug!("{}: {} ({:?} dBFS)", path.display(), audibility, level);
    status(true, audibility, level)
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOUDNORM_STDERR: &str = r#"Input #0, mp3, from 'R1_call1.mp3':
  Metadata:
    encoder         : Lavf60.3.100
  Duration: 00:04:12.53, start: 0.025057, bitrate: 64 kb/s
  Stream #0:0: Audio: mp3, 16000 Hz, mono, fltp, 64 kb/s
Stream mapping:
  Stream #0:0 (mp3float) -> loudnorm:default
  loudnorm:default -> Stream #0:0 (pcm_s16le)
Output #0, null, to 'pipe:':
  Stream #0:0: Audio: pcm_s16le, 192000 Hz, mono, s16, 3072 kb/s
size=N/A time=00:04:12.50 bitrate=N/A speed= 341x
[Parsed_loudnorm_0 @ 0x55d1c8a4f2c0]
{
	"input_i" : "-27.61",
	"input_tp" : "-4.12",
	"input_lra" : "6.20",
	"input_thresh" : "-38.02",
	"output_i" : "-23.04",
	"output_tp" : "-1.50",
	"output_lra" : "5.10",
	"output_thresh" : "-33.38",
	"normalization_type" : "dynamic",
	"target_offset" : "0.04"
}
"#;

    const VOLUMEDETECT_STDERR: &str = "size=N/A time=00:00:20.00 bitrate=N/A speed= 412x
[Parsed_volumedetect_0 @ 0x5601d2b3a8c0] n_samples: 320000
[Parsed_volumedetect_0 @ 0x5601d2b3a8c0] mean_volume: -32.5 dB
[Parsed_volumedetect_0 @ 0x5601d2b3a8c0] max_volume: -4.0 dB
[Parsed_volumedetect_0 @ 0x5601d2b3a8c0] histogram_4db: 12
";

    #[test]
    fn test_parse_loudnorm() {
        assert_eq!(parse_loudnorm_input_i(LOUDNORM_STDERR), Some(-27.61));
        // stdout is appended after stderr
        assert_eq!(parse_loudnorm_input_i(&format!("{}\n", LOUDNORM_STDERR)), Some(-27.61));
        assert_eq!(parse_loudnorm_input_i("{\"input_i\": -41}"), Some(-41.0));
        assert_eq!(parse_loudnorm_input_i("{\"input_i\" : \"-inf\"}"), None);
        assert_eq!(parse_loudnorm_input_i("no report"), None);
    }

    #[test]
    fn test_parse_mean_volume() {
        assert_eq!(parse_mean_volume(VOLUMEDETECT_STDERR), Some(-32.5));
        assert_eq!(parse_mean_volume("mean_volume: -18 dB"), Some(-18.0));
        assert_eq!(parse_mean_volume("max_volume: -4.0 dB"), None);
    }

    #[test]
    fn test_classify() {
        assert_eq!(classify(Some(-20.0), -40.0), AUDIBLE);
        assert_eq!(classify(Some(-40.0), -40.0), AUDIBLE);
        assert_eq!(classify(Some(-40.5), -40.0), NOT_AUDIBLE);
        assert_eq!(classify(None, -40.0), UNKNOWN);
    }

    #[tokio::test]
    async fn test_missing_recording() {
        let status = analyze(&MediaConfig::default(), Path::new("/nonexistent/call.mp3")).await;
        assert_eq!(status.recording_exists, Some(false));
        assert_eq!(status.audibility_level.as_deref(), Some(NOT_AUDIBLE));
        assert_eq!(status.avg_dbfs, None);
    }

    #[tokio::test]
    async fn test_unmeasurable_recording_is_unknown() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("call.mp3");
        std::fs::write(&path, b"not audio").unwrap();
        let config = MediaConfig {
            ffmpeg_path: "merqa-no-such-ffmpeg".to_string(),
            ..MediaConfig::default()
        };

        let status = analyze(&config, &path).await;
        assert_eq!(status.recording_exists, Some(true));
        assert_eq!(status.audibility_level.as_deref(), Some(UNKNOWN));
    }
}
