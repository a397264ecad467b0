use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration struct
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MerqaConfig {
    #[serde(default)]
    pub records: RecordsConfig,

    #[serde(default)]
    pub transcription: TranscriptionConfig,

    #[serde(default)]
    pub analyzer: AnalyzerConfig,

    #[serde(default)]
    pub media: MediaConfig,

    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordsConfig {
    /// Directory holding `<id>_MER.pdf` files and call recordings (None = data dir)
    pub root_dir: Option<PathBuf>,
    /// Name of the per-record artifact directory
    #[serde(default = "default_processed_dir_name")]
    pub processed_dir_name: String,
}

impl Default for RecordsConfig {
    fn default() -> Self {
        Self {
            root_dir: None,
            processed_dir_name: default_processed_dir_name(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptionConfig {
    /// Length of each audio chunk sent to the analyzer
    #[serde(default = "default_chunk_seconds")]
    pub chunk_seconds: u64,
    /// Calls longer than this (or of unknown length) are split into chunks
    #[serde(default = "default_chunk_seconds")]
    pub long_call_threshold_secs: u64,
    /// Upper bound on concurrently transcribed chunks per call
    #[serde(default = "default_max_parallel_chunks")]
    pub max_parallel_chunks: usize,
    /// Per-chunk transcription timeout
    #[serde(default = "default_chunk_timeout")]
    pub chunk_timeout_secs: u64,
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            chunk_seconds: default_chunk_seconds(),
            long_call_threshold_secs: default_chunk_seconds(),
            max_parallel_chunks: default_max_parallel_chunks(),
            chunk_timeout_secs: default_chunk_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    /// Analysis provider: "gemini", "none"
    #[serde(default = "default_provider")]
    pub provider: String,
    pub api_key: Option<String>,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            api_key: None,
            model: default_model(),
            temperature: default_temperature(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    #[serde(default = "default_ffmpeg")]
    pub ffmpeg_path: String,
    #[serde(default = "default_ffprobe")]
    pub ffprobe_path: String,
    #[serde(default = "default_pdftotext")]
    pub pdftotext_path: String,
    /// Integrated loudness below this is reported as not audible
    #[serde(default = "default_audible_threshold")]
    pub audible_threshold_dbfs: f64,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: default_ffmpeg(),
            ffprobe_path: default_ffprobe(),
            pdftotext_path: default_pdftotext(),
            audible_threshold_dbfs: default_audible_threshold(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Path to SQLite database
    pub database_path: Option<PathBuf>,
    /// Runs left in `processing` longer than this no longer block a record
    #[serde(default = "default_stale_run_minutes")]
    pub stale_run_minutes: i64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            stale_run_minutes: default_stale_run_minutes(),
        }
    }
}

fn default_processed_dir_name() -> String {
    "_processed".to_string()
}

fn default_chunk_seconds() -> u64 {
    300
}

fn default_max_parallel_chunks() -> usize {
    8
}

fn default_chunk_timeout() -> u64 {
    240
}

fn default_provider() -> String {
    "gemini".to_string()
}

fn default_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_temperature() -> f32 {
    0.1
}

fn default_request_timeout() -> u64 {
    300
}

fn default_ffmpeg() -> String {
    "ffmpeg".to_string()
}

fn default_ffprobe() -> String {
    "ffprobe".to_string()
}

fn default_pdftotext() -> String {
    "pdftotext".to_string()
}

fn default_audible_threshold() -> f64 {
    -40.0
}

fn default_stale_run_minutes() -> i64 {
    360
}
