use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::analysis::report::{QaReport, QcParametersReport};
use crate::error::Result;
use crate::transcription::Transcript;

pub const MERGED_TRANSCRIPT: &str = "merged_transcript.json";
pub const MERGED_TRANSCRIPT_TEXT: &str = "merged_transcript.txt";
pub const MERGED_QA_REPORT: &str = "merged_qa_report.json";
pub const MERGED_QC_REPORT: &str = "merged_qa_report_part2.json";
pub const QC_SCORE: &str = "qc_score.json";
pub const FINAL_DECISION: &str = "final_decision.json";
pub const PROCESSING_SUMMARY: &str = "processing_summary.json";
pub const PROCESS_LOG: &str = "process.log";

const CALL_TRANSCRIPT: &str = "transcript.json";
const CALL_QA_REPORT: &str = "qa_report.json";
const CALL_QC_REPORT: &str = "qa_report_part2.json";

/// Derived artifacts of one record, kept under `<root>/<id>/<processed_dir>/`.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    record_id: String,
    dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(records_root: &Path, processed_dir_name: &str, record_id: &str) -> Self {
        Self {
            record_id: record_id.to_string(),
            dir: records_root.join(record_id).join(processed_dir_name),
        }
    }

    pub fn record_id(&self) -> &str {
        &self.record_id
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn ensure(&self) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        Ok(())
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    pub fn call_dir(&self, index: u32) -> PathBuf {
        self.dir.join(format!("call{}", index))
    }

    pub fn call_transcript_path(&self, index: u32) -> PathBuf {
        self.call_dir(index).join(CALL_TRANSCRIPT)
    }

    pub fn chunks_dir(&self, index: u32) -> PathBuf {
        self.call_dir(index).join("chunks")
    }

    pub fn extracted_audio_path(&self, index: u32) -> PathBuf {
        self.call_dir(index).join("audio.mp3")
    }

    /// Parsed JSON at `path`; `None` when the file is missing or malformed.
    fn parse_file(path: &Path) -> Option<Value> {
        let content = fs::read_to_string(path).ok()?;
        match serde_json::from_str(&content) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!("Ignoring malformed {}: {}", path.display(), e);
                None
            }
        }
    }

    /// JSON at `path`, or an empty object when the file is missing or unreadable.
    pub fn read_value(path: &Path) -> Value {
        Self::parse_file(path).unwrap_or_else(|| Value::Object(Default::default()))
    }

    /// Typed artifact, or `None` when it is missing, malformed or of the wrong shape.
    pub fn read_json<T>(&self, name: &str) -> Option<T>
    where
        T: DeserializeOwned,
    {
        let path = self.path(name);
        let value = Self::parse_file(&path)?;
        match serde_json::from_value(value) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                tracing::warn!("Ignoring unexpected {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Write `value` as pretty JSON, creating parent directories as needed.
    pub fn write_json_at<T: Serialize>(path: &Path, value: &T) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(value)?)?;
        Ok(())
    }

    pub fn write_json<T: Serialize>(&self, name: &str, value: &T) -> Result<PathBuf> {
        let path = self.path(name);
        Self::write_json_at(&path, value)?;
        Ok(path)
    }

    pub fn write_text(&self, name: &str, text: &str) -> Result<PathBuf> {
        self.ensure()?;
        let path = self.path(name);
        fs::write(&path, text)?;
        Ok(path)
    }

    /// Append a timestamped step to the record's `process.log`.
    pub fn log(&self, message: &str) {
        tracing::info!("[{}] {}", self.record_id, message);
        let line = format!("[{}] {}\n", chrono::Local::now().format("%H:%M:%S"), message);
        let written = self.ensure().map_err(|e| e.to_string()).and_then(|_| {
            OpenOptions::new()
                .create(true)
                .append(true)
                .open(self.path(PROCESS_LOG))
                .and_then(|mut f| f.write_all(line.as_bytes()))
                .map_err(|e| e.to_string())
        });
        if let Err(e) = written {
            tracing::warn!("Could not write process log for {}: {}", self.record_id, e);
        }
    }

    pub fn load_call_transcript(&self, index: u32) -> Option<Transcript> {
        let path = self.call_transcript_path(index);
        path.exists()
            .then(|| Transcript::from_value(Self::read_value(&path)))
    }

    pub fn load_merged_transcript(&self) -> Transcript {
        Transcript::from_value(Self::read_value(&self.path(MERGED_TRANSCRIPT)))
    }

    fn merged_or_first_call(&self, merged: &str, per_call: &str) -> Option<Value> {
        [self.path(merged), self.call_dir(1).join(per_call)]
            .iter()
            .find_map(|p| Self::parse_file(p))
    }

    /// The merged QA report, falling back to the first call's report.
    /// Unparseable reports are skipped.
    pub fn load_qa_report(&self) -> Option<QaReport> {
        self.merged_or_first_call(MERGED_QA_REPORT, CALL_QA_REPORT)
            .map(QaReport::from_value)
    }

    /// The merged QC parameters, falling back to the first call's, else empty.
    pub fn load_qc_parameters(&self) -> QcParametersReport {
        self.merged_or_first_call(MERGED_QC_REPORT, CALL_QC_REPORT)
            .map(QcParametersReport::from_value)
            .unwrap_or_default()
    }

    /// A record counts as processed once a readable QA report exists.
    pub fn is_processed(&self) -> bool {
        self.load_qa_report().is_some()
    }
}
