use crate::analysis::{lenient, timestamp};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub mod merge;
pub mod parallel;

/// One utterance of a call transcript.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    #[serde(default, deserialize_with = "lenient::text")]
    pub segment_id: String,

    #[serde(default, deserialize_with = "lenient::text")]
    pub text: String,

    #[serde(default, deserialize_with = "lenient::text")]
    pub speaker: String,

    /// `M:SS` offset from the start of the call
    #[serde(default, deserialize_with = "lenient::text")]
    pub start_timestamp: String,

    #[serde(default, deserialize_with = "lenient::text")]
    pub end_timestamp: String,

    /// Set on merged transcripts: 1-based index of the source call
    #[serde(
        default,
        deserialize_with = "lenient::or_default",
        skip_serializing_if = "Option::is_none"
    )]
    pub call_index: Option<u32>,
}

/// Who is speaking. Doctors are recorded as either `doctor` or `agent`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeakerRole {
    Agent,
    Customer,
}

impl Segment {
    pub fn new(id: &str, speaker: &str, start: &str, end: &str, text: &str) -> Self {
        Self {
            segment_id: id.to_string(),
            text: text.to_string(),
            speaker: speaker.to_string(),
            start_timestamp: start.to_string(),
            end_timestamp: end.to_string(),
            call_index: None,
        }
    }

    pub fn role(&self) -> Option<SpeakerRole> {
        match self.speaker.trim().to_lowercase().as_str() {
            "doctor" | "agent" => Some(SpeakerRole::Agent),
            "customer" => Some(SpeakerRole::Customer),
            _ => None,
        }
    }

    /// `(start, end)` in seconds, or `None` if either timestamp is invalid
    /// or the segment has no positive length.
    pub fn interval(&self) -> Option<(f64, f64)> {
        let start = timestamp::parse_secs(&self.start_timestamp)?;
        let end = timestamp::parse_secs(&self.end_timestamp)?;
        (end > start).then_some((start, end))
    }
}

/// Ordered segments of one call, or of several calls after merging.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    #[serde(default, deserialize_with = "lenient::list")]
    pub segments: Vec<Segment>,
}

impl Transcript {
    /// Read a transcript from analyzer output.
    ///
    /// Besides `{segments: [...]}` this accepts `{raw_text: "..."}` where the
    /// text holds the JSON, possibly code-fenced. Anything else is empty.
    pub fn from_value(value: Value) -> Self {
        if let Some(raw) = value.get("raw_text").and_then(Value::as_str) {
            if value.get("segments").is_none() {
                return lenient::extract_json(raw)
                    .filter(|inner| inner.get("raw_text").is_none())
                    .map(Self::from_value)
                    .unwrap_or_default();
            }
        }
        serde_json::from_value(value).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Latest parseable end offset in seconds.
    pub fn max_end_seconds(&self) -> Option<f64> {
        self.segments
            .iter()
            .filter_map(|s| timestamp::parse_secs(&s.end_timestamp))
            .reduce(f64::max)
    }
}
