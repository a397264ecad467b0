//! Typed views of the analyzer's QA and QC reports.
//!
//! Every field is optional and shape-tolerant. Keys this crate does not know
//! about are kept in `extra` so a report survives a read-modify-write cycle
//! unchanged apart from the fields we touch.

use crate::analysis::lenient;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// QA analysis of a record: the per-question matrix plus behavioral,
/// documentation, technical and video findings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QaReport {
    #[serde(default, deserialize_with = "lenient::list")]
    pub qa_matrix: Vec<QaMatrixItem>,

    #[serde(default, deserialize_with = "lenient::or_default")]
    pub summary: ReportSummary,

    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub personal_particulars: Value,

    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub process_compliance: Value,

    #[serde(default, deserialize_with = "lenient::or_default")]
    pub behavioral_flags: BehavioralFlags,

    #[serde(default, deserialize_with = "lenient::or_default")]
    pub documentation_quality: DocumentationQuality,

    #[serde(default, deserialize_with = "lenient::or_default")]
    pub data_validation: DataValidation,

    #[serde(default, deserialize_with = "lenient::or_default")]
    pub technical_status: TechnicalStatus,

    #[serde(default, deserialize_with = "lenient::or_default")]
    pub video_analysis: VideoAnalysis,

    #[serde(default, deserialize_with = "lenient::or_default")]
    pub meta: ReportMeta,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl QaReport {
    /// Anything that is not a JSON object yields an empty report.
    pub fn from_value(value: Value) -> Self {
        serde_json::from_value(value).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.qa_matrix.is_empty() && self.extra.is_empty() && self.personal_particulars.is_null()
    }

    /// Customer name as recorded under `personal_particulars.name`.
    pub fn customer_name(&self) -> Option<String> {
        self.personal_particulars
            .get("name")
            .and_then(lenient::scalar_text)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QaMatrixItem {
    #[serde(default, deserialize_with = "lenient::string")]
    pub question_id: Option<String>,

    #[serde(default, deserialize_with = "lenient::string")]
    pub question_text: Option<String>,

    #[serde(default, deserialize_with = "lenient::string")]
    pub captured_response: Option<String>,

    #[serde(default, deserialize_with = "lenient::string")]
    pub expected_response: Option<String>,

    #[serde(default, deserialize_with = "lenient::string")]
    pub status: Option<String>,

    #[serde(
        default,
        deserialize_with = "lenient::or_default",
        skip_serializing_if = "Option::is_none"
    )]
    pub typo_in_expected_response: Option<TypoCheck>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl QaMatrixItem {
    /// Trimmed question id, empty when absent.
    pub fn id(&self) -> &str {
        self.question_id.as_deref().unwrap_or("").trim()
    }

    /// Exact, case-insensitive status comparison.
    pub fn status_is(&self, status: &str) -> bool {
        self.status
            .as_deref()
            .is_some_and(|s| s.trim().eq_ignore_ascii_case(status))
    }

    pub fn has_typo(&self) -> bool {
        self.typo_in_expected_response
            .as_ref()
            .is_some_and(|t| lenient::to_bool(&t.has_typo) == Some(true))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TypoCheck {
    #[serde(default)]
    pub has_typo: Value,

    #[serde(default, deserialize_with = "lenient::string")]
    pub corrected_text: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportSummary {
    #[serde(default, deserialize_with = "lenient::list")]
    pub critical_issues: Vec<Value>,

    #[serde(default, deserialize_with = "lenient::list")]
    pub recommendations: Vec<Value>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BehavioralFlags {
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub prompting_detected: FlagObservation,

    #[serde(default, deserialize_with = "lenient::or_default")]
    pub customer_hesitation: FlagObservation,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A behavioral observation with its supporting evidence.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FlagObservation {
    #[serde(default)]
    pub value: Value,

    #[serde(default, deserialize_with = "lenient::list")]
    pub timestamps: Vec<Value>,

    #[serde(default, deserialize_with = "lenient::list")]
    pub examples: Vec<Value>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl FlagObservation {
    pub fn is_detected(&self) -> bool {
        lenient::to_bool(&self.value) == Some(true)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentationQuality {
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub spelling_errors_count: Value,

    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub typos_found: Value,

    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub notes: Value,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl DocumentationQuality {
    pub fn from_value(value: Value) -> Self {
        serde_json::from_value(value).unwrap_or_default()
    }

    /// Spelling error count; missing or non-numeric counts as zero.
    pub fn spelling_errors(&self) -> i64 {
        lenient::to_i64(&self.spelling_errors_count).unwrap_or(0)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DataValidation {
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub height_cm: Value,

    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub weight_kg: Value,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TechnicalStatus {
    /// Only an explicit boolean counts; anything else reads as unknown.
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub recording_exists: Option<bool>,

    #[serde(default, deserialize_with = "lenient::string")]
    pub audibility_level: Option<String>,

    #[serde(default, deserialize_with = "lenient::or_default")]
    pub avg_dbfs: Option<f64>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VideoAnalysis {
    #[serde(default, deserialize_with = "lenient::string")]
    pub attire_check: Option<String>,

    #[serde(default, deserialize_with = "lenient::string")]
    pub visibility_status: Option<String>,

    /// `true`, `false`, `null` or `"NA"`.
    #[serde(default)]
    pub privacy_maintained: Value,

    #[serde(default, deserialize_with = "lenient::list")]
    pub screenshots: Vec<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl VideoAnalysis {
    pub fn from_value(value: Value) -> Self {
        serde_json::from_value(value).unwrap_or_default()
    }

    /// Status for a call with no video frames.
    pub fn not_applicable() -> Self {
        Self {
            attire_check: Some("NA".to_string()),
            visibility_status: Some("NA".to_string()),
            privacy_maintained: Value::String("NA".to_string()),
            screenshots: Vec::new(),
            extra: Map::new(),
        }
    }

    /// Status when frames exist but could not be judged.
    pub fn unknown(screenshots: Vec<String>) -> Self {
        Self {
            attire_check: Some("unknown".to_string()),
            visibility_status: Some("unknown".to_string()),
            privacy_maintained: Value::Null,
            screenshots,
            extra: Map::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportMeta {
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub doctor_wpm: Value,

    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub customer_wpm: Value,

    #[serde(
        default,
        deserialize_with = "lenient::string",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<String>,

    #[serde(
        default,
        deserialize_with = "lenient::string",
        skip_serializing_if = "Option::is_none"
    )]
    pub employee: Option<String>,

    #[serde(
        default,
        deserialize_with = "lenient::string",
        skip_serializing_if = "Option::is_none"
    )]
    pub doctor_name: Option<String>,

    #[serde(
        default,
        deserialize_with = "lenient::string",
        skip_serializing_if = "Option::is_none"
    )]
    pub insurance_company: Option<String>,

    #[serde(
        default,
        deserialize_with = "lenient::string",
        skip_serializing_if = "Option::is_none"
    )]
    pub date: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ReportMeta {
    pub fn doctor_wpm(&self) -> Option<f64> {
        lenient::to_f64(&self.doctor_wpm)
    }
}

/// Behavioral QC judgments keyed by dimension name.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QcParametersReport {
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub qc_parameters: Map<String, Value>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl QcParametersReport {
    pub fn from_value(value: Value) -> Self {
        serde_json::from_value(value).unwrap_or_default()
    }

    /// Raw `value` of a dimension, if present.
    pub fn value(&self, dimension: &str) -> Option<&Value> {
        self.qc_parameters.get(dimension)?.get("value")
    }

    /// Trimmed, lowercased `value` of a dimension. Booleans read as `yes`/`no`;
    /// missing dimensions read as the empty string.
    pub fn value_text(&self, dimension: &str) -> String {
        match self.value(dimension) {
            Some(Value::Bool(true)) => "yes".to_string(),
            Some(Value::Bool(false)) => "no".to_string(),
            Some(other) => lenient::normalized(other),
            None => String::new(),
        }
    }
}
