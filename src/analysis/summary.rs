//! Count-based compliance metrics over the QA matrix.

use crate::analysis::report::{QaMatrixItem, QaReport};
use crate::analysis::round2;
use crate::transcription::Transcript;
use serde::{Deserialize, Serialize};

/// Canonical question status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NormalizedStatus {
    Incorrect,
    Missing,
    Clubbed,
    Paraphrased,
    Correct,
    Unknown,
}

impl NormalizedStatus {
    /// Substring needles, first match wins. Order matters: "incorrect"
    /// contains "correct", and free-text variants such as
    /// "Paraphrased (correct)" must land on the more specific status.
    const PRECEDENCE: [(&'static str, NormalizedStatus); 5] = [
        ("incorrect", NormalizedStatus::Incorrect),
        ("missing", NormalizedStatus::Missing),
        ("clubbed", NormalizedStatus::Clubbed),
        ("paraphrased", NormalizedStatus::Paraphrased),
        ("correct", NormalizedStatus::Correct),
    ];

    pub fn from_raw(raw: Option<&str>) -> Self {
        let status = raw.unwrap_or("").trim().to_lowercase();
        Self::PRECEDENCE
            .iter()
            .find(|(needle, _)| status.contains(needle))
            .map(|(_, normalized)| *normalized)
            .unwrap_or(NormalizedStatus::Unknown)
    }
}

const NOT_APPLICABLE: [&str; 6] = ["", "na", "n/a", "not applicable", "null", "none"];

/// Personal-particulars items with no expected answer are not scored.
fn is_excluded(item: &QaMatrixItem) -> bool {
    let is_personal = item.id().to_ascii_lowercase().starts_with("pp.");
    let expected = item
        .expected_response
        .as_deref()
        .unwrap_or("")
        .trim()
        .to_lowercase();
    is_personal && NOT_APPLICABLE.contains(&expected.as_str())
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UiSummary {
    pub overall_compliance_score: f64,
    pub total_questions: u32,
    pub questions_asked: u32,
    pub questions_missed: u32,
    pub incorrect_responses: u32,
    pub paraphrased_responses: u32,
    pub clubbed_questions: u32,
    pub critical_errors: u32,
}

impl UiSummary {
    /// Share of scored questions that were asked, 0 when nothing is scored.
    pub fn asked_pct(&self) -> f64 {
        if self.total_questions == 0 {
            return 0.0;
        }
        f64::from(self.questions_asked) / f64::from(self.total_questions) * 100.0
    }
}

/// Summarise the QA matrix.
///
/// Statuses that match no known needle still count towards the total, and
/// since `questions_asked` is `total - missing` they count as asked too.
pub fn compute_ui_summary(report: &QaReport) -> UiSummary {
    let mut summary = UiSummary::default();
    let mut correct = 0u32;

    for item in report.qa_matrix.iter().filter(|item| !is_excluded(item)) {
        summary.total_questions += 1;
        match NormalizedStatus::from_raw(item.status.as_deref()) {
            NormalizedStatus::Missing => summary.questions_missed += 1,
            NormalizedStatus::Incorrect => summary.incorrect_responses += 1,
            NormalizedStatus::Paraphrased => summary.paraphrased_responses += 1,
            NormalizedStatus::Clubbed => summary.clubbed_questions += 1,
            NormalizedStatus::Correct => correct += 1,
            NormalizedStatus::Unknown => {}
        }
    }

    summary.questions_asked = summary.total_questions - summary.questions_missed;
    summary.critical_errors = report.summary.critical_issues.len() as u32;
    summary.overall_compliance_score = if summary.total_questions > 0 {
        round2(f64::from(correct) / f64::from(summary.total_questions) * 100.0)
    } else {
        0.0
    };
    summary
}

/// Headline figures shown for a record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TopMetrics {
    pub accuracy: f64,
    pub questions_asked: u32,
    pub total_questions: u32,
    pub documentation_errors: u32,
    pub questions_missed: u32,
    pub paraphrased_responses: u32,
    pub clubbed_questions: u32,
    pub critical_errors: u32,
    pub id: Option<String>,
    pub employee: Option<String>,
    /// `M:SS`, truncated to the whole second.
    pub duration: Option<String>,
}

pub fn derive_top_metrics(report: &QaReport, duration_seconds: Option<f64>) -> TopMetrics {
    let summary = compute_ui_summary(report);
    let duration = duration_seconds
        .filter(|d| d.is_finite() && *d > 0.0)
        .map(|d| {
            let whole = d.floor() as u64;
            format!("{}:{:02}", whole / 60, whole % 60)
        });

    TopMetrics {
        accuracy: summary.overall_compliance_score,
        questions_asked: summary.questions_asked,
        total_questions: summary.total_questions,
        documentation_errors: summary.incorrect_responses,
        questions_missed: summary.questions_missed,
        paraphrased_responses: summary.paraphrased_responses,
        clubbed_questions: summary.clubbed_questions,
        critical_errors: summary.critical_errors,
        id: report.meta.id.clone(),
        employee: report.meta.employee.clone(),
        duration,
    }
}

/// Media duration when it is known, otherwise the last transcript end offset.
pub fn effective_duration_seconds(media_seconds: Option<f64>, transcript: &Transcript) -> Option<f64> {
    media_seconds
        .filter(|d| d.is_finite() && *d > 0.0)
        .or_else(|| transcript.max_end_seconds().filter(|end| *end > 0.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcription::Segment;
    use serde_json::json;

    fn report(items: serde_json::Value) -> QaReport {
        QaReport::from_value(json!({ "qa_matrix": items }))
    }

    #[test]
    fn test_status_precedence() {
        use NormalizedStatus::*;
        assert_eq!(NormalizedStatus::from_raw(Some("Incorrect (minor)")), Incorrect);
        assert_eq!(NormalizedStatus::from_raw(Some(" CORRECT ")), Correct);
        assert_eq!(NormalizedStatus::from_raw(Some("Paraphrased but correct")), Paraphrased);
        assert_eq!(NormalizedStatus::from_raw(Some("missing / clubbed")), Missing);
        assert_eq!(NormalizedStatus::from_raw(Some("Clubbed")), Clubbed);
        assert_eq!(NormalizedStatus::from_raw(Some("NA")), Unknown);
        assert_eq!(NormalizedStatus::from_raw(None), Unknown);
    }

    #[test]
    fn test_empty_matrix() {
        let summary = compute_ui_summary(&QaReport::default());
        assert_eq!(summary.total_questions, 0);
        assert_eq!(summary.overall_compliance_score, 0.0);
        assert_eq!(summary.asked_pct(), 0.0);
    }

    #[test]
    fn test_personal_particulars_exclusion() {
        let excluded = report(json!([
            {"question_id": "PP.Name", "expected_response": "NA", "status": "Correct"}
        ]));
        assert_eq!(compute_ui_summary(&excluded).total_questions, 0);

        let included = report(json!([
            {"question_id": "PP.Name", "expected_response": "John Doe", "status": "Correct"}
        ]));
        let summary = compute_ui_summary(&included);
        assert_eq!(summary.total_questions, 1);
        assert_eq!(summary.overall_compliance_score, 100.0);

        let lowercase = report(json!([
            {"question_id": "pp.dob", "expected_response": " n/a ", "status": "Missing"},
            {"question_id": "PP.Email", "status": "Missing"},
            {"question_id": "3.1", "expected_response": "NA", "status": "Missing"}
        ]));
        let summary = compute_ui_summary(&lowercase);
        assert_eq!(summary.total_questions, 1);
        assert_eq!(summary.questions_missed, 1);
    }

    #[test]
    fn test_counts() {
        let report = QaReport::from_value(json!({
            "qa_matrix": [
                {"question_id": "1.1", "status": "Correct"},
                {"question_id": "1.2", "status": "Correct"},
                {"question_id": "1.3", "status": "Incorrect"},
                {"question_id": "1.4", "status": "Missing"},
                {"question_id": "1.5", "status": "Paraphrased"},
                {"question_id": "1.6", "status": "Clubbed"},
                {"question_id": "1.7", "status": ""}
            ],
            "summary": {"critical_issues": ["a", "b"]}
        }));
        let summary = compute_ui_summary(&report);
        assert_eq!(summary.total_questions, 7);
        assert_eq!(summary.questions_missed, 1);
        assert_eq!(summary.questions_asked, 6);
        assert_eq!(summary.incorrect_responses, 1);
        assert_eq!(summary.paraphrased_responses, 1);
        assert_eq!(summary.clubbed_questions, 1);
        assert_eq!(summary.critical_errors, 2);
        assert_eq!(summary.overall_compliance_score, 28.57);
    }

    #[test]
    fn test_top_metrics() {
        let mut report = report(json!([{"question_id": "1.1", "status": "Incorrect"}]));
        report.meta.id = Some("R-7".to_string());
        let top = derive_top_metrics(&report, Some(125.9));
        assert_eq!(top.duration.as_deref(), Some("2:05"));
        assert_eq!(top.documentation_errors, 1);
        assert_eq!(top.id.as_deref(), Some("R-7"));
        assert!(derive_top_metrics(&report, Some(0.0)).duration.is_none());
        assert!(derive_top_metrics(&report, None).duration.is_none());
    }

    #[test]
    fn test_effective_duration() {
        let transcript = Transcript {
            segments: vec![
                Segment::new("1", "agent", "0:00", "1:10", "hello"),
                Segment::new("2", "customer", "1:10", "bad", "hi"),
                Segment::new("3", "customer", "0:30", "2:05", "yes"),
            ],
        };
        assert_eq!(effective_duration_seconds(Some(300.0), &transcript), Some(300.0));
        assert_eq!(effective_duration_seconds(Some(0.0), &transcript), Some(125.0));
        assert_eq!(effective_duration_seconds(None, &Transcript::default()), None);
    }
}
