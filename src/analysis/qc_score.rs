//! Fixed-weight QC score: sixteen dimensions of 100 points each.

use crate::analysis::report::{QaReport, QcParametersReport};
use crate::analysis::round2;
use crate::analysis::summary::compute_ui_summary;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const MAX_SCORE: u32 = 1600;

/// How a categorical QC value maps onto points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Policy {
    /// yes => 100
    Binary,
    /// yes => 100, partial => 50
    Graded,
    /// yes or na => 100
    Contextual,
}

impl Policy {
    fn score(self, value: &str) -> u32 {
        match (self, value) {
            (_, "yes") => 100,
            (Policy::Graded, "partial") => 50,
            (Policy::Contextual, "na") => 100,
            _ => 0,
        }
    }
}

/// Banding for percentage dimensions; only a perfect 100% earns full marks.
fn percentage_band(pct: f64) -> u32 {
    match pct {
        p if p >= 100.0 => 100,
        p if p >= 95.0 => 80,
        p if p >= 85.0 => 60,
        p if p >= 70.0 => 40,
        _ => 20,
    }
}

fn call_duration_score(minutes: f64) -> u32 {
    if minutes >= 10.0 {
        100
    } else if minutes >= 7.0 {
        70
    } else {
        30
    }
}

/// An unknown (or zero) rate is neutral rather than penalised.
fn rate_of_speech_score(doctor_wpm: Option<f64>) -> u32 {
    let wpm = match doctor_wpm {
        Some(w) if w != 0.0 => w,
        _ => return 50,
    };
    if (120.0..=160.0).contains(&wpm) {
        100
    } else if (100.0..120.0).contains(&wpm) || (wpm > 160.0 && wpm <= 180.0) {
        70
    } else if (80.0..100.0).contains(&wpm) || (wpm > 180.0 && wpm <= 200.0) {
        30
    } else {
        0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QcCategory {
    #[serde(rename = "Good")]
    Good,
    #[serde(rename = "Above Average")]
    AboveAverage,
    #[serde(rename = "Average")]
    Average,
    #[serde(rename = "Poor")]
    Poor,
}

impl QcCategory {
    /// Bands are inclusive floors on raw points, not on the percentage.
    pub fn from_total(total: u32) -> Self {
        match total {
            t if t >= 1500 => QcCategory::Good,
            t if t >= 1400 => QcCategory::AboveAverage,
            t if t >= 1300 => QcCategory::Average,
            _ => QcCategory::Poor,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            QcCategory::Good => "Good",
            QcCategory::AboveAverage => "Above Average",
            QcCategory::Average => "Average",
            QcCategory::Poor => "Poor",
        }
    }
}

impl fmt::Display for QcCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub greetings: u32,
    pub call_opening: u32,
    pub language_preference: u32,
    pub id_validation: u32,
    pub disclaimer: u32,
    pub politeness: u32,
    pub empathy: u32,
    pub communication_skills: u32,
    pub probing: u32,
    pub observations: u32,
    pub call_closure: u32,
    pub complete_mer_questions: u32,
    pub correct_documentation: u32,
    pub call_duration: u32,
    pub rate_of_speech: u32,
    pub visual_presentation: u32,
}

impl ScoreBreakdown {
    pub fn entries(&self) -> [(&'static str, u32); 16] {
        [
            ("greetings", self.greetings),
            ("call_opening", self.call_opening),
            ("language_preference", self.language_preference),
            ("id_validation", self.id_validation),
            ("disclaimer", self.disclaimer),
            ("politeness", self.politeness),
            ("empathy", self.empathy),
            ("communication_skills", self.communication_skills),
            ("probing", self.probing),
            ("observations", self.observations),
            ("call_closure", self.call_closure),
            ("complete_mer_questions", self.complete_mer_questions),
            ("correct_documentation", self.correct_documentation),
            ("call_duration", self.call_duration),
            ("rate_of_speech", self.rate_of_speech),
            ("visual_presentation", self.visual_presentation),
        ]
    }

    pub fn total(&self) -> u32 {
        self.entries().iter().map(|(_, points)| points).sum()
    }
}

/// Intermediate values kept for auditing a score.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreInputs {
    pub complete_mer_pct: f64,
    pub correct_documentation_pct: f64,
    pub call_duration_min: f64,
    pub doctor_wpm: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QcScore {
    pub total_score: u32,
    pub max_score: u32,
    pub percentage: f64,
    pub category: QcCategory,
    pub breakdown: ScoreBreakdown,
    pub derived: ScoreInputs,
}

/// Score a record from its QA report, QC parameters and call duration.
///
/// The doctor's WPM is read from `meta.doctor_wpm` of the QA report.
pub fn compute_qc_score(
    qa_report: &QaReport,
    qc_parameters: &QcParametersReport,
    duration_seconds: Option<f64>,
) -> QcScore {
    let summary = compute_ui_summary(qa_report);
    let complete_mer_pct = summary.asked_pct();
    let correct_documentation_pct = summary.overall_compliance_score;
    let call_duration_min = duration_seconds
        .filter(|d| d.is_finite())
        .map(|d| d / 60.0)
        .unwrap_or(0.0);
    let doctor_wpm = qa_report.meta.doctor_wpm();

    let qc = |dimension: &str, policy: Policy| policy.score(&qc_parameters.value_text(dimension));

    let breakdown = ScoreBreakdown {
        greetings: qc("greetings", Policy::Binary),
        call_opening: qc("call_opening", Policy::Graded),
        language_preference: qc("language_preference", Policy::Binary),
        id_validation: qc("id_validation", Policy::Binary),
        disclaimer: qc("disclaimer", Policy::Binary),
        politeness: qc("politeness", Policy::Graded),
        empathy: qc("empathy", Policy::Contextual),
        communication_skills: qc("communication_skills", Policy::Graded),
        probing: qc("probing", Policy::Contextual),
        observations: qc("observations", Policy::Contextual),
        call_closure: qc("call_closure", Policy::Graded),
        complete_mer_questions: percentage_band(complete_mer_pct),
        correct_documentation: percentage_band(correct_documentation_pct),
        call_duration: call_duration_score(call_duration_min),
        rate_of_speech: rate_of_speech_score(doctor_wpm),
        visual_presentation: 100,
    };

    let total_score = breakdown.total();
    QcScore {
        total_score,
        max_score: MAX_SCORE,
        percentage: round2(f64::from(total_score) / f64::from(MAX_SCORE) * 100.0),
        category: QcCategory::from_total(total_score),
        breakdown,
        derived: ScoreInputs {
            complete_mer_pct: round2(complete_mer_pct),
            correct_documentation_pct: round2(correct_documentation_pct),
            call_duration_min: round2(call_duration_min),
            doctor_wpm: doctor_wpm.map(round2),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    const DIMENSIONS: [&str; 11] = [
        "greetings",
        "call_opening",
        "language_preference",
        "id_validation",
        "disclaimer",
        "politeness",
        "empathy",
        "communication_skills",
        "probing",
        "observations",
        "call_closure",
    ];

    fn all_yes() -> QcParametersReport {
        let params: serde_json::Map<String, Value> = DIMENSIONS
            .iter()
            .map(|d| (d.to_string(), json!({"value": "Yes", "explanation": "observed"})))
            .collect();
        QcParametersReport::from_value(json!({ "qc_parameters": params }))
    }

    fn correct_report(doctor_wpm: Value) -> QaReport {
        QaReport::from_value(json!({
            "qa_matrix": [
                {"question_id": "1.1", "status": "Correct"},
                {"question_id": "1.2", "status": "Correct"}
            ],
            "meta": {"doctor_wpm": doctor_wpm}
        }))
    }

    #[test]
    fn test_perfect_record() {
        let score = compute_qc_score(&correct_report(json!(140)), &all_yes(), Some(650.0));
        assert_eq!(score.total_score, 1600);
        assert_eq!(score.max_score, 1600);
        assert_eq!(score.percentage, 100.0);
        assert_eq!(score.category, QcCategory::Good);
        assert_eq!(score.derived.doctor_wpm, Some(140.0));
    }

    #[test]
    fn test_rate_of_speech() {
        assert_eq!(rate_of_speech_score(Some(90.0)), 30);
        assert_eq!(rate_of_speech_score(None), 50);
        assert_eq!(rate_of_speech_score(Some(0.0)), 50);
        assert_eq!(rate_of_speech_score(Some(120.0)), 100);
        assert_eq!(rate_of_speech_score(Some(160.0)), 100);
        assert_eq!(rate_of_speech_score(Some(119.5)), 70);
        assert_eq!(rate_of_speech_score(Some(160.5)), 70);
        assert_eq!(rate_of_speech_score(Some(180.0)), 70);
        assert_eq!(rate_of_speech_score(Some(99.9)), 30);
        assert_eq!(rate_of_speech_score(Some(200.0)), 30);
        assert_eq!(rate_of_speech_score(Some(79.9)), 0);
        assert_eq!(rate_of_speech_score(Some(200.5)), 0);
    }

    #[test]
    fn test_rate_of_speech_from_meta() {
        let qc = all_yes();
        let slow = compute_qc_score(&correct_report(json!(90)), &qc, Some(650.0));
        assert_eq!(slow.breakdown.rate_of_speech, 30);
        let unknown = compute_qc_score(&correct_report(Value::Null), &qc, Some(650.0));
        assert_eq!(unknown.breakdown.rate_of_speech, 50);
        assert_eq!(unknown.derived.doctor_wpm, None);
        let zero = compute_qc_score(&correct_report(json!(0)), &qc, Some(650.0));
        assert_eq!(zero.breakdown.rate_of_speech, 50);
    }

    #[test]
    fn test_call_duration() {
        let report = correct_report(json!(140));
        let qc = all_yes();
        let score = |secs| compute_qc_score(&report, &qc, secs).breakdown.call_duration;
        assert_eq!(score(Some(650.0)), 100);
        assert_eq!(score(Some(420.0)), 70);
        assert_eq!(score(Some(300.0)), 30);
        assert_eq!(score(None), 30);
        assert_eq!(
            compute_qc_score(&report, &qc, Some(650.0)).derived.call_duration_min,
            10.83
        );
    }

    #[test]
    fn test_policies() {
        assert_eq!(Policy::Binary.score("yes"), 100);
        assert_eq!(Policy::Binary.score("partial"), 0);
        assert_eq!(Policy::Graded.score("partial"), 50);
        assert_eq!(Policy::Graded.score("na"), 0);
        assert_eq!(Policy::Contextual.score("na"), 100);
        assert_eq!(Policy::Contextual.score("no"), 0);
    }

    #[test]
    fn test_percentage_band() {
        assert_eq!(percentage_band(100.0), 100);
        assert_eq!(percentage_band(99.99), 80);
        assert_eq!(percentage_band(95.0), 80);
        assert_eq!(percentage_band(85.0), 60);
        assert_eq!(percentage_band(70.0), 40);
        assert_eq!(percentage_band(69.9), 20);
        assert_eq!(percentage_band(0.0), 20);
    }

    #[test]
    fn test_category_bands() {
        assert_eq!(QcCategory::from_total(1600), QcCategory::Good);
        assert_eq!(QcCategory::from_total(1500), QcCategory::Good);
        assert_eq!(QcCategory::from_total(1499), QcCategory::AboveAverage);
        assert_eq!(QcCategory::from_total(1400), QcCategory::AboveAverage);
        assert_eq!(QcCategory::from_total(1300), QcCategory::Average);
        assert_eq!(QcCategory::from_total(1299), QcCategory::Poor);
        assert_eq!(
            serde_json::to_value(QcCategory::AboveAverage).unwrap(),
            json!("Above Average")
        );
    }

    #[test]
    fn test_many_incorrect_lowers_documentation() {
        let mut items: Vec<Value> = (0..9)
            .map(|i| json!({"question_id": format!("2.{i}"), "status": "Incorrect"}))
            .collect();
        items.push(json!({"question_id": "3.1", "status": "Correct"}));
        let report = QaReport::from_value(json!({ "qa_matrix": items }));
        let score = compute_qc_score(&report, &all_yes(), Some(650.0));
        assert_eq!(score.derived.correct_documentation_pct, 10.0);
        assert_eq!(score.breakdown.correct_documentation, 20);
        assert_eq!(score.breakdown.complete_mer_questions, 100);
    }

    #[test]
    fn test_empty_inputs() {
        let score = compute_qc_score(&QaReport::default(), &QcParametersReport::default(), None);
        // percentage bands floor at 20, duration at 30, neutral rate 50, visual 100
        assert_eq!(score.total_score, 20 + 20 + 30 + 50 + 100);
        assert_eq!(score.category, QcCategory::Poor);
    }

    #[test]
    fn test_breakdown_serializes_all_dimensions() {
        let score = compute_qc_score(&correct_report(json!(140)), &all_yes(), Some(650.0));
        let value = serde_json::to_value(&score).unwrap();
        let breakdown = value["breakdown"].as_object().unwrap();
        assert_eq!(breakdown.len(), 16);
        assert_eq!(value["category"], json!("Good"));
    }
}
