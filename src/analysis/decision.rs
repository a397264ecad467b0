//! Escalation rules that triage a processed record.
//!
//! Each rule is an independent predicate over the QA report and QC
//! parameters, so a record can land in several buckets at once. The only
//! coupling is prompting: minor prompting is defined as the complement of
//! major prompting, which guarantees exactly one of the two fires.

use crate::analysis::lenient;
use crate::analysis::report::{QaMatrixItem, QaReport, QcParametersReport};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    pub issue: String,
    #[serde(default)]
    pub details: Value,
}

impl Issue {
    fn new(issue: &str, details: Value) -> Self {
        Self {
            issue: issue.to_string(),
            details,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    #[serde(rename = "ASSIGNBACK", default)]
    pub assignback: Vec<Issue>,
    #[serde(rename = "OPS_ATTENTION", default)]
    pub ops_attention: Vec<Issue>,
    #[serde(rename = "FLAGS", default)]
    pub flags: Vec<Issue>,
    #[serde(rename = "TECH_ISSUES", default)]
    pub tech_issues: Vec<Issue>,
}

/// Most severe bucket a record falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Triage {
    Assignback,
    OpsAttention,
    TechIssues,
    Flags,
    Pass,
}

impl Triage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Triage::Assignback => "assignback",
            Triage::OpsAttention => "ops_attention",
            Triage::TechIssues => "tech_issues",
            Triage::Flags => "flags",
            Triage::Pass => "pass",
        }
    }
}

impl Decision {
    pub fn triage(&self) -> Triage {
        if !self.assignback.is_empty() {
            Triage::Assignback
        } else if !self.ops_attention.is_empty() {
            Triage::OpsAttention
        } else if !self.tech_issues.is_empty() {
            Triage::TechIssues
        } else if !self.flags.is_empty() {
            Triage::Flags
        } else {
            Triage::Pass
        }
    }

    pub fn issue_count(&self) -> usize {
        self.assignback.len() + self.ops_attention.len() + self.flags.len() + self.tech_issues.len()
    }

    pub fn buckets(&self) -> [(&'static str, &[Issue]); 4] {
        [
            ("ASSIGNBACK", &self.assignback),
            ("OPS_ATTENTION", &self.ops_attention),
            ("FLAGS", &self.flags),
            ("TECH_ISSUES", &self.tech_issues),
        ]
    }
}

type Rule = fn(&QaReport, &QcParametersReport) -> Option<Issue>;

const ASSIGNBACK_RULES: &[Rule] = &[
    questions_missing,
    customer_name_incorrect,
    id_proof_missing,
    clubbed_questions,
    many_incorrect_entries,
    disclaimer_missing,
    self_introduction_missing,
    major_prompting,
    apron_missing,
];

const OPS_ATTENTION_RULES: &[Rule] = &[
    multiple_typos,
    spelling_errors,
    date_of_birth_incorrect,
    some_incorrect_entries,
    occupation_incorrect,
];

const FLAG_RULES: &[Rule] = &[
    minor_prompting,
    customer_hesitation,
    height_out_of_range,
    weight_out_of_range,
    contradictory_responses,
    privacy_breach,
    unprofessional_behavior,
];

const TECH_RULES: &[Rule] = &[recording_missing, voice_not_audible, participants_not_visible];

/// Apply every rule and collect the issues by bucket.
pub fn build_decision(qa: &QaReport, qc: &QcParametersReport) -> Decision {
    let apply = |rules: &[Rule]| -> Vec<Issue> { rules.iter().filter_map(|rule| rule(qa, qc)).collect() };
    Decision {
        assignback: apply(ASSIGNBACK_RULES),
        ops_attention: apply(OPS_ATTENTION_RULES),
        flags: apply(FLAG_RULES),
        tech_issues: apply(TECH_RULES),
    }
}

fn items_with_status<'a>(qa: &'a QaReport, status: &'a str) -> impl Iterator<Item = &'a QaMatrixItem> + 'a {
    qa.qa_matrix.iter().filter(move |item| item.status_is(status))
}

fn first_with_id<'a>(qa: &'a QaReport, ids: &[&str], status: &str) -> Option<&'a QaMatrixItem> {
    qa.qa_matrix
        .iter()
        .find(|item| ids.iter().any(|id| item.id().eq_ignore_ascii_case(id)) && item.status_is(status))
}

fn captured_vs_expected(item: &QaMatrixItem) -> Value {
    json!({
        "captured": item.captured_response,
        "expected": item.expected_response,
    })
}

fn normalized(text: Option<&str>) -> String {
    text.unwrap_or("").trim().to_lowercase()
}

fn incorrect_count(qa: &QaReport) -> usize {
    items_with_status(qa, "incorrect").count()
}

// ASSIGNBACK

fn questions_missing(qa: &QaReport, _: &QcParametersReport) -> Option<Issue> {
    let missing: Vec<Value> = items_with_status(qa, "missing")
        .map(|item| json!({"id": item.question_id, "text": item.question_text}))
        .collect();
    (!missing.is_empty()).then(|| Issue::new("Questions missing", Value::Array(missing)))
}

fn customer_name_incorrect(qa: &QaReport, _: &QcParametersReport) -> Option<Issue> {
    first_with_id(qa, &["pp.name"], "incorrect")
        .map(|item| Issue::new("Customer name incorrect (PP.Name)", captured_vs_expected(item)))
}

fn id_proof_missing(qa: &QaReport, _: &QcParametersReport) -> Option<Issue> {
    let missing: Vec<Value> = items_with_status(qa, "missing")
        .filter(|item| item.id().to_ascii_lowercase().starts_with("pp.id."))
        .map(|item| json!({"id": item.question_id, "expected": item.expected_response}))
        .collect();
    (!missing.is_empty()).then(|| Issue::new("Missing ID proof verification", Value::Array(missing)))
}

fn clubbed_questions(qa: &QaReport, _: &QcParametersReport) -> Option<Issue> {
    let count = items_with_status(qa, "clubbed").count();
    (count >= 2).then(|| Issue::new("2+ clubbed questions", json!({ "count": count })))
}

fn many_incorrect_entries(qa: &QaReport, _: &QcParametersReport) -> Option<Issue> {
    let count = incorrect_count(qa);
    (count >= 8).then(|| Issue::new("Many incorrect documentation entries", json!({ "count": count })))
}

fn disclaimer_missing(_: &QaReport, qc: &QcParametersReport) -> Option<Issue> {
    let given = qc.value("disclaimer").and_then(lenient::to_bool);
    (given == Some(false)).then(|| Issue::new("Disclaimer missing", json!({})))
}

fn self_introduction_missing(_: &QaReport, qc: &QcParametersReport) -> Option<Issue> {
    (qc.value_text("call_opening") == "no").then(|| Issue::new("Doctor self-introduction missing", json!({})))
}

/// Prompting backed by at least two examples or two timestamps.
fn is_major_prompting(qa: &QaReport) -> bool {
    let prompting = &qa.behavioral_flags.prompting_detected;
    prompting.is_detected() && (prompting.examples.len() >= 2 || prompting.timestamps.len() >= 2)
}

fn major_prompting(qa: &QaReport, _: &QcParametersReport) -> Option<Issue> {
    let prompting = &qa.behavioral_flags.prompting_detected;
    is_major_prompting(qa).then(|| {
        Issue::new(
            "Major agent-led prompting detected",
            json!({"examples": prompting.examples, "timestamps": prompting.timestamps}),
        )
    })
}

fn apron_missing(qa: &QaReport, _: &QcParametersReport) -> Option<Issue> {
    let attire = &qa.video_analysis.attire_check;
    matches!(
        normalized(attire.as_deref()).as_str(),
        "no" | "missing_apron" | "not_wearing_apron"
    )
    .then(|| Issue::new("Doctor not wearing apron", json!({ "attire_check": attire })))
}

// OPS_ATTENTION

fn multiple_typos(qa: &QaReport, _: &QcParametersReport) -> Option<Issue> {
    let typos: Vec<&QaMatrixItem> = qa.qa_matrix.iter().filter(|item| item.has_typo()).collect();
    if typos.len() < 3 {
        return None;
    }
    let examples: Vec<Value> = typos
        .iter()
        .take(5)
        .map(|item| {
            json!({
                "id": item.question_id,
                "expected": item.expected_response,
                "corrected": item.typo_in_expected_response.as_ref().and_then(|t| t.corrected_text.clone()),
            })
        })
        .collect();
    Some(Issue::new(
        "Multiple typos in MER entries",
        json!({"count": typos.len(), "examples": examples}),
    ))
}

fn spelling_errors(qa: &QaReport, _: &QcParametersReport) -> Option<Issue> {
    let count = qa.documentation_quality.spelling_errors();
    (count >= 3).then(|| Issue::new("3+ spelling errors in MER", json!({ "count": count })))
}

fn date_of_birth_incorrect(qa: &QaReport, _: &QcParametersReport) -> Option<Issue> {
    first_with_id(qa, &["pp.dob"], "incorrect")
        .map(|item| Issue::new("Incorrect date of birth", captured_vs_expected(item)))
}

fn some_incorrect_entries(qa: &QaReport, _: &QcParametersReport) -> Option<Issue> {
    let count = incorrect_count(qa);
    (4..=7)
        .contains(&count)
        .then(|| Issue::new("4-7 incorrect documentation entries", json!({ "count": count })))
}

fn occupation_incorrect(qa: &QaReport, _: &QcParametersReport) -> Option<Issue> {
    first_with_id(qa, &["1.4", "1.4."], "incorrect")
        .map(|item| Issue::new("Incorrect occupation (1.4)", captured_vs_expected(item)))
}

// FLAGS

fn minor_prompting(qa: &QaReport, _: &QcParametersReport) -> Option<Issue> {
    let prompting = &qa.behavioral_flags.prompting_detected;
    (prompting.is_detected() && !is_major_prompting(qa)).then(|| {
        Issue::new(
            "Minor prompting detected",
            json!({"examples": prompting.examples, "timestamps": prompting.timestamps}),
        )
    })
}

fn customer_hesitation(qa: &QaReport, _: &QcParametersReport) -> Option<Issue> {
    let hesitation = &qa.behavioral_flags.customer_hesitation;
    hesitation.is_detected().then(|| {
        Issue::new(
            "Customer hesitation detected",
            json!({"examples": hesitation.examples, "timestamps": hesitation.timestamps}),
        )
    })
}

fn height_out_of_range(qa: &QaReport, _: &QcParametersReport) -> Option<Issue> {
    let height = lenient::to_f64(&qa.data_validation.height_cm)?;
    (!(130.0..=210.0).contains(&height))
        .then(|| Issue::new("Height out of range", json!({ "height_cm": height })))
}

fn weight_out_of_range(qa: &QaReport, _: &QcParametersReport) -> Option<Issue> {
    let weight = lenient::to_f64(&qa.data_validation.weight_kg)?;
    (!(35.0..=150.0).contains(&weight))
        .then(|| Issue::new("Weight out of range", json!({ "weight_kg": weight })))
}

fn contradictory_responses(qa: &QaReport, _: &QcParametersReport) -> Option<Issue> {
    let matches: Vec<Value> = qa
        .qa_matrix
        .iter()
        .filter(|item| normalized(item.captured_response.as_deref()).contains("later revealed"))
        .map(|item| json!({"id": item.question_id, "text": item.question_text}))
        .collect();
    (!matches.is_empty()).then(|| Issue::new("Contradictory responses", Value::Array(matches)))
}

fn privacy_breach(qa: &QaReport, _: &QcParametersReport) -> Option<Issue> {
    (lenient::to_bool(&qa.video_analysis.privacy_maintained) == Some(false))
        .then(|| Issue::new("Privacy breach in video", json!({})))
}

fn unprofessional_behavior(_: &QaReport, qc: &QcParametersReport) -> Option<Issue> {
    let politeness = qc.value_text("politeness");
    matches!(politeness.as_str(), "no" | "partial")
        .then(|| Issue::new("Unprofessional behavior (politeness)", json!({ "value": politeness })))
}

// TECH_ISSUES

fn recording_missing(qa: &QaReport, _: &QcParametersReport) -> Option<Issue> {
    (qa.technical_status.recording_exists == Some(false))
        .then(|| Issue::new("Recording file missing", json!({})))
}

fn voice_not_audible(qa: &QaReport, _: &QcParametersReport) -> Option<Issue> {
    let level = &qa.technical_status.audibility_level;
    matches!(
        normalized(level.as_deref()).as_str(),
        "poor" | "inaudible" | "not_audible"
    )
    .then(|| Issue::new("Voice not audible", json!({ "audibility_level": level })))
}

fn participants_not_visible(qa: &QaReport, _: &QcParametersReport) -> Option<Issue> {
    let status = &qa.video_analysis.visibility_status;
    let visibility = normalized(status.as_deref());
    (!visibility.is_empty() && visibility != "both_visible")
        .then(|| Issue::new("Not both participants visible", json!({ "visibility_status": status })))
}
