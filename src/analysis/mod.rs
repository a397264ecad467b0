//! Deterministic post-processing of analyzer output: compliance summary,
//! speaker timing, the 1600-point QC score and escalation decisions.
//!
//! Nothing in here performs I/O or returns errors. Malformed input degrades
//! to neutral defaults.

pub mod decision;
pub mod lenient;
pub mod qc_score;
pub mod report;
pub mod speakers;
pub mod summary;
pub mod timestamp;

pub use decision::{build_decision, Decision, Issue, Triage};
pub use qc_score::{compute_qc_score, QcCategory, QcScore};
pub use report::{QaReport, QcParametersReport};
pub use speakers::{speaker_distribution, speaking_rate, SpeakerDistribution, SpeakingRate};
pub use summary::{
    compute_ui_summary, derive_top_metrics, effective_duration_seconds, TopMetrics, UiSummary,
};

/// Round to two decimal places, the precision every reported ratio uses.
pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
