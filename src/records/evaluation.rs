use serde::Serialize;

use crate::analysis::report::{QaReport, QcParametersReport};
use crate::analysis::{
    build_decision, compute_qc_score, compute_ui_summary, derive_top_metrics,
    effective_duration_seconds, speaker_distribution, speaking_rate, Decision, QcScore,
    SpeakerDistribution, SpeakingRate, TopMetrics, UiSummary,
};
use crate::error::{MerqaError, Result};
use crate::records::pipeline::ProcessingSummary;
use crate::records::store::{self, ArtifactStore};
use crate::transcription::Transcript;

/// Everything derived for a processed record, recomputed from its stored
/// analyses.
#[derive(Debug, Clone, Serialize)]
pub struct RecordEvaluation {
    pub record_id: String,
    pub duration_seconds: Option<f64>,
    pub summary: UiSummary,
    pub top_metrics: TopMetrics,
    pub speakers: SpeakerDistribution,
    pub speaking_rate: SpeakingRate,
    pub score: QcScore,
    pub decision: Decision,
    #[serde(skip)]
    pub qa: QaReport,
    #[serde(skip)]
    pub qc: QcParametersReport,
}

impl RecordEvaluation {
    pub fn load(store: &ArtifactStore) -> Result<Self> {
        let qa = store
            .load_qa_report()
            .ok_or_else(|| MerqaError::RecordNotProcessed(store.record_id().to_string()))?;
        let qc = store.load_qc_parameters();

        let mut transcript = store.load_merged_transcript();
        if transcript.is_empty() {
            transcript = store.load_call_transcript(1).unwrap_or_default();
        }

        let recorded = store
            .read_json::<ProcessingSummary>(store::PROCESSING_SUMMARY)
            .map(|s| s.total_duration);
        let duration_seconds = effective_duration_seconds(recorded, &transcript);

        Ok(Self::compute(store.record_id(), qa, qc, &transcript, duration_seconds))
    }

    pub fn compute(
        record_id: &str,
        qa: QaReport,
        qc: QcParametersReport,
        transcript: &Transcript,
        duration_seconds: Option<f64>,
    ) -> Self {
        Self {
            record_id: record_id.to_string(),
            duration_seconds,
            summary: compute_ui_summary(&qa),
            top_metrics: derive_top_metrics(&qa, duration_seconds),
            speakers: speaker_distribution(transcript, duration_seconds),
            speaking_rate: speaking_rate(transcript),
            score: compute_qc_score(&qa, &qc, duration_seconds),
            decision: build_decision(&qa, &qc),
            qa,
            qc,
        }
    }

    /// Rewrite `qc_score.json` and `final_decision.json` from this evaluation.
    pub fn save(&self, store: &ArtifactStore) -> Result<()> {
        store.write_json(store::QC_SCORE, &self.score)?;
        store.write_json(store::FINAL_DECISION, &self.decision)?;
        Ok(())
    }
}
