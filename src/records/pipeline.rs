//! End-to-end processing of one record: transcribe every call, merge the
//! calls into one conversation, run the form and behavior analyses over it,
//! then score and decide.

use serde::{Deserialize, Serialize};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::analysis::report::{QaReport, QcParametersReport, TechnicalStatus, VideoAnalysis};
use crate::analysis::{
    build_decision, compute_qc_score, effective_duration_seconds, speaking_rate, Decision, QcScore,
};
use crate::config::settings::{MediaConfig, MerqaConfig, TranscriptionConfig};
use crate::error::{MerqaError, Result};
use crate::media::{self, audibility, frames};
use crate::oracle::Analyzer;
use crate::records::store::{self, ArtifactStore};
use crate::records::{mer, CallSource, Record};
use crate::transcription::merge::{merge_calls, render_for_prompt, stitch_chunks};
use crate::transcription::parallel::transcribe_chunks;
use crate::transcription::Transcript;

#[derive(Debug, Clone, Copy, Default)]
pub struct PipelineOptions {
    /// Regenerate every derived artifact instead of reusing what exists
    pub force: bool,
    /// Use stored call transcripts (or empty ones) and never call transcription
    pub skip_transcription: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CallSummary {
    pub call_index: u32,
    pub media_file: PathBuf,
    pub audio_path: PathBuf,
    pub duration: Option<f64>,
    pub transcript_path: PathBuf,
    pub segments_count: usize,
    pub technical_analysis: TechnicalStatus,
    pub video_analysis: VideoAnalysis,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MergedTranscriptSummary {
    pub path: PathBuf,
    pub total_segments: usize,
    pub total_duration: f64,
}

/// Written to `processing_summary.json` at the end of every run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingSummary {
    pub record_id: String,
    pub mer_pdf: PathBuf,
    pub total_calls: usize,
    pub total_duration: f64,
    pub individual_calls: Vec<CallSummary>,
    pub merged_transcript: MergedTranscriptSummary,
    pub total_score: u32,
    pub category: String,
    pub triage: String,
    pub output_directory: PathBuf,
    pub processed_at: String,
}

#[derive(Debug, Clone)]
pub struct ProcessingOutcome {
    pub summary: ProcessingSummary,
    pub score: QcScore,
    pub decision: Decision,
}

/// Shared state handed to each concurrently prepared call.
#[derive(Clone)]
struct CallContext {
    analyzer: Arc<dyn Analyzer>,
    transcription: TranscriptionConfig,
    media: MediaConfig,
    store: ArtifactStore,
    options: PipelineOptions,
}

/// A call after audio extraction and transcription.
#[derive(Debug, Clone)]
struct PreparedCall {
    source: CallSource,
    audio_path: PathBuf,
    duration: Option<f64>,
    transcript: Transcript,
}

impl PreparedCall {
    fn empty(source: &CallSource) -> Self {
        Self {
            source: source.clone(),
            audio_path: source.path.clone(),
            duration: None,
            transcript: Transcript::default(),
        }
    }

    /// Media duration, else the last transcript timestamp, else zero.
    fn offset_seconds(&self) -> f64 {
        effective_duration_seconds(self.duration, &self.transcript).unwrap_or(0.0)
    }
}

/// A call after audibility and video checks.
struct AnalyzedCall {
    prepared: PreparedCall,
    technical: TechnicalStatus,
    video: VideoAnalysis,
}

async fn transcribe_call(
    ctx: &CallContext,
    index: u32,
    audio: &PathBuf,
    duration: Option<f64>,
) -> Transcript {
    let timeout = Duration::from_secs(ctx.transcription.chunk_timeout_secs);
    let threshold = ctx.transcription.long_call_threshold_secs as f64;
    let is_long = duration.map_or(true, |d| d > threshold);

    if is_long {
        match duration {
            Some(d) => ctx.store.log(&format!(
                "Call {}: duration {}s > {}s, splitting into chunks",
                index, d as u64, threshold as u64
            )),
            None => ctx
                .store
                .log(&format!("Call {}: duration unknown; defaulting to chunking", index)),
        }
        match media::split_into_chunks(
            &ctx.media,
            audio,
            &ctx.store.chunks_dir(index),
            ctx.transcription.chunk_seconds,
        )
        .await
        {
            Ok(chunks) if !chunks.is_empty() => {
                ctx.store
                    .log(&format!("Call {}: {} chunk(s) ready", index, chunks.len()));
                let pieces = transcribe_chunks(
                    ctx.analyzer.as_ref(),
                    &chunks,
                    ctx.transcription.max_parallel_chunks,
                    timeout,
                )
                .await;

                let mut stitched = Vec::with_capacity(pieces.len());
                for (piece, chunk) in pieces.into_iter().zip(&chunks) {
                    let secs = media::probe_duration(&ctx.media, chunk).await.unwrap_or(0.0);
                    stitched.push((piece, secs));
                }
                return stitch_chunks(&stitched);
            }
            Ok(_) => ctx
                .store
                .log(&format!("Call {}: splitting produced no chunks; sending whole file", index)),
            Err(e) => ctx
                .store
                .log(&format!("Call {}: splitting failed ({}); sending whole file", index, e)),
        }
    } else {
        ctx.store
            .log(&format!("Call {}: transcribing (no split)", index));
    }

    transcribe_chunks(ctx.analyzer.as_ref(), std::slice::from_ref(audio), 1, timeout)
        .await
        .pop()
        .unwrap_or_default()
}

async fn prepare_call(ctx: CallContext, source: CallSource) -> PreparedCall {
    let index = source.index;
    let store = &ctx.store;
    store.log(&format!("Call {}: source={}", index, source.path.display()));

    let mut audio_path = source.path.clone();
    if source.is_video() {
        let extracted = store.extracted_audio_path(index);
        if ctx.options.force || !extracted.exists() {
            if let Err(e) = std::fs::create_dir_all(store.call_dir(index)) {
                store.log(&format!("Call {}: cannot create call directory: {}", index, e));
            }
            match media::extract_audio(&ctx.media, &source.path, &extracted).await {
                Ok(()) => store.log(&format!("Call {}: extracted audio -> {}", index, extracted.display())),
                Err(e) => store.log(&format!("Call {}: audio extraction failed: {}", index, e)),
            }
        }
        if extracted.exists() {
            audio_path = extracted;
        }
    }

    let duration = media::probe_duration(&ctx.media, &audio_path).await;
    store.log(&format!(
        "Call {}: duration {}",
        index,
        duration.map_or("unknown".to_string(), |d| format!("{:.1}s", d))
    ));

    let transcript_path = store.call_transcript_path(index);
    let existing = store.load_call_transcript(index);
    let transcript = match existing {
        Some(transcript) if ctx.options.skip_transcription || !ctx.options.force => {
            store.log(&format!(
                "Call {}: reusing stored transcript ({} segments)",
                index,
                transcript.segments.len()
            ));
            transcript
        }
        None if ctx.options.skip_transcription => {
            store.log(&format!("Call {}: no stored transcript; using empty", index));
            Transcript::default()
        }
        _ => {
            let transcript = transcribe_call(&ctx, index, &audio_path, duration).await;
            match ArtifactStore::write_json_at(&transcript_path, &transcript) {
                Ok(()) => store.log(&format!(
                    "Call {}: transcript saved ({} segments)",
                    index,
                    transcript.segments.len()
                )),
                Err(e) => store.log(&format!("Call {}: could not save transcript: {}", index, e)),
            }
            transcript
        }
    };

    PreparedCall {
        source,
        audio_path,
        duration,
        transcript,
    }
}

/// Transcribe every call of the record concurrently, one task per call.
async fn prepare_calls(ctx: &CallContext, calls: &[CallSource]) -> Vec<PreparedCall> {
    let handles: Vec<_> = calls
        .iter()
        .map(|call| tokio::spawn(prepare_call(ctx.clone(), call.clone())))
        .collect();

    let results = futures::future::join_all(handles).await;
    calls
        .iter()
        .zip(results)
        .map(|(call, result)| match result {
            Ok(prepared) => prepared,
            Err(e) => {
                ctx.store
                    .log(&format!("Call {}: pre-transcription task failed: {}", call.index, e));
                PreparedCall::empty(call)
            }
        })
        .collect()
}

async fn analyze_call(ctx: &CallContext, prepared: PreparedCall) -> AnalyzedCall {
    let index = prepared.source.index;
    let technical = audibility::analyze(&ctx.media, &prepared.audio_path).await;
    ctx.store.log(&format!(
        "Call {}: audibility level={} dBFS={:?}",
        index,
        technical.audibility_level.as_deref().unwrap_or("unknown"),
        technical.avg_dbfs
    ));

    let video = if prepared.source.is_video() {
        let shots = frames::extract_screenshots(
            &ctx.media,
            &prepared.source.path,
            prepared.duration,
            &ctx.store.call_dir(index),
        )
        .await;
        ctx.store
            .log(&format!("Call {}: screenshots={}", index, shots.len()));
        if shots.is_empty() {
            VideoAnalysis::not_applicable()
        } else {
            match ctx.analyzer.assess_video(&shots).await {
                Ok(video) => video,
                Err(e) => {
                    ctx.store
                        .log(&format!("Call {}: video analysis failed: {:#}", index, e));
                    VideoAnalysis::unknown(shots.iter().map(|p| p.display().to_string()).collect())
                }
            }
        }
    } else {
        VideoAnalysis::not_applicable()
    };

    AnalyzedCall {
        prepared,
        technical,
        video,
    }
}

/// The call whose technical and video status stands for the whole record:
/// the longest one, the earliest on ties.
fn representative(calls: &[AnalyzedCall]) -> Option<&AnalyzedCall> {
    calls.iter().fold(None, |best: Option<&AnalyzedCall>, call| match best {
        Some(b) if b.prepared.offset_seconds() >= call.prepared.offset_seconds() => Some(b),
        _ => Some(call),
    })
}

/// Fold record-level measurements into the form analysis.
fn enrich_report(qa: &mut QaReport, merged: &Transcript, calls: &[AnalyzedCall]) {
    let rate = speaking_rate(merged);
    qa.meta.doctor_wpm = json!(rate.doctor_wpm);
    qa.meta.customer_wpm = json!(rate.customer_wpm);

    if let Some(call) = representative(calls) {
        qa.technical_status = call.technical.clone();
        qa.video_analysis = if call.video.screenshots.is_empty() {
            VideoAnalysis::not_applicable()
        } else {
            call.video.clone()
        };
    }
}

/// Form comparison plus spelling review, or `None` when the comparison failed.
async fn form_analysis(ctx: &CallContext, transcript_text: &str, mer_text: &str) -> Option<QaReport> {
    let store = &ctx.store;
    if !ctx.options.force {
        if let Some(qa) = store.read_json::<QaReport>(store::MERGED_QA_REPORT) {
            store.log("Reusing merged QA report");
            return Some(qa);
        }
    }

    store.log("Merged QA analysis");
    let mut qa = match ctx.analyzer.compare_against_form(transcript_text, mer_text).await {
        Ok(qa) => qa,
        Err(e) => {
            store.log(&format!("Merged QA failed: {:#}", e));
            return None;
        }
    };

    match ctx.analyzer.check_form_spelling(mer_text).await {
        Ok(quality) => qa.documentation_quality = quality,
        Err(e) => store.log(&format!("MER spelling check failed: {:#}", e)),
    }
    Some(qa)
}

async fn behavior_analysis(ctx: &CallContext, transcript_text: &str) -> QcParametersReport {
    let store = &ctx.store;
    if !ctx.options.force {
        if let Some(qc) = store.read_json::<QcParametersReport>(store::MERGED_QC_REPORT) {
            store.log("Reusing merged QC report");
            return qc;
        }
    }

    store.log("Merged QC analysis");
    match ctx.analyzer.assess_behavior(transcript_text).await {
        Ok(qc) => {
            if let Err(e) = store.write_json(store::MERGED_QC_REPORT, &qc) {
                store.log(&format!("Could not save QC report: {}", e));
            }
            qc
        }
        Err(e) => {
            store.log(&format!("Merged QC failed: {:#}", e));
            QcParametersReport::default()
        }
    }
}

/// Process one record and write all of its artifacts.
///
/// Analyzer failures never abort the run: each degrades to an empty result
/// and the score and decision are computed over whatever remains.
pub async fn process_record(
    config: &MerqaConfig,
    analyzer: Arc<dyn Analyzer>,
    record: &Record,
    store: &ArtifactStore,
    options: PipelineOptions,
) -> Result<ProcessingOutcome> {
    if !record.mer_pdf.exists() {
        return Err(MerqaError::MerNotFound(record.id.clone()));
    }
    if record.calls.is_empty() {
        return Err(MerqaError::NoCalls(record.id.clone()));
    }
    store.ensure()?;
    store.log(&format!(
        "Starting processing (force={}, skip_transcription={})",
        options.force, options.skip_transcription
    ));

    let ctx = CallContext {
        analyzer,
        transcription: config.transcription.clone(),
        media: config.media.clone(),
        store: store.clone(),
        options,
    };

    let mer_text = mer::extract_text(&ctx.media, &record.mer_pdf).await;
    store.log(&format!("MER text: {} chars", mer_text.len()));
    store.log(&format!("Found {} call(s)", record.calls.len()));

    let prepared = prepare_calls(&ctx, &record.calls).await;
    store.log("All calls transcribed");

    let mut calls = Vec::with_capacity(prepared.len());
    for call in prepared {
        calls.push(analyze_call(&ctx, call).await);
    }

    let merged = merge_calls(
        calls
            .iter()
            .map(|c| (&c.prepared.transcript, c.prepared.offset_seconds())),
    );
    let merged_path = store.write_json(store::MERGED_TRANSCRIPT, &merged)?;
    let transcript_text = render_for_prompt(&merged);
    store.write_text(store::MERGED_TRANSCRIPT_TEXT, &transcript_text)?;
    store.log(&format!(
        "Merged transcript saved (segments={})",
        merged.segments.len()
    ));

    let analyzed = form_analysis(&ctx, &transcript_text, &mer_text).await;
    let saved = analyzed.is_some();
    let mut qa = analyzed.unwrap_or_default();
    enrich_report(&mut qa, &merged, &calls);
    if saved {
        store.write_json(store::MERGED_QA_REPORT, &qa)?;
        store.log("Merged QA report saved");
    }

    let qc = behavior_analysis(&ctx, &transcript_text).await;

    let total_duration: f64 = calls.iter().map(|c| c.prepared.offset_seconds()).sum();
    let score = compute_qc_score(&qa, &qc, (total_duration > 0.0).then_some(total_duration));
    let decision = build_decision(&qa, &qc);
    store.write_json(store::QC_SCORE, &score)?;
    store.write_json(store::FINAL_DECISION, &decision)?;
    store.log(&format!(
        "QC score {}/{} ({}), decision: {} ({} issue(s))",
        score.total_score,
        score.max_score,
        score.category,
        decision.triage().as_str(),
        decision.issue_count()
    ));

    let summary = ProcessingSummary {
        record_id: record.id.clone(),
        mer_pdf: record.mer_pdf.clone(),
        total_calls: calls.len(),
        total_duration,
        individual_calls: calls
            .iter()
            .map(|c| CallSummary {
                call_index: c.prepared.source.index,
                media_file: c.prepared.source.path.clone(),
                audio_path: c.prepared.audio_path.clone(),
                duration: c.prepared.duration,
                transcript_path: store.call_transcript_path(c.prepared.source.index),
                segments_count: c.prepared.transcript.segments.len(),
                technical_analysis: c.technical.clone(),
                video_analysis: c.video.clone(),
            })
            .collect(),
        merged_transcript: MergedTranscriptSummary {
            path: merged_path,
            total_segments: merged.segments.len(),
            total_duration,
        },
        total_score: score.total_score,
        category: score.category.to_string(),
        triage: decision.triage().as_str().to_string(),
        output_directory: store.dir().to_path_buf(),
        processed_at: chrono::Utc::now().to_rfc3339(),
    };
    store.write_json(store::PROCESSING_SUMMARY, &summary)?;
    store.log("Processing completed");

    Ok(ProcessingOutcome {
        summary,
        score,
        decision,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::report::DocumentationQuality;
    use crate::analysis::QcCategory;
    use crate::records::scan_records;
    use anyhow::Result as AnyResult;
    use async_trait::async_trait;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    /// Deterministic analyzer: every call transcribes to the same two
    /// segments and the form comparison reports a fixed matrix.
    struct StubAnalyzer {
        transcriptions: AtomicUsize,
        qa_calls: AtomicUsize,
        fail_qa: bool,
    }

    impl StubAnalyzer {
        fn new(fail_qa: bool) -> Self {
            Self {
                transcriptions: AtomicUsize::new(0),
                qa_calls: AtomicUsize::new(0),
                fail_qa,
            }
        }
    }

    #[async_trait]
    impl Analyzer for StubAnalyzer {
        async fn transcribe(&self, _audio: &Path) -> AnyResult<Transcript> {
            self.transcriptions.fetch_add(1, Ordering::SeqCst);
            Ok(Transcript::from_value(json!({
                "segments": [
                    {"segment_id": "1", "speaker": "doctor", "start_timestamp": "0:00", "end_timestamp": "1:00",
                     "text": "good morning this is doctor mehta calling from the insurer"},
                    {"segment_id": "2", "speaker": "customer", "start_timestamp": "1:00", "end_timestamp": "1:30",
                     "text": "yes please go ahead"}
                ]
            })))
        }

        async fn compare_against_form(&self, transcript_text: &str, _mer: &str) -> AnyResult<QaReport> {
            self.qa_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_qa {
                anyhow::bail!("Gemini API error 503: overloaded");
            }
            assert!(transcript_text.starts_with("Call - 1\n"));
            Ok(QaReport::from_value(json!({
                "qa_matrix": [
                    {"question_id": "PP.Name", "expected_response": "Asha Rao", "status": "Correct"},
                    {"question_id": "1", "expected_response": "No", "status": "Correct"},
                    {"question_id": "2", "expected_response": "No", "status": "Missing"}
                ],
                "personal_particulars": {"name": "Asha Rao"},
                "meta": {"id": "R1", "doctor_name": "Dr Mehta"}
            })))
        }

        async fn assess_behavior(&self, _transcript_text: &str) -> AnyResult<QcParametersReport> {
            Ok(QcParametersReport::from_value(json!({
                "qc_parameters": {"greetings": {"value": "Yes"}, "disclaimer": {"value": "No"}}
            })))
        }

        async fn check_form_spelling(&self, _mer: &str) -> AnyResult<DocumentationQuality> {
            Ok(DocumentationQuality::from_value(json!({
                "spelling_errors_count": 4, "typos_found": ["hypertenshun"]
            })))
        }

        async fn assess_video(&self, _frames: &[PathBuf]) -> AnyResult<VideoAnalysis> {
            Ok(VideoAnalysis::default())
        }
    }

    fn offline_config(root: &Path) -> MerqaConfig {
        let mut config = MerqaConfig::default();
        config.records.root_dir = Some(root.to_path_buf());
        config.media.ffmpeg_path = "merqa-no-such-ffmpeg".to_string();
        config.media.ffprobe_path = "merqa-no-such-ffprobe".to_string();
        config.media.pdftotext_path = "merqa-no-such-pdftotext".to_string();
        config
    }

    fn setup() -> (TempDir, Record, ArtifactStore) {
        let dir = TempDir::new().unwrap();
        for name in ["R1_MER.pdf", "R1_call1.mp3", "R1_call2.mp3"] {
            std::fs::write(dir.path().join(name), b"stub").unwrap();
        }
        let record = scan_records(dir.path()).unwrap().remove("R1").unwrap();
        let store = ArtifactStore::new(dir.path(), "_processed", "R1");
        (dir, record, store)
    }

    #[tokio::test]
    async fn test_process_record_end_to_end() {
        let (dir, record, store) = setup();
        let config = offline_config(dir.path());
        let analyzer = Arc::new(StubAnalyzer::new(false));

        let outcome = process_record(&config, analyzer.clone(), &record, &store, PipelineOptions::default())
            .await
            .unwrap();

        // Unknown duration and failed splitting fall back to one request per call.
        assert_eq!(analyzer.transcriptions.load(Ordering::SeqCst), 2);

        let merged = store.load_merged_transcript();
        assert_eq!(merged.segments.len(), 4);
        assert_eq!(merged.segments[2].segment_id, "call2_1");
        assert_eq!(merged.segments[2].start_timestamp, "1:30");
        assert_eq!(merged.segments[3].end_timestamp, "3:00");
        assert!(std::fs::read_to_string(store.path(store::MERGED_TRANSCRIPT_TEXT)).unwrap().contains("Call - 2\n"));

        let qa = store.load_qa_report().unwrap();
        assert_eq!(qa.documentation_quality.spelling_errors(), 4);
        assert_eq!(qa.meta.doctor_wpm(), Some(10.0));
        assert_eq!(qa.technical_status.recording_exists, Some(true));
        assert_eq!(qa.technical_status.audibility_level.as_deref(), Some("unknown"));
        assert_eq!(qa.video_analysis.attire_check.as_deref(), Some("NA"));

        assert_eq!(outcome.summary.total_calls, 2);
        assert_eq!(outcome.summary.total_duration, 180.0);
        assert_eq!(outcome.score.category, QcCategory::Poor);
        let titles: Vec<&str> = outcome
            .decision
            .assignback
            .iter()
            .map(|i| i.issue.as_str())
            .collect();
        assert!(titles.contains(&"Disclaimer missing"));
        assert!(outcome
            .decision
            .ops_attention
            .iter()
            .any(|i| i.issue.contains("spelling")));

        for name in [store::QC_SCORE, store::FINAL_DECISION, store::PROCESSING_SUMMARY, store::PROCESS_LOG] {
            assert!(store.path(name).exists(), "missing {}", name);
        }
        assert!(store.call_transcript_path(1).exists());
        assert!(store.call_transcript_path(2).exists());
    }

    #[tokio::test]
    async fn test_reprocessing_reuses_artifacts_unless_forced() {
        let (dir, record, store) = setup();
        let config = offline_config(dir.path());
        let analyzer = Arc::new(StubAnalyzer::new(false));

        process_record(&config, analyzer.clone(), &record, &store, PipelineOptions::default())
            .await
            .unwrap();
        process_record(&config, analyzer.clone(), &record, &store, PipelineOptions::default())
            .await
            .unwrap();
        assert_eq!(analyzer.transcriptions.load(Ordering::SeqCst), 2);
        assert_eq!(analyzer.qa_calls.load(Ordering::SeqCst), 1);

        let forced = PipelineOptions {
            force: true,
            ..PipelineOptions::default()
        };
        process_record(&config, analyzer.clone(), &record, &store, forced)
            .await
            .unwrap();
        assert_eq!(analyzer.transcriptions.load(Ordering::SeqCst), 4);
        assert_eq!(analyzer.qa_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_truncated_reports_are_analyzed_again() {
        let (dir, record, store) = setup();
        let config = offline_config(dir.path());
        let analyzer = Arc::new(StubAnalyzer::new(false));

        process_record(&config, analyzer.clone(), &record, &store, PipelineOptions::default())
            .await
            .unwrap();
        store.write_text(store::MERGED_QA_REPORT, "{ truncated").unwrap();
        store.write_text(store::MERGED_QC_REPORT, "{\"qc_para").unwrap();

        let outcome = process_record(&config, analyzer.clone(), &record, &store, PipelineOptions::default())
            .await
            .unwrap();
        assert_eq!(analyzer.qa_calls.load(Ordering::SeqCst), 2);
        assert_eq!(store.load_qa_report().unwrap().qa_matrix.len(), 3);
        assert_eq!(store.load_qc_parameters().value_text("greetings"), "yes");
        assert!(outcome.score.breakdown.complete_mer_questions > 0);
    }

    #[tokio::test]
    async fn test_skip_transcription_without_stored_transcripts() {
        let (dir, record, store) = setup();
        let config = offline_config(dir.path());
        let analyzer = Arc::new(StubAnalyzer::new(false));
        let options = PipelineOptions {
            skip_transcription: true,
            ..PipelineOptions::default()
        };

        let outcome = process_record(&config, analyzer.clone(), &record, &store, options)
            .await
            .unwrap();
        assert_eq!(analyzer.transcriptions.load(Ordering::SeqCst), 0);
        assert_eq!(outcome.summary.merged_transcript.total_segments, 0);
    }

    #[tokio::test]
    async fn test_failed_form_analysis_still_scores_and_decides() {
        let (dir, record, store) = setup();
        let config = offline_config(dir.path());
        let analyzer = Arc::new(StubAnalyzer::new(true));

        let outcome = process_record(&config, analyzer, &record, &store, PipelineOptions::default())
            .await
            .unwrap();
        assert!(!store.path(store::MERGED_QA_REPORT).exists());
        assert!(store.path(store::FINAL_DECISION).exists());
        assert_eq!(outcome.score.breakdown.complete_mer_questions, 0);
        assert!(outcome
            .decision
            .tech_issues
            .iter()
            .all(|i| i.issue != "Recording file missing"));
    }

    #[tokio::test]
    async fn test_record_without_calls() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("R2_MER.pdf"), b"stub").unwrap();
        let record = scan_records(dir.path()).unwrap().remove("R2").unwrap();
        let store = ArtifactStore::new(dir.path(), "_processed", "R2");
        let result = process_record(
            &offline_config(dir.path()),
            Arc::new(StubAnalyzer::new(false)),
            &record,
            &store,
            PipelineOptions::default(),
        )
        .await;
        assert!(matches!(result, Err(MerqaError::NoCalls(_))));
    }
}
