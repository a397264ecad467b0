//! Combining per-call (and per-chunk) transcripts onto one timeline.

use crate::analysis::timestamp;
use crate::transcription::{Segment, SpeakerRole, Transcript};
use std::collections::BTreeMap;

fn shift(segment: &Segment, offset: f64, id: String, call_index: Option<u32>) -> Segment {
    // Unparseable offsets are carried over as-is; consumers drop them anyway.
    let moved = |ts: &str| match timestamp::parse_secs(ts) {
        Some(secs) => timestamp::format(secs + offset),
        None => ts.to_string(),
    };
    Segment {
        segment_id: id,
        text: segment.text.clone(),
        speaker: segment.speaker.clone(),
        start_timestamp: moved(&segment.start_timestamp),
        end_timestamp: moved(&segment.end_timestamp),
        call_index,
    }
}

fn usable(duration: f64) -> f64 {
    if duration.is_finite() && duration > 0.0 {
        duration
    } else {
        0.0
    }
}

/// Merge call transcripts in call order.
///
/// Call `i` (1-based) is shifted by the summed durations of calls `1..i`,
/// tagged with `call_index = i` and its segment ids prefixed `call<i>_`.
/// Unknown durations count as zero.
pub fn merge_calls<'a, I>(calls: I) -> Transcript
where
    I: IntoIterator<Item = (&'a Transcript, f64)>,
{
    let mut merged = Transcript::default();
    let mut offset = 0.0;

    for (index, (transcript, duration)) in calls.into_iter().enumerate() {
        let call_index = index as u32 + 1;
        merged.segments.extend(transcript.segments.iter().map(|segment| {
            let id = format!("call{}_{}", call_index, segment.segment_id);
            shift(segment, offset, id, Some(call_index))
        }));
        offset += usable(duration);
    }
    merged
}

/// Stitch the chunk transcripts of a single call back together.
///
/// Same offset rule as [`merge_calls`] but without a call index. Segment ids
/// get a `chunk<n>_` prefix only when there is more than one chunk.
pub fn stitch_chunks(chunks: &[(Transcript, f64)]) -> Transcript {
    if let [(only, _)] = chunks {
        return only.clone();
    }

    let mut stitched = Transcript::default();
    let mut offset = 0.0;
    for (index, (transcript, duration)) in chunks.iter().enumerate() {
        stitched.segments.extend(transcript.segments.iter().map(|segment| {
            let id = format!("chunk{}_{}", index + 1, segment.segment_id);
            shift(segment, offset, id, segment.call_index)
        }));
        offset += usable(*duration);
    }
    stitched
}

fn prompt_speaker(segment: &Segment) -> String {
    match segment.role() {
        Some(SpeakerRole::Agent) => "agent".to_string(),
        Some(SpeakerRole::Customer) => "customer".to_string(),
        None => {
            let raw = segment.speaker.trim().to_lowercase();
            if raw.is_empty() {
                "agent".to_string()
            } else {
                raw
            }
        }
    }
}

/// Render a merged transcript as the plain text handed to the analyzer:
/// one `Call - N` block per call, each segment on a single line of
/// bracketed fields.
pub fn render_for_prompt(transcript: &Transcript) -> String {
    let mut by_call: BTreeMap<u32, Vec<&Segment>> = BTreeMap::new();
    for segment in &transcript.segments {
        by_call
            .entry(segment.call_index.unwrap_or(1))
            .or_default()
            .push(segment);
    }

    let blocks: Vec<String> = by_call
        .into_iter()
        .map(|(call, segments)| {
            let body = segments
                .iter()
                .map(|s| {
                    format!(
                        "[Segment ID - {}] [Start Timestamp - {}] [End Timestamp - {}] [Speaker - {}] {}",
                        s.segment_id,
                        timestamp::to_hhmmss(&s.start_timestamp),
                        timestamp::to_hhmmss(&s.end_timestamp),
                        prompt_speaker(s),
                        s.text.trim()
                    )
                })
                .collect::<Vec<_>>()
                .join(" ");
            format!("Call - {}\n{}", call, body)
        })
        .collect();

    blocks.join("\n\n")
}
