//! Speaking time, dead air and words-per-minute per speaker role.

use crate::analysis::round2;
use crate::analysis::timestamp;
use crate::transcription::{SpeakerRole, Transcript};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpeakerDistribution {
    pub agent_seconds: f64,
    pub customer_seconds: f64,
    pub dead_air_seconds: f64,
    pub agent_pct: f64,
    pub customer_pct: f64,
    pub dead_air_pct: f64,
}

/// Split a call's time between agent, customer and dead air.
///
/// Segments with unparseable or inverted timestamps are ignored. Segments
/// from unrecognised speakers add no speaking time but still cover their
/// interval. Dead air is only computed when the total duration is known.
pub fn speaker_distribution(transcript: &Transcript, total_duration: Option<f64>) -> SpeakerDistribution {
    let mut agent = 0.0;
    let mut customer = 0.0;
    let mut covered = Vec::with_capacity(transcript.segments.len());

    for segment in &transcript.segments {
        let Some((start, end)) = segment.interval() else {
            continue;
        };
        match segment.role() {
            Some(SpeakerRole::Agent) => agent += end - start,
            Some(SpeakerRole::Customer) => customer += end - start,
            None => {}
        }
        covered.push((start, end));
    }

    let dead_air = match total_duration.filter(|d| d.is_finite() && *d > 0.0) {
        Some(total) => {
            let spoken = timestamp::covered_seconds(&timestamp::merge_intervals(covered));
            (total - spoken).max(0.0)
        }
        None => 0.0,
    };

    let whole = agent + customer + dead_air;
    let pct = |part: f64| {
        if whole > 0.0 {
            round2(part / whole * 100.0)
        } else {
            0.0
        }
    };

    SpeakerDistribution {
        agent_seconds: round2(agent),
        customer_seconds: round2(customer),
        dead_air_seconds: round2(dead_air),
        agent_pct: pct(agent),
        customer_pct: pct(customer),
        dead_air_pct: pct(dead_air),
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SpeakingRate {
    pub doctor_wpm: f64,
    pub customer_wpm: f64,
}

/// Words per minute for the doctor (agent) and the customer.
pub fn speaking_rate(transcript: &Transcript) -> SpeakingRate {
    let mut doctor = (0usize, 0.0f64);
    let mut customer = (0usize, 0.0f64);

    for segment in &transcript.segments {
        let Some((start, end)) = segment.interval() else {
            continue;
        };
        let totals = match segment.role() {
            Some(SpeakerRole::Agent) => &mut doctor,
            Some(SpeakerRole::Customer) => &mut customer,
            None => continue,
        };
        totals.0 += segment.text.split_whitespace().count();
        totals.1 += end - start;
    }

    let wpm = |(words, seconds): (usize, f64)| {
        if seconds > 0.0 {
            round2(words as f64 / (seconds / 60.0))
        } else {
            0.0
        }
    };

    SpeakingRate {
        doctor_wpm: wpm(doctor),
        customer_wpm: wpm(customer),
    }
}
