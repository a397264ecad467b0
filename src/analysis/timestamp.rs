//! `M:SS` offsets as they appear in transcripts.

/// Parse a `minutes:seconds` offset into whole seconds.
///
/// Anything other than exactly two non-negative integer fields yields `None`;
/// callers must drop such entries rather than treat them as zero.
pub fn parse(ts: &str) -> Option<u64> {
    let mut parts = ts.split(':');
    let minutes = parts.next()?.trim().parse::<u64>().ok()?;
    let seconds = parts.next()?.trim().parse::<u64>().ok()?;
    if parts.next().is_some() {
        return None;
    }
    minutes.checked_mul(60)?.checked_add(seconds)
}

/// Same as [`parse`] but as `f64`, which is what the interval maths works in.
pub fn parse_secs(ts: &str) -> Option<f64> {
    parse(ts).map(|s| s as f64)
}

/// Format seconds as `M:SS`, rounding to the nearest second.
pub fn format(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds.round() as u64
    } else {
        0
    };
    format!("{}:{:02}", total / 60, total % 60)
}

/// Render an `M:SS` offset as `HH:MM:SS`; unparseable input becomes `00:00:00`.
pub fn to_hhmmss(ts: &str) -> String {
    let total = parse(ts).unwrap_or(0);
    format!(
        "{:02}:{:02}:{:02}",
        total / 3600,
        (total % 3600) / 60,
        total % 60
    )
}

/// Union of `(start, end)` ranges, sorted by start.
///
/// Touching ranges (`next.start <= current.end`) are merged. Callers filter out
/// ranges with `end <= start` beforehand.
pub fn merge_intervals(mut intervals: Vec<(f64, f64)>) -> Vec<(f64, f64)> {
    intervals.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut merged: Vec<(f64, f64)> = Vec::with_capacity(intervals.len());
    for (start, end) in intervals {
        match merged.last_mut() {
            Some(current) if start <= current.1 => {
                current.1 = current.1.max(end);
            }
            _ => merged.push((start, end)),
        }
    }
    merged
}

/// Total length covered by already-merged intervals.
pub fn covered_seconds(merged: &[(f64, f64)]) -> f64 {
    merged.iter().map(|(s, e)| e - s).sum()
}
