use futures::{stream, StreamExt};
use std::path::PathBuf;
use std::time::Duration;

use crate::oracle::Analyzer;
use crate::transcription::Transcript;

/// Transcribe audio chunks concurrently, returning results in chunk order.
///
/// At most `min(chunks, max_parallel)` requests are in flight. A chunk that
/// errors or exceeds `timeout` yields an empty transcript instead of failing
/// the call.
pub async fn transcribe_chunks(
    analyzer: &dyn Analyzer,
    chunks: &[PathBuf],
    max_parallel: usize,
    timeout: Duration,
) -> Vec<Transcript> {
    if chunks.is_empty() {
        return Vec::new();
    }
    let workers = chunks.len().min(max_parallel).max(1);
    tracing::info!(
        "Transcribing {} chunk(s) with up to {} workers",
        chunks.len(),
        workers
    );

    let total = chunks.len();
    let jobs = chunks.iter().cloned().enumerate().map(|(index, path)| async move {
        let started = std::time::Instant::now();
        match tokio::time::timeout(timeout, analyzer.transcribe(&path)).await {
            Ok(Ok(transcript)) => {
                tracing::info!(
                    "Chunk {}/{} done in {:.1}s ({} segments)",
                    index + 1,
                    total,
                    started.elapsed().as_secs_f64(),
                    transcript.segments.len()
                );
                transcript
            }
            Ok(Err(e)) => {
                tracing::warn!("Chunk {}/{} failed: {:#}", index + 1, total, e);
                Transcript::default()
            }
            Err(_) => {
                tracing::warn!(
                    "Chunk {}/{} timed out after {}s; skipping",
                    index + 1,
                    total,
                    timeout.as_secs()
                );
                Transcript::default()
            }
        }
    });

    stream::iter(jobs).buffered(workers).collect().await
}
