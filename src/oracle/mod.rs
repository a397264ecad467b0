pub mod gemini;
pub mod prompts;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::analysis::lenient;
use crate::analysis::report::{DocumentationQuality, QaReport, QcParametersReport, VideoAnalysis};
use crate::config::settings::AnalyzerConfig;
use crate::transcription::Transcript;

/// The external service that listens to calls and makes every semantic
/// judgment the scoring engine consumes.
#[async_trait]
pub trait Analyzer: Send + Sync {
    /// Diarised transcript of one audio file.
    async fn transcribe(&self, audio: &Path) -> Result<Transcript>;

    /// Question-by-question audit of the MER form against the call.
    async fn compare_against_form(&self, transcript_text: &str, mer_text: &str) -> Result<QaReport>;

    /// Behavioral QC parameters of the call.
    async fn assess_behavior(&self, transcript_text: &str) -> Result<QcParametersReport>;

    /// Spelling and typo review of the filled form itself.
    async fn check_form_spelling(&self, mer_text: &str) -> Result<DocumentationQuality>;

    /// Attire, visibility and privacy judgments from sampled video frames.
    async fn assess_video(&self, frames: &[PathBuf]) -> Result<VideoAnalysis>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalyzerProvider {
    Gemini,
}

impl AnalyzerProvider {
    pub fn from_provider(provider: &str) -> Option<Self> {
        match provider.to_lowercase().as_str() {
            "gemini" => Some(Self::Gemini),
            _ => None,
        }
    }
}

pub fn analyzer_from_config(config: &AnalyzerConfig) -> Result<Arc<dyn Analyzer>> {
    if config.provider == "none" {
        anyhow::bail!("Analyzer is not configured. Set [analyzer] provider and api_key in the config file.");
    }

    let provider = AnalyzerProvider::from_provider(&config.provider)
        .context("Invalid analyzer provider specified")?;

    match provider {
        AnalyzerProvider::Gemini => {
            let api_key = config
                .api_key
                .clone()
                .context("Gemini API key not configured (set MERQA_API_KEY or GEMINI_API_KEY)")?;
            Ok(Arc::new(gemini::GeminiAnalyzer::new(config, api_key)?))
        }
    }
}

/// Decode a model reply into `T`, tolerating code fences and prose around the JSON.
pub(crate) fn parse_reply<T>(text: &str) -> Result<T>
where
    T: DeserializeOwned,
{
    let value: Value = lenient::extract_json(text).context("No JSON object in analyzer reply")?;
    serde_json::from_value(value).context("Analyzer reply did not match the expected shape")
}
