use anyhow::{Context, Result};
use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::{parse_reply, prompts, Analyzer};
use crate::analysis::lenient;
use crate::analysis::report::{DocumentationQuality, QaReport, QcParametersReport, VideoAnalysis};
use crate::config::settings::AnalyzerConfig;
use crate::transcription::Transcript;

const GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    role: String,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part {
    Text {
        text: String,
    },
    #[serde(rename_all = "camelCase")]
    Inline {
        inline_data: InlineData,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    response_mime_type: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

impl GenerateResponse {
    /// Text of the first candidate, parts joined by newlines.
    fn text(&self) -> Option<String> {
        let parts = &self.candidates.first()?.content.as_ref()?.parts;
        let text: Vec<&str> = parts.iter().filter_map(|p| p.text.as_deref()).collect();
        (!text.is_empty()).then(|| text.join("\n"))
    }
}

fn mime_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "mp3" => "audio/mp3",
        "wav" => "audio/wav",
        "m4a" => "audio/mp4",
        "ogg" => "audio/ogg",
        "flac" => "audio/flac",
        "webm" => "audio/webm",
        "mp4" => "video/mp4",
        "mov" => "video/quicktime",
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        _ => "application/octet-stream",
    }
}

async fn inline_file(path: &Path) -> Result<Part> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(Part::Inline {
        inline_data: InlineData {
            mime_type: mime_type_for(path).to_string(),
            data: base64::engine::general_purpose::STANDARD.encode(bytes),
        },
    })
}

/// Gemini `generateContent` backed analyzer.
pub struct GeminiAnalyzer {
    client: reqwest::Client,
    api_key: String,
    model: String,
    temperature: f32,
}

impl GeminiAnalyzer {
    pub fn new(config: &AnalyzerConfig, api_key: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            api_key,
            model: config.model.clone(),
            temperature: config.temperature,
        })
    }

    async fn generate(&self, prompt: String, attachments: Vec<Part>) -> Result<String> {
        let mut parts = vec![Part::Text { text: prompt }];
        parts.extend(attachments);

        let request = GenerateRequest {
            contents: vec![Content {
                role: "user".to_string(),
                parts,
            }],
            generation_config: GenerationConfig {
                temperature: self.temperature,
                response_mime_type: "application/json".to_string(),
            },
        };

        let url = format!("{}/{}:generateContent", GEMINI_API_URL, self.model);
        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .context("Failed to send request to Gemini API")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("Gemini API error {}: {}", status, error_text);
        }

        let body: GenerateResponse = response
            .json()
            .await
            .context("Failed to parse Gemini API response")?;

        body.text().context("No content in Gemini response")
    }
}

#[async_trait]
impl Analyzer for GeminiAnalyzer {
    async fn transcribe(&self, audio: &Path) -> Result<Transcript> {
        tracing::debug!("Transcribing {}", audio.display());
        let attachment = inline_file(audio).await?;
        let text = self
            .generate(prompts::transcription_prompt(), vec![attachment])
            .await?;
        let value = lenient::extract_json(&text).context("No JSON in transcription reply")?;
        Ok(Transcript::from_value(value))
    }

    async fn compare_against_form(&self, transcript_text: &str, mer_text: &str) -> Result<QaReport> {
        let text = self
            .generate(prompts::qa_prompt(transcript_text, mer_text), Vec::new())
            .await?;
        parse_reply(&text)
    }

    async fn assess_behavior(&self, transcript_text: &str) -> Result<QcParametersReport> {
        let text = self
            .generate(prompts::qc_prompt(transcript_text), Vec::new())
            .await?;
        parse_reply(&text)
    }

    async fn check_form_spelling(&self, mer_text: &str) -> Result<DocumentationQuality> {
        #[derive(Deserialize)]
        struct Reply {
            #[serde(default, deserialize_with = "lenient::or_default")]
            documentation_quality: DocumentationQuality,
        }

        let text = self
            .generate(prompts::spelling_prompt(mer_text), Vec::new())
            .await?;
        let reply: Reply = parse_reply(&text)?;
        Ok(reply.documentation_quality)
    }

    async fn assess_video(&self, frames: &[PathBuf]) -> Result<VideoAnalysis> {
        let mut attachments = Vec::with_capacity(frames.len());
        for frame in frames {
            attachments.push(inline_file(frame).await?);
        }
        let text = self
            .generate(prompts::video_prompt(frames.len()), attachments)
            .await?;
        video_from_reply(&text, frames)
    }
}

/// Video judgments from a model reply, bare or wrapped in `video_analysis`.
fn video_from_reply(text: &str, frames: &[PathBuf]) -> Result<VideoAnalysis> {
    let mut value = lenient::extract_json(text).context("No JSON in video reply")?;
    if let Some(inner) = value.get_mut("video_analysis").map(Value::take) {
        value = inner;
    }
    let mut video = VideoAnalysis::from_value(value);
    if video.screenshots.is_empty() {
        video.screenshots = frames.iter().map(|f| f.display().to_string()).collect();
    }
    Ok(video)
}
