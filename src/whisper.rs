//! OpenAI-compatible Whisper transcription client.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info};

use crate::config::TranscriptionConfig;
use crate::error::{Result, YtError};
use crate::transcript::{SpeechTranscriber, TranscribedAudio, TranscriptSegment};

/// Whisper jobs on long videos can take several minutes.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(1800);

pub struct WhisperClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct VerboseJsonResponse {
    language: Option<String>,
    text: Option<String>,
    #[serde(default)]
    segments: Vec<VerboseJsonSegment>,
}

#[derive(Debug, Deserialize)]
struct VerboseJsonSegment {
    start: f64,
    end: f64,
    text: String,
}

impl WhisperClient {
    /// Returns None when the configured API key environment variable is
    /// unset, so callers can degrade to captions-only operation.
    pub fn from_config(config: &TranscriptionConfig) -> Result<Option<Self>> {
        let Some(api_key) = config.api_key() else {
            return Ok(None);
        };
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Some(Self {
            client,
            base_url: config.base_url.clone(),
            model: config.model.clone(),
            api_key,
        }))
    }
}

#[async_trait]
impl SpeechTranscriber for WhisperClient {
    async fn transcribe(&self, audio: &Path) -> Result<TranscribedAudio> {
        if !audio.exists() {
            return Err(YtError::FileNotFound(audio.display().to_string()));
        }

        let filename = audio
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("audio.m4a")
            .to_string();
        let bytes = tokio::fs::read(audio).await?;
        info!(
            "Uploading {} ({:.1} MB) to {}",
            filename,
            bytes.len() as f64 / 1_048_576.0,
            self.base_url
        );

        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(filename)
            .mime_str(mime_for(audio))
            .map_err(|e| YtError::Transcription(format!("invalid mime type: {}", e)))?;
        let form = reqwest::multipart::Form::new()
            .text("model", self.model.clone())
            .text("response_format", "verbose_json")
            .part("file", part);

        let response = self
            .client
            .post(&self.base_url)
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(YtError::Transcription(format!(
                "transcription request failed ({}): {}",
                status,
                body.trim()
            )));
        }

        let parsed: VerboseJsonResponse = response.json().await?;
        debug!("Whisper returned {} segments", parsed.segments.len());

        let segments = if parsed.segments.is_empty() {
            // Some compatible servers only return the full text.
            match parsed.text {
                Some(text) if !text.trim().is_empty() => {
                    vec![TranscriptSegment::new(0.0, 0.0, text.trim())]
                }
                _ => {
                    return Err(YtError::Transcription(
                        "transcription response contained no segments".to_string(),
                    ))
                }
            }
        } else {
            parsed
                .segments
                .into_iter()
                .map(|s| TranscriptSegment::new(s.start, s.end, s.text.trim()))
                .collect()
        };

        Ok(TranscribedAudio {
            language: parsed.language.unwrap_or_else(|| "unknown".to_string()),
            segments,
        })
    }
}

fn mime_for(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("m4a") => "audio/mp4",
        Some("mp3") => "audio/mpeg",
        Some("opus") => "audio/ogg",
        Some("webm") => "audio/webm",
        Some("wav") => "audio/wav",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mime_by_extension() {
        assert_eq!(mime_for(Path::new("a.m4a")), "audio/mp4");
        assert_eq!(mime_for(Path::new("a.mp3")), "audio/mpeg");
        assert_eq!(mime_for(Path::new("a.xyz")), "application/octet-stream");
    }

    #[test]
    fn verbose_json_parses() {
        let json = r#"{
            "language": "english",
            "text": "hello world",
            "segments": [
                {"id": 0, "start": 0.0, "end": 2.2, "text": " hello"},
                {"id": 1, "start": 2.2, "end": 4.0, "text": " world"}
            ]
        }"#;
        let parsed: VerboseJsonResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.language.as_deref(), Some("english"));
        assert_eq!(parsed.segments.len(), 2);
        assert_eq!(parsed.segments[1].text.trim(), "world");
    }

    #[test]
    fn verbose_json_without_segments() {
        let json = r#"{"text": "just text"}"#;
        let parsed: VerboseJsonResponse = serde_json::from_str(json).unwrap();
        assert!(parsed.segments.is_empty());
        assert_eq!(parsed.text.as_deref(), Some("just text"));
    }

    #[tokio::test]
    async fn missing_file_is_rejected_before_upload() {
        let client = WhisperClient {
            client: reqwest::Client::new(),
            base_url: "http://localhost:1/v1/audio/transcriptions".to_string(),
            model: "whisper-1".to_string(),
            api_key: "test".to_string(),
        };
        let err = client.transcribe(Path::new("/nonexistent/audio.m4a")).await;
        assert!(matches!(err, Err(YtError::FileNotFound(_))));
    }
}
