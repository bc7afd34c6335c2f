//! Translation and article rewriting through an OpenAI-compatible chat API.

use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::{LlmConfig, MetadataStyle};
use crate::error::{Result, YtError};
use crate::transcript::Transcript;
use crate::youtube::VideoMetadata;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(600);

/// Segments translated per chat request. Large enough to keep context,
/// small enough to stay inside completion limits.
const CHUNK_SIZE: usize = 50;

const ARTICLE_PROMPT: &str = include_str!("../prompt.md");

pub struct TranslationClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
}

/// Target length of a generated article.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArticleLength {
    Original,
    Long,
    Medium,
    Short,
}

impl ArticleLength {
    fn instruction(&self) -> &'static str {
        match self {
            ArticleLength::Original => {
                "Keep roughly the same length as the transcript, preserving all substantive content."
            }
            ArticleLength::Long => "Write a detailed long-form article of 1500-2500 words.",
            ArticleLength::Medium => "Write an article of 700-1200 words.",
            ArticleLength::Short => "Write a concise article of 300-500 words.",
        }
    }
}

impl FromStr for ArticleLength {
    type Err = YtError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "original" => Ok(ArticleLength::Original),
            "long" => Ok(ArticleLength::Long),
            "medium" => Ok(ArticleLength::Medium),
            "short" => Ok(ArticleLength::Short),
            other => Err(YtError::Config(format!(
                "Invalid article length '{}'. Valid lengths: original, long, medium, short",
                other
            ))),
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: String,
}

impl TranslationClient {
    /// Returns None when translation is disabled or the configured API key
    /// environment variable is unset, so callers can skip translation rather
    /// than fail at startup.
    pub fn from_config(config: &LlmConfig) -> Result<Option<Self>> {
        if !config.enabled {
            return Ok(None);
        }
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

    async fn chat(&self, system: &str, user: &str) -> Result<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage { role: "system", content: system },
                ChatMessage { role: "user", content: user },
            ],
            temperature: 0.3,
        };

        let response = self
            .client
            .post(&self.base_url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(YtError::Translation(format!(
                "chat request failed ({}): {}",
                status,
                body.trim()
            )));
        }

        let parsed: ChatResponse = response.json().await?;
        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| YtError::Translation("chat response contained no choices".to_string()))
    }

    /// Translate a transcript into `target`, preserving segment count and
    /// timing exactly.
    pub async fn translate_transcript(
        &self,
        transcript: &Transcript,
        target: &str,
    ) -> Result<Transcript> {
        info!(
            "Translating {} segments from {} to {}",
            transcript.segments.len(),
            transcript.language,
            target
        );

        let mut translated = Vec::with_capacity(transcript.segments.len());
        for chunk in transcript.segments.chunks(CHUNK_SIZE) {
            let texts: Vec<&str> = chunk.iter().map(|s| s.text.as_str()).collect();
            translated.extend(self.translate_chunk(&texts, target).await?);
        }

        transcript.with_texts(target, translated)
    }

    /// Translate one batch of lines. The prompt numbers each line and the
    /// response is matched back by line number; a count mismatch falls back
    /// to one request per line so timing never drifts.
    async fn translate_chunk(&self, texts: &[&str], target: &str) -> Result<Vec<String>> {
        let system = format!(
            "You are a professional subtitle translator. Translate each numbered line into {}. \
             Reply with the same numbered lines, one translation per line, and nothing else. \
             Never merge, split, or omit lines.",
            language_name(target)
        );
        let numbered: String = texts
            .iter()
            .enumerate()
            .map(|(i, t)| format!("{}. {}\n", i + 1, t.replace('\n', " ")))
            .collect();

        let response = self.chat(&system, &numbered).await?;
        let lines = parse_numbered_lines(&response, texts.len());

        if let Some(lines) = lines {
            return Ok(lines);
        }

        warn!(
            "Batch translation returned a mismatched line count, retrying line by line ({} lines)",
            texts.len()
        );
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            let single = format!(
                "Translate into {}. Reply with the translation only:\n{}",
                language_name(target),
                text
            );
            let translated = self
                .chat("You are a professional subtitle translator.", &single)
                .await?;
            out.push(translated.trim().to_string());
        }
        Ok(out)
    }

    /// Rewrite a transcript as a prose article in `language`. Translation
    /// happens inside the same call when the transcript language differs.
    pub async fn generate_article(
        &self,
        transcript: &Transcript,
        metadata: &VideoMetadata,
        url: &str,
        language: &str,
        length: ArticleLength,
        metadata_style: MetadataStyle,
    ) -> Result<String> {
        info!(
            "Generating {:?} article in {} from a {} transcript",
            length,
            language,
            transcript.language
        );

        let system = ARTICLE_PROMPT
            .replace("{language}", language_name(language))
            .replace("{length_instruction}", length.instruction());
        let user = format!("Title: {}\n\nTranscript:\n{}", metadata.title, transcript.plain_text());

        let body = self.chat(&system, &user).await?;
        let body = body.trim();

        let article = match metadata_style {
            MetadataStyle::None => body.to_string(),
            MetadataStyle::Header => {
                format!("{}\n\n{}\n", metadata_block(metadata, url), body)
            }
            MetadataStyle::Footer => {
                format!("{}\n\n{}\n", body, metadata_block(metadata, url))
            }
        };
        Ok(article)
    }
}

/// Source attribution block placed above or below a generated article.
fn metadata_block(metadata: &VideoMetadata, url: &str) -> String {
    let mut block = format!("> **{}**", metadata.title);
    if let Some(uploader) = &metadata.uploader {
        block.push_str(&format!("\n> {}", uploader));
    }
    if let Some(date) = &metadata.upload_date {
        block.push_str(&format!("\n> {}", crate::output::format_upload_date(date)));
    }
    block.push_str(&format!("\n> <{}>", url));
    block
}

/// Match a numbered response back to the original lines. Returns None when
/// any line is missing, which signals the per-line fallback.
fn parse_numbered_lines(response: &str, expected: usize) -> Option<Vec<String>> {
    let mut out: Vec<Option<String>> = vec![None; expected];

    for line in response.lines() {
        let line = line.trim();
        let Some((number, text)) = line.split_once('.') else {
            continue;
        };
        let Ok(index) = number.trim().parse::<usize>() else {
            continue;
        };
        if index == 0 || index > expected {
            continue;
        }
        out[index - 1] = Some(text.trim().to_string());
    }

    if out.iter().any(|l| l.is_none()) {
        debug!("Numbered response incomplete: {} lines expected", expected);
        return None;
    }
    Some(out.into_iter().flatten().collect())
}

/// English name for a language code, used in prompts. Unknown codes pass
/// through unchanged; LLMs handle raw BCP-47 tags reasonably well.
pub fn language_name(code: &str) -> &str {
    match code.to_lowercase().as_str() {
        "en" | "en-us" | "en-gb" => "English",
        "ja" => "Japanese",
        "ko" => "Korean",
        "zh" | "zh-hans" => "Simplified Chinese",
        "zh-hant" => "Traditional Chinese",
        "es" => "Spanish",
        "fr" => "French",
        "de" => "German",
        "pt" => "Portuguese",
        "it" => "Italian",
        "ru" => "Russian",
        "ar" => "Arabic",
        "hi" => "Hindi",
        "nl" => "Dutch",
        "vi" => "Vietnamese",
        "th" => "Thai",
        "id" => "Indonesian",
        _ => code,
    }
}
