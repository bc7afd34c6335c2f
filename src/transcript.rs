//! Transcript data model and the caption/transcription fallback chain.

use std::fmt;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::cache::TranscriptionStore;
use crate::config::WhisperMode;
use crate::error::{Result, YtError};
use crate::youtube::VideoMetadata;

/// A single timed segment of spoken content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptSegment {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

impl TranscriptSegment {
    pub fn new(start: f64, end: f64, text: impl Into<String>) -> Self {
        Self {
            start,
            end: end.max(start),
            text: text.into(),
        }
    }
}

/// Which fallback stage produced a transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Provenance {
    Official,
    AutoGenerated,
    Transcribed,
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Provenance::Official => "official",
            Provenance::AutoGenerated => "auto-generated",
            Provenance::Transcribed => "whisper",
        };
        write!(f, "{}", label)
    }
}

/// An immutable transcript for one (video, language) pair.
///
/// Segments are ordered by start time; construction sorts and clamps so the
/// ordering invariant holds regardless of the source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transcript {
    pub video_id: String,
    pub language: String,
    pub provenance: Provenance,
    pub segments: Vec<TranscriptSegment>,
}

impl Transcript {
    pub fn new(
        video_id: impl Into<String>,
        language: impl Into<String>,
        provenance: Provenance,
        mut segments: Vec<TranscriptSegment>,
    ) -> Self {
        segments.sort_by(|a, b| a.start.partial_cmp(&b.start).unwrap_or(std::cmp::Ordering::Equal));
        for seg in &mut segments {
            if seg.end < seg.start {
                seg.end = seg.start;
            }
        }
        Self {
            video_id: video_id.into(),
            language: language.into(),
            provenance,
            segments,
        }
    }

    /// Concatenated segment texts, timestamps discarded.
    pub fn plain_text(&self) -> String {
        self.segments
            .iter()
            .map(|s| s.text.trim())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Build a new transcript in `language` with the same timing but new texts.
    ///
    /// Returns an error when the text count does not match the segment count,
    /// so callers cannot accidentally break the timing-preservation invariant.
    pub fn with_texts(&self, language: impl Into<String>, texts: Vec<String>) -> Result<Self> {
        if texts.len() != self.segments.len() {
            return Err(YtError::Translation(format!(
                "segment count changed during translation: {} -> {}",
                self.segments.len(),
                texts.len()
            )));
        }
        let segments = self
            .segments
            .iter()
            .zip(texts)
            .map(|(seg, text)| TranscriptSegment {
                start: seg.start,
                end: seg.end,
                text,
            })
            .collect();
        Ok(Self {
            video_id: self.video_id.clone(),
            language: language.into(),
            provenance: self.provenance,
            segments,
        })
    }
}

/// Result of a speech-to-text transcription, before it is tied to a video.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscribedAudio {
    pub language: String,
    pub segments: Vec<TranscriptSegment>,
}

/// Source of video metadata, caption tracks, and audio streams.
#[async_trait]
pub trait CaptionProvider: Send + Sync {
    async fn metadata(&self, url: &str) -> Result<VideoMetadata>;

    /// Fetch the caption track for `language`. `automatic` selects the
    /// auto-generated track instead of the official one. Returns the raw
    /// subtitle text (VTT or SRT) when the track exists.
    async fn captions(&self, url: &str, language: &str, automatic: bool) -> Result<Option<String>>;

    /// Download the audio stream to a file under `dir` named `{stem}.<ext>`
    /// and return the path of the file actually produced.
    async fn download_audio(&self, url: &str, dir: &Path, stem: &str) -> Result<PathBuf>;
}

/// Remote speech-to-text endpoint.
#[async_trait]
pub trait SpeechTranscriber: Send + Sync {
    async fn transcribe(&self, audio: &Path) -> Result<TranscribedAudio>;
}

/// Fetches transcripts through the fallback chain:
/// official captions, then auto-generated captions, then Whisper
/// transcription of the downloaded audio.
pub struct TranscriptFetcher<'a> {
    provider: &'a dyn CaptionProvider,
    transcriber: Option<&'a dyn SpeechTranscriber>,
    store: &'a dyn TranscriptionStore,
    audio_dir: PathBuf,
    mode: WhisperMode,
    discard_audio: bool,
}

/// Auto-caption languages worth trying when the requested language has no
/// track of its own. YouTube auto-generates captions in dozens of languages;
/// probing them all trips rate limits.
const PREFERRED_AUTO_LANGS: &[&str] = &[
    "en", "en-US", "en-GB", "zh", "zh-Hans", "zh-Hant", "ja", "ko", "es", "fr", "de", "pt",
];

impl<'a> TranscriptFetcher<'a> {
    pub fn new(
        provider: &'a dyn CaptionProvider,
        transcriber: Option<&'a dyn SpeechTranscriber>,
        store: &'a dyn TranscriptionStore,
        audio_dir: impl Into<PathBuf>,
        mode: WhisperMode,
        discard_audio: bool,
    ) -> Self {
        Self {
            provider,
            transcriber,
            store,
            audio_dir: audio_dir.into(),
            mode,
            discard_audio,
        }
    }

    /// Fetch a transcript in `language`, or in whatever source language the
    /// chain can produce (the caller translates when they differ).
    ///
    /// `allow_other_languages` enables the source-language rescue step used
    /// when translation is available.
    pub async fn fetch(
        &self,
        url: &str,
        metadata: &VideoMetadata,
        language: &str,
        allow_other_languages: bool,
    ) -> Result<Transcript> {
        if self.mode != WhisperMode::Force {
            if let Some(transcript) = self.try_captions(url, metadata, language).await? {
                return Ok(transcript);
            }

            if allow_other_languages {
                if let Some(transcript) = self.try_any_captions(url, metadata).await? {
                    return Ok(transcript);
                }
            }
        } else {
            debug!("use-whisper: force, skipping caption lookup");
        }

        if self.mode == WhisperMode::Never {
            return Err(YtError::NoTranscript {
                video: metadata.id.clone(),
                language: language.to_string(),
            });
        }

        self.transcribe(url, metadata).await
    }

    /// Fetch a transcript in any language the chain can produce, preferring
    /// captions over Whisper. Used by article mode, which translates as part
    /// of the rewrite call.
    pub async fn fetch_source(&self, url: &str, metadata: &VideoMetadata) -> Result<Transcript> {
        if self.mode != WhisperMode::Force {
            if let Some(transcript) = self.try_any_captions(url, metadata).await? {
                return Ok(transcript);
            }
        }
        if self.mode == WhisperMode::Never {
            return Err(YtError::NoTranscript {
                video: metadata.id.clone(),
                language: "any".to_string(),
            });
        }
        self.transcribe(url, metadata).await
    }

    async fn try_captions(
        &self,
        url: &str,
        metadata: &VideoMetadata,
        language: &str,
    ) -> Result<Option<Transcript>> {
        if metadata.subtitle_langs.iter().any(|l| l == language) {
            if let Some(content) = self.provider.captions(url, language, false).await? {
                info!("Found official transcript in {}", language);
                return Ok(Some(self.parse_captions(metadata, language, Provenance::Official, &content)?));
            }
        }

        if metadata.auto_caption_langs.iter().any(|l| l == language) {
            if let Some(content) = self.provider.captions(url, language, true).await? {
                info!("Found auto-generated captions in {}", language);
                return Ok(Some(self.parse_captions(
                    metadata,
                    language,
                    Provenance::AutoGenerated,
                    &content,
                )?));
            }
        }

        Ok(None)
    }

    async fn try_any_captions(
        &self,
        url: &str,
        metadata: &VideoMetadata,
    ) -> Result<Option<Transcript>> {
        for lang in &metadata.subtitle_langs {
            if let Some(content) = self.provider.captions(url, lang, false).await? {
                info!("Found official transcript in source language {}", lang);
                return Ok(Some(self.parse_captions(metadata, lang, Provenance::Official, &content)?));
            }
        }

        let mut candidates: Vec<&str> = PREFERRED_AUTO_LANGS
            .iter()
            .copied()
            .filter(|l| metadata.auto_caption_langs.iter().any(|a| a == l))
            .collect();
        if candidates.is_empty() {
            if let Some(first) = metadata.auto_caption_langs.first() {
                candidates.push(first);
            }
        }

        for lang in candidates {
            if let Some(content) = self.provider.captions(url, lang, true).await? {
                info!("Found auto-generated captions in source language {}", lang);
                return Ok(Some(self.parse_captions(
                    metadata,
                    lang,
                    Provenance::AutoGenerated,
                    &content,
                )?));
            }
        }

        Ok(None)
    }

    fn parse_captions(
        &self,
        metadata: &VideoMetadata,
        language: &str,
        provenance: Provenance,
        content: &str,
    ) -> Result<Transcript> {
        let segments = crate::format::parse_subtitles(content)?;
        Ok(Transcript::new(&metadata.id, language, provenance, segments))
    }

    /// Download the audio (cached on disk keyed by video ID) and transcribe
    /// it, caching the result so other target languages reuse it.
    async fn transcribe(&self, url: &str, metadata: &VideoMetadata) -> Result<Transcript> {
        let transcriber = self.transcriber.ok_or_else(|| {
            YtError::Transcription("Whisper API key not configured".to_string())
        })?;

        if let Some(cached) = self.store.get(&metadata.id)? {
            debug!("Using cached transcription for {}", metadata.id);
            return Ok(Transcript::new(
                &metadata.id,
                cached.language.clone(),
                Provenance::Transcribed,
                cached.segments,
            ));
        }

        let audio_path = self.cached_audio(&metadata.id).await;
        let audio_path = match audio_path {
            Some(path) => {
                info!("Using cached audio: {}", path.display());
                path
            }
            None => {
                info!("Downloading audio for Whisper transcription");
                tokio::fs::create_dir_all(&self.audio_dir).await?;
                self.provider.download_audio(url, &self.audio_dir, &metadata.id).await?
            }
        };

        // The audio stays on disk if transcription fails, so a later run can
        // resume without re-downloading.
        let result = transcriber.transcribe(&audio_path).await?;
        info!("Whisper transcription complete (detected: {})", result.language);

        self.store.put(&metadata.id, &result)?;

        if self.discard_audio {
            if let Err(e) = tokio::fs::remove_file(&audio_path).await {
                warn!("Failed to delete audio file {}: {}", audio_path.display(), e);
            }
        }

        Ok(Transcript::new(
            &metadata.id,
            result.language,
            Provenance::Transcribed,
            result.segments,
        ))
    }

    async fn cached_audio(&self, video_id: &str) -> Option<PathBuf> {
        for ext in ["m4a", "mp3", "opus", "webm"] {
            let path = self.audio_dir.join(format!("{}.{}", video_id, ext));
            if tokio::fs::try_exists(&path).await.unwrap_or(false) {
                return Some(path);
            }
        }
        None
    }
}
