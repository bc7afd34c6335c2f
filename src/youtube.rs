//! YouTube metadata, caption, and audio extraction via the yt-dlp CLI.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::YoutubeConfig;
use crate::error::{Result, YtError};
use crate::transcript::CaptionProvider;

/// Metadata for a single video. Immutable once fetched.
#[derive(Debug, Clone)]
pub struct VideoMetadata {
    pub id: String,
    pub title: String,
    /// Upload date in `YYYYMMDD` form, as yt-dlp reports it.
    pub upload_date: Option<String>,
    pub uploader: Option<String>,
    /// Duration in seconds.
    pub duration: u64,
    /// Languages with an official (owner-authored) caption track.
    pub subtitle_langs: Vec<String>,
    /// Languages with an auto-generated caption track.
    pub auto_caption_langs: Vec<String>,
}

/// Stderr markers that indicate a cookie-authenticated request was rejected.
/// yt-dlp does not expose the HTTP status directly, so this is best-effort
/// matching; the retry itself is gated by `retry_without_cookies`.
const AUTH_ERROR_MARKERS: &[&str] = &[
    "HTTP Error 401",
    "HTTP Error 403",
    "Sign in to confirm",
    "cookies are no longer valid",
];

pub struct YouTubeClient {
    program: String,
    options: YoutubeConfig,
    verbose: bool,
}

impl YouTubeClient {
    pub fn new(options: YoutubeConfig, verbose: bool) -> Self {
        Self {
            program: "yt-dlp".to_string(),
            options,
            verbose,
        }
    }

    fn base_args(&self, with_cookies: bool) -> Vec<String> {
        let mut args = vec!["--no-playlist".to_string()];
        if !self.verbose {
            args.push("--quiet".to_string());
            args.push("--no-warnings".to_string());
        }
        if with_cookies {
            if let Some(file) = &self.options.cookies_file {
                args.push("--cookies".to_string());
                args.push(crate::config::expand_path(file).to_string_lossy().into_owned());
            }
            if let Some(browser) = &self.options.cookies_from_browser {
                args.push("--cookies-from-browser".to_string());
                args.push(browser.clone());
            }
        }
        if let Some(client) = &self.options.player_client {
            args.push("--extractor-args".to_string());
            args.push(format!("youtube:player_client={}", client));
        }
        args
    }

    fn has_cookies(&self) -> bool {
        self.options.cookies_file.is_some() || self.options.cookies_from_browser.is_some()
    }

    async fn run(&self, extra_args: &[String]) -> Result<std::process::Output> {
        let output = self.spawn(extra_args, true).await?;
        if output.status.success() {
            return Ok(output);
        }

        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        if self.has_cookies() && self.options.retry_without_cookies && is_auth_rejection(&stderr) {
            warn!("Request rejected with cookies, retrying without");
            let retried = self.spawn(extra_args, false).await?;
            if retried.status.success() {
                return Ok(retried);
            }
            let stderr = String::from_utf8_lossy(&retried.stderr).into_owned();
            return Err(YtError::Extractor(format!("yt-dlp failed: {}", stderr.trim())));
        }

        Err(YtError::Extractor(format!("yt-dlp failed: {}", stderr.trim())))
    }

    async fn spawn(&self, extra_args: &[String], with_cookies: bool) -> Result<std::process::Output> {
        let mut args = self.base_args(with_cookies);
        args.extend_from_slice(extra_args);
        debug!("Running {} {}", self.program, args.join(" "));

        tokio::process::Command::new(&self.program)
            .args(&args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| YtError::Extractor(format!("failed to run {}: {}", self.program, e)))
    }
}

#[async_trait]
impl CaptionProvider for YouTubeClient {
    async fn metadata(&self, url: &str) -> Result<VideoMetadata> {
        let args = vec![
            "--dump-json".to_string(),
            "--skip-download".to_string(),
            url.to_string(),
        ];
        let output = self.run(&args).await?;
        let json = String::from_utf8_lossy(&output.stdout);
        parse_metadata(&json)
    }

    async fn captions(&self, url: &str, language: &str, automatic: bool) -> Result<Option<String>> {
        let dir = tempfile::tempdir()?;
        let template = dir.path().join("captions");

        let mut args = vec!["--skip-download".to_string()];
        if automatic {
            args.push("--write-auto-subs".to_string());
        } else {
            args.push("--write-subs".to_string());
        }
        args.push("--sub-langs".to_string());
        args.push(language.to_string());
        args.push("--sub-format".to_string());
        args.push("vtt/srt/best".to_string());
        args.push("-o".to_string());
        args.push(template.to_string_lossy().into_owned());
        args.push(url.to_string());

        if let Err(e) = self.run(&args).await {
            debug!("Caption download failed for {} ({}): {}", language, url, e);
            return Ok(None);
        }

        // yt-dlp appends the language code and extension to the template.
        for ext in ["vtt", "srt"] {
            let path = dir.path().join(format!("captions.{}.{}", language, ext));
            if path.exists() {
                return Ok(Some(tokio::fs::read_to_string(&path).await?));
            }
        }

        // Language tags in filenames can differ from the requested code
        // (e.g. en-orig), so fall back to any subtitle file in the directory.
        let mut entries = tokio::fs::read_dir(dir.path()).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            match path.extension().and_then(|e| e.to_str()) {
                Some("vtt") | Some("srt") => {
                    return Ok(Some(tokio::fs::read_to_string(&path).await?));
                }
                _ => {}
            }
        }

        Ok(None)
    }

    async fn download_audio(&self, url: &str, dir: &Path, stem: &str) -> Result<PathBuf> {
        let template = dir.join(format!("{}.%(ext)s", stem));

        let args = vec![
            "-f".to_string(),
            "bestaudio[ext=m4a]/bestaudio/best".to_string(),
            "--extract-audio".to_string(),
            "--audio-format".to_string(),
            "m4a".to_string(),
            "-o".to_string(),
            template.to_string_lossy().into_owned(),
            url.to_string(),
        ];
        self.run(&args).await?;

        for ext in ["m4a", "mp3", "opus", "webm"] {
            let path = dir.join(format!("{}.{}", stem, ext));
            if path.exists() {
                return Ok(path);
            }
        }

        Err(YtError::Extractor(format!("audio download produced no file for {}", url)))
    }
}

/// Parse the JSON document emitted by `yt-dlp --dump-json`.
fn parse_metadata(json: &str) -> Result<VideoMetadata> {
    let info: Value = serde_json::from_str(json.trim())
        .map_err(|e| YtError::Extractor(format!("invalid yt-dlp JSON: {}", e)))?;

    let id = info["id"]
        .as_str()
        .ok_or_else(|| YtError::Extractor("metadata missing video id".to_string()))?
        .to_string();

    Ok(VideoMetadata {
        id,
        title: info["title"].as_str().unwrap_or("Unknown").to_string(),
        upload_date: info["upload_date"].as_str().map(|s| s.to_string()),
        uploader: info["uploader"].as_str().map(|s| s.to_string()),
        duration: info["duration"].as_f64().unwrap_or(0.0) as u64,
        subtitle_langs: track_languages(&info["subtitles"]),
        auto_caption_langs: track_languages(&info["automatic_captions"]),
    })
}

fn track_languages(tracks: &Value) -> Vec<String> {
    tracks
        .as_object()
        .map(|map| map.keys().cloned().collect())
        .unwrap_or_default()
}

fn is_auth_rejection(stderr: &str) -> bool {
    AUTH_ERROR_MARKERS.iter().any(|marker| stderr.contains(marker))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_metadata_full() {
        let json = r#"{
            "id": "dQw4w9WgXcQ",
            "title": "Test Title",
            "upload_date": "20241213",
            "uploader": "Channel",
            "duration": 212.4,
            "subtitles": {"en": [{"ext": "vtt"}]},
            "automatic_captions": {"en": [{"ext": "vtt"}], "ja": [{"ext": "vtt"}]}
        }"#;
        let meta = parse_metadata(json).unwrap();
        assert_eq!(meta.id, "dQw4w9WgXcQ");
        assert_eq!(meta.title, "Test Title");
        assert_eq!(meta.upload_date.as_deref(), Some("20241213"));
        assert_eq!(meta.duration, 212);
        assert_eq!(meta.subtitle_langs, vec!["en"]);
        assert_eq!(meta.auto_caption_langs, vec!["en", "ja"]);
    }

    #[test]
    fn parse_metadata_missing_optional_fields() {
        let json = r#"{"id": "abc", "title": "t"}"#;
        let meta = parse_metadata(json).unwrap();
        assert_eq!(meta.upload_date, None);
        assert!(meta.subtitle_langs.is_empty());
    }

    #[test]
    fn parse_metadata_requires_id() {
        assert!(parse_metadata(r#"{"title": "t"}"#).is_err());
        assert!(parse_metadata("not json").is_err());
    }

    #[test]
    fn auth_rejection_markers() {
        assert!(is_auth_rejection("ERROR: HTTP Error 403: Forbidden"));
        assert!(is_auth_rejection("Sign in to confirm you're not a bot"));
        assert!(!is_auth_rejection("ERROR: video unavailable"));
    }
}
