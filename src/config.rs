//! Configuration loading: YAML file merged with CLI flags, credentials by
//! environment-variable reference.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, YtError};

pub const DEFAULT_CONFIG_TEMPLATE: &str = include_str!("../config.example.yaml");

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Target languages, in priority order.
    pub languages: Vec<String>,
    pub output: OutputConfig,
    pub storage: StorageConfig,
    pub youtube: YoutubeConfig,
    pub transcription: TranscriptionConfig,
    pub llm: LlmConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Output format: srt, vtt, txt, or article.
    pub format: String,
    /// Emit the first language's transcript on stdout.
    pub pipe_mode: bool,
    /// Date prefix source for output filenames.
    pub filename_date: DateMode,
    /// Verbose log file path. None disables file logging.
    pub log_file: Option<String>,
    pub article: ArticleConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DateMode {
    /// Video upload date.
    Upload,
    /// Date of the invocation.
    Request,
    /// No date prefix.
    None,
}

impl FromStr for DateMode {
    type Err = YtError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "upload" => Ok(DateMode::Upload),
            "request" => Ok(DateMode::Request),
            "none" => Ok(DateMode::None),
            other => Err(YtError::Config(format!(
                "Invalid date mode '{}'. Valid modes: upload, request, none",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArticleConfig {
    /// Where the title/author/source block goes: none, header, or footer.
    pub metadata: MetadataStyle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetadataStyle {
    None,
    Header,
    Footer,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub audio_dir: String,
    pub transcript_dir: String,
    pub article_dir: String,
    /// Keep downloaded audio after a successful transcription so other
    /// target languages and later runs can reuse it.
    pub keep_audio: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct YoutubeConfig {
    /// Path to cookies.txt (Netscape format).
    pub cookies_file: Option<String>,
    /// Browser to extract cookies from (chrome, firefox, safari, ...).
    pub cookies_from_browser: Option<String>,
    /// Force a YouTube player client: web, android, ios, tv.
    pub player_client: Option<String>,
    /// Retry a rejected request once without cookies. The exact trigger
    /// condition upstream is undocumented, so the retry is a switch rather
    /// than hard-coded behavior.
    pub retry_without_cookies: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptionConfig {
    /// OpenAI-compatible audio transcription endpoint.
    pub base_url: String,
    pub model: String,
    /// Environment variable holding the API key.
    pub api_key_env: String,
    /// When to use Whisper: never, fallback, or force.
    pub use_whisper: WhisperMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WhisperMode {
    /// Never transcribe; captions only.
    Never,
    /// Transcribe only when no usable caption track exists.
    Fallback,
    /// Skip caption lookup and always transcribe.
    Force,
}

impl FromStr for WhisperMode {
    type Err = YtError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "never" => Ok(WhisperMode::Never),
            "fallback" => Ok(WhisperMode::Fallback),
            "force" => Ok(WhisperMode::Force),
            other => Err(YtError::Config(format!(
                "Invalid whisper mode '{}'. Valid modes: never, fallback, force",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Disable to fetch transcripts without any translation step.
    pub enabled: bool,
    /// OpenAI-compatible chat completions endpoint.
    pub base_url: String,
    pub model: String,
    /// Environment variable holding the API key.
    pub api_key_env: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            languages: vec!["en".to_string()],
            output: OutputConfig::default(),
            storage: StorageConfig::default(),
            youtube: YoutubeConfig::default(),
            transcription: TranscriptionConfig::default(),
            llm: LlmConfig::default(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: "srt".to_string(),
            pipe_mode: false,
            filename_date: DateMode::Upload,
            log_file: None,
            article: ArticleConfig::default(),
        }
    }
}

impl Default for ArticleConfig {
    fn default() -> Self {
        Self {
            metadata: MetadataStyle::Header,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            audio_dir: "~/YouTube Subtitles/Audio".to_string(),
            transcript_dir: "~/YouTube Subtitles/Transcripts".to_string(),
            article_dir: "~/YouTube Subtitles/Articles".to_string(),
            keep_audio: true,
        }
    }
}

impl Default for YoutubeConfig {
    fn default() -> Self {
        Self {
            cookies_file: None,
            cookies_from_browser: None,
            player_client: None,
            retry_without_cookies: true,
        }
    }
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1/audio/transcriptions".to_string(),
            model: "whisper-1".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            use_whisper: WhisperMode::Fallback,
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: "https://api.openai.com/v1/chat/completions".to_string(),
            model: "gpt-4o".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
        }
    }
}

impl TranscriptionConfig {
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env).ok().filter(|k| !k.is_empty())
    }
}

impl LlmConfig {
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env).ok().filter(|k| !k.is_empty())
    }
}

impl Config {
    /// Default config location: `~/.config/yt/config.yaml`.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("yt")
            .join("config.yaml")
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            YtError::Config(format!(
                "Failed to read config file {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        serde_yaml::from_str(&content)
            .map_err(|e| YtError::Config(format!("Failed to parse config file: {}", e)))
    }

    /// Load configuration: explicit path must exist; the default path falls
    /// back to defaults when absent.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                let default = Self::default_path();
                if default.exists() {
                    Self::from_file(default)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn audio_dir(&self) -> PathBuf {
        expand_path(&self.storage.audio_dir)
    }

    pub fn transcript_dir(&self) -> PathBuf {
        expand_path(&self.storage.transcript_dir)
    }

    pub fn article_dir(&self) -> PathBuf {
        expand_path(&self.storage.article_dir)
    }

    pub fn log_file(&self) -> Option<PathBuf> {
        self.output.log_file.as_deref().map(expand_path)
    }

    pub fn ensure_directories(&self) -> Result<()> {
        std::fs::create_dir_all(self.audio_dir())?;
        std::fs::create_dir_all(self.transcript_dir())?;
        std::fs::create_dir_all(self.article_dir())?;
        Ok(())
    }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_path(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

/// Parse comma-separated language codes.
pub fn parse_language_codes(s: &str) -> Vec<String> {
    s.split(',')
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = Config::default();
        assert_eq!(config.languages, vec!["en"]);
        assert_eq!(config.output.format, "srt");
        assert_eq!(config.transcription.use_whisper, WhisperMode::Fallback);
        assert_eq!(config.output.filename_date, DateMode::Upload);
        assert!(config.youtube.retry_without_cookies);
    }

    #[test]
    fn partial_yaml_fills_in_defaults() {
        let yaml = "languages:\n  - ja\n  - ko\ntranscription:\n  use_whisper: never\n";
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.languages, vec!["ja", "ko"]);
        assert_eq!(config.transcription.use_whisper, WhisperMode::Never);
        // Untouched sections keep defaults.
        assert_eq!(config.llm.model, "gpt-4o");
        assert_eq!(config.output.format, "srt");
    }

    #[test]
    fn default_template_parses() {
        let config: Config = serde_yaml::from_str(DEFAULT_CONFIG_TEMPLATE).unwrap();
        assert!(!config.languages.is_empty());
        assert_eq!(config.transcription.model, "whisper-1");
    }

    #[test]
    fn whisper_mode_from_str() {
        assert_eq!("never".parse::<WhisperMode>().unwrap(), WhisperMode::Never);
        assert_eq!("FORCE".parse::<WhisperMode>().unwrap(), WhisperMode::Force);
        assert!("sometimes".parse::<WhisperMode>().is_err());
    }

    #[test]
    fn language_code_parsing() {
        assert_eq!(parse_language_codes("en, ja ,ko"), vec!["en", "ja", "ko"]);
        assert_eq!(parse_language_codes("en,,"), vec!["en"]);
        assert!(parse_language_codes("").is_empty());
    }
}
