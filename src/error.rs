use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum YtError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Extraction error: {0}")]
    Extractor(String),

    #[error("Transcription error: {0}")]
    Transcription(String),

    #[error("Translation error: {0}")]
    Translation(String),

    #[error("Format error: {0}")]
    Format(String),

    #[error("No transcript available for {video} in {language}")]
    NoTranscript { video: String, language: String },

    #[error("Output file already exists: {0} (use --force to overwrite)")]
    FileExists(PathBuf),

    #[error("File not found: {0}")]
    FileNotFound(String),
}

pub type Result<T> = std::result::Result<T, YtError>;
