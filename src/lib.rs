//! yt-transcript - YouTube transcript downloader
//!
//! Fetches transcripts for YouTube videos through a fallback chain of
//! official captions, auto-generated captions, and Whisper transcription,
//! with optional LLM translation and article rewriting.

pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod format;
pub mod output;
pub mod transcript;
pub mod translate;
pub mod whisper;
pub mod workflow;
pub mod youtube;
