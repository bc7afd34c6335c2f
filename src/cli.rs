//! Command-line interface definitions and config overrides.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::{parse_language_codes, Config, DateMode, WhisperMode};
use crate::translate::ArticleLength;

#[derive(Parser, Debug)]
#[command(
    name = "yt",
    version,
    about = "Download YouTube transcripts, with Whisper and LLM translation fallbacks"
)]
pub struct Cli {
    /// Video URLs to process
    pub urls: Vec<String>,

    /// Config file path (default: ~/.config/yt/config.yaml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Target languages, comma separated (e.g. "en,ja")
    #[arg(short, long)]
    pub languages: Option<String>,

    /// Output format: srt, vtt, txt, or article
    #[arg(short, long)]
    pub format: Option<String>,

    /// Read URLs from a file, one per line ('#' starts a comment)
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Also write the first language's transcript to stdout
    #[arg(short, long)]
    pub pipe: bool,

    /// With --pipe, skip writing output files entirely
    #[arg(long, requires = "pipe")]
    pub no_save: bool,

    /// Overwrite existing output files
    #[arg(long)]
    pub force: bool,

    /// Fetch transcripts in whatever language is available, without translating
    #[arg(long)]
    pub no_translate: bool,

    /// Delete downloaded audio after a successful transcription
    #[arg(long)]
    pub discard_audio: bool,

    /// When to use Whisper transcription: never, fallback, or force
    #[arg(long = "whisper", value_name = "MODE")]
    pub use_whisper: Option<WhisperMode>,

    /// Article length: original, long, medium, or short
    #[arg(long, value_name = "LENGTH", default_value = "medium")]
    pub length: ArticleLength,

    /// Number of parallel workers (reserved; only 1 is supported)
    #[arg(long, value_name = "N", default_value_t = 1)]
    pub workers: usize,

    /// Filename date prefix: upload, request, or none
    #[arg(long, value_name = "MODE")]
    pub date: Option<DateMode>,

    /// cookies.txt file passed to yt-dlp
    #[arg(long = "cookies", value_name = "FILE")]
    pub cookies_file: Option<String>,

    /// Browser to extract cookies from (chrome, firefox, ...)
    #[arg(long, value_name = "BROWSER")]
    pub cookies_from_browser: Option<String>,

    /// Force a YouTube player client (web, android, ios, tv)
    #[arg(long, value_name = "CLIENT")]
    pub player_client: Option<String>,

    /// Verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Inspect or create the config file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Write a commented default config file
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },
}

impl Cli {
    /// Overlay command-line flags onto the loaded configuration. Flags win
    /// over the file; unset flags leave the file values alone.
    pub fn apply_to(&self, config: &mut Config) {
        if let Some(languages) = &self.languages {
            let parsed = parse_language_codes(languages);
            if !parsed.is_empty() {
                config.languages = parsed;
            }
        }
        if let Some(format) = &self.format {
            config.output.format = format.clone();
        }
        if self.pipe {
            config.output.pipe_mode = true;
        }
        if let Some(date) = self.date {
            config.output.filename_date = date;
        }
        if let Some(mode) = self.use_whisper {
            config.transcription.use_whisper = mode;
        }
        if self.no_translate {
            config.llm.enabled = false;
        }
        if self.discard_audio {
            config.storage.keep_audio = false;
        }
        if let Some(file) = &self.cookies_file {
            config.youtube.cookies_file = Some(file.clone());
        }
        if let Some(browser) = &self.cookies_from_browser {
            config.youtube.cookies_from_browser = Some(browser.clone());
        }
        if let Some(client) = &self.player_client {
            config.youtube.player_client = Some(client.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_config_file() {
        let cli = Cli::parse_from([
            "yt",
            "--languages",
            "ja,ko",
            "--format",
            "vtt",
            "--pipe",
            "--whisper",
            "force",
            "--date",
            "none",
            "https://youtu.be/abc",
        ]);
        let mut config = Config::default();
        cli.apply_to(&mut config);

        assert_eq!(config.languages, vec!["ja", "ko"]);
        assert_eq!(config.output.format, "vtt");
        assert!(config.output.pipe_mode);
        assert_eq!(config.transcription.use_whisper, WhisperMode::Force);
        assert_eq!(config.output.filename_date, DateMode::None);
        assert_eq!(cli.urls, vec!["https://youtu.be/abc"]);

        let cli = Cli::parse_from(["yt", "--no-translate", "--discard-audio", "url"]);
        let mut config = Config::default();
        cli.apply_to(&mut config);
        assert!(!config.llm.enabled);
        assert!(!config.storage.keep_audio);
    }

    #[test]
    fn unset_flags_keep_config_values() {
        let cli = Cli::parse_from(["yt", "https://youtu.be/abc"]);
        let mut config = Config::default();
        config.languages = vec!["de".to_string()];
        config.output.format = "txt".to_string();
        cli.apply_to(&mut config);

        assert_eq!(config.languages, vec!["de"]);
        assert_eq!(config.output.format, "txt");
        assert!(!config.output.pipe_mode);
    }

    #[test]
    fn config_subcommand_parses() {
        let cli = Cli::parse_from(["yt", "config", "init", "--force"]);
        assert!(matches!(
            cli.command,
            Some(Command::Config {
                action: ConfigAction::Init { force: true }
            })
        ));

        let cli = Cli::parse_from(["yt", "config", "show"]);
        assert!(matches!(
            cli.command,
            Some(Command::Config {
                action: ConfigAction::Show
            })
        ));
    }

    #[test]
    fn rejects_invalid_enum_values() {
        assert!(Cli::try_parse_from(["yt", "--whisper", "maybe", "url"]).is_err());
        assert!(Cli::try_parse_from(["yt", "--length", "huge", "url"]).is_err());
    }

    #[test]
    fn no_save_requires_pipe() {
        assert!(Cli::try_parse_from(["yt", "--no-save", "url"]).is_err());
        let cli = Cli::parse_from(["yt", "--pipe", "--no-save", "url"]);
        assert!(cli.pipe);
        assert!(cli.no_save);
    }
}
