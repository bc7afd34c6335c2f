//! Orchestrates the per-URL pipeline: metadata, fallback transcript fetch,
//! translation, and output writing.

use std::io::Write;

use console::style;
use tracing::{info, warn};

use crate::cache::DiskStore;
use crate::config::Config;
use crate::error::{Result, YtError};
use crate::format::{self, OutputFormat};
use crate::output;
use crate::transcript::{CaptionProvider, SpeechTranscriber, Transcript, TranscriptFetcher};
use crate::translate::{ArticleLength, TranslationClient};
use crate::whisper::WhisperClient;
use crate::youtube::{VideoMetadata, YouTubeClient};

pub struct Workflow {
    config: Config,
    format: OutputFormat,
    article_length: ArticleLength,
    force: bool,
    no_save: bool,
    provider: YouTubeClient,
    transcriber: Option<WhisperClient>,
    translator: Option<TranslationClient>,
    store: DiskStore,
}

/// Per-run tally. One failing URL never aborts the rest of the batch.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub succeeded: usize,
    pub failed: usize,
}

/// What to do for one requested language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LanguageAction {
    /// Nothing to produce (--no-save and not the piped language).
    Skip,
    /// Output file already present; leave it alone.
    NoteExisting,
    /// Output file already present; stream its content to stdout without
    /// fetching anything.
    PipeExisting,
    /// Fetch and deliver.
    Fetch { to_stdout: bool, write_file: bool },
}

/// Decide how to handle the language at `index`. Pipe mode streams only the
/// first requested language to stdout; files are still written for every
/// language unless --no-save.
fn plan_language(
    index: usize,
    pipe: bool,
    no_save: bool,
    exists: bool,
    force: bool,
) -> LanguageAction {
    let to_stdout = pipe && index == 0;

    if pipe && no_save {
        return if to_stdout {
            LanguageAction::Fetch { to_stdout: true, write_file: false }
        } else {
            LanguageAction::Skip
        };
    }

    if exists && !force {
        return if to_stdout {
            LanguageAction::PipeExisting
        } else {
            LanguageAction::NoteExisting
        };
    }

    LanguageAction::Fetch { to_stdout, write_file: true }
}

impl Workflow {
    pub fn new(
        config: Config,
        format: OutputFormat,
        article_length: ArticleLength,
        force: bool,
        no_save: bool,
        verbose: bool,
    ) -> Result<Self> {
        let provider = YouTubeClient::new(config.youtube.clone(), verbose);
        let transcriber = WhisperClient::from_config(&config.transcription)?;
        let translator = TranslationClient::from_config(&config.llm)?;

        if format == OutputFormat::Article && translator.is_none() {
            return Err(YtError::Config(format!(
                "Article output needs the LLM enabled and an API key in {}",
                config.llm.api_key_env
            )));
        }
        let store = DiskStore::new(config.audio_dir());

        if transcriber.is_none() {
            info!(
                "{} unset, Whisper fallback disabled",
                config.transcription.api_key_env
            );
        }

        Ok(Self {
            config,
            format,
            article_length,
            force,
            no_save,
            provider,
            transcriber,
            translator,
            store,
        })
    }

    pub async fn run(&self, urls: &[String]) -> Result<RunSummary> {
        let mut summary = RunSummary::default();

        for url in urls {
            match self.process_url(url).await {
                Ok(()) => summary.succeeded += 1,
                Err(e) => {
                    summary.failed += 1;
                    warn!("Failed to process {}: {}", url, e);
                    eprintln!("{} {}: {}", style("error:").red().bold(), url, e);
                }
            }
        }

        Ok(summary)
    }

    async fn process_url(&self, url: &str) -> Result<()> {
        eprintln!("{} {}", style("Fetching").cyan().bold(), url);
        let metadata = self.provider.metadata(url).await?;
        info!(
            "Video {}: \"{}\" ({}s)",
            metadata.id, metadata.title, metadata.duration
        );

        if self.format == OutputFormat::Article {
            self.process_article(url, &metadata).await
        } else {
            self.process_subtitles(url, &metadata).await
        }
    }

    /// One output file per requested language. In pipe mode the first
    /// language is additionally written to stdout (and exclusively to stdout
    /// with --no-save). A failing language is skipped so the remaining
    /// languages still get their files.
    async fn process_subtitles(&self, url: &str, metadata: &VideoMetadata) -> Result<()> {
        let dir = self.config.transcript_dir();
        let date = output::resolve_date(self.config.output.filename_date, metadata);
        let pipe = self.config.output.pipe_mode;
        let mut produced = 0usize;
        let mut failed = 0usize;

        for (index, language) in self.config.languages.iter().enumerate() {
            let filename = output::output_filename(
                &metadata.title,
                language,
                self.format.extension(),
                date.as_deref(),
            );
            let exists = dir.join(&filename).exists();

            let result = match plan_language(index, pipe, self.no_save, exists, self.force) {
                LanguageAction::Skip => continue,
                LanguageAction::NoteExisting => {
                    eprintln!(
                        "{} {} (already exists)",
                        style("Skipping").yellow(),
                        filename
                    );
                    produced += 1;
                    continue;
                }
                LanguageAction::PipeExisting => self.pipe_existing(&dir.join(&filename)),
                LanguageAction::Fetch { to_stdout, write_file } => {
                    self.emit_language(url, metadata, language, &dir, &filename, to_stdout, write_file)
                        .await
                }
            };
            match result {
                Ok(()) => produced += 1,
                Err(e) => {
                    failed += 1;
                    warn!("Skipping language {} for {}: {}", language, metadata.id, e);
                    eprintln!("{} [{}] {}", style("Skipping").yellow(), language, e);
                }
            }
        }

        if produced == 0 && failed > 0 {
            return Err(YtError::NoTranscript {
                video: metadata.id.clone(),
                language: self.config.languages.join(","),
            });
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    async fn emit_language(
        &self,
        url: &str,
        metadata: &VideoMetadata,
        language: &str,
        dir: &std::path::Path,
        filename: &str,
        to_stdout: bool,
        write_file: bool,
    ) -> Result<()> {
        let transcript = self.transcript_in(url, metadata, language).await?;
        let rendered = format::render(&transcript, self.format)?;
        self.deliver(&rendered, dir, filename, to_stdout, write_file)?;
        if write_file {
            eprintln!(
                "{} {} ({})",
                style("Saved").green().bold(),
                filename,
                transcript.provenance
            );
        }
        Ok(())
    }

    /// Stream an already-saved output file to stdout.
    fn pipe_existing(&self, path: &std::path::Path) -> Result<()> {
        let content = std::fs::read_to_string(path)?;
        let mut stdout = std::io::stdout().lock();
        stdout.write_all(content.as_bytes())?;
        stdout.flush()?;
        Ok(())
    }

    fn deliver(
        &self,
        rendered: &str,
        dir: &std::path::Path,
        filename: &str,
        to_stdout: bool,
        write_file: bool,
    ) -> Result<()> {
        if to_stdout {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(rendered.as_bytes())?;
            stdout.flush()?;
        }
        if write_file {
            output::write_output(dir, filename, rendered, self.force)?;
        }
        Ok(())
    }

    /// One article per requested language, like the subtitle path. The
    /// source transcript is fetched once and reused for every language; the
    /// rewrite call translates as part of the same request.
    async fn process_article(&self, url: &str, metadata: &VideoMetadata) -> Result<()> {
        let translator = self.require_translator()?;
        if self.config.languages.is_empty() {
            return Err(YtError::Config("No target language configured".to_string()));
        }

        let dir = self.config.article_dir();
        let date = output::resolve_date(self.config.output.filename_date, metadata);
        let pipe = self.config.output.pipe_mode;
        let mut produced = 0usize;
        let mut failed = 0usize;

        // Plan every language up front so the source transcript is fetched
        // only when at least one language actually needs it.
        let plans: Vec<(&String, String, LanguageAction)> = self
            .config
            .languages
            .iter()
            .enumerate()
            .map(|(index, language)| {
                let filename = output::output_filename(
                    &metadata.title,
                    language,
                    self.format.extension(),
                    date.as_deref(),
                );
                let exists = dir.join(&filename).exists();
                let action = plan_language(index, pipe, self.no_save, exists, self.force);
                (language, filename, action)
            })
            .collect();

        // A source fetch failure affects every language, so it aborts the URL.
        let needs_source = plans
            .iter()
            .any(|(_, _, action)| matches!(action, LanguageAction::Fetch { .. }));
        let source = if needs_source {
            Some(self.fetcher().fetch_source(url, metadata).await?)
        } else {
            None
        };

        for (language, filename, action) in plans {
            let result = match action {
                LanguageAction::Skip => continue,
                LanguageAction::NoteExisting => {
                    eprintln!(
                        "{} {} (already exists)",
                        style("Skipping").yellow(),
                        filename
                    );
                    produced += 1;
                    continue;
                }
                LanguageAction::PipeExisting => self.pipe_existing(&dir.join(&filename)),
                LanguageAction::Fetch { to_stdout, write_file } => {
                    let Some(transcript) = source.as_ref() else {
                        continue;
                    };
                    let generated = translator
                        .generate_article(
                            transcript,
                            metadata,
                            url,
                            language,
                            self.article_length,
                            self.config.output.article.metadata,
                        )
                        .await;
                    match generated {
                        Ok(article) => self
                            .deliver(&article, &dir, &filename, to_stdout, write_file)
                            .map(|_| {
                                if write_file {
                                    eprintln!("{} {}", style("Saved").green().bold(), filename);
                                }
                            }),
                        Err(e) => Err(e),
                    }
                }
            };
            match result {
                Ok(()) => produced += 1,
                Err(e) => {
                    failed += 1;
                    warn!("Skipping language {} for {}: {}", language, metadata.id, e);
                    eprintln!("{} [{}] {}", style("Skipping").yellow(), language, e);
                }
            }
        }

        if produced == 0 && failed > 0 {
            return Err(YtError::NoTranscript {
                video: metadata.id.clone(),
                language: self.config.languages.join(","),
            });
        }
        Ok(())
    }

    /// Fetch a transcript in `language`, translating when the chain could
    /// only produce another language.
    async fn transcript_in(
        &self,
        url: &str,
        metadata: &VideoMetadata,
        language: &str,
    ) -> Result<Transcript> {
        let allow_other = self.translator.is_some();
        let transcript = self.fetcher().fetch(url, metadata, language, allow_other).await?;

        if transcript.language == language {
            return Ok(transcript);
        }

        let translator = self.require_translator()?;
        eprintln!(
            "{} {} -> {}",
            style("Translating").cyan().bold(),
            transcript.language,
            language
        );
        translator.translate_transcript(&transcript, language).await
    }

    fn fetcher(&self) -> TranscriptFetcher<'_> {
        TranscriptFetcher::new(
            &self.provider,
            self.transcriber.as_ref().map(|t| t as &dyn SpeechTranscriber),
            &self.store,
            self.config.audio_dir(),
            self.config.transcription.use_whisper,
            !self.config.storage.keep_audio,
        )
    }

    fn require_translator(&self) -> Result<&TranslationClient> {
        self.translator.as_ref().ok_or_else(|| {
            YtError::Translation(format!(
                "Translation needs an LLM API key; set {}",
                self.config.llm.api_key_env
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pipe_streams_first_language_and_saves_all() {
        // languages ["en", "ja"], nothing on disk yet
        assert_eq!(
            plan_language(0, true, false, false, false),
            LanguageAction::Fetch { to_stdout: true, write_file: true }
        );
        assert_eq!(
            plan_language(1, true, false, false, false),
            LanguageAction::Fetch { to_stdout: false, write_file: true }
        );
    }

    #[test]
    fn no_save_limits_pipe_to_stdout_only() {
        assert_eq!(
            plan_language(0, true, true, false, false),
            LanguageAction::Fetch { to_stdout: true, write_file: false }
        );
        assert_eq!(plan_language(1, true, true, false, false), LanguageAction::Skip);
        // Existing files change nothing under --no-save.
        assert_eq!(plan_language(1, true, true, true, false), LanguageAction::Skip);
        assert_eq!(
            plan_language(0, true, true, true, false),
            LanguageAction::Fetch { to_stdout: true, write_file: false }
        );
    }

    #[test]
    fn existing_file_is_streamed_not_refetched() {
        assert_eq!(plan_language(0, false, false, true, false), LanguageAction::NoteExisting);
        assert_eq!(plan_language(0, true, false, true, false), LanguageAction::PipeExisting);
        assert_eq!(plan_language(1, true, false, true, false), LanguageAction::NoteExisting);
    }

    #[test]
    fn force_refetches_existing_files() {
        assert_eq!(
            plan_language(0, true, false, true, true),
            LanguageAction::Fetch { to_stdout: true, write_file: true }
        );
        assert_eq!(
            plan_language(0, false, false, true, true),
            LanguageAction::Fetch { to_stdout: false, write_file: true }
        );
    }

    #[test]
    fn every_language_gets_an_output_action() {
        // Article and subtitle modes share this planning; each requested
        // language must come out with a deliverable action.
        let languages = ["en", "ja", "ko"];
        let plans: Vec<_> = languages
            .iter()
            .enumerate()
            .map(|(index, _)| plan_language(index, false, false, false, false))
            .collect();
        assert!(plans
            .iter()
            .all(|p| matches!(p, LanguageAction::Fetch { write_file: true, .. })));
    }
}
