//! Output file naming and writing.
//!
//! Filenames follow `{YYYY-MM-DD} - {title} [{lang}].{ext}` so transcripts
//! sort chronologically in a directory listing.

use std::path::{Path, PathBuf};

use chrono::Local;
use tracing::{info, warn};

use crate::config::DateMode;
use crate::error::{Result, YtError};
use crate::youtube::VideoMetadata;

/// Replace characters that break filenames on common filesystems.
pub fn sanitize_title(title: &str) -> String {
    let mut name = String::with_capacity(title.len());
    for c in title.chars() {
        match c {
            '/' | '\\' | '|' => name.push('-'),
            ':' => name.push_str(" -"),
            '"' => name.push('\''),
            '*' | '?' | '<' | '>' => {}
            _ => name.push(c),
        }
    }

    // Collapse whitespace runs and trim edge dots.
    let collapsed: String = name.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed.trim_matches('.').trim().to_string()
}

/// Reformat yt-dlp's `YYYYMMDD` date as `YYYY-MM-DD`. Anything else passes
/// through unchanged.
pub fn format_upload_date(date: &str) -> String {
    if date.len() == 8 && date.chars().all(|c| c.is_ascii_digit()) {
        format!("{}-{}-{}", &date[..4], &date[4..6], &date[6..])
    } else {
        date.to_string()
    }
}

/// Pick the filename date prefix for `mode`. `DateMode::Upload` falls back
/// to the request date when yt-dlp reports no upload date.
pub fn resolve_date(mode: DateMode, metadata: &VideoMetadata) -> Option<String> {
    match mode {
        DateMode::None => None,
        DateMode::Request => Some(Local::now().format("%Y-%m-%d").to_string()),
        DateMode::Upload => match &metadata.upload_date {
            Some(date) => Some(format_upload_date(date)),
            None => {
                warn!("No upload date for {}, using today's date", metadata.id);
                Some(Local::now().format("%Y-%m-%d").to_string())
            }
        },
    }
}

/// Build `{date} - {title} [{lang}].{ext}`, omitting the date part when
/// `date` is None.
pub fn output_filename(
    title: &str,
    language: &str,
    extension: &str,
    date: Option<&str>,
) -> String {
    let safe_title = sanitize_title(title);
    match date {
        Some(date) => format!("{} - {} [{}].{}", date, safe_title, language, extension),
        None => format!("{} [{}].{}", safe_title, language, extension),
    }
}

/// Write `content` to `dir/filename`, refusing to overwrite unless `force`.
pub fn write_output(dir: &Path, filename: &str, content: &str, force: bool) -> Result<PathBuf> {
    let path = dir.join(filename);
    if path.exists() && !force {
        return Err(YtError::FileExists(path));
    }
    std::fs::create_dir_all(dir)?;
    std::fs::write(&path, content)?;
    info!("Wrote {}", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_replaces_problem_characters() {
        assert_eq!(sanitize_title("a/b\\c|d"), "a-b-c-d");
        assert_eq!(sanitize_title("Rust: The Book"), "Rust - The Book");
        assert_eq!(sanitize_title("what?*"), "what");
        assert_eq!(sanitize_title("\"quoted\""), "'quoted'");
        assert_eq!(sanitize_title("  spaced   out  "), "spaced out");
        assert_eq!(sanitize_title("trailing dots..."), "trailing dots");
    }

    #[test]
    fn upload_date_reformatting() {
        assert_eq!(format_upload_date("20241213"), "2024-12-13");
        assert_eq!(format_upload_date("2024-12-13"), "2024-12-13");
        assert_eq!(format_upload_date("unknown"), "unknown");
    }

    #[test]
    fn filename_pattern() {
        assert_eq!(
            output_filename("How AI Works", "en", "srt", Some("2024-12-13")),
            "2024-12-13 - How AI Works [en].srt"
        );
        assert_eq!(
            output_filename("How AI Works", "ja", "md", None),
            "How AI Works [ja].md"
        );
    }

    #[test]
    fn filename_sanitizes_title() {
        assert_eq!(
            output_filename("C++: A Tour", "en", "txt", Some("2024-01-02")),
            "2024-01-02 - C++ - A Tour [en].txt"
        );
    }

    fn meta(upload_date: Option<&str>) -> VideoMetadata {
        VideoMetadata {
            id: "v".to_string(),
            title: "t".to_string(),
            upload_date: upload_date.map(|s| s.to_string()),
            uploader: None,
            duration: 0,
            subtitle_langs: vec![],
            auto_caption_langs: vec![],
        }
    }

    #[test]
    fn date_resolution() {
        assert_eq!(resolve_date(DateMode::None, &meta(Some("20241213"))), None);
        assert_eq!(
            resolve_date(DateMode::Upload, &meta(Some("20241213"))).as_deref(),
            Some("2024-12-13")
        );
        // Missing upload date falls back to today rather than dropping the prefix.
        let today = Local::now().format("%Y-%m-%d").to_string();
        assert_eq!(resolve_date(DateMode::Upload, &meta(None)).as_deref(), Some(today.as_str()));
        assert_eq!(resolve_date(DateMode::Request, &meta(None)).as_deref(), Some(today.as_str()));
    }

    #[test]
    fn write_refuses_overwrite_without_force() {
        let dir = tempfile::tempdir().unwrap();
        write_output(dir.path(), "a.srt", "one", false).unwrap();

        let err = write_output(dir.path(), "a.srt", "two", false).unwrap_err();
        assert!(matches!(err, YtError::FileExists(_)));
        assert_eq!(std::fs::read_to_string(dir.path().join("a.srt")).unwrap(), "one");

        write_output(dir.path(), "a.srt", "two", true).unwrap();
        assert_eq!(std::fs::read_to_string(dir.path().join("a.srt")).unwrap(), "two");
    }
}
