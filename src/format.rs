//! Subtitle parsing and rendering for SRT, VTT, and plain text.

use std::fmt;
use std::str::FromStr;

use crate::error::{Result, YtError};
use crate::transcript::{Transcript, TranscriptSegment};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Srt,
    Vtt,
    Txt,
    Article,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Srt => "srt",
            OutputFormat::Vtt => "vtt",
            OutputFormat::Txt => "txt",
            OutputFormat::Article => "md",
        }
    }
}

impl FromStr for OutputFormat {
    type Err = YtError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "srt" => Ok(OutputFormat::Srt),
            "vtt" => Ok(OutputFormat::Vtt),
            "txt" => Ok(OutputFormat::Txt),
            "article" => Ok(OutputFormat::Article),
            other => Err(YtError::Format(format!(
                "Unknown format '{}'. Supported: srt, vtt, txt, article",
                other
            ))),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OutputFormat::Srt => "srt",
            OutputFormat::Vtt => "vtt",
            OutputFormat::Txt => "txt",
            OutputFormat::Article => "article",
        };
        write!(f, "{}", name)
    }
}

/// Parse subtitle content, detecting VTT by its header.
pub fn parse_subtitles(content: &str) -> Result<Vec<TranscriptSegment>> {
    if content.trim_start().starts_with("WEBVTT") {
        parse_vtt(content)
    } else {
        parse_srt(content)
    }
}

/// Parse SRT content into segments. Malformed blocks are skipped.
pub fn parse_srt(content: &str) -> Result<Vec<TranscriptSegment>> {
    let mut segments = Vec::new();

    for block in content.trim().split("\n\n") {
        let lines: Vec<&str> = block.trim().lines().collect();
        if lines.len() < 3 {
            continue;
        }
        if lines[0].trim().parse::<u64>().is_err() {
            continue;
        }
        let Some((start, end)) = parse_cue_timing(lines[1]) else {
            continue;
        };
        let text = lines[2..].join("\n");
        segments.push(TranscriptSegment::new(start, end, text));
    }

    Ok(segments)
}

/// Parse VTT content into segments. Header, notes, and cue settings are
/// ignored; hour-less `MM:SS.mmm` cues are accepted.
pub fn parse_vtt(content: &str) -> Result<Vec<TranscriptSegment>> {
    let mut segments = Vec::new();
    let lines: Vec<&str> = content.lines().collect();

    let mut i = 0;
    while i < lines.len() {
        let Some((start, end)) = parse_cue_timing(lines[i]) else {
            i += 1;
            continue;
        };

        i += 1;
        let mut text_lines = Vec::new();
        while i < lines.len() && !lines[i].trim().is_empty() {
            if parse_cue_timing(lines[i]).is_some() {
                break;
            }
            text_lines.push(lines[i]);
            i += 1;
        }

        if !text_lines.is_empty() {
            segments.push(TranscriptSegment::new(start, end, text_lines.join("\n")));
        }
    }

    Ok(segments)
}

/// Parse a `start --> end` cue line. Cue settings after the end timestamp
/// (VTT positioning) are tolerated.
fn parse_cue_timing(line: &str) -> Option<(f64, f64)> {
    let (start_str, rest) = line.split_once("-->")?;
    let end_str = rest.trim().split_whitespace().next()?;
    let start = parse_timestamp(start_str.trim())?;
    let end = parse_timestamp(end_str)?;
    Some((start, end))
}

/// Parse `HH:MM:SS,mmm`, `HH:MM:SS.mmm`, or `MM:SS.mmm` into seconds.
fn parse_timestamp(s: &str) -> Option<f64> {
    let (clock, millis) = match s.rsplit_once([',', '.']) {
        Some((clock, millis)) => (clock, millis.parse::<u32>().ok()?),
        None => (s, 0),
    };

    let parts: Vec<&str> = clock.split(':').collect();
    let (hours, minutes, seconds) = match parts.as_slice() {
        [h, m, sec] => (h.parse::<u64>().ok()?, m.parse::<u64>().ok()?, sec.parse::<u64>().ok()?),
        [m, sec] => (0, m.parse::<u64>().ok()?, sec.parse::<u64>().ok()?),
        _ => return None,
    };

    Some(hours as f64 * 3600.0 + minutes as f64 * 60.0 + seconds as f64 + millis as f64 / 1000.0)
}

/// Render a transcript in `format`. Article rendering is not a pure
/// formatting step and lives in the translation client.
pub fn render(transcript: &Transcript, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Srt => Ok(format_srt(&transcript.segments)),
        OutputFormat::Vtt => Ok(format_vtt(&transcript.segments)),
        OutputFormat::Txt => Ok(transcript.plain_text()),
        OutputFormat::Article => Err(YtError::Format(
            "article output requires the LLM rewrite step".to_string(),
        )),
    }
}

/// Format segments as SRT: numbered blocks with `HH:MM:SS,mmm` timestamps.
pub fn format_srt(segments: &[TranscriptSegment]) -> String {
    let mut out = String::new();
    for (index, segment) in segments.iter().enumerate() {
        out.push_str(&format!(
            "{}\n{} --> {}\n{}\n\n",
            index + 1,
            format_srt_time(segment.start),
            format_srt_time(segment.end),
            segment.text.trim()
        ));
    }
    out
}

/// Format segments as WebVTT with `HH:MM:SS.mmm` timestamps.
pub fn format_vtt(segments: &[TranscriptSegment]) -> String {
    let mut out = String::from("WEBVTT\n\n");
    for segment in segments {
        out.push_str(&format!(
            "{} --> {}\n{}\n\n",
            format_vtt_time(segment.start),
            format_vtt_time(segment.end),
            segment.text.trim()
        ));
    }
    out
}

/// Format time in seconds to SRT time format (HH:MM:SS,mmm)
fn format_srt_time(seconds: f64) -> String {
    let total_milliseconds = (seconds * 1000.0) as u64;
    let hours = total_milliseconds / 3_600_000;
    let minutes = (total_milliseconds % 3_600_000) / 60_000;
    let secs = (total_milliseconds % 60_000) / 1_000;
    let millis = total_milliseconds % 1_000;

    format!("{:02}:{:02}:{:02},{:03}", hours, minutes, secs, millis)
}

/// Format time in seconds to VTT time format (HH:MM:SS.mmm)
fn format_vtt_time(seconds: f64) -> String {
    let total_milliseconds = (seconds * 1000.0) as u64;
    let hours = total_milliseconds / 3_600_000;
    let minutes = (total_milliseconds % 3_600_000) / 60_000;
    let secs = (total_milliseconds % 60_000) / 1_000;
    let millis = total_milliseconds % 1_000;

    format!("{:02}:{:02}:{:02}.{:03}", hours, minutes, secs, millis)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcript::Provenance;

    #[test]
    fn test_format_srt_time() {
        assert_eq!(format_srt_time(0.0), "00:00:00,000");
        assert_eq!(format_srt_time(65.123), "00:01:05,123");
        assert_eq!(format_srt_time(3661.500), "01:01:01,500");
    }

    #[test]
    fn test_format_vtt_time() {
        assert_eq!(format_vtt_time(0.0), "00:00:00.000");
        assert_eq!(format_vtt_time(65.123), "00:01:05.123");
    }

    #[test]
    fn parse_srt_basic() {
        let content = "1\n00:00:00,000 --> 00:00:02,500\nhello\nworld\n\n2\n00:00:02,500 --> 00:00:04,000\nbye\n";
        let segments = parse_srt(content).unwrap();
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].text, "hello\nworld");
        assert_eq!(segments[0].start, 0.0);
        assert_eq!(segments[0].end, 2.5);
        assert_eq!(segments[1].start, 2.5);
    }

    #[test]
    fn parse_srt_skips_malformed_blocks() {
        let content = "not a number\njunk\nmore\n\n1\n00:00:01,000 --> 00:00:02,000\nok\n";
        let segments = parse_srt(content).unwrap();
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].text, "ok");
    }

    #[test]
    fn parse_vtt_with_header_and_settings() {
        let content = "WEBVTT\nKind: captions\n\n00:00:00.000 --> 00:00:02.000 align:start\nfirst cue\n\n00:00:02.000 --> 00:00:04.000\nsecond cue\n";
        let segments = parse_vtt(content).unwrap();
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].text, "first cue");
        assert_eq!(segments[1].start, 2.0);
    }

    #[test]
    fn parse_vtt_without_hours() {
        let content = "WEBVTT\n\n01:05.250 --> 01:07.000\nshort form\n";
        let segments = parse_vtt(content).unwrap();
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].start, 65.25);
        assert_eq!(segments[0].end, 67.0);
    }

    #[test]
    fn detect_format_by_header() {
        let vtt = "WEBVTT\n\n00:00:00.000 --> 00:00:01.000\nhi\n";
        let srt = "1\n00:00:00,000 --> 00:00:01,000\nhi\n";
        assert_eq!(parse_subtitles(vtt).unwrap().len(), 1);
        assert_eq!(parse_subtitles(srt).unwrap().len(), 1);
    }

    #[test]
    fn render_round_trip_srt_to_vtt() {
        let srt = "1\n00:00:00,000 --> 00:00:02,000\nhello\n";
        let segments = parse_srt(srt).unwrap();
        let transcript = Transcript::new("v", "en", Provenance::Official, segments);
        let vtt = render(&transcript, OutputFormat::Vtt).unwrap();
        assert!(vtt.starts_with("WEBVTT"));
        assert!(vtt.contains("00:00:00.000 --> 00:00:02.000"));
        assert!(vtt.contains("hello"));
    }

    #[test]
    fn render_txt_discards_timestamps() {
        let transcript = Transcript::new(
            "v",
            "en",
            Provenance::Official,
            vec![
                TranscriptSegment::new(0.0, 1.0, "one"),
                TranscriptSegment::new(1.0, 2.0, "two"),
            ],
        );
        assert_eq!(render(&transcript, OutputFormat::Txt).unwrap(), "one\ntwo");
    }

    #[test]
    fn format_parse_from_str() {
        assert_eq!("SRT".parse::<OutputFormat>().unwrap(), OutputFormat::Srt);
        assert_eq!("article".parse::<OutputFormat>().unwrap(), OutputFormat::Article);
        assert!("docx".parse::<OutputFormat>().is_err());
        assert_eq!(OutputFormat::Article.extension(), "md");
    }
}
