//! SRT subtitle parsing and validity checks.

use std::path::Path;

use narramix_common::error::{NarramixError, NarramixResult};
use narramix_project_model::cue::SubtitleCue;
use narramix_project_model::window::{parse_timecode, TimeWindow};
use once_cell::sync::Lazy;
use regex::Regex;

/// A `HH:MM:SS,mmm --> HH:MM:SS,mmm` timing line anywhere in the file.
static TIMING_LINE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\d{2}:\d{2}:\d{2},\d{3}\s*-->\s*\d{2}:\d{2}:\d{2},\d{3}")
        .expect("timing pattern compiles")
});

/// Whether a subtitle file is worth loading.
///
/// The file must exist, contain non-whitespace text, and include at
/// least one SRT timing line. Read failures count as invalid.
pub fn is_valid_subtitle_file(path: &Path) -> bool {
    if !path.is_file() {
        return false;
    }
    match std::fs::read_to_string(path) {
        Ok(content) => {
            let content = content.trim();
            !content.is_empty() && TIMING_LINE_RE.is_match(content)
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Failed to read subtitle file");
            false
        }
    }
}

/// Parse SRT content into cues.
///
/// Blocks without a parseable timing line, with inverted timings, or with
/// no text are skipped. Cues keep file order.
pub fn parse_srt(content: &str) -> Vec<SubtitleCue> {
    let content = content
        .trim_start_matches('\u{feff}')
        .replace("\r\n", "\n")
        .replace('\r', "\n");

    let mut cues = Vec::new();
    for block in content.split("\n\n") {
        let lines: Vec<&str> = block.trim().lines().collect();
        let Some(timing_idx) = lines.iter().position(|line| line.contains("-->")) else {
            continue;
        };

        let window = match parse_timing_line(lines[timing_idx]) {
            Some(window) => window,
            None => {
                tracing::debug!(line = lines[timing_idx], "Skipping SRT block with bad timing");
                continue;
            }
        };

        let text = lines[timing_idx + 1..].join("\n");
        let text = text.trim();
        if text.is_empty() {
            continue;
        }
        cues.push(SubtitleCue::new(window, text));
    }
    cues
}

fn parse_timing_line(line: &str) -> Option<TimeWindow> {
    let (start, rest) = line.split_once("-->")?;
    // Trailing cue settings (e.g. `X1:...`) follow the end timecode.
    let end = rest.split_whitespace().next()?;
    let start = parse_timecode(start.trim()).ok()?;
    let end = parse_timecode(end).ok()?;
    TimeWindow::new(start, end).ok()
}

/// Read and parse an SRT file.
pub fn load_srt(path: &Path) -> NarramixResult<Vec<SubtitleCue>> {
    NarramixError::require_file(path)?;
    let content = std::fs::read_to_string(path).map_err(|e| {
        NarramixError::subtitle(format!("failed to read {}: {e}", path.display()))
    })?;
    let cues = parse_srt(&content);
    tracing::debug!(path = %path.display(), cues = cues.len(), "Subtitle file parsed");
    Ok(cues)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "1\n00:00:00,000 --> 00:00:02,500\nHello world\n\n2\n00:00:03,000 --> 00:00:05,000\nTwo\nlines\n";

    #[test]
    fn test_parse_basic() {
        let cues = parse_srt(SAMPLE);
        assert_eq!(cues.len(), 2);
        assert_eq!(cues[0].text, "Hello world");
        assert!((cues[0].window.end - 2.5).abs() < 1e-9);
        assert_eq!(cues[1].text, "Two\nlines");
    }

    #[test]
    fn test_parse_crlf_bom_and_settings() {
        let content = "\u{feff}1\r\n00:01:01,500 --> 00:01:03,000 X1:10\r\nCue\r\n";
        let cues = parse_srt(content);
        assert_eq!(cues.len(), 1);
        assert!((cues[0].window.start - 61.5).abs() < 1e-9);
    }

    #[test]
    fn test_parse_skips_bad_blocks() {
        let content = "1\n00:00:05,000 --> 00:00:01,000\nInverted\n\n2\n00:00:06,000 --> 00:00:07,000\n\n3\nnot a timing\ntext\n\n4\n00:00:08,000 --> 00:00:09,000\nKept\n";
        let cues = parse_srt(content);
        assert_eq!(cues.len(), 1);
        assert_eq!(cues[0].text, "Kept");
    }

    #[test]
    fn test_validity_gate() {
        let dir = tempfile::tempdir().unwrap();

        let missing = dir.path().join("missing.srt");
        assert!(!is_valid_subtitle_file(&missing));

        let empty = dir.path().join("empty.srt");
        std::fs::write(&empty, "  \n\n ").unwrap();
        assert!(!is_valid_subtitle_file(&empty));

        let plain = dir.path().join("plain.srt");
        std::fs::write(&plain, "just some words\nno timings").unwrap();
        assert!(!is_valid_subtitle_file(&plain));

        let good = dir.path().join("good.srt");
        std::fs::write(&good, SAMPLE).unwrap();
        assert!(is_valid_subtitle_file(&good));
    }

    #[test]
    fn test_load_srt_missing_file() {
        let err = load_srt(Path::new("/no/such/subs.srt")).unwrap_err();
        assert!(matches!(err, NarramixError::FileNotFound { .. }));
    }
}
