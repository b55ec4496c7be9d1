//! Narration segments: timestamped voice-over units.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::window::{TimeWindow, TimecodeError};

/// One entry of a narration segment list.
///
/// Segment lists are JSON arrays; input order is not assumed sorted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NarrationSegment {
    /// `HH:MM:SS,mmm-HH:MM:SS,mmm` window on the source video.
    pub timestamp: String,

    /// Narration audio file.
    #[serde(alias = "audio")]
    pub audio_path: PathBuf,

    /// Optional subtitle file for this segment.
    #[serde(default, alias = "subtitle")]
    pub subtitle_path: Option<PathBuf>,
}

impl NarrationSegment {
    /// Parse the segment's timestamp.
    pub fn window(&self) -> Result<TimeWindow, TimecodeError> {
        self.timestamp.parse()
    }

    /// Resolve relative media paths against a base directory.
    pub fn resolve_paths(mut self, base: &Path) -> Self {
        if self.audio_path.is_relative() {
            self.audio_path = base.join(&self.audio_path);
        }
        if let Some(subtitle) = &self.subtitle_path {
            if subtitle.is_relative() {
                self.subtitle_path = Some(base.join(subtitle));
            }
        }
        self
    }
}

/// Parse a JSON segment list.
pub fn parse_segments(json: &str) -> Result<Vec<NarrationSegment>, serde_json::Error> {
    serde_json::from_str(json)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_segments_with_aliases() {
        let json = r#"[
            {"timestamp": "00:00:10,000-00:00:15,500", "audio_path": "a.mp3", "subtitle_path": "a.srt"},
            {"timestamp": "00:00:20,000-00:00:22,000", "audio": "b.mp3"}
        ]"#;
        let segments = parse_segments(json).unwrap();
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[1].audio_path, PathBuf::from("b.mp3"));
        assert!(segments[1].subtitle_path.is_none());
        assert!((segments[0].window().unwrap().end - 15.5).abs() < 1e-9);
    }

    #[test]
    fn test_resolve_paths() {
        let segment = NarrationSegment {
            timestamp: "00:00:00,000-00:00:01,000".to_string(),
            audio_path: PathBuf::from("voice/1.mp3"),
            subtitle_path: Some(PathBuf::from("/abs/1.srt")),
        }
        .resolve_paths(Path::new("/work"));
        assert_eq!(segment.audio_path, PathBuf::from("/work/voice/1.mp3"));
        assert_eq!(segment.subtitle_path, Some(PathBuf::from("/abs/1.srt")));
    }

    #[test]
    fn test_malformed_timestamp_surfaces_error() {
        let segment = NarrationSegment {
            timestamp: "00:00:10-00:00:15,500".to_string(),
            audio_path: PathBuf::from("a.mp3"),
            subtitle_path: None,
        };
        assert!(segment.window().is_err());
    }
}
