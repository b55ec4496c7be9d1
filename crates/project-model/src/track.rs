//! Declarative audio track contributions.
//!
//! A composite timeline is the sample-wise sum of its tracks. Each track
//! says where its audio comes from, where it starts, how loud it is, and
//! whether it loops, fades, or is spliced from sub-clips.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::window::TimeWindow;

/// What a track contributes to the mix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackRole {
    Narration,
    Original,
    Bgm,
}

/// Where a track's samples come from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "path", rename_all = "snake_case")]
pub enum TrackSource {
    /// The audio stream embedded in the primary video.
    VideoAudio,
    /// A standalone audio file.
    File(PathBuf),
}

/// Whether a splice piece keeps or silences its range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PieceKind {
    Keep,
    Silence,
}

/// One sub-clip of a spliced track, in source time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SplicePiece {
    pub range: TimeWindow,
    pub kind: PieceKind,
}

impl SplicePiece {
    pub fn keep(range: TimeWindow) -> Self {
        Self {
            range,
            kind: PieceKind::Keep,
        }
    }

    pub fn silence(range: TimeWindow) -> Self {
        Self {
            range,
            kind: PieceKind::Silence,
        }
    }

    /// Amplitude multiplier of this piece.
    pub fn gain(&self) -> f64 {
        match self.kind {
            PieceKind::Keep => 1.0,
            PieceKind::Silence => 0.0,
        }
    }
}

/// One contribution to the composite audio timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioTrackSpec {
    pub role: TrackRole,
    pub source: TrackSource,

    /// Multiplicative gain applied to the whole track.
    pub gain: f64,

    /// Position of the track's first sample on the target timeline.
    pub start_offset: f64,

    /// Loop (and truncate) the source to exactly this many seconds.
    pub loop_to: Option<f64>,

    /// Fade-out length ending at the track end.
    pub fade_out: Option<f64>,

    /// Natural duration of the source, when known.
    pub natural_duration: Option<f64>,

    /// Sub-clips concatenated in order; empty plays the source unchanged.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub splice: Vec<SplicePiece>,
}

impl AudioTrackSpec {
    /// A track that plays a source from `start_offset` at `gain`.
    pub fn new(role: TrackRole, source: TrackSource, gain: f64, start_offset: f64) -> Self {
        Self {
            role,
            source,
            gain,
            start_offset,
            loop_to: None,
            fade_out: None,
            natural_duration: None,
            splice: Vec::new(),
        }
    }

    pub fn with_natural_duration(mut self, duration: f64) -> Self {
        self.natural_duration = Some(duration);
        self
    }

    pub fn looped_to(mut self, duration: f64) -> Self {
        self.loop_to = Some(duration);
        self
    }

    pub fn with_fade_out(mut self, secs: f64) -> Self {
        self.fade_out = Some(secs);
        self
    }

    pub fn with_splice(mut self, pieces: Vec<SplicePiece>) -> Self {
        self.splice = pieces;
        self
    }

    /// Timeline position where this track stops contributing, if bounded.
    pub fn timeline_end(&self) -> Option<f64> {
        if let Some(loop_to) = self.loop_to {
            return Some(self.start_offset + loop_to);
        }
        if let Some(last) = self.splice.last() {
            return Some(self.start_offset + last.range.end);
        }
        self.natural_duration.map(|d| self.start_offset + d)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeline_end_prefers_loop() {
        let track = AudioTrackSpec::new(
            TrackRole::Bgm,
            TrackSource::File(PathBuf::from("bgm.mp3")),
            0.3,
            0.0,
        )
        .with_natural_duration(20.0)
        .looped_to(90.0);
        assert_eq!(track.timeline_end(), Some(90.0));
    }

    #[test]
    fn test_timeline_end_of_offset_narration() {
        let track = AudioTrackSpec::new(
            TrackRole::Narration,
            TrackSource::File(PathBuf::from("n.mp3")),
            1.0,
            10.0,
        )
        .with_natural_duration(6.2);
        assert!((track.timeline_end().unwrap() - 16.2).abs() < 1e-9);
    }

    #[test]
    fn test_piece_gain() {
        let window = TimeWindow::new(1.0, 2.0).unwrap();
        assert_eq!(SplicePiece::keep(window).gain(), 1.0);
        assert_eq!(SplicePiece::silence(window).gain(), 0.0);
    }
}
