//! Time windows and SRT-style timecodes.
//!
//! Timecodes use the comma-decimal form `HH:MM:SS,mmm`. Segment
//! timestamps join two timecodes with a hyphen:
//! `00:00:00,000-00:00:05,900`.

use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static TIMECODE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{2,}):([0-5]\d):([0-5]\d),(\d{3})$").expect("timecode pattern compiles")
});

/// Errors from timecode and window parsing.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TimecodeError {
    #[error("malformed timecode '{0}' (expected HH:MM:SS,mmm)")]
    Malformed(String),

    #[error("timestamp range '{0}' must have exactly one '-' separator")]
    InvalidRange(String),

    #[error("window start {start:.3}s is after end {end:.3}s")]
    Inverted { start: f64, end: f64 },

    #[error("window bound {0} is negative or not finite")]
    OutOfDomain(f64),
}

/// Parse a single `HH:MM:SS,mmm` timecode into seconds.
pub fn parse_timecode(input: &str) -> Result<f64, TimecodeError> {
    let trimmed = input.trim();
    let caps = TIMECODE_RE
        .captures(trimmed)
        .ok_or_else(|| TimecodeError::Malformed(trimmed.to_string()))?;

    let field = |idx: usize| -> Result<u64, TimecodeError> {
        caps[idx]
            .parse::<u64>()
            .map_err(|_| TimecodeError::Malformed(trimmed.to_string()))
    };

    let hours = field(1)?;
    let minutes = field(2)?;
    let seconds = field(3)?;
    let millis = field(4)?;

    let total_ms = hours
        .checked_mul(60)
        .and_then(|m| m.checked_add(minutes))
        .and_then(|m| m.checked_mul(60))
        .and_then(|s| s.checked_add(seconds))
        .and_then(|s| s.checked_mul(1000))
        .and_then(|ms| ms.checked_add(millis))
        .ok_or_else(|| TimecodeError::Malformed(trimmed.to_string()))?;
    Ok(total_ms as f64 / 1000.0)
}

/// Format seconds as `HH:MM:SS,mmm`.
pub fn format_timecode(secs: f64) -> String {
    let total_ms = (secs.max(0.0) * 1000.0).round() as u64;
    let hours = total_ms / 3_600_000;
    let minutes = (total_ms % 3_600_000) / 60_000;
    let seconds = (total_ms % 60_000) / 1000;
    let millis = total_ms % 1000;
    format!("{hours:02}:{minutes:02}:{seconds:02},{millis:03}")
}

/// A half-open interval `[start, end)` on a timeline, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: f64,
    pub end: f64,
}

impl TimeWindow {
    /// Create a window, rejecting negative, non-finite, or inverted bounds.
    pub fn new(start: f64, end: f64) -> Result<Self, TimecodeError> {
        for bound in [start, end] {
            if !bound.is_finite() || bound < 0.0 {
                return Err(TimecodeError::OutOfDomain(bound));
            }
        }
        if start > end {
            return Err(TimecodeError::Inverted { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.duration() <= 0.0
    }

    /// True when `t` lies strictly inside the window.
    pub fn contains_strictly(&self, t: f64) -> bool {
        t > self.start && t < self.end
    }

    /// True when the two windows share a non-empty interior.
    pub fn overlaps(&self, other: &TimeWindow) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Intersect with `[0, total)`. Returns `None` when nothing remains.
    pub fn clip_to(&self, total: f64) -> Option<TimeWindow> {
        let start = self.start.max(0.0);
        let end = self.end.min(total);
        if end > start {
            Some(TimeWindow { start, end })
        } else {
            None
        }
    }

    /// Shift both bounds by `offset` seconds.
    pub fn shifted(&self, offset: f64) -> TimeWindow {
        TimeWindow {
            start: (self.start + offset).max(0.0),
            end: (self.end + offset).max(0.0),
        }
    }
}

impl FromStr for TimeWindow {
    type Err = TimecodeError;

    /// Parse `HH:MM:SS,mmm-HH:MM:SS,mmm`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split('-').collect();
        if parts.len() != 2 {
            return Err(TimecodeError::InvalidRange(s.to_string()));
        }
        let start = parse_timecode(parts[0])?;
        let end = parse_timecode(parts[1])?;
        TimeWindow::new(start, end)
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}",
            format_timecode(self.start),
            format_timecode(self.end)
        )
    }
}
