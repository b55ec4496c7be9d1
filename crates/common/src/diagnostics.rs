//! Degraded-continue diagnostics.
//!
//! Optional pipeline steps (BGM, a single narration segment, a subtitle
//! cue set, smart volume analysis, volume clamping) never abort an
//! operation. Their failures are logged and collected here so callers
//! can inspect what was omitted or adjusted.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::NarramixResult;

/// Pipeline stage a diagnostic belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Volume,
    SmartVolume,
    OriginalAudio,
    Narration,
    Segment,
    Bgm,
    Subtitles,
    Verification,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Volume => "volume",
            Stage::SmartVolume => "smart_volume",
            Stage::OriginalAudio => "original_audio",
            Stage::Narration => "narration",
            Stage::Segment => "segment",
            Stage::Bgm => "bgm",
            Stage::Subtitles => "subtitles",
            Stage::Verification => "verification",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One absorbed failure or correction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub stage: Stage,
    pub message: String,
}

/// Ordered trail of degraded-continue events for one operation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a warning for a stage.
    pub fn warn(&mut self, stage: Stage, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!(stage = stage.as_str(), "{message}");
        self.entries.push(Diagnostic { stage, message });
    }

    /// Absorb a failed optional step, keeping the value on success.
    pub fn recover<T>(&mut self, stage: Stage, result: NarramixResult<T>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(err) => {
                self.warn(stage, err.to_string());
                None
            }
        }
    }

    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    pub fn for_stage(&self, stage: Stage) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter().filter(move |d| d.stage == stage)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NarramixError;

    #[test]
    fn test_recover_keeps_success() {
        let mut diagnostics = Diagnostics::new();
        let value = diagnostics.recover(Stage::Bgm, Ok::<_, NarramixError>(42));
        assert_eq!(value, Some(42));
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_recover_records_failure() {
        let mut diagnostics = Diagnostics::new();
        let value: Option<u32> =
            diagnostics.recover(Stage::Bgm, Err(NarramixError::media("bgm.mp3 unreadable")));
        assert!(value.is_none());
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics.entries()[0].stage, Stage::Bgm);
        assert!(diagnostics.entries()[0].message.contains("bgm.mp3"));
    }

    #[test]
    fn test_for_stage_filters() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.warn(Stage::Segment, "segment 2 dropped");
        diagnostics.warn(Stage::Volume, "voice clamped");
        diagnostics.warn(Stage::Segment, "segment 3 dropped");
        assert_eq!(diagnostics.for_stage(Stage::Segment).count(), 2);
    }
}
