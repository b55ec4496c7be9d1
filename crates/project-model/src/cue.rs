//! Subtitle cues.

use serde::{Deserialize, Serialize};

use crate::window::TimeWindow;

/// One timed subtitle text, as produced by the cue parser.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubtitleCue {
    pub window: TimeWindow,
    pub text: String,
}

impl SubtitleCue {
    pub fn new(window: TimeWindow, text: impl Into<String>) -> Self {
        Self {
            window,
            text: text.into(),
        }
    }
}
