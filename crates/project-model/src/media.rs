//! Probed media metadata.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Metadata of a decoded audio or video asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaInfo {
    pub path: PathBuf,

    /// Container duration in seconds.
    pub duration_secs: f64,

    /// Frame width (video only).
    pub width: Option<u32>,

    /// Frame height (video only).
    pub height: Option<u32>,

    /// Whether the asset carries at least one audio stream.
    pub has_audio: bool,
}

impl MediaInfo {
    /// Frame size, when this asset is a video.
    pub fn frame_size(&self) -> Option<FrameSize> {
        match (self.width, self.height) {
            (Some(width), Some(height)) if width > 0 && height > 0 => {
                Some(FrameSize { width, height })
            }
            _ => None,
        }
    }
}

/// Output frame dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameSize {
    pub width: u32,
    pub height: u32,
}

/// An audio file with a known natural duration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioAsset {
    pub path: PathBuf,
    pub duration_secs: f64,
}

impl From<&MediaInfo> for AudioAsset {
    fn from(info: &MediaInfo) -> Self {
        Self {
            path: info.path.clone(),
            duration_secs: info.duration_secs,
        }
    }
}
