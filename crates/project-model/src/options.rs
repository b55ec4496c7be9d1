//! Render options: the raw options record and its validated form.
//!
//! [`MergeOptions`] mirrors what a settings surface produces: every field
//! optional, string-typed where the user types text. [`RenderOptions`] is
//! the immutable, fully-defaulted record the pipeline consumes by value.

use serde::{Deserialize, Serialize};

use crate::defaults;

/// Raw options record (JSON or CLI). Absent fields take defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeOptions {
    pub voice_volume: Option<f64>,
    pub bgm_volume: Option<f64>,
    pub original_audio_volume: Option<f64>,
    pub keep_original_audio: Option<bool>,
    pub mute_original_audio: Option<bool>,
    pub smart_volume: Option<bool>,
    pub subtitle_enabled: Option<bool>,
    pub subtitle_font: Option<String>,
    pub subtitle_font_size: Option<u32>,
    pub subtitle_color: Option<String>,
    pub subtitle_bg_color: Option<String>,
    pub subtitle_position: Option<PositionMode>,
    pub custom_position: Option<f64>,
    pub stroke_color: Option<String>,
    pub stroke_width: Option<f64>,
    pub threads: Option<u32>,
    pub fps: Option<u32>,
}

impl MergeOptions {
    /// Layer `overrides` on top of `self`; set fields in `overrides` win.
    pub fn with_overrides(self, overrides: MergeOptions) -> MergeOptions {
        MergeOptions {
            voice_volume: overrides.voice_volume.or(self.voice_volume),
            bgm_volume: overrides.bgm_volume.or(self.bgm_volume),
            original_audio_volume: overrides
                .original_audio_volume
                .or(self.original_audio_volume),
            keep_original_audio: overrides.keep_original_audio.or(self.keep_original_audio),
            mute_original_audio: overrides.mute_original_audio.or(self.mute_original_audio),
            smart_volume: overrides.smart_volume.or(self.smart_volume),
            subtitle_enabled: overrides.subtitle_enabled.or(self.subtitle_enabled),
            subtitle_font: overrides.subtitle_font.or(self.subtitle_font),
            subtitle_font_size: overrides.subtitle_font_size.or(self.subtitle_font_size),
            subtitle_color: overrides.subtitle_color.or(self.subtitle_color),
            subtitle_bg_color: overrides.subtitle_bg_color.or(self.subtitle_bg_color),
            subtitle_position: overrides.subtitle_position.or(self.subtitle_position),
            custom_position: overrides.custom_position.or(self.custom_position),
            stroke_color: overrides.stroke_color.or(self.stroke_color),
            stroke_width: overrides.stroke_width.or(self.stroke_width),
            threads: overrides.threads.or(self.threads),
            fps: overrides.fps.or(self.fps),
        }
    }

    /// Load an options record from a JSON file.
    pub fn from_json_file(path: &std::path::Path) -> Result<Self, OptionsError> {
        let content = std::fs::read_to_string(path).map_err(|e| OptionsError::Read {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        serde_json::from_str(&content).map_err(|e| OptionsError::Parse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }
}

/// Errors loading an options record.
#[derive(Debug, Clone, thiserror::Error)]
pub enum OptionsError {
    #[error("failed to read options file {path:?}: {reason}")]
    Read {
        path: std::path::PathBuf,
        reason: String,
    },

    #[error("failed to parse options file {path:?}: {reason}")]
    Parse {
        path: std::path::PathBuf,
        reason: String,
    },
}

/// Subtitle position mode as written in the options record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionMode {
    Bottom,
    Top,
    Center,
    Custom,
}

/// Resolved subtitle placement.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum SubtitlePlacement {
    Bottom,
    Top,
    Center,
    /// Percentage `[0, 100]` of the free vertical space above the text.
    Custom { percent: f64 },
}

/// Requested gains. `None` means unset (use the default); `Some(0.0)` mutes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct VolumeRequest {
    pub voice: Option<f64>,
    pub bgm: Option<f64>,
    pub original: Option<f64>,
}

/// Resolved gains, each within `[MIN_VOLUME, MAX_VOLUME]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VolumeOptions {
    pub voice: f64,
    pub bgm: f64,
    pub original: f64,
}

impl Default for VolumeOptions {
    fn default() -> Self {
        Self {
            voice: defaults::VOICE_VOLUME,
            bgm: defaults::BGM_VOLUME,
            original: defaults::ORIGINAL_VOLUME,
        }
    }
}

/// Subtitle styling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubtitleStyle {
    /// Custom font (file name under the font directory, or a path).
    pub font: Option<String>,
    pub font_size: u32,
    pub color: String,
    /// Background box colour; `None` is a transparent background.
    pub background: Option<String>,
    pub stroke_color: String,
    pub stroke_width: f64,
    pub placement: SubtitlePlacement,
}

impl Default for SubtitleStyle {
    fn default() -> Self {
        Self {
            font: None,
            font_size: defaults::SUBTITLE_FONT_SIZE,
            color: defaults::SUBTITLE_COLOR.to_string(),
            background: None,
            stroke_color: defaults::STROKE_COLOR.to_string(),
            stroke_width: defaults::STROKE_WIDTH,
            placement: SubtitlePlacement::Bottom,
        }
    }
}

/// Validated, immutable configuration consumed by the merge operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderOptions {
    pub volume: VolumeRequest,
    pub keep_original_audio: bool,
    pub mute_original_audio: bool,
    pub smart_volume: bool,
    pub subtitle_enabled: bool,
    pub subtitle: SubtitleStyle,
    /// Parallelism hint passed through to the encoder.
    pub threads: u32,
    pub fps: u32,
}

impl Default for RenderOptions {
    fn default() -> Self {
        RenderOptions::from(MergeOptions::default())
    }
}

impl From<MergeOptions> for RenderOptions {
    fn from(raw: MergeOptions) -> Self {
        let placement = match raw.subtitle_position.unwrap_or(PositionMode::Bottom) {
            PositionMode::Bottom => SubtitlePlacement::Bottom,
            PositionMode::Top => SubtitlePlacement::Top,
            PositionMode::Center => SubtitlePlacement::Center,
            PositionMode::Custom => SubtitlePlacement::Custom {
                percent: raw
                    .custom_position
                    .filter(|p| p.is_finite())
                    .unwrap_or(defaults::CUSTOM_POSITION)
                    .clamp(0.0, 100.0),
            },
        };

        let subtitle = SubtitleStyle {
            font: raw.subtitle_font.filter(|f| !f.trim().is_empty()),
            font_size: raw
                .subtitle_font_size
                .unwrap_or(defaults::SUBTITLE_FONT_SIZE)
                .max(1),
            color: raw
                .subtitle_color
                .unwrap_or_else(|| defaults::SUBTITLE_COLOR.to_string()),
            background: raw.subtitle_bg_color.and_then(normalize_background),
            stroke_color: raw
                .stroke_color
                .unwrap_or_else(|| defaults::STROKE_COLOR.to_string()),
            stroke_width: raw
                .stroke_width
                .filter(|w| w.is_finite())
                .unwrap_or(defaults::STROKE_WIDTH)
                .max(0.0),
            placement,
        };

        Self {
            volume: VolumeRequest {
                voice: raw.voice_volume,
                bgm: raw.bgm_volume,
                original: raw.original_audio_volume,
            },
            keep_original_audio: raw
                .keep_original_audio
                .unwrap_or(defaults::KEEP_ORIGINAL_AUDIO),
            mute_original_audio: raw
                .mute_original_audio
                .unwrap_or(defaults::MUTE_ORIGINAL_AUDIO),
            smart_volume: raw.smart_volume.unwrap_or(defaults::ENABLE_SMART_VOLUME),
            subtitle_enabled: raw.subtitle_enabled.unwrap_or(defaults::SUBTITLE_ENABLED),
            subtitle,
            threads: raw.threads.unwrap_or(defaults::THREADS).max(1),
            fps: raw.fps.unwrap_or(defaults::FPS).max(1),
        }
    }
}

/// "transparent" (or blank) means no background box.
fn normalize_background(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty()
        || trimmed.eq_ignore_ascii_case("transparent")
        || trimmed.eq_ignore_ascii_case("none")
    {
        None
    } else {
        Some(trimmed.to_string())
    }
}
