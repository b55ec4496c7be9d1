//! Default values for every option and policy constant.
//!
//! This is the single defaults table; no other module should carry
//! literal defaults for these settings.

/// Narration (voice-over) gain.
pub const VOICE_VOLUME: f64 = 1.0;
/// Background music gain.
pub const BGM_VOLUME: f64 = 0.3;
/// Gain of the source video's own audio.
pub const ORIGINAL_VOLUME: f64 = 0.7;

/// Lower bound for any user volume.
pub const MIN_VOLUME: f64 = 0.0;
/// Upper bound for any user volume.
pub const MAX_VOLUME: f64 = 2.0;

/// Whether smart loudness balancing runs when its preconditions hold.
pub const ENABLE_SMART_VOLUME: bool = true;
/// Safety band for the voice gain after smart balancing.
pub const SMART_VOICE_RANGE: (f64, f64) = (0.1, 1.5);
/// Safety band for the original-audio gain after smart balancing.
pub const SMART_ORIGINAL_RANGE: (f64, f64) = (0.1, 2.0);
/// Seconds of audio decoded for loudness analysis.
pub const ANALYSIS_WINDOW_SECS: f64 = 30.0;

/// Gains within this distance of 1.0 are not applied.
pub const GAIN_EPSILON: f64 = 1e-3;

/// Fade-out length applied to BGM at the end of a simple merge.
pub const BGM_FADE_OUT_SECS: f64 = 3.0;

/// Allowed difference between source and output durations.
pub const DURATION_TOLERANCE_SECS: f64 = 0.1;

pub const KEEP_ORIGINAL_AUDIO: bool = true;
pub const MUTE_ORIGINAL_AUDIO: bool = true;
pub const SUBTITLE_ENABLED: bool = true;

pub const SUBTITLE_FONT_SIZE: u32 = 40;
pub const SUBTITLE_COLOR: &str = "#FFFFFF";
pub const STROKE_COLOR: &str = "#000000";
pub const STROKE_WIDTH: f64 = 1.0;
/// Vertical position (percent of free height) for custom placement.
pub const CUSTOM_POSITION: f64 = 70.0;
/// Keep-out margin for custom placement, in pixels.
pub const SUBTITLE_MARGIN_PX: f64 = 10.0;
/// Share of the frame width available to a subtitle line.
pub const SUBTITLE_MAX_WIDTH_RATIO: f64 = 0.9;

/// Encoder thread hint.
pub const THREADS: u32 = 2;
/// Output frame rate.
pub const FPS: u32 = 30;
