//! NarraMix Render Engine
//!
//! Turns a composed audio timeline plus subtitle cues into an encoded
//! video, and hosts the two merge operations that drive the whole
//! pipeline.
//!
//! # Pipeline Architecture
//!
//! ```text
//! video.mp4 ─────────┐
//!                    ├── Original audio (volume, mute splice)
//! narration.mp3 ─────┤         │
//!                    ├── Narration tracks (delay, volume)
//! bgm.mp3 ───────────┤         │
//!                    ├── BGM (loop, trim, fade)
//!                    │         ▼
//!                    │      amix ── pad/trim to source duration
//! subtitles.srt ─────┘         │
//!         │                    │
//!         └── drawtext burn ───┤
//!                              ▼
//!                       Encode (H.264 + AAC)
//!                              │
//!                              ▼
//!                          output.mp4 + output.merge.json
//! ```

pub mod backend;
pub mod ffmpeg;
pub mod filtergraph;
pub mod fonts;
pub mod merge;
pub mod subtitle;

pub use backend::*;
pub use ffmpeg::FfmpegBackend;
pub use merge::*;
pub use subtitle::{parse_color, render_cue, render_cues, DrawtextRenderer, PositionedClip, TextRenderer, TextStyle};
