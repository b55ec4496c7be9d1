//! NarraMix Processing Core: the mixing policy
//!
//! Turns resolved inputs into declarative mixing decisions:
//! - **Volume Policy:** Defaults, clamping, and smart-balance composition
//! - **Mute Splice:** Keep/silence pieces over a sorted interval list
//! - **Timeline Compositor:** Track lists for simple and overlay merges
//! - **Text Layout:** Subtitle wrapping and vertical placement
//!
//! This crate is pure computation. No I/O, no media decoding.
//! All inputs are data; all outputs are data.

pub mod compositor;
pub mod placement;
pub mod splice;
pub mod volume;
pub mod wrap;

pub use compositor::{
    compose_overlay, compose_simple, CompositePlan, OverlayMix, OverlaySegment, SimpleMix,
};
pub use placement::{anchor_segment_cues, max_text_width, subtitle_y};
pub use splice::mute_splice;
pub use volume::{needs_gain, ResolvedVolumes, VolumeCorrection, VolumePolicy};
pub use wrap::{wrap_text, ApproxMetrics, GlyphMetrics, TextBox, WrappedText};
