//! NarraMix Project Model
//!
//! Defines the core data contracts shared by the mixing pipeline:
//! - **Windows:** `TimeWindow` and `HH:MM:SS,mmm` timecodes
//! - **Segments:** Timestamped narration units read from a segment list
//! - **Options:** The immutable render options record and its defaults table
//! - **Tracks:** Declarative audio contributions to the composite timeline
//!
//! All times are seconds relative to the target (video) timeline.

pub mod cue;
pub mod defaults;
pub mod media;
pub mod options;
pub mod segment;
pub mod track;
pub mod window;

pub use cue::*;
pub use media::*;
pub use options::*;
pub use segment::*;
pub use track::*;
pub use window::*;
