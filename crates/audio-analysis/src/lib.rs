//! NarraMix Audio Analysis
//!
//! Local analysis of decoded audio and subtitle files:
//! - **Loudness:** RMS measurement of decoded WAV chunks and the smart
//!   volume balance factors derived from it
//! - **Subtitles:** SRT cue parsing and the subtitle validity gate

pub mod loudness;
pub mod subtitles;

pub use loudness::{BalanceFactors, Loudness, LoudnessAnalyzer};
pub use subtitles::{is_valid_subtitle_file, load_srt, parse_srt};
