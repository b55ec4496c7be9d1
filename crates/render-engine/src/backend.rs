//! Media backend abstraction.

use std::path::{Path, PathBuf};

use narramix_common::error::NarramixResult;
use narramix_processing_core::CompositePlan;
use narramix_project_model::media::MediaInfo;

use crate::subtitle::PositionedClip;

/// A fully composed output, ready to be encoded.
#[derive(Debug, Clone)]
pub struct EncodeJob {
    /// Primary video (picture source and `VideoAudio` tracks).
    pub video: PathBuf,

    /// Output file path.
    pub output: PathBuf,

    /// Composite audio timeline.
    pub plan: CompositePlan,

    /// Subtitle clips burned onto the picture.
    pub subtitles: Vec<PositionedClip>,

    /// Encoder thread hint.
    pub threads: u32,

    /// Output frame rate.
    pub fps: u32,
}

/// Progress callback for encoding.
pub type ProgressCallback = Box<dyn Fn(EncodeProgress) + Send>;

/// Encode progress report.
#[derive(Debug, Clone)]
pub struct EncodeProgress {
    /// Current progress [0.0, 1.0].
    pub progress: f64,

    /// Output timestamp reached so far.
    pub out_time_secs: f64,

    /// Estimated time remaining in seconds.
    pub eta_secs: f64,

    pub stage: EncodeStage,
}

/// Stages of an encode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodeStage {
    Preparing,
    Encoding,
    Finalizing,
    Complete,
}

/// Decoding, probing, and encoding collaborator.
pub trait MediaBackend: Send {
    /// Probe duration, frame size, and audio presence.
    fn probe(&self, path: &Path) -> NarramixResult<MediaInfo>;

    /// Decode up to `max_secs` of the first audio stream of `source` into a
    /// mono PCM WAV file at `dest`.
    fn decode_audio(&self, source: &Path, max_secs: f64, dest: &Path) -> NarramixResult<()>;

    /// Execute an encode job.
    fn encode(&mut self, job: &EncodeJob, progress: Option<ProgressCallback>) -> NarramixResult<()>;

    /// Check if this backend is available on the system.
    fn is_available(&self) -> bool;

    /// Backend name.
    fn name(&self) -> &str;
}
