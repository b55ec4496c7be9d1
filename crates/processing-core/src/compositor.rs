//! Timeline compositor.
//!
//! Builds the declarative track list for both merge modes. The output
//! plan always spans exactly the source video duration; tracks that run
//! longer are truncated by the mixer and shorter ones are padded with
//! silence.

use narramix_common::{Diagnostics, Stage};
use narramix_project_model::defaults;
use narramix_project_model::media::{AudioAsset, MediaInfo};
use narramix_project_model::options::VolumeOptions;
use narramix_project_model::track::{AudioTrackSpec, PieceKind, TrackRole, TrackSource};
use narramix_project_model::window::TimeWindow;
use serde::{Deserialize, Serialize};

use crate::splice;

/// The composite audio timeline for one output video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositePlan {
    /// Output duration; equals the source video duration.
    pub duration_secs: f64,
    pub tracks: Vec<AudioTrackSpec>,
    /// Informational notes about how the plan was built.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
}

impl CompositePlan {
    fn new(duration_secs: f64) -> Self {
        Self {
            duration_secs,
            tracks: Vec::new(),
            notes: Vec::new(),
        }
    }

    /// No track contributes; the output audio is silence.
    pub fn is_silent(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn tracks_with_role(&self, role: TrackRole) -> impl Iterator<Item = &AudioTrackSpec> {
        self.tracks.iter().filter(move |t| t.role == role)
    }

    pub fn original_track(&self) -> Option<&AudioTrackSpec> {
        self.tracks_with_role(TrackRole::Original).next()
    }

    /// Windows where the original audio is silenced.
    pub fn mute_windows(&self) -> Vec<TimeWindow> {
        self.original_track()
            .map(|track| {
                track
                    .splice
                    .iter()
                    .filter(|piece| piece.kind == PieceKind::Silence)
                    .map(|piece| piece.range)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Whether a measured output duration matches this plan.
    pub fn duration_matches(&self, measured_secs: f64) -> bool {
        (measured_secs - self.duration_secs).abs() < defaults::DURATION_TOLERANCE_SECS
    }

    fn note(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::info!("{message}");
        self.notes.push(message);
    }
}

/// Inputs for a simple merge.
#[derive(Debug, Clone)]
pub struct SimpleMix<'a> {
    pub video: &'a MediaInfo,
    pub narration: Option<&'a AudioAsset>,
    pub bgm: Option<&'a AudioAsset>,
    pub volumes: VolumeOptions,
    pub keep_original_audio: bool,
}

/// Compose one continuous narration track with optional original audio and BGM.
pub fn compose_simple(mix: &SimpleMix<'_>, diagnostics: &mut Diagnostics) -> CompositePlan {
    let duration = mix.video.duration_secs;
    let mut plan = CompositePlan::new(duration);

    if let Some(narration) = mix.narration {
        if narration.duration_secs > duration + defaults::DURATION_TOLERANCE_SECS {
            diagnostics.warn(
                Stage::Narration,
                format!(
                    "narration runs {:.3}s past the video end and will be truncated",
                    narration.duration_secs - duration
                ),
            );
        }
        plan.tracks.push(
            AudioTrackSpec::new(
                TrackRole::Narration,
                TrackSource::File(narration.path.clone()),
                mix.volumes.voice,
                0.0,
            )
            .with_natural_duration(narration.duration_secs),
        );
    }

    if mix.keep_original_audio && mix.volumes.original > 0.0 {
        if mix.video.has_audio {
            plan.tracks.push(
                AudioTrackSpec::new(
                    TrackRole::Original,
                    TrackSource::VideoAudio,
                    mix.volumes.original,
                    0.0,
                )
                .with_natural_duration(duration),
            );
        } else {
            diagnostics.warn(
                Stage::OriginalAudio,
                "video has no audio stream; original audio omitted",
            );
        }
    }

    if let Some(bgm) = mix.bgm {
        plan.tracks.push(bgm_track(bgm, mix.volumes.bgm, duration).with_fade_out(
            defaults::BGM_FADE_OUT_SECS.min(duration),
        ));
    }

    if plan.is_silent() {
        plan.note("no audio tracks; output audio is silence");
    }

    tracing::info!(
        duration_secs = duration,
        tracks = plan.tracks.len(),
        "Simple merge composed"
    );
    plan
}

/// One narration segment ready for composition.
#[derive(Debug, Clone)]
pub struct OverlaySegment {
    /// Position in the caller's segment list (for diagnostics).
    pub index: usize,
    pub window: TimeWindow,
    /// Loaded narration audio; `None` when loading failed.
    pub audio: Option<AudioAsset>,
}

/// Inputs for a narration overlay merge.
#[derive(Debug, Clone)]
pub struct OverlayMix<'a> {
    pub video: &'a MediaInfo,
    pub segments: &'a [OverlaySegment],
    pub bgm: Option<&'a AudioAsset>,
    pub volumes: VolumeOptions,
    /// Silence the original audio inside narration windows.
    pub mute_original: bool,
}

/// Compose timestamped narration segments over the full video.
///
/// Every segment's window takes part in muting, even when its audio
/// failed to load. Segments starting at or after the video end are dropped.
pub fn compose_overlay(mix: &OverlayMix<'_>, diagnostics: &mut Diagnostics) -> CompositePlan {
    let duration = mix.video.duration_secs;
    let mut plan = CompositePlan::new(duration);

    if mix.video.has_audio && mix.volumes.original > 0.0 {
        let mut original = AudioTrackSpec::new(
            TrackRole::Original,
            TrackSource::VideoAudio,
            mix.volumes.original,
            0.0,
        )
        .with_natural_duration(duration);

        if mix.mute_original {
            let windows: Vec<TimeWindow> = mix.segments.iter().map(|s| s.window).collect();
            let overlaps = splice::count_overlaps(&windows);
            if overlaps > 0 {
                diagnostics.warn(
                    Stage::Segment,
                    format!("{overlaps} overlapping narration windows merged for muting"),
                );
            }
            let pieces = splice::mute_splice(&windows, duration);
            if !splice::is_passthrough(&pieces) {
                tracing::debug!(pieces = pieces.len(), "Original audio spliced");
                original = original.with_splice(pieces);
            }
        }
        plan.tracks.push(original);
    } else if !mix.video.has_audio {
        plan.note("video has no audio stream; original audio omitted");
    }

    for segment in mix.segments {
        let Some(audio) = &segment.audio else {
            continue;
        };
        if segment.window.start >= duration {
            diagnostics.warn(
                Stage::Segment,
                format!(
                    "segment {} starts at {} past the video end; dropped",
                    segment.index + 1,
                    segment.window
                ),
            );
            continue;
        }
        plan.tracks.push(
            AudioTrackSpec::new(
                TrackRole::Narration,
                TrackSource::File(audio.path.clone()),
                mix.volumes.voice,
                segment.window.start,
            )
            .with_natural_duration(audio.duration_secs),
        );
    }

    if let Some(bgm) = mix.bgm {
        plan.tracks.push(bgm_track(bgm, mix.volumes.bgm, duration));
    }

    if plan.is_silent() {
        plan.note("no audio tracks; output audio is silence");
    }

    tracing::info!(
        duration_secs = duration,
        tracks = plan.tracks.len(),
        mute_windows = plan.mute_windows().len(),
        "Narration overlay composed"
    );
    plan
}

fn bgm_track(bgm: &AudioAsset, gain: f64, duration: f64) -> AudioTrackSpec {
    AudioTrackSpec::new(TrackRole::Bgm, TrackSource::File(bgm.path.clone()), gain, 0.0)
        .with_natural_duration(bgm.duration_secs)
        .looped_to(duration)
}
