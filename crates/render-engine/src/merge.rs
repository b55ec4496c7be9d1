//! The merge operations.
//!
//! Both operations follow the same shape: open the primary video (the
//! only fatal input), gather optional contributions into the diagnostics
//! trail, compose the audio timeline, render subtitles, encode, verify
//! the output duration, and write a JSON report next to the output.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use narramix_audio_analysis::loudness::{BalanceFactors, LoudnessAnalyzer};
use narramix_audio_analysis::subtitles::{is_valid_subtitle_file, load_srt};
use narramix_common::error::{NarramixError, NarramixResult};
use narramix_common::{Diagnostics, Stage};
use narramix_processing_core::compositor::{
    compose_overlay, compose_simple, CompositePlan, OverlayMix, OverlaySegment, SimpleMix,
};
use narramix_processing_core::placement::anchor_segment_cues;
use narramix_processing_core::volume::{ResolvedVolumes, VolumeCorrection, VolumePolicy};
use narramix_processing_core::wrap::GlyphMetrics;
use narramix_project_model::cue::SubtitleCue;
use narramix_project_model::defaults;
use narramix_project_model::media::{AudioAsset, FrameSize, MediaInfo};
use narramix_project_model::options::{RenderOptions, SubtitlePlacement, VolumeOptions};
use narramix_project_model::segment::NarrationSegment;
use serde::{Deserialize, Serialize};
use tempfile::TempDir;

use crate::backend::{EncodeJob, MediaBackend, ProgressCallback};
use crate::fonts;
use crate::subtitle::{render_cues, DrawtextRenderer, PositionedClip, TextStyle};

/// An opened media input plus its scratch resources.
///
/// Scratch files (decoded analysis chunks) are removed when the handle is
/// dropped, whichever way the operation exits.
#[derive(Debug)]
pub struct MediaHandle {
    info: MediaInfo,
    scratch: Option<TempDir>,
}

impl MediaHandle {
    pub fn open(backend: &dyn MediaBackend, path: &Path) -> NarramixResult<Self> {
        let info = backend.probe(path)?;
        if !(info.duration_secs > 0.0) {
            return Err(NarramixError::media(format!(
                "{} has zero duration",
                path.display()
            )));
        }
        tracing::info!(
            path = %path.display(),
            duration_secs = info.duration_secs,
            has_audio = info.has_audio,
            width = ?info.width,
            height = ?info.height,
            "Media opened"
        );
        Ok(Self {
            info,
            scratch: None,
        })
    }

    pub fn info(&self) -> &MediaInfo {
        &self.info
    }

    /// Scratch directory tied to this handle, created on first use.
    pub fn scratch_dir(&mut self) -> NarramixResult<&Path> {
        if self.scratch.is_none() {
            self.scratch = Some(
                tempfile::Builder::new()
                    .prefix("narramix-scratch")
                    .tempdir()?,
            );
        }
        match &self.scratch {
            Some(dir) => Ok(dir.path()),
            None => Err(NarramixError::media("scratch directory unavailable")),
        }
    }
}

impl Drop for MediaHandle {
    fn drop(&mut self) {
        if let Some(dir) = self.scratch.take() {
            let path = dir.path().to_path_buf();
            match dir.close() {
                Ok(()) => tracing::debug!(path = %path.display(), "Scratch released"),
                Err(err) => {
                    tracing::warn!(path = %path.display(), error = %err, "Failed to release scratch")
                }
            }
        }
    }
}

/// Inputs for [`simple_merge`].
#[derive(Debug, Clone)]
pub struct SimpleMergeJob {
    pub video: PathBuf,
    pub narration: Option<PathBuf>,
    pub subtitle: Option<PathBuf>,
    pub bgm: Option<PathBuf>,
    pub output: PathBuf,
    pub options: RenderOptions,
    /// Resolved subtitle font file.
    pub font: Option<PathBuf>,
    /// Build and report the plan without encoding.
    pub dry_run: bool,
}

/// Inputs for [`narration_overlay_merge`].
#[derive(Debug, Clone)]
pub struct OverlayMergeJob {
    pub video: PathBuf,
    pub segments: Vec<NarrationSegment>,
    pub bgm: Option<PathBuf>,
    pub output: PathBuf,
    pub options: RenderOptions,
    pub font: Option<PathBuf>,
    pub dry_run: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeKind {
    Simple,
    NarrationOverlay,
}

/// Outcome of a merge, also written as `<output>.merge.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeReport {
    pub kind: MergeKind,
    pub output: PathBuf,
    pub created_at: DateTime<Utc>,
    pub dry_run: bool,
    pub source_duration_secs: f64,
    /// Probed output duration; `None` for dry runs or when probing failed.
    pub measured_duration_secs: Option<f64>,
    pub volumes: VolumeOptions,
    pub volume_corrections: Vec<VolumeCorrection>,
    pub plan: CompositePlan,
    pub subtitles_rendered: usize,
    /// Segments whose timestamp parsed (overlay only).
    pub segments_used: Option<usize>,
    pub diagnostics: Diagnostics,
}

impl MergeReport {
    pub fn report_path(output: &Path) -> PathBuf {
        output.with_extension("merge.json")
    }

    fn write(&self) -> NarramixResult<PathBuf> {
        let path = Self::report_path(&self.output);
        std::fs::write(&path, serde_json::to_string_pretty(self)?)?;
        Ok(path)
    }
}

/// Merge one continuous narration track, optional BGM and an optional
/// subtitle file onto a video.
pub fn simple_merge(
    backend: &mut dyn MediaBackend,
    job: &SimpleMergeJob,
    progress: Option<ProgressCallback>,
) -> NarramixResult<MergeReport> {
    tracing::info!(
        video = %job.video.display(),
        output = %job.output.display(),
        narration = job.narration.is_some(),
        bgm = job.bgm.is_some(),
        subtitle = job.subtitle.is_some(),
        dry_run = job.dry_run,
        "Starting simple merge"
    );
    ensure_backend(backend, job.dry_run)?;

    let mut diagnostics = Diagnostics::new();
    let mut video = MediaHandle::open(&*backend, &job.video)?;

    let narration = job.narration.as_deref().and_then(|path| {
        diagnostics.recover(Stage::Narration, probe_audio(&*backend, path))
    });
    let bgm = job
        .bgm
        .as_deref()
        .and_then(|path| diagnostics.recover(Stage::Bgm, probe_audio(&*backend, path)));

    let have_original = job.options.keep_original_audio && video.info().has_audio;
    let mut resolved = resolve_volumes(&job.options, have_original, &mut diagnostics);
    if let Some(narration) = &narration {
        if job.options.smart_volume && resolved.original_audible {
            resolved.volumes = smart_balance(
                &*backend,
                &mut video,
                &narration.path,
                &resolved.volumes,
                &mut diagnostics,
            );
        }
    }

    let plan = compose_simple(
        &SimpleMix {
            video: video.info(),
            narration: narration.as_ref(),
            bgm: bgm.as_ref(),
            volumes: resolved.volumes,
            keep_original_audio: job.options.keep_original_audio,
        },
        &mut diagnostics,
    );

    let mut subtitles = Vec::new();
    if job.options.subtitle_enabled {
        if let Some(path) = &job.subtitle {
            if let Some(cues) = load_cues(path, &mut diagnostics) {
                if let Some(ctx) = SubtitleContext::new(job, video.info(), &mut diagnostics) {
                    subtitles = ctx.render(&cues, &mut diagnostics);
                }
            }
        }
    }

    finish(
        backend,
        Finish {
            kind: MergeKind::Simple,
            video: &video,
            output: &job.output,
            options: &job.options,
            dry_run: job.dry_run,
            plan,
            subtitles,
            resolved,
            segments_used: None,
        },
        diagnostics,
        progress,
    )
}

/// Overlay timestamped narration segments onto the full, untrimmed video,
/// muting the original audio only inside narration windows.
pub fn narration_overlay_merge(
    backend: &mut dyn MediaBackend,
    job: &OverlayMergeJob,
    progress: Option<ProgressCallback>,
) -> NarramixResult<MergeReport> {
    tracing::info!(
        video = %job.video.display(),
        output = %job.output.display(),
        segments = job.segments.len(),
        bgm = job.bgm.is_some(),
        mute_original = job.options.mute_original_audio,
        dry_run = job.dry_run,
        "Starting narration overlay merge"
    );
    ensure_backend(backend, job.dry_run)?;

    let mut diagnostics = Diagnostics::new();
    let mut video = MediaHandle::open(&*backend, &job.video)?;

    let prepared = prepare_segments(&*backend, &job.segments, &mut diagnostics);
    let bgm = job
        .bgm
        .as_deref()
        .and_then(|path| diagnostics.recover(Stage::Bgm, probe_audio(&*backend, path)));

    let have_original = job.options.keep_original_audio && video.info().has_audio;
    let mut resolved = resolve_volumes(&job.options, have_original, &mut diagnostics);
    let first_narration = prepared
        .iter()
        .find_map(|p| p.segment.audio.as_ref())
        .map(|a| a.path.clone());
    if let Some(narration) = first_narration {
        if job.options.smart_volume && resolved.original_audible {
            resolved.volumes = smart_balance(
                &*backend,
                &mut video,
                &narration,
                &resolved.volumes,
                &mut diagnostics,
            );
        }
    }

    let mut volumes = resolved.volumes;
    if !job.options.keep_original_audio {
        volumes.original = 0.0;
    }

    let segments: Vec<OverlaySegment> = prepared.iter().map(|p| p.segment.clone()).collect();
    let plan = compose_overlay(
        &OverlayMix {
            video: video.info(),
            segments: &segments,
            bgm: bgm.as_ref(),
            volumes,
            mute_original: job.options.mute_original_audio,
        },
        &mut diagnostics,
    );

    let mut subtitles = Vec::new();
    let wants_subtitles = prepared.iter().any(|p| p.subtitle.is_some());
    if job.options.subtitle_enabled && wants_subtitles {
        let overlay_font = FontChoice {
            font: job.font.clone(),
            options: &job.options,
        };
        if let Some(ctx) = SubtitleContext::from_font(overlay_font, video.info(), &mut diagnostics) {
            for p in &prepared {
                let Some(path) = &p.subtitle else {
                    continue;
                };
                let Some(cues) = load_cues(path, &mut diagnostics) else {
                    continue;
                };
                let anchored = anchor_segment_cues(&cues, p.segment.window);
                subtitles.extend(ctx.render(&anchored, &mut diagnostics));
            }
        }
    }

    finish(
        backend,
        Finish {
            kind: MergeKind::NarrationOverlay,
            video: &video,
            output: &job.output,
            options: &job.options,
            dry_run: job.dry_run,
            plan,
            subtitles,
            resolved: ResolvedVolumes {
                volumes,
                ..resolved
            },
            segments_used: Some(segments.len()),
        },
        diagnostics,
        progress,
    )
}

fn ensure_backend(backend: &dyn MediaBackend, dry_run: bool) -> NarramixResult<()> {
    if !dry_run && !backend.is_available() {
        return Err(NarramixError::unsupported(format!(
            "media backend '{}' is not available (expected ffmpeg in PATH)",
            backend.name()
        )));
    }
    Ok(())
}

fn probe_audio(backend: &dyn MediaBackend, path: &Path) -> NarramixResult<AudioAsset> {
    let info = backend.probe(path)?;
    if !info.has_audio {
        return Err(NarramixError::audio(format!(
            "{} has no audio stream",
            path.display()
        )));
    }
    Ok(AudioAsset::from(&info))
}

fn resolve_volumes(
    options: &RenderOptions,
    have_original_audio: bool,
    diagnostics: &mut Diagnostics,
) -> ResolvedVolumes {
    let resolved = VolumePolicy::default().resolve(&options.volume, have_original_audio);
    for correction in &resolved.corrections {
        diagnostics.warn(Stage::Volume, correction.describe());
    }
    resolved
}

/// Decode narration and original audio and derive balance factors.
fn measure_balance(
    backend: &dyn MediaBackend,
    video: &mut MediaHandle,
    narration: &Path,
) -> NarramixResult<BalanceFactors> {
    let source = video.info().path.clone();
    let dir = video.scratch_dir()?.to_path_buf();
    let voice_wav = dir.join("narration.wav");
    let original_wav = dir.join("original.wav");

    backend.decode_audio(narration, defaults::ANALYSIS_WINDOW_SECS, &voice_wav)?;
    backend.decode_audio(&source, defaults::ANALYSIS_WINDOW_SECS, &original_wav)?;
    LoudnessAnalyzer::default().analyze_files(&voice_wav, &original_wav)
}

fn smart_balance(
    backend: &dyn MediaBackend,
    video: &mut MediaHandle,
    narration: &Path,
    volumes: &VolumeOptions,
    diagnostics: &mut Diagnostics,
) -> VolumeOptions {
    match diagnostics.recover(
        Stage::SmartVolume,
        measure_balance(backend, video, narration),
    ) {
        Some(factors) => {
            let balanced =
                VolumePolicy::default().apply_balance(volumes, factors.voice, factors.original);
            tracing::info!(
                voice = balanced.voice,
                original = balanced.original,
                "Smart volume applied"
            );
            balanced
        }
        None => *volumes,
    }
}

struct PreparedSegment {
    segment: OverlaySegment,
    subtitle: Option<PathBuf>,
}

/// Parse windows and load audio for every segment.
///
/// A malformed timestamp drops the segment entirely. A segment whose
/// audio cannot be loaded keeps its window so the original is still muted.
fn prepare_segments(
    backend: &dyn MediaBackend,
    segments: &[NarrationSegment],
    diagnostics: &mut Diagnostics,
) -> Vec<PreparedSegment> {
    let mut prepared = Vec::with_capacity(segments.len());
    for (index, segment) in segments.iter().enumerate() {
        let window = match segment.window() {
            Ok(window) => window,
            Err(err) => {
                diagnostics.warn(
                    Stage::Segment,
                    NarramixError::timestamp(&segment.timestamp, err.to_string()).to_string(),
                );
                continue;
            }
        };

        let audio = match probe_audio(backend, &segment.audio_path) {
            Ok(audio) => Some(audio),
            Err(err) => {
                diagnostics.warn(
                    Stage::Segment,
                    format!(
                        "segment {} audio unavailable, window still muted: {err}",
                        index + 1
                    ),
                );
                None
            }
        };

        prepared.push(PreparedSegment {
            segment: OverlaySegment {
                index,
                window,
                audio,
            },
            subtitle: segment.subtitle_path.clone(),
        });
    }

    tracing::info!(
        total = segments.len(),
        usable = prepared.len(),
        "Narration segments prepared"
    );
    prepared
}

fn load_cues(path: &Path, diagnostics: &mut Diagnostics) -> Option<Vec<SubtitleCue>> {
    if !is_valid_subtitle_file(path) {
        diagnostics.warn(
            Stage::Subtitles,
            format!(
                "subtitle file {} is missing, empty, or has no timings; skipped",
                path.display()
            ),
        );
        return None;
    }
    diagnostics.recover(Stage::Subtitles, load_srt(path))
}

/// Font choice and styling shared by both operations.
struct FontChoice<'a> {
    font: Option<PathBuf>,
    options: &'a RenderOptions,
}

struct SubtitleContext {
    renderer: DrawtextRenderer,
    metrics: Box<dyn GlyphMetrics>,
    style: TextStyle,
    frame: FrameSize,
    placement: SubtitlePlacement,
}

impl SubtitleContext {
    fn new(
        job: &SimpleMergeJob,
        video: &MediaInfo,
        diagnostics: &mut Diagnostics,
    ) -> Option<Self> {
        Self::from_font(
            FontChoice {
                font: job.font.clone(),
                options: &job.options,
            },
            video,
            diagnostics,
        )
    }

    fn from_font(
        choice: FontChoice<'_>,
        video: &MediaInfo,
        diagnostics: &mut Diagnostics,
    ) -> Option<Self> {
        let Some(frame) = video.frame_size() else {
            diagnostics.warn(Stage::Subtitles, "video frame size unknown; subtitles skipped");
            return None;
        };

        let font = match choice.font {
            Some(path) if !path.is_file() => {
                diagnostics.warn(
                    Stage::Subtitles,
                    format!("font {} not found; using the default font", path.display()),
                );
                None
            }
            other => other,
        };

        let subtitle = &choice.options.subtitle;
        Some(Self {
            renderer: DrawtextRenderer,
            metrics: fonts::metrics_for(font.as_deref(), subtitle.font_size),
            style: TextStyle::from_subtitle(subtitle, font),
            frame,
            placement: subtitle.placement,
        })
    }

    fn render(&self, cues: &[SubtitleCue], diagnostics: &mut Diagnostics) -> Vec<PositionedClip> {
        render_cues(
            &self.renderer,
            self.metrics.as_ref(),
            cues,
            &self.style,
            self.frame,
            self.placement,
            diagnostics,
        )
    }
}

struct Finish<'a> {
    kind: MergeKind,
    video: &'a MediaHandle,
    output: &'a Path,
    options: &'a RenderOptions,
    dry_run: bool,
    plan: CompositePlan,
    subtitles: Vec<PositionedClip>,
    resolved: ResolvedVolumes,
    segments_used: Option<usize>,
}

fn finish(
    backend: &mut dyn MediaBackend,
    finish: Finish<'_>,
    mut diagnostics: Diagnostics,
    progress: Option<ProgressCallback>,
) -> NarramixResult<MergeReport> {
    if let Some(parent) = finish.output.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let subtitles_rendered = finish.subtitles.len();
    let job = EncodeJob {
        video: finish.video.info().path.clone(),
        output: finish.output.to_path_buf(),
        plan: finish.plan,
        subtitles: finish.subtitles,
        threads: finish.options.threads,
        fps: finish.options.fps,
    };

    let measured_duration_secs = if finish.dry_run {
        tracing::info!("Dry run: skipping encode");
        None
    } else {
        tracing::info!(backend = backend.name(), "Encoding");
        backend.encode(&job, progress)?;
        verify_duration(&*backend, &job, &mut diagnostics)
    };

    let report = MergeReport {
        kind: finish.kind,
        output: job.output,
        created_at: Utc::now(),
        dry_run: finish.dry_run,
        source_duration_secs: finish.video.info().duration_secs,
        measured_duration_secs,
        volumes: finish.resolved.volumes,
        volume_corrections: finish.resolved.corrections,
        plan: job.plan,
        subtitles_rendered,
        segments_used: finish.segments_used,
        diagnostics,
    };

    match report.write() {
        Ok(path) => tracing::info!(report = %path.display(), "Wrote merge report"),
        Err(err) => tracing::warn!(error = %err, "Failed to write merge report"),
    }

    tracing::info!(
        output = %report.output.display(),
        tracks = report.plan.tracks.len(),
        subtitles = subtitles_rendered,
        diagnostics = report.diagnostics.len(),
        "Merge finished"
    );
    Ok(report)
}

/// Probe the encoded output and compare against the plan duration.
fn verify_duration(
    backend: &dyn MediaBackend,
    job: &EncodeJob,
    diagnostics: &mut Diagnostics,
) -> Option<f64> {
    let measured = diagnostics.recover(Stage::Verification, backend.probe(&job.output))?;
    if !job.plan.duration_matches(measured.duration_secs) {
        diagnostics.warn(
            Stage::Verification,
            format!(
                "output duration {:.3}s differs from source {:.3}s",
                measured.duration_secs, job.plan.duration_secs
            ),
        );
    }
    Some(measured.duration_secs)
}
