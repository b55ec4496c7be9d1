//! Overlay timestamped narration segments onto a full video.

use std::path::PathBuf;

use narramix_common::config::AppConfig;
use narramix_project_model::options::RenderOptions;
use narramix_project_model::segment::parse_segments;
use narramix_render_engine::{narration_overlay_merge, FfmpegBackend, OverlayMergeJob};

use super::MixArgs;

pub async fn run(
    config: AppConfig,
    video: PathBuf,
    segments_path: PathBuf,
    bgm: Option<PathBuf>,
    output: PathBuf,
    keep_original_under_narration: bool,
    mix: MixArgs,
) -> anyhow::Result<()> {
    println!("Overlaying narration onto: {}", video.display());

    let content = std::fs::read_to_string(&segments_path).map_err(|e| {
        anyhow::anyhow!("Failed to read segments {}: {e}", segments_path.display())
    })?;
    let base = super::base_dir(&segments_path);
    let segments: Vec<_> = parse_segments(&content)
        .map_err(|e| anyhow::anyhow!("Failed to parse segments: {e}"))?
        .into_iter()
        .map(|segment| segment.resolve_paths(&base))
        .collect();
    tracing::debug!(
        segments = segments.len(),
        base = %base.display(),
        "Segment list loaded"
    );

    let mut merge_options = mix.merge_options()?;
    if keep_original_under_narration {
        merge_options.mute_original_audio = Some(false);
    }
    let options = RenderOptions::from(merge_options);
    let font = super::resolve_font(&config, &options);

    println!("  Segments: {}", segments.len());
    println!(
        "  Original audio under narration: {}",
        if options.mute_original_audio { "muted" } else { "kept" }
    );
    println!("  Output: {}", output.display());

    let job = OverlayMergeJob {
        video,
        segments,
        bgm,
        output,
        options,
        font,
        dry_run: mix.dry_run,
    };

    let report = tokio::task::spawn_blocking(move || {
        let mut backend = FfmpegBackend::new(&config.media_tools);
        narration_overlay_merge(&mut backend, &job, Some(super::progress_printer()))
    })
    .await?
    .map_err(|e| anyhow::anyhow!("Overlay failed: {e}"))?;

    if let Some(used) = report.segments_used {
        println!("\n  Segments used: {used}");
    }
    super::print_report(&report);
    Ok(())
}
