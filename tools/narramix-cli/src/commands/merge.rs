//! Merge one narration track onto a video.

use std::path::PathBuf;

use narramix_common::config::AppConfig;
use narramix_project_model::options::RenderOptions;
use narramix_render_engine::{simple_merge, FfmpegBackend, SimpleMergeJob};

use super::MixArgs;

pub async fn run(
    config: AppConfig,
    video: PathBuf,
    narration: Option<PathBuf>,
    subtitle: Option<PathBuf>,
    bgm: Option<PathBuf>,
    output: PathBuf,
    mix: MixArgs,
) -> anyhow::Result<()> {
    println!("Merging onto: {}", video.display());

    let options = RenderOptions::from(mix.merge_options()?);
    let font = super::resolve_font(&config, &options);
    tracing::debug!(?options, font = ?font, "Render options resolved");

    if let Some(path) = &narration {
        println!("  Narration: {}", path.display());
    }
    if let Some(path) = &subtitle {
        println!("  Subtitles: {}", path.display());
    }
    if let Some(path) = &bgm {
        println!("  BGM: {}", path.display());
    }
    println!("  Output: {}", output.display());

    let job = SimpleMergeJob {
        video,
        narration,
        subtitle,
        bgm,
        output,
        options,
        font,
        dry_run: mix.dry_run,
    };

    let report = tokio::task::spawn_blocking(move || {
        let mut backend = FfmpegBackend::new(&config.media_tools);
        simple_merge(&mut backend, &job, Some(super::progress_printer()))
    })
    .await?
    .map_err(|e| anyhow::anyhow!("Merge failed: {e}"))?;

    super::print_report(&report);
    Ok(())
}
