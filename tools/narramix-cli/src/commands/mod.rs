//! Subcommand implementations and the flags they share.

use std::io::Write;
use std::path::{Path, PathBuf};

use clap::{Args, ValueEnum};
use narramix_common::config::AppConfig;
use narramix_project_model::options::{MergeOptions, PositionMode, RenderOptions};
use narramix_render_engine::{EncodeProgress, MergeReport, ProgressCallback};

pub mod check;
pub mod merge;
pub mod overlay;
pub mod validate;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum PositionArg {
    Bottom,
    Top,
    Center,
    Custom,
}

impl From<PositionArg> for PositionMode {
    fn from(arg: PositionArg) -> Self {
        match arg {
            PositionArg::Bottom => PositionMode::Bottom,
            PositionArg::Top => PositionMode::Top,
            PositionArg::Center => PositionMode::Center,
            PositionArg::Custom => PositionMode::Custom,
        }
    }
}

/// Volume, subtitle and encoder flags shared by `merge` and `overlay`.
///
/// Flags override values loaded from `--options`.
#[derive(Debug, Clone, Default, Args)]
pub struct MixArgs {
    /// JSON options record
    #[arg(long)]
    pub options: Option<PathBuf>,

    /// Narration gain [0.0, 2.0]
    #[arg(long)]
    pub voice_volume: Option<f64>,

    /// Background music gain [0.0, 2.0]
    #[arg(long)]
    pub bgm_volume: Option<f64>,

    /// Original audio gain [0.0, 2.0]
    #[arg(long)]
    pub original_volume: Option<f64>,

    /// Drop the video's own audio entirely
    #[arg(long)]
    pub drop_original_audio: bool,

    /// Disable loudness-based volume balancing
    #[arg(long)]
    pub no_smart_volume: bool,

    /// Skip subtitle burn-in
    #[arg(long)]
    pub no_subtitles: bool,

    /// Subtitle font (file path or name in the configured font directory)
    #[arg(long)]
    pub font: Option<String>,

    /// Subtitle font size in pixels
    #[arg(long)]
    pub font_size: Option<u32>,

    /// Subtitle text colour
    #[arg(long)]
    pub subtitle_color: Option<String>,

    /// Subtitle background colour ("transparent" for none)
    #[arg(long)]
    pub subtitle_bg: Option<String>,

    /// Subtitle position
    #[arg(long, value_enum)]
    pub position: Option<PositionArg>,

    /// Vertical position in percent for `--position custom`
    #[arg(long)]
    pub custom_position: Option<f64>,

    /// Encoder threads
    #[arg(long)]
    pub threads: Option<u32>,

    /// Output frame rate
    #[arg(long)]
    pub fps: Option<u32>,

    /// Build and report the plan without encoding
    #[arg(long)]
    pub dry_run: bool,
}

impl MixArgs {
    fn overrides(&self) -> MergeOptions {
        MergeOptions {
            voice_volume: self.voice_volume,
            bgm_volume: self.bgm_volume,
            original_audio_volume: self.original_volume,
            keep_original_audio: self.drop_original_audio.then_some(false),
            smart_volume: self.no_smart_volume.then_some(false),
            subtitle_enabled: self.no_subtitles.then_some(false),
            subtitle_font: self.font.clone(),
            subtitle_font_size: self.font_size,
            subtitle_color: self.subtitle_color.clone(),
            subtitle_bg_color: self.subtitle_bg.clone(),
            subtitle_position: self.position.map(PositionMode::from),
            custom_position: self.custom_position,
            threads: self.threads,
            fps: self.fps,
            ..MergeOptions::default()
        }
    }

    /// Options file (if any) with CLI flags layered on top.
    pub fn merge_options(&self) -> anyhow::Result<MergeOptions> {
        let base = match &self.options {
            Some(path) => MergeOptions::from_json_file(path)?,
            None => MergeOptions::default(),
        };
        Ok(base.with_overrides(self.overrides()))
    }
}

/// Subtitle font file for the chosen options, if one is configured.
pub fn resolve_font(config: &AppConfig, options: &RenderOptions) -> Option<PathBuf> {
    options
        .subtitle
        .font
        .as_deref()
        .map(|font| config.resolve_font(font))
}

pub fn progress_printer() -> ProgressCallback {
    Box::new(|p: EncodeProgress| {
        print!(
            "\r  Progress: {:.1}% ({:.1}s, ETA: {:.0}s)  ",
            p.progress * 100.0,
            p.out_time_secs,
            p.eta_secs,
        );
        std::io::stdout().flush().ok();
    })
}

pub fn print_report(report: &MergeReport) {
    println!();
    if report.dry_run {
        println!("Dry run complete (nothing encoded)");
    } else {
        println!("Merge complete: {}", report.output.display());
    }
    println!("  Source duration: {:.3}s", report.source_duration_secs);
    if let Some(measured) = report.measured_duration_secs {
        println!("  Output duration: {measured:.3}s");
    }
    println!(
        "  Volumes: voice {} / bgm {} / original {}",
        report.volumes.voice, report.volumes.bgm, report.volumes.original
    );
    println!("  Audio tracks: {}", report.plan.tracks.len());
    let mutes = report.plan.mute_windows();
    if !mutes.is_empty() {
        let listed: Vec<String> = mutes.iter().map(|w| w.to_string()).collect();
        println!("  Muted windows: {}", listed.join(", "));
    }
    println!("  Subtitles rendered: {}", report.subtitles_rendered);
    for note in &report.plan.notes {
        println!("  Note: {note}");
    }

    if report.diagnostics.is_empty() {
        println!("\nNo issues.");
    } else {
        println!("\nDiagnostics:");
        for entry in report.diagnostics.entries() {
            println!("  - [{}] {}", entry.stage, entry.message);
        }
        println!("\n{} issue(s) recorded.", report.diagnostics.len());
    }
    println!(
        "  Report: {}",
        MergeReport::report_path(&report.output).display()
    );
}

/// Directory that relative paths in `file` are resolved against.
pub fn base_dir(file: &Path) -> PathBuf {
    file.parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}
