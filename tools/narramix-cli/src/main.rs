//! NarraMix CLI: merge narration, background music and subtitles onto video.
//!
//! Usage:
//!   narramix merge --video V --output O [OPTIONS]      One continuous narration track
//!   narramix overlay --video V --segments S --output O Timed narration segments
//!   narramix validate <PATH>                           Check a subtitle file or segment list
//!   narramix check                                     Check media tools and fonts

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use narramix_common::config::AppConfig;

mod commands;

use commands::MixArgs;

#[derive(Parser)]
#[command(
    name = "narramix",
    about = "Audio composition and subtitle burn-in for narrated videos",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge one narration track, BGM and a subtitle file onto a video
    Merge {
        /// Primary video
        #[arg(long)]
        video: PathBuf,

        /// Narration audio, placed at t=0
        #[arg(long)]
        narration: Option<PathBuf>,

        /// SRT subtitle file with absolute timings
        #[arg(long)]
        subtitle: Option<PathBuf>,

        /// Background music, looped to the video length
        #[arg(long)]
        bgm: Option<PathBuf>,

        /// Output video file
        #[arg(short, long)]
        output: PathBuf,

        #[command(flatten)]
        mix: MixArgs,
    },

    /// Overlay timestamped narration segments onto the full video
    Overlay {
        /// Primary video
        #[arg(long)]
        video: PathBuf,

        /// JSON list of {timestamp, audio_path, subtitle_path}
        #[arg(long)]
        segments: PathBuf,

        /// Background music, looped to the video length
        #[arg(long)]
        bgm: Option<PathBuf>,

        /// Output video file
        #[arg(short, long)]
        output: PathBuf,

        /// Keep the original audio audible under narration
        #[arg(long)]
        keep_original_under_narration: bool,

        #[command(flatten)]
        mix: MixArgs,
    },

    /// Validate a subtitle file or a segment list
    Validate {
        /// `.srt` file or segments `.json`
        path: PathBuf,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check media tools and font configuration
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load();

    // Initialize logging
    let mut logging = config.logging.clone();
    if cli.verbose {
        logging.level = "debug".to_string();
    }
    logging.json |= cli.json_logs;
    narramix_common::logging::init_logging(&logging);

    match cli.command {
        Commands::Merge {
            video,
            narration,
            subtitle,
            bgm,
            output,
            mix,
        } => commands::merge::run(config, video, narration, subtitle, bgm, output, mix).await,
        Commands::Overlay {
            video,
            segments,
            bgm,
            output,
            keep_original_under_narration,
            mix,
        } => {
            commands::overlay::run(
                config,
                video,
                segments,
                bgm,
                output,
                keep_original_under_narration,
                mix,
            )
            .await
        }
        Commands::Validate { path, json } => commands::validate::run(path, json),
        Commands::Check => commands::check::run(&config),
    }
}
