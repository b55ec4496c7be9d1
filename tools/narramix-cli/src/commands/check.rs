//! Check media tools and font configuration.

use narramix_common::config::{config_file_path, AppConfig};
use narramix_render_engine::{FfmpegBackend, MediaBackend};

pub fn run(config: &AppConfig) -> anyhow::Result<()> {
    println!("NarraMix System Check");
    println!("{}", "=".repeat(50));

    let config_path = config_file_path();
    if config_path.exists() {
        println!("[OK] Config: {}", config_path.display());
    } else {
        println!("[--] Config: defaults ({} not found)", config_path.display());
    }

    let backend = FfmpegBackend::new(&config.media_tools);
    let ffmpeg_ok = backend.is_available();
    let ffprobe_ok = backend.probe_available();
    report_tool("ffmpeg", &config.media_tools.ffmpeg.display().to_string(), ffmpeg_ok);
    report_tool("ffprobe", &config.media_tools.ffprobe.display().to_string(), ffprobe_ok);

    let font_dir = &config.font_dir;
    match std::fs::read_dir(font_dir) {
        Ok(entries) => {
            let fonts = entries
                .filter_map(Result::ok)
                .filter(|e| {
                    e.path()
                        .extension()
                        .and_then(|ext| ext.to_str())
                        .is_some_and(|ext| {
                            matches!(ext.to_ascii_lowercase().as_str(), "ttf" | "otf" | "ttc")
                        })
                })
                .count();
            println!("[OK] Font directory: {} ({fonts} fonts)", font_dir.display());
        }
        Err(_) => println!(
            "[WARN] Font directory: {} not readable; subtitles use the default font",
            font_dir.display()
        ),
    }

    println!();
    if ffmpeg_ok && ffprobe_ok {
        println!("All required tools are available. NarraMix is ready.");
    } else {
        println!("Some required tools are missing. Install ffmpeg or set media_tools in the config.");
    }

    Ok(())
}

fn report_tool(name: &str, binary: &str, available: bool) {
    if available {
        println!("[OK] {name}: {binary}");
    } else {
        println!("[MISSING] {name}: {binary}");
    }
}
