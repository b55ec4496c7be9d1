//! Validate a subtitle file or a narration segment list.

use std::path::{Path, PathBuf};

use narramix_audio_analysis::subtitles::{is_valid_subtitle_file, load_srt};
use narramix_project_model::segment::parse_segments;
use serde::Serialize;

#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum Validation {
    Subtitle {
        path: PathBuf,
        valid: bool,
        cues: usize,
        first_cue: Option<String>,
        last_cue: Option<String>,
        error: Option<String>,
    },
    Segments {
        path: PathBuf,
        segments: Vec<SegmentCheck>,
    },
}

#[derive(Debug, Serialize)]
struct SegmentCheck {
    index: usize,
    timestamp: String,
    window: Option<String>,
    error: Option<String>,
    audio_present: bool,
    subtitle_valid: Option<bool>,
}

impl SegmentCheck {
    fn issues(&self) -> usize {
        usize::from(self.error.is_some())
            + usize::from(!self.audio_present)
            + usize::from(self.subtitle_valid == Some(false))
    }
}

pub fn run(path: PathBuf, json: bool) -> anyhow::Result<()> {
    let is_segments = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));

    let validation = if is_segments {
        check_segments(&path)?
    } else {
        check_subtitle(&path)
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&validation)?);
        return Ok(());
    }

    match &validation {
        Validation::Subtitle {
            path,
            valid,
            cues,
            first_cue,
            last_cue,
            error,
        } => {
            println!("Validating subtitle file: {}", path.display());
            if !valid {
                println!("\nNot a usable subtitle file (missing, empty, or no timing lines).");
                return Ok(());
            }
            println!("  Cues: {cues}");
            if let (Some(first), Some(last)) = (first_cue, last_cue) {
                println!("  First: {first}");
                println!("  Last: {last}");
            }
            match error {
                Some(e) => println!("\nFailed to parse: {e}"),
                None => println!("\nSubtitle file is valid."),
            }
        }
        Validation::Segments { path, segments } => {
            println!("Validating segment list: {}", path.display());
            for check in segments {
                let window = check.window.as_deref().unwrap_or("-");
                println!("  #{} {} -> {window}", check.index + 1, check.timestamp);
                if let Some(e) = &check.error {
                    println!("      timestamp: {e}");
                }
                if !check.audio_present {
                    println!("      audio file missing");
                }
                if check.subtitle_valid == Some(false) {
                    println!("      subtitle file unusable; it will be skipped");
                }
            }
            let issues: usize = segments.iter().map(SegmentCheck::issues).sum();
            if issues == 0 {
                println!("\nAll {} segment(s) are valid.", segments.len());
            } else {
                println!("\n{issues} issue(s) found. Affected segments degrade during merge.");
            }
        }
    }

    Ok(())
}

fn check_subtitle(path: &Path) -> Validation {
    let valid = is_valid_subtitle_file(path);
    let (cues, error) = if valid {
        match load_srt(path) {
            Ok(cues) => (cues, None),
            Err(e) => (Vec::new(), Some(e.to_string())),
        }
    } else {
        (Vec::new(), None)
    };

    Validation::Subtitle {
        path: path.to_path_buf(),
        valid,
        cues: cues.len(),
        first_cue: cues.first().map(|c| c.window.to_string()),
        last_cue: cues.last().map(|c| c.window.to_string()),
        error,
    }
}

fn check_segments(path: &Path) -> anyhow::Result<Validation> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Failed to read {}: {e}", path.display()))?;
    let base = super::base_dir(path);
    let segments = parse_segments(&content)
        .map_err(|e| anyhow::anyhow!("Failed to parse segments: {e}"))?;

    let checks = segments
        .into_iter()
        .map(|segment| segment.resolve_paths(&base))
        .enumerate()
        .map(|(index, segment)| {
            let (window, error) = match segment.window() {
                Ok(w) => (Some(w.to_string()), None),
                Err(e) => (None, Some(e.to_string())),
            };
            SegmentCheck {
                index,
                window,
                error,
                audio_present: segment.audio_path.is_file(),
                subtitle_valid: segment
                    .subtitle_path
                    .as_deref()
                    .map(is_valid_subtitle_file),
                timestamp: segment.timestamp,
            }
        })
        .collect();

    Ok(Validation::Segments {
        path: path.to_path_buf(),
        segments: checks,
    })
}
