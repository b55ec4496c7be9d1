//! ffmpeg/ffprobe subprocess backend.

use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use narramix_common::config::MediaToolsConfig;
use narramix_common::error::{NarramixError, NarramixResult};
use narramix_project_model::media::MediaInfo;
use serde::Deserialize;

use crate::backend::{EncodeJob, EncodeProgress, EncodeStage, MediaBackend, ProgressCallback};
use crate::filtergraph::{self, num};

/// Sample rate used for loudness analysis chunks.
const ANALYSIS_SAMPLE_RATE: u32 = 16_000;

/// Media backend driving the `ffmpeg` and `ffprobe` binaries.
#[derive(Debug, Clone)]
pub struct FfmpegBackend {
    ffmpeg: PathBuf,
    ffprobe: PathBuf,
}

impl Default for FfmpegBackend {
    fn default() -> Self {
        Self::new(&MediaToolsConfig::default())
    }
}

impl FfmpegBackend {
    pub fn new(tools: &MediaToolsConfig) -> Self {
        Self {
            ffmpeg: tools.ffmpeg.clone(),
            ffprobe: tools.ffprobe.clone(),
        }
    }

    /// Whether `ffprobe` can be run.
    pub fn probe_available(&self) -> bool {
        command_exists(&self.ffprobe)
    }

    fn run_ffmpeg(
        &self,
        args: &[String],
        expected_duration_secs: f64,
        progress: Option<ProgressCallback>,
    ) -> NarramixResult<()> {
        tracing::debug!(args = ?args, "Running ffmpeg");
        let mut cmd = Command::new(&self.ffmpeg);
        cmd.args(args).stdout(Stdio::piped()).stderr(Stdio::piped());

        let start = std::time::Instant::now();
        let mut child = cmd
            .spawn()
            .map_err(|e| NarramixError::encode(format!("Failed to start ffmpeg: {e}")))?;

        tracing::info!(
            pid = child.id(),
            args_len = args.len(),
            expected_duration_secs,
            "ffmpeg process started"
        );

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| NarramixError::encode("Failed to capture ffmpeg stdout"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| NarramixError::encode("Failed to capture ffmpeg stderr"))?;

        // ffmpeg blocks once the stderr pipe fills up.
        let stderr_task = std::thread::spawn(move || -> String {
            let mut reader = BufReader::new(stderr);
            let mut output = String::new();
            match reader.read_to_string(&mut output) {
                Ok(_) => output,
                Err(err) => format!("<failed to read ffmpeg stderr: {err}>"),
            }
        });

        let mut reader = BufReader::new(stdout);
        let mut line = String::new();
        let mut latest = ProgressState::default();
        let mut last_progress_secs = 0.0f64;
        let mut last_progress_wall = std::time::Instant::now();
        loop {
            line.clear();
            let bytes = reader
                .read_line(&mut line)
                .map_err(|e| NarramixError::encode(format!("Failed reading ffmpeg progress: {e}")))?;
            if bytes == 0 {
                break;
            }

            let Some((key, value)) = line.trim().split_once('=') else {
                continue;
            };
            latest.update(key, value);
            if key != "progress" {
                continue;
            }

            if latest.out_time_secs > last_progress_secs + 0.001 {
                last_progress_secs = latest.out_time_secs;
                last_progress_wall = std::time::Instant::now();
            }
            if let Some(cb) = &progress {
                cb(progress_report(
                    &latest,
                    expected_duration_secs,
                    start.elapsed().as_secs_f64(),
                ));
            }
            if last_progress_wall.elapsed().as_secs() >= 10 {
                tracing::warn!(
                    out_time_secs = latest.out_time_secs,
                    elapsed_secs = start.elapsed().as_secs_f64(),
                    "No ffmpeg progress advancement for 10s"
                );
                last_progress_wall = std::time::Instant::now();
            }
        }

        let status = child
            .wait()
            .map_err(|e| NarramixError::encode(format!("Failed to wait on ffmpeg: {e}")))?;
        let stderr_output = stderr_task
            .join()
            .unwrap_or_else(|_| "<failed to join stderr reader>".to_string());

        if !status.success() {
            return Err(NarramixError::encode(format!(
                "ffmpeg failed (status {}): {}",
                status,
                stderr_output.trim()
            )));
        }

        if let Some(cb) = &progress {
            cb(EncodeProgress {
                progress: 1.0,
                out_time_secs: expected_duration_secs,
                eta_secs: 0.0,
                stage: EncodeStage::Complete,
            });
        }
        Ok(())
    }
}

impl MediaBackend for FfmpegBackend {
    fn probe(&self, path: &Path) -> NarramixResult<MediaInfo> {
        NarramixError::require_file(path)?;
        let output = Command::new(&self.ffprobe)
            .args([
                "-v",
                "error",
                "-show_entries",
                "format=duration:stream=codec_type,width,height",
                "-of",
                "json",
            ])
            .arg(path)
            .output()
            .map_err(|e| NarramixError::media(format!("Failed to run ffprobe: {e}")))?;

        if !output.status.success() {
            return Err(NarramixError::media(format!(
                "ffprobe failed for {}: {}",
                path.display(),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let info = parse_probe_output(path, &String::from_utf8_lossy(&output.stdout))?;
        tracing::debug!(
            path = %path.display(),
            duration_secs = info.duration_secs,
            has_audio = info.has_audio,
            "Media probed"
        );
        Ok(info)
    }

    fn decode_audio(&self, source: &Path, max_secs: f64, dest: &Path) -> NarramixResult<()> {
        NarramixError::require_file(source)?;
        let output = Command::new(&self.ffmpeg)
            .args(["-y", "-hide_banner", "-nostdin", "-v", "error", "-i"])
            .arg(source)
            .args(["-vn", "-map", "0:a:0", "-t"])
            .arg(num(max_secs))
            .args(["-ac", "1", "-ar"])
            .arg(ANALYSIS_SAMPLE_RATE.to_string())
            .args(["-acodec", "pcm_s16le", "-f", "wav"])
            .arg(dest)
            .output()
            .map_err(|e| NarramixError::audio(format!("Failed to run ffmpeg: {e}")))?;

        if !output.status.success() {
            return Err(NarramixError::audio(format!(
                "audio decode failed for {}: {}",
                source.display(),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(())
    }

    fn encode(&mut self, job: &EncodeJob, progress: Option<ProgressCallback>) -> NarramixResult<()> {
        let started = std::time::Instant::now();
        let text_dir = tempfile::Builder::new()
            .prefix("narramix-cues")
            .tempdir()
            .map_err(|e| NarramixError::encode(format!("Failed to create scratch dir: {e}")))?;
        for (i, clip) in job.subtitles.iter().enumerate() {
            std::fs::write(filtergraph::cue_text_path(text_dir.path(), i), &clip.text)?;
        }

        let args = build_encode_args(job, text_dir.path());

        if let Some(cb) = &progress {
            cb(EncodeProgress {
                progress: 0.0,
                out_time_secs: 0.0,
                eta_secs: 0.0,
                stage: EncodeStage::Preparing,
            });
        }

        self.run_ffmpeg(&args, job.plan.duration_secs, progress)?;
        tracing::info!(
            elapsed_secs = started.elapsed().as_secs_f64(),
            output = %job.output.display(),
            "Encode finished"
        );
        Ok(())
    }

    fn is_available(&self) -> bool {
        command_exists(&self.ffmpeg)
    }

    fn name(&self) -> &str {
        "ffmpeg"
    }
}

/// Full ffmpeg argument list for an encode job.
pub fn build_encode_args(job: &EncodeJob, text_dir: &Path) -> Vec<String> {
    let graph = filtergraph::build_graph(&job.plan, &job.subtitles, text_dir);

    let mut args: Vec<String> = [
        "-y",
        "-hide_banner",
        "-nostdin",
        "-nostats",
        "-progress",
        "pipe:1",
        "-i",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();
    args.push(job.video.to_string_lossy().into_owned());

    for input in &graph.inputs {
        if input.loop_forever {
            args.push("-stream_loop".to_string());
            args.push("-1".to_string());
        }
        args.push("-i".to_string());
        args.push(input.path.to_string_lossy().into_owned());
    }

    args.push("-filter_complex".to_string());
    args.push(graph.filter_complex);
    args.push("-map".to_string());
    args.push(graph.video_map);
    args.push("-map".to_string());
    args.push(graph.audio_map);
    args.extend(codec_args(job.fps));
    args.push("-threads".to_string());
    args.push(job.threads.max(1).to_string());
    args.push("-t".to_string());
    args.push(num(job.plan.duration_secs));
    args.push(job.output.to_string_lossy().into_owned());
    args
}

fn codec_args(fps: u32) -> Vec<String> {
    let fps = fps.max(1).to_string();
    [
        "-c:v",
        "libx264",
        "-preset",
        "medium",
        "-profile:v",
        "high",
        "-pix_fmt",
        "yuv420p",
        "-r",
        fps.as_str(),
        "-c:a",
        "aac",
        "-b:a",
        "192k",
        "-movflags",
        "+faststart",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    format: Option<ProbeFormat>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

fn parse_probe_output(path: &Path, json: &str) -> NarramixResult<MediaInfo> {
    let probe: ProbeOutput = serde_json::from_str(json)?;
    let duration_secs = probe
        .format
        .and_then(|f| f.duration)
        .and_then(|d| d.trim().parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d > 0.0)
        .ok_or_else(|| {
            NarramixError::media(format!("{} has no usable duration", path.display()))
        })?;

    let video = probe
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"));
    let has_audio = probe
        .streams
        .iter()
        .any(|s| s.codec_type.as_deref() == Some("audio"));

    Ok(MediaInfo {
        path: path.to_path_buf(),
        duration_secs,
        width: video.and_then(|s| s.width),
        height: video.and_then(|s| s.height),
        has_audio,
    })
}

fn command_exists(binary: &Path) -> bool {
    Command::new(binary)
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

#[derive(Debug, Default)]
struct ProgressState {
    out_time_secs: f64,
    complete: bool,
}

impl ProgressState {
    fn update(&mut self, key: &str, value: &str) {
        match key {
            // ffmpeg reports microseconds under both keys.
            "out_time_ms" | "out_time_us" => {
                if let Ok(us) = value.parse::<f64>() {
                    self.out_time_secs = us / 1_000_000.0;
                }
            }
            "progress" => {
                self.complete = value == "end";
            }
            _ => {}
        }
    }
}

fn progress_report(
    state: &ProgressState,
    expected_duration_secs: f64,
    elapsed_secs: f64,
) -> EncodeProgress {
    let progress = if expected_duration_secs <= 0.0 {
        0.0
    } else {
        (state.out_time_secs / expected_duration_secs).clamp(0.0, 1.0)
    };

    let eta_secs = if progress > 0.0 {
        (elapsed_secs / progress) - elapsed_secs
    } else {
        0.0
    }
    .max(0.0);

    EncodeProgress {
        progress: if state.complete { 1.0 } else { progress },
        out_time_secs: state.out_time_secs,
        eta_secs,
        stage: if state.complete {
            EncodeStage::Finalizing
        } else {
            EncodeStage::Encoding
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use narramix_processing_core::CompositePlan;
    use narramix_project_model::track::{AudioTrackSpec, TrackRole, TrackSource};

    fn job(tracks: Vec<AudioTrackSpec>) -> EncodeJob {
        EncodeJob {
            video: PathBuf::from("/in/video.mp4"),
            output: PathBuf::from("/out/final.mp4"),
            plan: CompositePlan {
                duration_secs: 90.0,
                tracks,
                notes: Vec::new(),
            },
            subtitles: Vec::new(),
            threads: 4,
            fps: 30,
        }
    }

    #[test]
    fn test_parse_probe_output_video() {
        let json = r#"{
            "streams": [
                {"codec_type": "video", "width": 1920, "height": 1080},
                {"codec_type": "audio"}
            ],
            "format": {"duration": "90.023000"}
        }"#;
        let info = parse_probe_output(Path::new("v.mp4"), json).unwrap();
        assert!((info.duration_secs - 90.023).abs() < 1e-9);
        assert_eq!(info.width, Some(1920));
        assert!(info.has_audio);
    }

    #[test]
    fn test_parse_probe_output_audio_only() {
        let json = r#"{"streams": [{"codec_type": "audio"}], "format": {"duration": "5.2"}}"#;
        let info = parse_probe_output(Path::new("a.mp3"), json).unwrap();
        assert_eq!(info.frame_size(), None);
        assert!(info.has_audio);
    }

    #[test]
    fn test_parse_probe_output_without_duration_fails() {
        let json = r#"{"streams": [], "format": {}}"#;
        let err = parse_probe_output(Path::new("x.bin"), json).unwrap_err();
        assert!(matches!(err, NarramixError::Media { .. }));
    }

    #[test]
    fn test_encode_args_layout() {
        let bgm = AudioTrackSpec::new(
            TrackRole::Bgm,
            TrackSource::File(PathBuf::from("/in/bgm.mp3")),
            0.3,
            0.0,
        )
        .looped_to(90.0);
        let args = build_encode_args(&job(vec![bgm]), Path::new("/tmp/cues"));
        let joined = args.join(" ");

        assert!(joined.starts_with("-y -hide_banner -nostdin -nostats -progress pipe:1 -i /in/video.mp4"));
        assert!(joined.contains("-stream_loop -1 -i /in/bgm.mp3"));
        assert!(joined.contains("-map 0:v -map [aout]"));
        assert!(joined.contains("-c:v libx264"));
        assert!(joined.contains("-c:a aac"));
        assert!(joined.contains("-r 30"));
        assert!(joined.contains("-threads 4"));
        assert!(joined.ends_with("-t 90 /out/final.mp4"));
    }

    #[test]
    fn test_progress_state_and_report() {
        let mut state = ProgressState::default();
        state.update("out_time_us", "45000000");
        state.update("progress", "continue");
        let report = progress_report(&state, 90.0, 10.0);
        assert!((report.progress - 0.5).abs() < 1e-9);
        assert!((report.eta_secs - 10.0).abs() < 1e-9);
        assert_eq!(report.stage, EncodeStage::Encoding);

        state.update("progress", "end");
        let report = progress_report(&state, 90.0, 20.0);
        assert_eq!(report.progress, 1.0);
        assert_eq!(report.stage, EncodeStage::Finalizing);
    }
}
