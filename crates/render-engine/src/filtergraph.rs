//! ffmpeg filtergraph generation.
//!
//! Input 0 is always the primary video. Every file-backed track gets its
//! own input; looped tracks are read with `-stream_loop -1` and trimmed in
//! the graph. Tracks are summed with `amix ... normalize=0`, then padded
//! and trimmed to the plan duration, so the output audio length always
//! equals the video length.

use std::path::{Path, PathBuf};

use narramix_processing_core::volume::needs_gain;
use narramix_processing_core::CompositePlan;
use narramix_project_model::track::{AudioTrackSpec, PieceKind, SplicePiece, TrackSource};

use crate::subtitle::PositionedClip;

/// Sample rate of generated silence.
const SILENCE_SAMPLE_RATE: u32 = 48_000;

/// One `-i` input after the primary video.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaInput {
    pub path: PathBuf,
    /// Read with `-stream_loop -1`.
    pub loop_forever: bool,
}

/// Complete filtergraph plus the stream labels to map.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodeGraph {
    /// Extra inputs, numbered from 1.
    pub inputs: Vec<MediaInput>,
    pub filter_complex: String,
    pub video_map: String,
    pub audio_map: String,
}

/// Build the filtergraph for a plan and its subtitle clips.
///
/// Subtitle texts are read from `text_dir` (see [`cue_text_path`]).
pub fn build_graph(plan: &CompositePlan, clips: &[PositionedClip], text_dir: &Path) -> EncodeGraph {
    let mut inputs = Vec::new();
    let mut statements = audio_statements(plan, &mut inputs);

    let video_map = if clips.is_empty() {
        "0:v".to_string()
    } else {
        let chain = clips
            .iter()
            .enumerate()
            .map(|(i, clip)| drawtext_filter(clip, &cue_text_path(text_dir, i)))
            .collect::<Vec<_>>()
            .join(",");
        statements.push(format!("[0:v]{chain}[vout]"));
        "[vout]".to_string()
    };

    EncodeGraph {
        inputs,
        filter_complex: statements.join(";"),
        video_map,
        audio_map: "[aout]".to_string(),
    }
}

/// File holding the text of subtitle clip `index`.
pub fn cue_text_path(dir: &Path, index: usize) -> PathBuf {
    dir.join(format!("cue-{index:04}.txt"))
}

fn audio_statements(plan: &CompositePlan, inputs: &mut Vec<MediaInput>) -> Vec<String> {
    let duration = num(plan.duration_secs);
    let mut statements = Vec::new();

    if plan.tracks.is_empty() {
        statements.push(format!(
            "anullsrc=r={SILENCE_SAMPLE_RATE}:cl=stereo,atrim=end={duration}[aout]"
        ));
        return statements;
    }

    for (i, track) in plan.tracks.iter().enumerate() {
        let source = match &track.source {
            TrackSource::VideoAudio => "0:a".to_string(),
            TrackSource::File(path) => {
                inputs.push(MediaInput {
                    path: path.clone(),
                    loop_forever: track.loop_to.is_some(),
                });
                format!("{}:a", inputs.len())
            }
        };
        statements.extend(track_statements(i, track, &source));
    }

    let labels: String = (0..plan.tracks.len()).map(|i| format!("[t{i}]")).collect();
    if plan.tracks.len() == 1 {
        statements.push(format!("{labels}apad,atrim=end={duration}[aout]"));
    } else {
        statements.push(format!(
            "{labels}amix=inputs={}:duration=longest:dropout_transition=0:normalize=0,apad,atrim=end={duration}[aout]",
            plan.tracks.len()
        ));
    }
    statements
}

/// Statements producing `[t{index}]` for one track.
fn track_statements(index: usize, track: &AudioTrackSpec, source: &str) -> Vec<String> {
    let filters = track_filters(track);
    let chain = if filters.is_empty() {
        "anull".to_string()
    } else {
        filters.join(",")
    };

    match track.splice.as_slice() {
        [] => vec![format!("[{source}]{chain}[t{index}]")],
        [piece] => vec![format!(
            "[{source}]{},{chain}[t{index}]",
            piece_filter(piece)
        )],
        pieces => {
            let k = pieces.len();
            let split_labels: String = (0..k).map(|j| format!("[s{index}_{j}]")).collect();
            let mut statements = vec![format!("[{source}]asplit={k}{split_labels}")];
            for (j, piece) in pieces.iter().enumerate() {
                statements.push(format!(
                    "[s{index}_{j}]{}[p{index}_{j}]",
                    piece_filter(piece)
                ));
            }
            let piece_labels: String = (0..k).map(|j| format!("[p{index}_{j}]")).collect();
            statements.push(format!(
                "{piece_labels}concat=n={k}:v=0:a=1,{chain}[t{index}]"
            ));
            statements
        }
    }
}

fn piece_filter(piece: &SplicePiece) -> String {
    let trim = format!(
        "atrim=start={}:end={},asetpts=PTS-STARTPTS",
        num(piece.range.start),
        num(piece.range.end)
    );
    match piece.kind {
        PieceKind::Keep => trim,
        PieceKind::Silence => format!("{trim},volume=0"),
    }
}

fn track_filters(track: &AudioTrackSpec) -> Vec<String> {
    let mut filters = Vec::new();

    if needs_gain(track.gain) {
        filters.push(format!("volume={}", num(track.gain)));
    }

    if let Some(loop_to) = track.loop_to {
        filters.push(format!("atrim=end={}", num(loop_to)));
        filters.push("asetpts=PTS-STARTPTS".to_string());
    }

    if let Some(fade) = track.fade_out.filter(|f| *f > 0.0) {
        let end = track
            .loop_to
            .or(track.natural_duration)
            .unwrap_or(fade);
        filters.push(format!(
            "afade=t=out:st={}:d={}",
            num((end - fade).max(0.0)),
            num(fade)
        ));
    }

    if track.start_offset > 0.0 {
        let delay_ms = (track.start_offset * 1000.0).round() as u64;
        filters.push(format!("adelay={delay_ms}:all=1"));
    }

    filters
}

/// `drawtext` filter for one clip, horizontally centred.
pub fn drawtext_filter(clip: &PositionedClip, text_file: &Path) -> String {
    let style = &clip.style;
    let mut options = vec![
        format!("textfile='{}'", escape_path(text_file)),
        "expansion=none".to_string(),
        format!("fontsize={}", style.font_size),
        format!("fontcolor={}", style.font_color),
    ];
    if let Some(font) = &style.font_file {
        options.push(format!("fontfile='{}'", escape_path(font)));
    }
    if let Some(border) = &style.border {
        options.push(format!("borderw={}", num(border.width)));
        options.push(format!("bordercolor={}", border.color));
    }
    if let Some(box_color) = &style.box_color {
        options.push("box=1".to_string());
        options.push(format!("boxcolor={box_color}"));
        options.push("boxborderw=8".to_string());
    }
    options.push("x=(w-text_w)/2".to_string());
    options.push(format!("y={}", num(clip.y.round())));
    options.push(format!(
        "enable='between(t,{},{})'",
        num(clip.start),
        num(clip.end)
    ));
    format!("drawtext={}", options.join(":"))
}

/// Escape a path for use inside a single-quoted filter option.
fn escape_path(path: &Path) -> String {
    path.to_string_lossy()
        .replace('\\', "/")
        .replace('\'', "'\\''")
        .replace(':', "\\:")
}

/// Format a number with at most three decimals and no trailing zeros.
pub(crate) fn num(value: f64) -> String {
    let formatted = format!("{value:.3}");
    let trimmed = formatted.trim_end_matches('0').trim_end_matches('.');
    if trimmed.is_empty() || trimmed == "-" {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subtitle::{Border, DrawtextStyle};
    use narramix_project_model::track::TrackRole;
    use narramix_project_model::window::TimeWindow;
    use proptest::prelude::*;

    fn window(start: f64, end: f64) -> TimeWindow {
        TimeWindow::new(start, end).unwrap()
    }

    fn plan(duration: f64, tracks: Vec<AudioTrackSpec>) -> CompositePlan {
        CompositePlan {
            duration_secs: duration,
            tracks,
            notes: Vec::new(),
        }
    }

    fn file(name: &str) -> TrackSource {
        TrackSource::File(PathBuf::from(name))
    }

    #[test]
    fn test_num_formatting() {
        assert_eq!(num(10.0), "10");
        assert_eq!(num(15.5), "15.5");
        assert_eq!(num(0.7), "0.7");
        assert_eq!(num(0.0), "0");
        assert_eq!(num(1.23456), "1.235");
    }

    #[test]
    fn test_empty_plan_is_silence() {
        let graph = build_graph(&plan(12.0, Vec::new()), &[], Path::new("/tmp"));
        assert_eq!(
            graph.filter_complex,
            "anullsrc=r=48000:cl=stereo,atrim=end=12[aout]"
        );
        assert!(graph.inputs.is_empty());
        assert_eq!(graph.video_map, "0:v");
    }

    #[test]
    fn test_single_unity_voice_track_has_no_gain() {
        let track = AudioTrackSpec::new(TrackRole::Narration, file("voice.mp3"), 1.0, 0.0)
            .with_natural_duration(30.0);
        let graph = build_graph(&plan(30.0, vec![track]), &[], Path::new("/tmp"));
        assert_eq!(
            graph.filter_complex,
            "[1:a]anull[t0];[t0]apad,atrim=end=30[aout]"
        );
        assert!(!graph.filter_complex.contains("volume"));
        assert!(!graph.filter_complex.contains("amix"));
    }

    #[test]
    fn test_bgm_is_looped_trimmed_and_faded() {
        let narration = AudioTrackSpec::new(TrackRole::Narration, file("voice.mp3"), 1.2, 0.0);
        let bgm = AudioTrackSpec::new(TrackRole::Bgm, file("bgm.mp3"), 0.3, 0.0)
            .with_natural_duration(20.0)
            .looped_to(90.0)
            .with_fade_out(3.0);
        let graph = build_graph(&plan(90.0, vec![narration, bgm]), &[], Path::new("/tmp"));

        assert_eq!(graph.inputs.len(), 2);
        assert!(!graph.inputs[0].loop_forever);
        assert!(graph.inputs[1].loop_forever);
        assert!(graph.filter_complex.contains("[1:a]volume=1.2[t0]"));
        assert!(graph
            .filter_complex
            .contains("[2:a]volume=0.3,atrim=end=90,asetpts=PTS-STARTPTS,afade=t=out:st=87:d=3[t1]"));
        assert!(graph.filter_complex.contains(
            "[t0][t1]amix=inputs=2:duration=longest:dropout_transition=0:normalize=0,apad,atrim=end=90[aout]"
        ));
    }

    #[test]
    fn test_spliced_original_and_delayed_narration() {
        let original = AudioTrackSpec::new(TrackRole::Original, TrackSource::VideoAudio, 0.7, 0.0)
            .with_splice(vec![
                SplicePiece::keep(window(0.0, 10.0)),
                SplicePiece::silence(window(10.0, 15.5)),
                SplicePiece::keep(window(15.5, 90.0)),
            ]);
        let narration =
            AudioTrackSpec::new(TrackRole::Narration, file("seg1.mp3"), 1.0, 10.0);
        let graph = build_graph(&plan(90.0, vec![original, narration]), &[], Path::new("/tmp"));
        let fc = &graph.filter_complex;

        assert!(fc.contains("[0:a]asplit=3[s0_0][s0_1][s0_2]"));
        assert!(fc.contains("[s0_0]atrim=start=0:end=10,asetpts=PTS-STARTPTS[p0_0]"));
        assert!(fc.contains("[s0_1]atrim=start=10:end=15.5,asetpts=PTS-STARTPTS,volume=0[p0_1]"));
        assert!(fc.contains("[p0_0][p0_1][p0_2]concat=n=3:v=0:a=1,volume=0.7[t0]"));
        assert!(fc.contains("[1:a]adelay=10000:all=1[t1]"));
        assert_eq!(graph.inputs.len(), 1);
    }

    #[test]
    fn test_single_silence_piece_skips_concat() {
        let original = AudioTrackSpec::new(TrackRole::Original, TrackSource::VideoAudio, 1.0, 0.0)
            .with_splice(vec![SplicePiece::silence(window(0.0, 8.0))]);
        let graph = build_graph(&plan(8.0, vec![original]), &[], Path::new("/tmp"));
        assert!(graph
            .filter_complex
            .starts_with("[0:a]atrim=start=0:end=8,asetpts=PTS-STARTPTS,volume=0,anull[t0]"));
        assert!(!graph.filter_complex.contains("concat"));
    }

    #[test]
    fn test_drawtext_chain() {
        let clip = PositionedClip {
            text: "Hello".to_string(),
            start: 1.0,
            end: 3.5,
            duration: 2.5,
            y: 978.4,
            width: 100.0,
            height: 48.0,
            style: DrawtextStyle {
                font_file: Some(PathBuf::from("/fonts/Sans.ttf")),
                font_size: 40,
                font_color: "0xFFFFFF".to_string(),
                border: Some(Border {
                    color: "0x000000".to_string(),
                    width: 1.0,
                }),
                box_color: None,
            },
        };
        let graph = build_graph(&plan(5.0, Vec::new()), &[clip], Path::new("/scratch"));
        assert_eq!(graph.video_map, "[vout]");
        assert!(graph.filter_complex.contains(
            "[0:v]drawtext=textfile='/scratch/cue-0000.txt':expansion=none:fontsize=40:fontcolor=0xFFFFFF:fontfile='/fonts/Sans.ttf':borderw=1:bordercolor=0x000000:x=(w-text_w)/2:y=978:enable='between(t,1,3.5)'[vout]"
        ));
    }

    #[test]
    fn test_escape_path() {
        assert_eq!(escape_path(Path::new("C:\\Fonts\\a'b.ttf")), "C\\:/Fonts/a'\\''b.ttf");
    }

    proptest! {
        #[test]
        fn prop_spliced_track_concats_every_piece(
            starts in proptest::collection::vec(0.0f64..80.0, 1..6),
            len in 0.5f64..8.0,
        ) {
            let windows: Vec<TimeWindow> = starts
                .iter()
                .map(|&s| window(s, s + len))
                .collect();
            let pieces = narramix_processing_core::splice::mute_splice(&windows, 90.0);
            let k = pieces.len();
            let original = AudioTrackSpec::new(TrackRole::Original, TrackSource::VideoAudio, 0.7, 0.0)
                .with_splice(pieces);
            let graph = build_graph(&plan(90.0, vec![original]), &[], Path::new("/tmp"));

            if k > 1 {
                let needle = format!("concat=n={k}:v=0:a=1");
                prop_assert!(graph.filter_complex.contains(&needle));
            }
            prop_assert!(graph.filter_complex.ends_with("atrim=end=90[aout]"));
        }
    }
}
