use std::path::PathBuf;

use narramix_common::{Diagnostics, Stage};
use narramix_processing_core::compositor::{compose_overlay, OverlayMix, OverlaySegment};
use narramix_project_model::media::{AudioAsset, MediaInfo};
use narramix_project_model::options::VolumeOptions;
use narramix_project_model::segment::{parse_segments, NarrationSegment};
use narramix_project_model::track::{PieceKind, TrackRole};

fn fixture_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
        .join("fixtures")
        .join("overlay-scenario")
}

fn load_fixture_segments() -> Vec<NarrationSegment> {
    let content = std::fs::read_to_string(fixture_dir().join("segments.json"))
        .expect("fixture segments should be readable");
    parse_segments(&content).expect("fixture segments should parse")
}

fn source_video() -> MediaInfo {
    MediaInfo {
        path: PathBuf::from("source.mp4"),
        duration_secs: 90.0,
        width: Some(1280),
        height: Some(720),
        has_audio: true,
    }
}

/// Mirror what the merge operation does before composing: drop segments
/// whose timestamps do not parse, recording a diagnostic for each.
fn prepare(segments: &[NarrationSegment], diagnostics: &mut Diagnostics) -> Vec<OverlaySegment> {
    segments
        .iter()
        .enumerate()
        .filter_map(|(index, segment)| match segment.window() {
            Ok(window) => Some(OverlaySegment {
                index,
                window,
                audio: Some(AudioAsset {
                    path: segment.audio_path.clone(),
                    duration_secs: window.duration(),
                }),
            }),
            Err(err) => {
                diagnostics.warn(Stage::Segment, format!("segment {}: {err}", index + 1));
                None
            }
        })
        .collect()
}

#[test]
fn malformed_timestamp_drops_only_that_segment() {
    let segments = load_fixture_segments();
    assert_eq!(segments.len(), 3);

    let mut diagnostics = Diagnostics::new();
    let prepared = prepare(&segments, &mut diagnostics);
    assert_eq!(prepared.len(), 2);
    assert_eq!(diagnostics.for_stage(Stage::Segment).count(), 1);

    let video = source_video();
    let mix = OverlayMix {
        video: &video,
        segments: &prepared,
        bgm: None,
        volumes: VolumeOptions::default(),
        mute_original: true,
    };
    let plan = compose_overlay(&mix, &mut diagnostics);

    assert_eq!(plan.duration_secs, 90.0);
    assert_eq!(plan.tracks_with_role(TrackRole::Narration).count(), 2);

    let original = plan.original_track().expect("original audio kept");
    let signature = original
        .splice
        .iter()
        .map(|piece| {
            let kind = match piece.kind {
                PieceKind::Keep => "keep",
                PieceKind::Silence => "mute",
            };
            format!("{kind}:{:.3}-{:.3}", piece.range.start, piece.range.end)
        })
        .collect::<Vec<_>>()
        .join(" ");
    assert_eq!(
        signature,
        "keep:0.000-10.000 mute:10.000-15.500 keep:15.500-65.250 mute:65.250-72.000 keep:72.000-90.000"
    );
}

#[test]
fn narration_offsets_follow_window_starts() {
    let segments = load_fixture_segments();
    let mut diagnostics = Diagnostics::new();
    let prepared = prepare(&segments, &mut diagnostics);

    let video = source_video();
    let mix = OverlayMix {
        video: &video,
        segments: &prepared,
        bgm: None,
        volumes: VolumeOptions::default(),
        mute_original: true,
    };
    let plan = compose_overlay(&mix, &mut diagnostics);

    let offsets: Vec<f64> = plan
        .tracks_with_role(TrackRole::Narration)
        .map(|t| t.start_offset)
        .collect();
    assert_eq!(offsets, vec![10.0, 65.25]);
    for track in plan.tracks_with_role(TrackRole::Narration) {
        assert!(track.timeline_end().unwrap() <= plan.duration_secs);
    }
}
