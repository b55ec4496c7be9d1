//! Subtitle placement: vertical position on the frame and time anchoring
//! of per-segment cues.

use narramix_project_model::cue::SubtitleCue;
use narramix_project_model::defaults;
use narramix_project_model::options::SubtitlePlacement;
use narramix_project_model::window::TimeWindow;

/// Top edge (pixels from the frame top) of a text block of height
/// `text_h` in a frame of height `frame_h`.
///
/// - bottom: `0.95·H − h`, floored at 0
/// - top: `0.05·H`
/// - center: `(H − h) / 2`, floored at 0
/// - custom: `(H − h) · p / 100`, kept within a 10px margin of both
///   edges; the top margin wins when the block is taller than the frame.
pub fn subtitle_y(placement: SubtitlePlacement, frame_h: f64, text_h: f64) -> f64 {
    match placement {
        SubtitlePlacement::Bottom => (frame_h * 0.95 - text_h).max(0.0),
        SubtitlePlacement::Top => frame_h * 0.05,
        SubtitlePlacement::Center => ((frame_h - text_h) / 2.0).max(0.0),
        SubtitlePlacement::Custom { percent } => {
            let margin = defaults::SUBTITLE_MARGIN_PX;
            let max_y = frame_h - text_h - margin;
            let y = (frame_h - text_h) * (percent / 100.0);
            y.min(max_y).max(margin)
        }
    }
}

/// Widest a subtitle line may be in a frame of width `frame_w`.
pub fn max_text_width(frame_w: f64) -> f64 {
    frame_w * defaults::SUBTITLE_MAX_WIDTH_RATIO
}

/// Place a segment's cues on the video timeline.
///
/// A subtitle file whose cues all lie inside the segment window (within
/// [`defaults::DURATION_TOLERANCE_SECS`]) is taken as already absolute
/// and clipped to the window.
/// Otherwise cue times are relative to the segment start: they are
/// shifted by `window.start` and clipped to `window.end`, and cues that
/// start past the window are dropped.
pub fn anchor_segment_cues(cues: &[SubtitleCue], window: TimeWindow) -> Vec<SubtitleCue> {
    let tolerance = defaults::DURATION_TOLERANCE_SECS;
    let absolute = !cues.is_empty()
        && cues.iter().all(|cue| {
            cue.window.start >= window.start - tolerance && cue.window.end <= window.end + tolerance
        });

    if absolute {
        return cues
            .iter()
            .filter_map(|cue| {
                let start = cue.window.start.max(window.start);
                let end = cue.window.end.min(window.end);
                (start < end).then(|| SubtitleCue::new(TimeWindow { start, end }, cue.text.clone()))
            })
            .collect();
    }

    cues.iter()
        .filter_map(|cue| {
            let shifted = cue.window.shifted(window.start);
            if shifted.start >= window.end {
                return None;
            }
            Some(SubtitleCue::new(
                TimeWindow {
                    start: shifted.start,
                    end: shifted.end.min(window.end),
                },
                cue.text.clone(),
            ))
        })
        .collect()
}
