//! Mute splicing.
//!
//! Rebuilds a continuous track as an ordered list of keep/silence pieces
//! so that narration windows are silent while the total duration stays
//! equal to the source.

use narramix_project_model::track::{PieceKind, SplicePiece};
use narramix_project_model::window::TimeWindow;

/// Clip windows to `[0, total)`, sort by start, and merge overlaps.
///
/// Windows that touch but do not overlap stay separate.
pub fn normalize_windows(windows: &[TimeWindow], total: f64) -> Vec<TimeWindow> {
    let mut clipped: Vec<TimeWindow> = windows.iter().filter_map(|w| w.clip_to(total)).collect();
    clipped.sort_by(|a, b| a.start.total_cmp(&b.start));

    let mut merged: Vec<TimeWindow> = Vec::with_capacity(clipped.len());
    for window in clipped {
        match merged.last_mut() {
            Some(last) if window.start < last.end => {
                last.end = last.end.max(window.end);
            }
            _ => merged.push(window),
        }
    }
    merged
}

/// Count window pairs whose interiors overlap.
pub fn count_overlaps(windows: &[TimeWindow]) -> usize {
    let mut sorted = windows.to_vec();
    sorted.sort_by(|a, b| a.start.total_cmp(&b.start));
    let mut count = 0;
    let mut reach = f64::NEG_INFINITY;
    for window in sorted {
        if window.start < reach {
            count += 1;
        }
        reach = reach.max(window.end);
    }
    count
}

/// Build keep/silence pieces covering `[0, total)`.
///
/// Pieces are contiguous and ordered; silence pieces match the (normalized)
/// mute windows exactly. Returns an empty list when `total <= 0`.
pub fn mute_splice(windows: &[TimeWindow], total: f64) -> Vec<SplicePiece> {
    if !(total > 0.0) {
        return Vec::new();
    }

    let mut pieces = Vec::new();
    let mut last_end = 0.0f64;

    for window in normalize_windows(windows, total) {
        if window.start > last_end {
            pieces.push(SplicePiece::keep(TimeWindow {
                start: last_end,
                end: window.start,
            }));
        }
        pieces.push(SplicePiece::silence(window));
        last_end = window.end;
    }

    if last_end < total {
        pieces.push(SplicePiece::keep(TimeWindow {
            start: last_end,
            end: total,
        }));
    }

    pieces
}

/// Whether pieces are a plain pass-through (a single keep piece).
pub fn is_passthrough(pieces: &[SplicePiece]) -> bool {
    matches!(pieces, [only] if only.kind == PieceKind::Keep)
}

/// Amplitude multiplier at source time `t`, or `None` outside the pieces.
pub fn gain_at(pieces: &[SplicePiece], t: f64) -> Option<f64> {
    pieces
        .iter()
        .find(|piece| t >= piece.range.start && t < piece.range.end)
        .map(SplicePiece::gain)
}

/// Sum of piece durations.
pub fn spliced_duration(pieces: &[SplicePiece]) -> f64 {
    pieces.iter().map(|piece| piece.range.duration()).sum()
}
