//! Subtitle rendering.
//!
//! Turns timed cues into positioned text clips. The text-rendering
//! collaborator validates styling and measures the rendered block; a
//! failed attempt is retried once with a minimal style (text, font, size,
//! colour) before the cue is dropped.

use std::path::PathBuf;

use narramix_common::error::{NarramixError, NarramixResult};
use narramix_common::{Diagnostics, Stage};
use narramix_processing_core::placement::{max_text_width, subtitle_y};
use narramix_processing_core::wrap::{wrap_text, GlyphMetrics};
use narramix_project_model::cue::SubtitleCue;
use narramix_project_model::media::FrameSize;
use narramix_project_model::options::{SubtitlePlacement, SubtitleStyle};
use serde::{Deserialize, Serialize};

/// Requested text styling for one render attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct TextStyle {
    /// Resolved font file; `None` uses the renderer's default font.
    pub font: Option<PathBuf>,
    pub font_size: u32,
    pub color: String,
    pub background: Option<String>,
    pub stroke_color: Option<String>,
    pub stroke_width: f64,
}

impl TextStyle {
    pub fn from_subtitle(style: &SubtitleStyle, font: Option<PathBuf>) -> Self {
        Self {
            font,
            font_size: style.font_size,
            color: style.color.clone(),
            background: style.background.clone(),
            stroke_color: Some(style.stroke_color.clone()),
            stroke_width: style.stroke_width,
        }
    }

    /// Text, font, size and colour only.
    pub fn minimal(&self) -> Self {
        Self {
            font: self.font.clone(),
            font_size: self.font_size,
            color: self.color.clone(),
            background: None,
            stroke_color: None,
            stroke_width: 0.0,
        }
    }
}

/// Text outline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Border {
    pub color: String,
    pub width: f64,
}

/// Validated drawing parameters, colours in `0xRRGGBB[AA]` form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawtextStyle {
    pub font_file: Option<PathBuf>,
    pub font_size: u32,
    pub font_color: String,
    pub border: Option<Border>,
    pub box_color: Option<String>,
}

/// Output of a successful render attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedText {
    pub width: f64,
    pub height: f64,
    pub style: DrawtextStyle,
}

/// A subtitle clip placed in time and on the frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionedClip {
    pub text: String,
    pub start: f64,
    pub end: f64,
    pub duration: f64,
    /// Top edge in pixels; horizontally the clip is centred.
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub style: DrawtextStyle,
}

/// Text-rendering collaborator.
pub trait TextRenderer {
    fn render(
        &self,
        text: &str,
        style: &TextStyle,
        metrics: &dyn GlyphMetrics,
    ) -> NarramixResult<RenderedText>;
}

/// Renderer producing styles for ffmpeg's `drawtext` filter.
#[derive(Debug, Clone, Copy, Default)]
pub struct DrawtextRenderer;

impl TextRenderer for DrawtextRenderer {
    fn render(
        &self,
        text: &str,
        style: &TextStyle,
        metrics: &dyn GlyphMetrics,
    ) -> NarramixResult<RenderedText> {
        if text.trim().is_empty() {
            return Err(NarramixError::subtitle("empty subtitle text"));
        }
        if style.font_size == 0 {
            return Err(NarramixError::subtitle("font size must be positive"));
        }
        if let Some(font) = &style.font {
            if !font.is_file() {
                return Err(NarramixError::subtitle(format!(
                    "font file not found: {}",
                    font.display()
                )));
            }
        }

        let font_color = parse_color(&style.color)?;
        let box_color = style.background.as_deref().map(parse_color).transpose()?;
        let border = match &style.stroke_color {
            Some(color) if style.stroke_width > 0.0 => {
                if !style.stroke_width.is_finite() {
                    return Err(NarramixError::subtitle(format!(
                        "invalid stroke width {}",
                        style.stroke_width
                    )));
                }
                Some(Border {
                    color: parse_color(color)?,
                    width: style.stroke_width,
                })
            }
            Some(_) if style.stroke_width < 0.0 || style.stroke_width.is_nan() => {
                return Err(NarramixError::subtitle(format!(
                    "invalid stroke width {}",
                    style.stroke_width
                )));
            }
            _ => None,
        };

        let mut width = 0.0f64;
        let mut line_height = 0.0f64;
        let mut lines = 0usize;
        for line in text.lines() {
            let extent = metrics.measure(line.trim());
            width = width.max(extent.width);
            line_height = line_height.max(extent.height);
            lines += 1;
        }
        let outline = border.as_ref().map_or(0.0, |b| 2.0 * b.width);

        Ok(RenderedText {
            width: width + outline,
            height: line_height * lines.max(1) as f64 + outline,
            style: DrawtextStyle {
                font_file: style.font.clone(),
                font_size: style.font_size,
                font_color,
                border,
                box_color,
            },
        })
    }
}

/// Render one cue; retries once with the minimal style.
pub fn render_cue(
    renderer: &dyn TextRenderer,
    metrics: &dyn GlyphMetrics,
    cue: &SubtitleCue,
    style: &TextStyle,
    frame: FrameSize,
    placement: SubtitlePlacement,
) -> NarramixResult<PositionedClip> {
    let text = if style.font.is_some() {
        wrap_text(&cue.text, max_text_width(f64::from(frame.width)), metrics).text
    } else {
        cue.text.clone()
    };

    let rendered = match renderer.render(&text, style, metrics) {
        Ok(rendered) => rendered,
        Err(err) => {
            tracing::warn!(error = %err, "Subtitle render failed, retrying with minimal style");
            renderer.render(&text, &style.minimal(), metrics)?
        }
    };

    let y = subtitle_y(placement, f64::from(frame.height), rendered.height);
    Ok(PositionedClip {
        text,
        start: cue.window.start,
        end: cue.window.end,
        duration: cue.window.duration(),
        y,
        width: rendered.width,
        height: rendered.height,
        style: rendered.style,
    })
}

/// Render a cue set, dropping cues that fail twice.
pub fn render_cues(
    renderer: &dyn TextRenderer,
    metrics: &dyn GlyphMetrics,
    cues: &[SubtitleCue],
    style: &TextStyle,
    frame: FrameSize,
    placement: SubtitlePlacement,
    diagnostics: &mut Diagnostics,
) -> Vec<PositionedClip> {
    let mut clips = Vec::with_capacity(cues.len());
    for (i, cue) in cues.iter().enumerate() {
        match render_cue(renderer, metrics, cue, style, frame, placement) {
            Ok(clip) => clips.push(clip),
            Err(err) => diagnostics.warn(
                Stage::Subtitles,
                format!("cue {} at {} dropped: {err}", i + 1, cue.window),
            ),
        }
    }
    clips
}

/// Parse a colour into ffmpeg's `0xRRGGBB` (or `0xRRGGBBAA`) form.
///
/// Accepts `#RGB`, `#RRGGBB`, `#RRGGBBAA`, the same with a `0x` prefix,
/// and a handful of common colour names.
pub fn parse_color(input: &str) -> NarramixResult<String> {
    let value = input.trim();
    let named = match value.to_ascii_lowercase().as_str() {
        "white" => Some("FFFFFF"),
        "black" => Some("000000"),
        "red" => Some("FF0000"),
        "green" => Some("00FF00"),
        "blue" => Some("0000FF"),
        "yellow" => Some("FFFF00"),
        "cyan" => Some("00FFFF"),
        "magenta" => Some("FF00FF"),
        "gray" | "grey" => Some("808080"),
        "orange" => Some("FFA500"),
        _ => None,
    };
    if let Some(hex) = named {
        return Ok(format!("0x{hex}"));
    }

    let hex = value
        .strip_prefix('#')
        .or_else(|| value.strip_prefix("0x"))
        .or_else(|| value.strip_prefix("0X"))
        .unwrap_or(value);
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(NarramixError::subtitle(format!("invalid colour '{input}'")));
    }
    match hex.len() {
        3 => {
            let expanded: String = hex.chars().flat_map(|c| [c, c]).collect();
            Ok(format!("0x{}", expanded.to_ascii_uppercase()))
        }
        6 | 8 => Ok(format!("0x{}", hex.to_ascii_uppercase())),
        _ => Err(NarramixError::subtitle(format!("invalid colour '{input}'"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use narramix_processing_core::wrap::TextBox;
    use narramix_project_model::window::TimeWindow;
    use std::cell::Cell;

    struct Fixed;

    impl GlyphMetrics for Fixed {
        fn measure(&self, text: &str) -> TextBox {
            TextBox {
                width: text.chars().count() as f64 * 10.0,
                height: 20.0,
            }
        }
    }

    /// Fails the first `failures` calls, then delegates.
    struct Flaky {
        failures: Cell<usize>,
        calls: Cell<usize>,
    }

    impl TextRenderer for Flaky {
        fn render(
            &self,
            text: &str,
            style: &TextStyle,
            metrics: &dyn GlyphMetrics,
        ) -> NarramixResult<RenderedText> {
            self.calls.set(self.calls.get() + 1);
            if self.failures.get() > 0 {
                self.failures.set(self.failures.get() - 1);
                return Err(NarramixError::subtitle("renderer unavailable"));
            }
            DrawtextRenderer.render(text, style, metrics)
        }
    }

    fn frame() -> FrameSize {
        FrameSize {
            width: 1280,
            height: 720,
        }
    }

    fn cue(text: &str) -> SubtitleCue {
        SubtitleCue::new(TimeWindow::new(1.0, 3.5).unwrap(), text)
    }

    fn style() -> TextStyle {
        TextStyle::from_subtitle(&SubtitleStyle::default(), None)
    }

    #[test]
    fn test_parse_color_forms() {
        assert_eq!(parse_color("#FFFFFF").unwrap(), "0xFFFFFF");
        assert_eq!(parse_color("#fa0").unwrap(), "0xFFAA00");
        assert_eq!(parse_color("0x00000080").unwrap(), "0x00000080");
        assert_eq!(parse_color("White").unwrap(), "0xFFFFFF");
        assert!(parse_color("#12345").is_err());
        assert!(parse_color("chartreuse-ish").is_err());
    }

    #[test]
    fn test_render_cue_bottom_placement() {
        let clip = render_cue(
            &DrawtextRenderer,
            &Fixed,
            &cue("hello"),
            &style(),
            frame(),
            SubtitlePlacement::Bottom,
        )
        .unwrap();
        assert_eq!(clip.text, "hello");
        assert_eq!(clip.start, 1.0);
        assert_eq!(clip.duration, 2.5);
        // 20px line plus a 1px outline on both sides.
        assert_eq!(clip.height, 22.0);
        assert!((clip.y - (720.0 * 0.95 - 22.0)).abs() < 1e-9);
        assert_eq!(clip.style.font_color, "0xFFFFFF");
        assert_eq!(clip.style.border.as_ref().unwrap().color, "0x000000");
    }

    #[test]
    fn test_no_font_passes_text_through() {
        let long = "word ".repeat(60);
        let clip = render_cue(
            &DrawtextRenderer,
            &Fixed,
            &cue(&long),
            &style(),
            frame(),
            SubtitlePlacement::Top,
        )
        .unwrap();
        assert_eq!(clip.text, long);
    }

    #[test]
    fn test_invalid_stroke_colour_retries_minimal() {
        let mut style = style();
        style.stroke_color = Some("not-a-colour".to_string());
        let clip = render_cue(
            &DrawtextRenderer,
            &Fixed,
            &cue("hi"),
            &style,
            frame(),
            SubtitlePlacement::Center,
        )
        .unwrap();
        assert!(clip.style.border.is_none());
        assert!(clip.style.box_color.is_none());
    }

    #[test]
    fn test_second_failure_drops_cue() {
        let renderer = Flaky {
            failures: Cell::new(2),
            calls: Cell::new(0),
        };
        let mut diagnostics = Diagnostics::new();
        let clips = render_cues(
            &renderer,
            &Fixed,
            &[cue("first"), cue("second")],
            &style(),
            frame(),
            SubtitlePlacement::Bottom,
            &mut diagnostics,
        );
        assert_eq!(clips.len(), 1);
        assert_eq!(clips[0].text, "second");
        assert_eq!(renderer.calls.get(), 3);
        assert_eq!(diagnostics.for_stage(Stage::Subtitles).count(), 1);
    }

    #[test]
    fn test_missing_font_file_fails_both_attempts() {
        let style = TextStyle::from_subtitle(
            &SubtitleStyle::default(),
            Some(PathBuf::from("/no/such/font.ttf")),
        );
        let result = render_cue(
            &DrawtextRenderer,
            &Fixed,
            &cue("text"),
            &style,
            frame(),
            SubtitlePlacement::Bottom,
        );
        assert!(result.is_err());
    }
}
