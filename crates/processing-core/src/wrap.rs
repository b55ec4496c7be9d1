//! Subtitle text wrapping.
//!
//! Greedy word wrap with a character-wrap fallback for text containing a
//! word (or a run of unspaced CJK text) wider than the available width.

use serde::{Deserialize, Serialize};

/// Pixel extent of a rendered string.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TextBox {
    pub width: f64,
    pub height: f64,
}

/// Measures rendered text for a specific font and size.
pub trait GlyphMetrics {
    /// Bounding box of `text` rendered on a single line.
    fn measure(&self, text: &str) -> TextBox;
}

/// Font-independent estimate used when no font file can be loaded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ApproxMetrics {
    pub font_size: f64,
}

impl ApproxMetrics {
    pub fn new(font_size: u32) -> Self {
        Self {
            font_size: f64::from(font_size.max(1)),
        }
    }
}

impl GlyphMetrics for ApproxMetrics {
    fn measure(&self, text: &str) -> TextBox {
        let width = text
            .chars()
            .map(|c| {
                if is_wide(c) {
                    self.font_size
                } else if c.is_whitespace() {
                    self.font_size * 0.3
                } else {
                    self.font_size * 0.55
                }
            })
            .sum();
        TextBox {
            width,
            height: self.font_size,
        }
    }
}

/// East Asian ideographs and full-width forms occupy a full em.
fn is_wide(c: char) -> bool {
    matches!(c as u32,
        0x1100..=0x115F
        | 0x2E80..=0xA4CF
        | 0xAC00..=0xD7A3
        | 0xF900..=0xFAFF
        | 0xFE30..=0xFE4F
        | 0xFF00..=0xFF60
        | 0xFFE0..=0xFFE6)
}

/// Wrapped subtitle text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WrappedText {
    /// Lines joined with `\n`.
    pub text: String,
    /// Total block height: line height times line count.
    pub height: f64,
    pub lines: usize,
}

/// Wrap `text` to fit within `max_width` pixels.
///
/// Text that already fits is returned unchanged. Otherwise words are
/// packed greedily; if any single word is wider than `max_width` the
/// whole text is re-wrapped character by character. A character wider
/// than `max_width` gets a line of its own, so wrapping always
/// terminates.
pub fn wrap_text(text: &str, max_width: f64, metrics: &dyn GlyphMetrics) -> WrappedText {
    let full = metrics.measure(text.trim());
    if full.width <= max_width || text.trim().is_empty() {
        let lines = text.lines().count().max(1);
        return WrappedText {
            text: text.to_string(),
            height: full.height * lines as f64,
            lines,
        };
    }

    let line_height = full.height;
    let lines = wrap_words(text, max_width, metrics)
        .unwrap_or_else(|| wrap_chars(text, max_width, metrics));

    let lines: Vec<String> = lines
        .into_iter()
        .map(|line| line.trim().to_string())
        .filter(|line| !line.is_empty())
        .collect();

    tracing::trace!(lines = lines.len(), max_width, "Subtitle text wrapped");

    WrappedText {
        height: line_height * lines.len() as f64,
        lines: lines.len(),
        text: lines.join("\n"),
    }
}

/// Greedy word packing; `None` when a single word cannot fit.
fn wrap_words(text: &str, max_width: f64, metrics: &dyn GlyphMetrics) -> Option<Vec<String>> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let candidate = if current.is_empty() {
            word.to_string()
        } else {
            format!("{current} {word}")
        };
        if metrics.measure(&candidate).width <= max_width {
            current = candidate;
            continue;
        }
        if current.is_empty() {
            return None;
        }
        lines.push(std::mem::take(&mut current));
        if metrics.measure(word).width > max_width {
            return None;
        }
        current = word.to_string();
    }

    if !current.is_empty() {
        lines.push(current);
    }
    Some(lines)
}

fn wrap_chars(text: &str, max_width: f64, metrics: &dyn GlyphMetrics) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for c in text.chars() {
        if c == '\n' {
            lines.push(std::mem::take(&mut current));
            continue;
        }
        current.push(c);
        if metrics.measure(current.trim()).width > max_width && current.chars().count() > 1 {
            current.pop();
            lines.push(std::mem::take(&mut current));
            current.push(c);
        }
    }

    if !current.is_empty() {
        lines.push(current);
    }
    lines
}
