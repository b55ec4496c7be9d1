//! Font loading and glyph metrics.

use std::path::Path;

use narramix_common::error::{NarramixError, NarramixResult};
use narramix_processing_core::wrap::{ApproxMetrics, GlyphMetrics, TextBox};
use rusttype::{point, Font, Scale};

/// Glyph metrics backed by a TrueType/OpenType font.
pub struct FontMetrics {
    font: Font<'static>,
    scale: Scale,
}

impl FontMetrics {
    pub fn load(path: &Path, font_size: u32) -> NarramixResult<Self> {
        let bytes = std::fs::read(path).map_err(|e| {
            NarramixError::subtitle(format!("failed to read font {}: {e}", path.display()))
        })?;
        let font = Font::try_from_vec(bytes).ok_or_else(|| {
            NarramixError::subtitle(format!("unsupported font file {}", path.display()))
        })?;
        Ok(Self {
            font,
            scale: Scale::uniform(font_size.max(1) as f32),
        })
    }
}

impl GlyphMetrics for FontMetrics {
    fn measure(&self, text: &str) -> TextBox {
        let v_metrics = self.font.v_metrics(self.scale);
        let width = self
            .font
            .layout(text, self.scale, point(0.0, v_metrics.ascent))
            .last()
            .map(|glyph| glyph.position().x + glyph.unpositioned().h_metrics().advance_width)
            .unwrap_or(0.0);
        TextBox {
            width: f64::from(width),
            height: f64::from(v_metrics.ascent - v_metrics.descent),
        }
    }
}

/// Metrics for `font`, falling back to a size-based estimate when the
/// font is absent or cannot be loaded.
pub fn metrics_for(font: Option<&Path>, font_size: u32) -> Box<dyn GlyphMetrics> {
    if let Some(path) = font {
        match FontMetrics::load(path, font_size) {
            Ok(metrics) => return Box::new(metrics),
            Err(err) => {
                tracing::warn!(error = %err, "Falling back to approximate glyph metrics");
            }
        }
    }
    Box::new(ApproxMetrics::new(font_size))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unloadable_font_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let bogus = dir.path().join("bogus.ttf");
        std::fs::write(&bogus, b"not a font").unwrap();

        assert!(FontMetrics::load(&bogus, 40).is_err());
        let metrics = metrics_for(Some(&bogus), 40);
        let expected = ApproxMetrics::new(40).measure("abc");
        assert_eq!(metrics.measure("abc"), expected);
    }

    #[test]
    fn test_no_font_uses_estimate() {
        let metrics = metrics_for(None, 20);
        assert_eq!(metrics.measure("x").height, 20.0);
    }
}
