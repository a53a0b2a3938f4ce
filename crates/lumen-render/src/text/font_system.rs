use std::fmt;

use fontdue::layout::{CoordinateSystem, Layout, LayoutSettings, TextStyle};

/// Error returned by [`FontSystem::load_font`].
#[derive(Debug, Clone)]
pub struct FontLoadError(pub String);

impl fmt::Display for FontLoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "font load error: {}", self.0)
    }
}

impl std::error::Error for FontLoadError {}

/// Opaque handle to a font loaded into a [`FontSystem`].
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct FontId(pub(crate) usize);

/// A glyph positioned by [`FontSystem::layout`], in pixels relative to the
/// top-left of the laid-out block.
#[derive(Debug, Copy, Clone)]
pub(crate) struct PlacedGlyph {
    pub key: fontdue::layout::GlyphRasterConfig,
    pub x: f32,
    pub y: f32,
}

/// Owns the fonts used for label and glyph rasterization.
///
/// Fonts are immutable after loading. Only simple left-to-right layout is
/// performed; there is no shaping.
pub struct FontSystem {
    fonts: Vec<fontdue::Font>,
}

impl FontSystem {
    pub fn new() -> Self {
        Self { fonts: Vec::new() }
    }

    /// Parses and stores a TrueType or OpenType font from raw bytes.
    pub fn load_font(&mut self, bytes: &[u8]) -> Result<FontId, FontLoadError> {
        let font = fontdue::Font::from_bytes(bytes, fontdue::FontSettings::default())
            .map_err(|e| FontLoadError(e.to_string()))?;
        let id = FontId(self.fonts.len());
        self.fonts.push(font);
        log::debug!("loaded font {id:?}");
        Ok(id)
    }

    pub fn len(&self) -> usize {
        self.fonts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fonts.is_empty()
    }

    pub(crate) fn get(&self, id: FontId) -> Option<&fontdue::Font> {
        self.fonts.get(id.0)
    }

    /// Lays out a single line (or wrapped block) at `px` pixels.
    ///
    /// Returns the visible glyphs and the block's pixel extent, or `None` for
    /// an unknown font.
    pub(crate) fn layout(
        &self,
        id: FontId,
        text: &str,
        px: f32,
        max_width: Option<f32>,
    ) -> Option<(Vec<PlacedGlyph>, f32, f32)> {
        let font = self.get(id)?;

        let mut layout: Layout<()> = Layout::new(CoordinateSystem::PositiveYDown);
        layout.reset(&LayoutSettings { max_width, ..LayoutSettings::default() });
        layout.append(&[font], &TextStyle::new(text, px, 0));

        let mut width = 0.0f32;
        let mut glyphs = Vec::with_capacity(layout.glyphs().len());
        for g in layout.glyphs() {
            // Advance extent, not bitmap edge, so trailing spaces count.
            let m = font.metrics_indexed(g.key.glyph_index, px);
            width = width.max(g.x - m.xmin as f32 + m.advance_width);
            if g.char_data.rasterize() && g.width > 0 && g.height > 0 {
                glyphs.push(PlacedGlyph { key: g.key, x: g.x, y: g.y });
            }
        }
        let height = layout.height().max(px);
        Some((glyphs, width.max(0.0), height))
    }

    /// Size of `text` at `px` pixels as `(width, height)`.
    ///
    /// Unknown fonts measure as zero width and one line-height tall.
    #[must_use]
    pub fn measure_text(
        &self,
        text: &str,
        id: FontId,
        px: f32,
        max_width: Option<f32>,
    ) -> (f32, f32) {
        match self.layout(id, text, px, max_width) {
            Some((_, w, h)) => (w, h),
            None => (0.0, px * 1.2),
        }
    }
}

impl Default for FontSystem {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn garbage_bytes_fail_to_load() {
        let mut fonts = FontSystem::new();
        assert!(fonts.load_font(b"definitely not a font").is_err());
        assert!(fonts.is_empty());
    }

    #[test]
    fn unknown_font_measures_one_line() {
        let fonts = FontSystem::new();
        let (w, h) = fonts.measure_text("hello", FontId(3), 10.0, None);
        assert_eq!(w, 0.0);
        assert!((h - 12.0).abs() < 1e-4);
    }
}
