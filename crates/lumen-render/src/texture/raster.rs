use resvg::tiny_skia;
use resvg::usvg;

use crate::coords::SizePx;
use crate::error::RasterError;
use crate::paint::Color;
use crate::text::{FontId, FontSystem};

/// Largest edge accepted for any rasterized bitmap.
const MAX_RASTER_EDGE: u32 = 8192;

/// Tightly packed premultiplied RGBA8 pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct Bitmap {
    pub size: SizePx,
    pub pixels: Vec<u8>,
}

impl Bitmap {
    /// Transparent bitmap of `size`.
    pub fn new(size: SizePx) -> Self {
        Self { size, pixels: vec![0; size.rgba_bytes()] }
    }

    /// Composites `color * coverage` over the pixel at (`x`, `y`).
    #[inline]
    fn blend_coverage(&mut self, x: u32, y: u32, color: [f32; 4], coverage: u8) {
        if x >= self.size.width || y >= self.size.height || coverage == 0 {
            return;
        }
        let k = coverage as f32 / 255.0;
        let i = ((y * self.size.width + x) * 4) as usize;
        let src_a = color[3] * k;
        for c in 0..4 {
            let dst = self.pixels[i + c] as f32 / 255.0;
            let out = color[c] * k + dst * (1.0 - src_a);
            self.pixels[i + c] = (out.clamp(0.0, 1.0) * 255.0).round() as u8;
        }
    }
}

/// Anything the cache knows how to turn into a texture.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RasterSource<'a> {
    /// Single-line (unshaped) label at `px` pixels.
    Text { text: &'a str, font: FontId, px: f32, color: Color },
    /// One glyph, cropped to its bitmap bounds.
    Glyph { ch: char, font: FontId, px: f32, color: Color },
    /// SVG document scaled to exactly `size`, optionally tinted.
    Svg { data: &'a [u8], size: SizePx, tint: Option<Color> },
}

/// CPU rasterization backend used by [`TextureCache`](super::TextureCache).
pub trait Rasterizer {
    fn rasterize(&mut self, source: &RasterSource<'_>) -> Result<Bitmap, RasterError>;

    /// Font storage, for backends that rasterize text.
    fn fonts_mut(&mut self) -> Option<&mut FontSystem> {
        None
    }
}

/// fontdue for text and glyphs, resvg for vector icons.
#[derive(Default)]
pub struct SoftwareRasterizer {
    fonts: FontSystem,
}

impl SoftwareRasterizer {
    pub fn new(fonts: FontSystem) -> Self {
        Self { fonts }
    }

    pub fn fonts(&self) -> &FontSystem {
        &self.fonts
    }

    fn text(&self, text: &str, font: FontId, px: f32, color: Color) -> Result<Bitmap, RasterError> {
        let f = self.fonts.get(font).ok_or(RasterError::UnknownFont(font))?;
        check_px(px)?;
        let (glyphs, w, h) =
            self.fonts.layout(font, text, px, None).ok_or(RasterError::UnknownFont(font))?;
        if glyphs.is_empty() {
            return Err(RasterError::EmptyContent);
        }

        let size = checked_size(w.ceil() as u32, h.ceil() as u32)?;
        let mut bitmap = Bitmap::new(size);
        let rgba = color.to_array();

        for g in glyphs {
            let (metrics, coverage) = f.rasterize_config(g.key);
            let ox = g.x.round() as i64;
            let oy = g.y.round() as i64;
            for row in 0..metrics.height {
                for col in 0..metrics.width {
                    let x = ox + col as i64;
                    let y = oy + row as i64;
                    if x < 0 || y < 0 {
                        continue;
                    }
                    let c = coverage[row * metrics.width + col];
                    bitmap.blend_coverage(x as u32, y as u32, rgba, c);
                }
            }
        }
        Ok(bitmap)
    }

    fn glyph(&self, ch: char, font: FontId, px: f32, color: Color) -> Result<Bitmap, RasterError> {
        let f = self.fonts.get(font).ok_or(RasterError::UnknownFont(font))?;
        check_px(px)?;
        let (metrics, coverage) = f.rasterize(ch, px);
        if metrics.width == 0 || metrics.height == 0 {
            return Err(RasterError::EmptyContent);
        }

        let size = checked_size(metrics.width as u32, metrics.height as u32)?;
        let mut bitmap = Bitmap::new(size);
        let rgba = color.to_array();
        for (i, &c) in coverage.iter().enumerate() {
            let x = (i % metrics.width) as u32;
            let y = (i / metrics.width) as u32;
            bitmap.blend_coverage(x, y, rgba, c);
        }
        Ok(bitmap)
    }

    fn svg(&self, data: &[u8], size: SizePx, tint: Option<Color>) -> Result<Bitmap, RasterError> {
        let size = checked_size(size.width, size.height)?;

        let tree = usvg::Tree::from_data(data, &usvg::Options::default())
            .map_err(|e| RasterError::Svg(e.to_string()))?;

        let mut pixmap = tiny_skia::Pixmap::new(size.width, size.height).ok_or(
            RasterError::PixmapAlloc { width: size.width, height: size.height },
        )?;

        let natural = tree.size();
        let sx = size.width as f32 / natural.width().max(f32::EPSILON);
        let sy = size.height as f32 / natural.height().max(f32::EPSILON);
        resvg::render(&tree, tiny_skia::Transform::from_scale(sx, sy), &mut pixmap.as_mut());

        // tiny-skia pixmaps are premultiplied RGBA, same as our bitmaps.
        let mut pixels = pixmap.take();
        if let Some(tint) = tint {
            let t = tint.to_array();
            for px in pixels.chunks_exact_mut(4) {
                for c in 0..4 {
                    px[c] = (px[c] as f32 * t[c]).round().clamp(0.0, 255.0) as u8;
                }
            }
        }
        Ok(Bitmap { size, pixels })
    }
}

impl Rasterizer for SoftwareRasterizer {
    fn rasterize(&mut self, source: &RasterSource<'_>) -> Result<Bitmap, RasterError> {
        match *source {
            RasterSource::Text { text, font, px, color } => self.text(text, font, px, color),
            RasterSource::Glyph { ch, font, px, color } => self.glyph(ch, font, px, color),
            RasterSource::Svg { data, size, tint } => self.svg(data, size, tint),
        }
    }

    fn fonts_mut(&mut self) -> Option<&mut FontSystem> {
        Some(&mut self.fonts)
    }
}

/// Font sizes must be finite and positive.
fn check_px(px: f32) -> Result<(), RasterError> {
    if px.is_finite() && px > 0.0 {
        Ok(())
    } else {
        Err(RasterError::InvalidSize { width: 0, height: 0 })
    }
}

fn checked_size(width: u32, height: u32) -> Result<SizePx, RasterError> {
    if width == 0 || height == 0 || width > MAX_RASTER_EDGE || height > MAX_RASTER_EDGE {
        return Err(RasterError::InvalidSize { width, height });
    }
    Ok(SizePx::new(width, height))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SQUARE_SVG: &[u8] = br##"<svg xmlns="http://www.w3.org/2000/svg" width="10" height="10">
        <rect x="0" y="0" width="10" height="10" fill="#ffffff"/>
    </svg>"##;

    #[test]
    fn svg_is_scaled_to_requested_size() {
        let mut r = SoftwareRasterizer::default();
        let bmp = r
            .rasterize(&RasterSource::Svg {
                data: SQUARE_SVG,
                size: SizePx::new(32, 16),
                tint: None,
            })
            .unwrap();
        assert_eq!(bmp.size, SizePx::new(32, 16));
        assert_eq!(bmp.pixels.len(), 32 * 16 * 4);
        // Interior pixel is opaque white.
        let i = (8 * 32 + 16) * 4;
        assert_eq!(&bmp.pixels[i..i + 4], &[255, 255, 255, 255]);
    }

    #[test]
    fn svg_tint_multiplies_pixels() {
        let mut r = SoftwareRasterizer::default();
        let red = Color::from_rgba8(255, 0, 0, 255);
        let bmp = r
            .rasterize(&RasterSource::Svg {
                data: SQUARE_SVG,
                size: SizePx::new(4, 4),
                tint: Some(red),
            })
            .unwrap();
        let i = (2 * 4 + 2) * 4;
        assert_eq!(&bmp.pixels[i..i + 4], &[255, 0, 0, 255]);
    }

    #[test]
    fn malformed_svg_is_an_error() {
        let mut r = SoftwareRasterizer::default();
        let err = r
            .rasterize(&RasterSource::Svg { data: b"<svg", size: SizePx::new(4, 4), tint: None })
            .unwrap_err();
        assert!(matches!(err, RasterError::Svg(_)));
    }

    #[test]
    fn zero_size_svg_is_rejected() {
        let mut r = SoftwareRasterizer::default();
        let err = r
            .rasterize(&RasterSource::Svg { data: SQUARE_SVG, size: SizePx::new(0, 4), tint: None })
            .unwrap_err();
        assert_eq!(err, RasterError::InvalidSize { width: 0, height: 4 });
    }

    #[test]
    fn text_with_unknown_font_fails() {
        let mut r = SoftwareRasterizer::default();
        let font = FontId(0);
        let err = r
            .rasterize(&RasterSource::Text { text: "hi", font, px: 12.0, color: Color::WHITE })
            .unwrap_err();
        assert_eq!(err, RasterError::UnknownFont(font));
    }

    const MONO: &[u8] = include_bytes!("../../assets/DejaVuSansMono.ttf");

    fn mono() -> (SoftwareRasterizer, FontId) {
        let mut fonts = FontSystem::new();
        let id = fonts.load_font(MONO).unwrap();
        (SoftwareRasterizer::new(fonts), id)
    }

    fn covered(bmp: &Bitmap) -> usize {
        bmp.pixels.chunks_exact(4).filter(|px| px[3] > 0).count()
    }

    #[test]
    fn label_has_coverage() {
        let (mut r, font) = mono();
        let bmp = r
            .rasterize(&RasterSource::Text { text: "Hello", font, px: 16.0, color: Color::WHITE })
            .unwrap();
        assert!(bmp.size.width > 0 && bmp.size.height > 0);
        assert_eq!(bmp.pixels.len(), bmp.size.rgba_bytes());
        assert!(covered(&bmp) > 0);
        // Monospace: five advances are wider than the line is tall.
        assert!(bmp.size.width > bmp.size.height);
    }

    #[test]
    fn longer_label_is_wider() {
        let (mut r, font) = mono();
        let short = r
            .rasterize(&RasterSource::Text { text: "ab", font, px: 16.0, color: Color::WHITE })
            .unwrap();
        let long = r
            .rasterize(&RasterSource::Text { text: "abcd", font, px: 16.0, color: Color::WHITE })
            .unwrap();
        assert!(long.size.width > short.size.width);
        assert_eq!(long.size.height, short.size.height);
    }

    #[test]
    fn whitespace_label_is_empty_content() {
        let (mut r, font) = mono();
        for text in ["", "   "] {
            let err = r
                .rasterize(&RasterSource::Text { text, font, px: 16.0, color: Color::WHITE })
                .unwrap_err();
            assert_eq!(err, RasterError::EmptyContent, "text {text:?}");
        }
    }

    #[test]
    fn non_positive_or_nan_px_is_rejected() {
        let (mut r, font) = mono();
        for px in [0.0, -4.0, f32::NAN, f32::INFINITY] {
            let err = r
                .rasterize(&RasterSource::Text { text: "a", font, px, color: Color::WHITE })
                .unwrap_err();
            assert_eq!(err, RasterError::InvalidSize { width: 0, height: 0 }, "px {px}");
            let err = r
                .rasterize(&RasterSource::Glyph { ch: 'a', font, px, color: Color::WHITE })
                .unwrap_err();
            assert_eq!(err, RasterError::InvalidSize { width: 0, height: 0 }, "px {px}");
        }
    }

    #[test]
    fn glyph_is_cropped_and_space_is_empty() {
        let (mut r, font) = mono();
        let bmp = r
            .rasterize(&RasterSource::Glyph { ch: 'W', font, px: 24.0, color: Color::WHITE })
            .unwrap();
        assert!(covered(&bmp) > 0);
        assert!(bmp.size.height <= 24);

        let err = r
            .rasterize(&RasterSource::Glyph { ch: ' ', font, px: 24.0, color: Color::WHITE })
            .unwrap_err();
        assert_eq!(err, RasterError::EmptyContent);
    }

    #[test]
    fn coverage_blend_premultiplies() {
        let mut bmp = Bitmap::new(SizePx::new(1, 1));
        bmp.blend_coverage(0, 0, Color::from_straight(1.0, 0.0, 0.0, 0.5).to_array(), 255);
        assert_eq!(bmp.pixels, vec![128, 0, 0, 128]);
    }
}
