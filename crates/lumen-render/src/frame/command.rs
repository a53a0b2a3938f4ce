use crate::coords::Rect;
use crate::paint::Color;
use crate::texture::TextureHandle;

/// Maps the "non-positive size means no clipping" convention onto `Option`.
#[inline]
fn effective_clip(clip: Rect) -> Option<Rect> {
    if clip.is_empty() { None } else { Some(clip) }
}

/// Filled rounded rectangle.
#[derive(Debug, Clone, PartialEq)]
pub struct RoundedRectCommand {
    /// Logical pixels, top-left origin.
    pub rect: Rect,
    /// Uniform corner radius in logical pixels. Clamped to half the short side at draw time.
    pub radius: f32,
    pub color: Color,
    /// Scissor rect in logical pixels. `None` = draw everywhere.
    pub clip: Option<Rect>,
}

impl RoundedRectCommand {
    #[inline]
    pub fn new(rect: Rect, radius: f32, color: Color) -> Self {
        Self { rect, radius, color, clip: None }
    }

    /// Sets the clip rect. A rect with non-positive width or height disables clipping.
    #[inline]
    pub fn with_clip(mut self, clip: Rect) -> Self {
        self.clip = effective_clip(clip);
        self
    }
}

/// Textured quad, tinted by a premultiplied color.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageCommand {
    /// Destination in logical pixels.
    pub rect: Rect,
    /// [`TextureHandle::INVALID`] makes the executor skip the command.
    pub texture: TextureHandle,
    /// Source region in texture (device) pixels. Empty = whole texture.
    pub src_px: Rect,
    pub tint: Color,
    pub clip: Option<Rect>,
}

impl ImageCommand {
    /// Whole-texture draw with a white (identity) tint.
    #[inline]
    pub fn new(rect: Rect, texture: TextureHandle) -> Self {
        Self {
            rect,
            texture,
            src_px: Rect::default(),
            tint: Color::WHITE,
            clip: None,
        }
    }

    #[inline]
    pub fn with_source(mut self, src_px: Rect) -> Self {
        self.src_px = src_px;
        self
    }

    #[inline]
    pub fn with_tint(mut self, tint: Color) -> Self {
        self.tint = tint;
        self
    }

    /// Sets the clip rect. A rect with non-positive width or height disables clipping.
    #[inline]
    pub fn with_clip(mut self, clip: Rect) -> Self {
        self.clip = effective_clip(clip);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_positive_clip_means_no_clipping() {
        let cmd = RoundedRectCommand::new(Rect::new(0.0, 0.0, 10.0, 10.0), 2.0, Color::WHITE)
            .with_clip(Rect::new(5.0, 5.0, 0.0, 20.0));
        assert_eq!(cmd.clip, None);

        let img = ImageCommand::new(Rect::new(0.0, 0.0, 10.0, 10.0), TextureHandle(3))
            .with_clip(Rect::new(0.0, 0.0, -1.0, -1.0));
        assert_eq!(img.clip, None);
    }

    #[test]
    fn positive_clip_is_kept() {
        let clip = Rect::new(1.0, 2.0, 3.0, 4.0);
        let cmd = RoundedRectCommand::new(Rect::new(0.0, 0.0, 10.0, 10.0), 0.0, Color::BLACK)
            .with_clip(clip);
        assert_eq!(cmd.clip, Some(clip));
    }

    #[test]
    fn image_defaults_to_whole_texture_and_white_tint() {
        let img = ImageCommand::new(Rect::new(0.0, 0.0, 8.0, 8.0), TextureHandle(1));
        assert!(img.src_px.is_empty());
        assert_eq!(img.tint, Color::WHITE);
    }
}
