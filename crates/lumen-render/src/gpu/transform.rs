//! Logical px → device px → clip space.
//!
//! All CPU geometry is logical pixels with a top-left origin. The executor
//! scales by the device-pixel ratio, then maps to NDC where +Y points up.
//! wgpu scissor rects share the framebuffer's top-left origin, so only the
//! NDC step flips Y.

use crate::coords::{Rect, SizePx, Vec2};

/// Scissor rect in framebuffer pixels, top-left origin.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct ScissorRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl ScissorRect {
    /// Whole framebuffer.
    #[inline]
    pub fn full(framebuffer: SizePx) -> Self {
        Self { x: 0, y: 0, width: framebuffer.width, height: framebuffer.height }
    }
}

/// Non-positive or non-finite ratios fall back to 1.
#[inline]
pub(crate) fn sanitize_dpr(dpr: f32) -> f32 {
    if dpr.is_finite() && dpr > 0.0 { dpr } else { 1.0 }
}

#[inline]
pub fn logical_to_device(rect: Rect, dpr: f32) -> Rect {
    rect.scaled(sanitize_dpr(dpr))
}

/// Inverse of [`logical_to_device`].
#[inline]
pub fn device_to_logical(rect: Rect, dpr: f32) -> Rect {
    rect.scaled(1.0 / sanitize_dpr(dpr))
}

/// Maps a device-pixel rect into normalized device coordinates.
///
/// The result is expressed in NDC's own convention: `origin` is the
/// bottom-left corner and +Y points up.
pub fn device_to_ndc(rect: Rect, framebuffer: SizePx) -> Rect {
    let w = framebuffer.width.max(1) as f32;
    let h = framebuffer.height.max(1) as f32;
    let r = rect.normalized();

    let left = r.origin.x / w * 2.0 - 1.0;
    let bottom = 1.0 - (r.origin.y + r.size.y) / h * 2.0;
    Rect::from_origin_size(
        Vec2::new(left, bottom),
        Vec2::new(r.size.x / w * 2.0, r.size.y / h * 2.0),
    )
}

/// Converts a logical clip rect into a scissor rect clamped to the framebuffer.
///
/// `None` clip means the whole framebuffer. Returns `None` when nothing
/// would be visible, in which case the draw must be skipped. Edges are
/// rounded outwards so partially covered pixels stay visible.
pub fn clip_to_scissor(clip: Option<Rect>, dpr: f32, framebuffer: SizePx) -> Option<ScissorRect> {
    if framebuffer.is_empty() {
        return None;
    }
    let Some(clip) = clip else {
        return Some(ScissorRect::full(framebuffer));
    };

    let d = logical_to_device(clip.normalized(), dpr);
    if d.is_empty() || !d.is_finite() {
        return None;
    }

    let fw = framebuffer.width as f32;
    let fh = framebuffer.height as f32;
    let x0 = d.origin.x.floor().clamp(0.0, fw) as u32;
    let y0 = d.origin.y.floor().clamp(0.0, fh) as u32;
    let x1 = d.max().x.ceil().clamp(0.0, fw) as u32;
    let y1 = d.max().y.ceil().clamp(0.0, fh) as u32;

    let width = x1.saturating_sub(x0);
    let height = y1.saturating_sub(y0);
    if width == 0 || height == 0 {
        None
    } else {
        Some(ScissorRect { x: x0, y: y0, width, height })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FB: SizePx = SizePx::new(800, 600);

    fn approx(a: Rect, b: Rect) -> bool {
        a.origin.max_abs_diff(b.origin) < 1e-4 && a.size.max_abs_diff(b.size) < 1e-4
    }

    // ── device pixels ─────────────────────────────────────────────────────

    #[test]
    fn logical_device_round_trip() {
        let r = Rect::new(12.3, 45.6, 78.9, 10.1);
        for dpr in [1.0, 1.25, 1.5, 2.0, 3.0] {
            assert!(approx(device_to_logical(logical_to_device(r, dpr), dpr), r), "dpr {dpr}");
        }
    }

    #[test]
    fn invalid_dpr_is_identity() {
        let r = Rect::new(1.0, 2.0, 3.0, 4.0);
        assert_eq!(logical_to_device(r, 0.0), r);
        assert_eq!(logical_to_device(r, f32::NAN), r);
    }

    // ── ndc ───────────────────────────────────────────────────────────────

    #[test]
    fn full_framebuffer_maps_to_unit_square() {
        let ndc = device_to_ndc(Rect::new(0.0, 0.0, 800.0, 600.0), FB);
        assert!(approx(ndc, Rect::new(-1.0, -1.0, 2.0, 2.0)));
    }

    #[test]
    fn top_strip_lands_at_top_of_ndc() {
        let ndc = device_to_ndc(Rect::new(0.0, 0.0, 800.0, 60.0), FB);
        // Bottom edge at 1 - 60/600*2 = 0.8, top edge at +1.
        assert!(approx(ndc, Rect::new(-1.0, 0.8, 2.0, 0.2)));
    }

    // ── scissor ───────────────────────────────────────────────────────────

    #[test]
    fn no_clip_is_full_framebuffer() {
        assert_eq!(clip_to_scissor(None, 2.0, FB), Some(ScissorRect::full(FB)));
    }

    #[test]
    fn clip_is_scaled_and_keeps_top_left_origin() {
        let s = clip_to_scissor(Some(Rect::new(10.0, 20.0, 30.0, 40.0)), 2.0, FB);
        assert_eq!(s, Some(ScissorRect { x: 20, y: 40, width: 60, height: 80 }));
    }

    #[test]
    fn fractional_clip_rounds_outwards() {
        let s = clip_to_scissor(Some(Rect::new(0.5, 0.5, 1.0, 1.0)), 1.0, FB);
        assert_eq!(s, Some(ScissorRect { x: 0, y: 0, width: 2, height: 2 }));
    }

    #[test]
    fn clip_is_clamped_to_framebuffer() {
        let s = clip_to_scissor(Some(Rect::new(-10.0, 590.0, 100.0, 100.0)), 1.0, FB);
        assert_eq!(s, Some(ScissorRect { x: 0, y: 590, width: 90, height: 10 }));
    }

    #[test]
    fn offscreen_or_empty_clip_is_skipped() {
        assert_eq!(clip_to_scissor(Some(Rect::new(900.0, 0.0, 10.0, 10.0)), 1.0, FB), None);
        assert_eq!(clip_to_scissor(Some(Rect::new(0.0, 0.0, 0.0, 10.0)), 1.0, FB), None);
        assert_eq!(clip_to_scissor(None, 1.0, SizePx::ZERO), None);
    }
}
