use crate::coords::Rect;
use crate::paint::Color;
use crate::texture::TextureHandle;

use super::{ImageCommand, RoundedRectCommand};

/// One frame's draw intent: rounded rects and images, each in submission order.
///
/// Built fresh per frame by tree traversal, submitted once, consumed at most
/// once. `clear()` keeps allocated capacity for reuse.
///
/// # Clipping
///
/// [`push_clip`](Self::push_clip) / [`pop_clip`](Self::pop_clip) scope
/// commands to a scissor rect. Nested clips are intersected with their
/// parent; commands pushed while the effective clip is empty are dropped.
///
/// ```ignore
/// frame.push_clip(scroll_viewport);
/// // ... children append here ...
/// frame.pop_clip();
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameBuffer {
    pub rounded_rects: Vec<RoundedRectCommand>,
    pub images: Vec<ImageCommand>,

    /// Top is the effective clip, already intersected with all parents.
    /// A zero-area top means nothing below it is visible.
    clip_stack: Vec<Rect>,
}

impl FrameBuffer {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears commands and the clip stack.
    #[inline]
    pub fn clear(&mut self) {
        self.rounded_rects.clear();
        self.images.clear();
        self.clip_stack.clear();
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rounded_rects.is_empty() && self.images.is_empty()
    }

    /// Total number of commands of both kinds.
    #[inline]
    pub fn len(&self) -> usize {
        self.rounded_rects.len() + self.images.len()
    }

    /// Records a rounded rect. The command's own clip is intersected with the
    /// current clip scope.
    pub fn push_rounded_rect(&mut self, mut cmd: RoundedRectCommand) {
        let Some(clip) = self.scoped_clip(cmd.clip) else { return };
        cmd.clip = clip;
        self.rounded_rects.push(cmd);
    }

    /// Records an image. The command's own clip is intersected with the
    /// current clip scope.
    pub fn push_image(&mut self, mut cmd: ImageCommand) {
        let Some(clip) = self.scoped_clip(cmd.clip) else { return };
        cmd.clip = clip;
        self.images.push(cmd);
    }

    #[inline]
    pub fn push_solid_rounded_rect(&mut self, rect: Rect, radius: f32, color: Color) {
        self.push_rounded_rect(RoundedRectCommand::new(rect, radius, color));
    }

    #[inline]
    pub fn push_texture(&mut self, rect: Rect, texture: TextureHandle) {
        self.push_image(ImageCommand::new(rect, texture));
    }

    /// Appends every command of `other`, preserving order. Clips carried by
    /// `other`'s commands are kept as-is.
    pub fn extend_from(&mut self, other: &FrameBuffer) {
        self.rounded_rects.extend_from_slice(&other.rounded_rects);
        self.images.extend_from_slice(&other.images);
    }

    /// Begins a clip scope. Must be balanced with [`pop_clip`](Self::pop_clip).
    #[inline]
    pub fn push_clip(&mut self, rect: Rect) {
        let effective = match self.clip_stack.last() {
            None => rect.normalized(),
            Some(&parent) => parent.intersect(rect).unwrap_or_default(),
        };
        self.clip_stack.push(effective);
    }

    /// Ends the most recent clip scope.
    ///
    /// # Panics
    /// Panics (debug only) if called without a matching `push_clip`.
    #[inline]
    pub fn pop_clip(&mut self) {
        debug_assert!(!self.clip_stack.is_empty(), "pop_clip called without matching push_clip");
        self.clip_stack.pop();
    }

    /// Current effective clip, if any scope is open.
    #[inline]
    pub fn current_clip(&self) -> Option<Rect> {
        self.clip_stack.last().copied()
    }

    /// Resolves a command clip against the scope stack.
    ///
    /// Outer `None`: the command is invisible and must be dropped.
    fn scoped_clip(&self, own: Option<Rect>) -> Option<Option<Rect>> {
        match (self.clip_stack.last().copied(), own) {
            (None, own) => Some(own),
            (Some(scope), _) if scope.is_empty() => None,
            (Some(scope), None) => Some(Some(scope)),
            (Some(scope), Some(own)) => scope.intersect(own).map(Some),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rr(x: f32, y: f32) -> RoundedRectCommand {
        RoundedRectCommand::new(Rect::new(x, y, 10.0, 10.0), 2.0, Color::WHITE)
    }

    #[test]
    fn len_counts_both_kinds() {
        let mut f = FrameBuffer::new();
        assert!(f.is_empty());
        f.push_rounded_rect(rr(0.0, 0.0));
        f.push_texture(Rect::new(0.0, 0.0, 4.0, 4.0), TextureHandle(7));
        assert_eq!(f.len(), 2);
        assert!(!f.is_empty());
    }

    #[test]
    fn clear_empties_everything() {
        let mut f = FrameBuffer::new();
        f.push_clip(Rect::new(0.0, 0.0, 5.0, 5.0));
        f.push_rounded_rect(rr(0.0, 0.0));
        f.clear();
        assert!(f.is_empty());
        assert_eq!(f.current_clip(), None);
    }

    #[test]
    fn commands_inherit_scope_clip() {
        let mut f = FrameBuffer::new();
        let scope = Rect::new(0.0, 0.0, 50.0, 50.0);
        f.push_clip(scope);
        f.push_rounded_rect(rr(10.0, 10.0));
        f.pop_clip();
        f.push_rounded_rect(rr(20.0, 20.0));

        assert_eq!(f.rounded_rects[0].clip, Some(scope));
        assert_eq!(f.rounded_rects[1].clip, None);
    }

    #[test]
    fn nested_clips_intersect() {
        let mut f = FrameBuffer::new();
        f.push_clip(Rect::new(0.0, 0.0, 100.0, 100.0));
        f.push_clip(Rect::new(50.0, 50.0, 100.0, 100.0));
        assert_eq!(f.current_clip(), Some(Rect::new(50.0, 50.0, 50.0, 50.0)));
    }

    #[test]
    fn commands_inside_disjoint_clips_are_dropped() {
        let mut f = FrameBuffer::new();
        f.push_clip(Rect::new(0.0, 0.0, 10.0, 10.0));
        f.push_clip(Rect::new(20.0, 20.0, 10.0, 10.0));
        f.push_rounded_rect(rr(0.0, 0.0));
        f.push_texture(Rect::new(0.0, 0.0, 4.0, 4.0), TextureHandle(1));
        assert!(f.is_empty());
    }

    #[test]
    fn own_clip_is_intersected_with_scope() {
        let mut f = FrameBuffer::new();
        f.push_clip(Rect::new(0.0, 0.0, 20.0, 20.0));
        f.push_rounded_rect(rr(0.0, 0.0).with_clip(Rect::new(10.0, 10.0, 20.0, 20.0)));
        assert_eq!(f.rounded_rects[0].clip, Some(Rect::new(10.0, 10.0, 10.0, 10.0)));
    }

    #[test]
    fn extend_preserves_order() {
        let mut a = FrameBuffer::new();
        a.push_rounded_rect(rr(0.0, 0.0));
        let mut b = FrameBuffer::new();
        b.push_rounded_rect(rr(1.0, 1.0));
        b.push_rounded_rect(rr(2.0, 2.0));
        a.extend_from(&b);
        let ys: Vec<f32> = a.rounded_rects.iter().map(|c| c.rect.origin.y).collect();
        assert_eq!(ys, vec![0.0, 1.0, 2.0]);
    }
}
