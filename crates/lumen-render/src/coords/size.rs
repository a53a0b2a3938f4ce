/// Integer size in device pixels (textures, framebuffers).
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub struct SizePx {
    pub width: u32,
    pub height: u32,
}

impl SizePx {
    pub const ZERO: SizePx = SizePx { width: 0, height: 0 };

    #[inline]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Approximate GPU memory footprint of an RGBA8 texture of this size.
    #[inline]
    pub fn rgba_bytes(self) -> usize {
        self.width as usize * self.height as usize * 4
    }
}
