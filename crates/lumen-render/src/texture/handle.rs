use crate::coords::SizePx;

/// Integer id of a GPU texture. `0` is never a live texture.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct TextureHandle(pub u32);

impl TextureHandle {
    /// Returned when rasterization or upload fails; draw commands carrying it are skipped.
    pub const INVALID: TextureHandle = TextureHandle(0);

    #[inline]
    pub fn is_valid(self) -> bool {
        self.0 != 0
    }
}

/// The GPU entry points the texture layer needs.
///
/// Passed explicitly into every call that creates or destroys textures, so
/// there is no global GPU state and the caller decides which context is
/// current. [`GpuContext`](crate::gpu::GpuContext) is the wgpu implementation.
pub trait TextureDevice {
    /// Creates a texture from tightly packed premultiplied RGBA8 rows.
    ///
    /// Returns `None` if the texture could not be created; the handle must
    /// never be [`TextureHandle::INVALID`].
    fn upload_rgba(&mut self, size: SizePx, rgba: &[u8]) -> Option<TextureHandle>;

    /// Destroys a texture. Unknown handles are ignored.
    fn destroy_texture(&mut self, handle: TextureHandle);
}
