//! Test doubles for the GPU and rasterizer seams.

use std::collections::HashSet;

use crate::coords::SizePx;
use crate::error::RasterError;

use super::{Bitmap, RasterSource, Rasterizer, TextureDevice, TextureHandle};

/// Hands out sequential handles and records every destroy call.
#[derive(Debug, Default)]
pub(crate) struct RecordingDevice {
    next: u32,
    pub live: HashSet<TextureHandle>,
    pub uploads: usize,
    pub destroyed: Vec<TextureHandle>,
    pub fail_uploads: bool,
}

impl RecordingDevice {
    /// A device that rejects every upload.
    pub fn failing() -> Self {
        Self { fail_uploads: true, ..Self::default() }
    }
}

impl TextureDevice for RecordingDevice {
    fn upload_rgba(&mut self, size: SizePx, rgba: &[u8]) -> Option<TextureHandle> {
        assert_eq!(rgba.len(), size.rgba_bytes(), "upload must be tightly packed");
        if self.fail_uploads {
            return None;
        }
        self.next += 1;
        self.uploads += 1;
        let handle = TextureHandle(self.next);
        self.live.insert(handle);
        Some(handle)
    }

    fn destroy_texture(&mut self, handle: TextureHandle) {
        self.live.remove(&handle);
        self.destroyed.push(handle);
    }
}

/// Produces a transparent bitmap of a fixed size for every source, except
/// SVG sources which use their requested size. Empty text fails.
#[derive(Debug)]
pub(crate) struct FixedRasterizer {
    pub size: SizePx,
}

impl FixedRasterizer {
    pub fn new(width: u32, height: u32) -> Self {
        Self { size: SizePx::new(width, height) }
    }
}

impl Rasterizer for FixedRasterizer {
    fn rasterize(&mut self, source: &RasterSource<'_>) -> Result<Bitmap, RasterError> {
        match *source {
            RasterSource::Text { text, .. } if text.is_empty() => Err(RasterError::EmptyContent),
            RasterSource::Svg { size, .. } if size.is_empty() => {
                Err(RasterError::InvalidSize { width: size.width, height: size.height })
            }
            RasterSource::Svg { size, .. } => Ok(Bitmap::new(size)),
            _ => Ok(Bitmap::new(self.size)),
        }
    }
}
