use thiserror::Error;

use crate::text::FontId;

/// Why a texture source could not be turned into a bitmap.
///
/// Never crosses the public cache API: the cache logs it and hands out
/// [`TextureHandle::INVALID`](crate::texture::TextureHandle::INVALID).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RasterError {
    #[error("unknown font {0:?}")]
    UnknownFont(FontId),

    #[error("source has no visible pixels")]
    EmptyContent,

    #[error("invalid raster size {width}x{height}")]
    InvalidSize { width: u32, height: u32 },

    #[error("svg parse failed: {0}")]
    Svg(String),

    #[error("could not allocate a {width}x{height} pixmap")]
    PixmapAlloc { width: u32, height: u32 },
}
