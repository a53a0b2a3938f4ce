//! Texture rasterization, caching and budgeted lifetime management.
//!
//! Layers, leaves first:
//! - `handle`: integer texture handles and the [`TextureDevice`] seam to the GPU
//! - `raster`: CPU rasterization of text, glyphs and SVG icons into RGBA bitmaps
//! - `cache`: key → texture map; rasterize + upload on miss
//! - `manager`: LRU order, memory budget, eviction and pinning on top of the cache
//!
//! None of these types lock internally. They must only be used from the
//! thread that owns the GPU context.

mod cache;
mod handle;
mod manager;
mod raster;

#[cfg(test)]
pub(crate) mod testing;

pub use cache::TextureCache;
pub use handle::{TextureDevice, TextureHandle};
pub use manager::{CachedTexture, ResourceManager, ResourceStats};
pub use raster::{Bitmap, RasterSource, Rasterizer, SoftwareRasterizer};
