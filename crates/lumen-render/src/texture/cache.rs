use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::coords::SizePx;
use crate::paint::Color;
use crate::text::FontId;

use super::{RasterSource, Rasterizer, TextureDevice, TextureHandle};

/// Content-keyed texture cache.
///
/// On a miss the source is rasterized synchronously, uploaded through the
/// caller's [`TextureDevice`], and recorded under `key`. On a hit the stored
/// handle is returned with no rasterization.
///
/// The key must encode every visual parameter (content, size, color, theme
/// variant). Collisions are not detected: a reused key returns the old texture.
///
/// Lookups are O(1) in both directions (`key → handle`, `handle → key`), so
/// removing a single texture never scans the key map.
pub struct TextureCache {
    rasterizer: Box<dyn Rasterizer>,

    entries: HashMap<String, TextureHandle>,
    sizes: HashMap<TextureHandle, SizePx>,
    keys: HashMap<TextureHandle, String>,

    failure_backoff: Option<Duration>,
    failures: HashMap<String, Instant>,

    raster_count: u64,
}

impl TextureCache {
    pub fn new(rasterizer: impl Rasterizer + 'static) -> Self {
        Self {
            rasterizer: Box::new(rasterizer),
            entries: HashMap::new(),
            sizes: HashMap::new(),
            keys: HashMap::new(),
            failure_backoff: None,
            failures: HashMap::new(),
            raster_count: 0,
        }
    }

    /// Suppresses re-rasterizing a key that failed until `backoff` elapsed.
    ///
    /// `None` (the default) retries failing sources on every request.
    pub fn with_failure_backoff(mut self, backoff: Option<Duration>) -> Self {
        self.failure_backoff = backoff;
        self
    }

    // ── ensure ────────────────────────────────────────────────────────────

    /// Label texture for `text` at `px` pixels.
    pub fn ensure_text_px(
        &mut self,
        gpu: &mut dyn TextureDevice,
        key: &str,
        text: &str,
        font: FontId,
        px: f32,
        color: Color,
    ) -> TextureHandle {
        self.ensure_px(gpu, key, &RasterSource::Text { text, font, px, color })
    }

    /// Single-glyph texture.
    pub fn ensure_glyph_px(
        &mut self,
        gpu: &mut dyn TextureDevice,
        key: &str,
        ch: char,
        font: FontId,
        px: f32,
        color: Color,
    ) -> TextureHandle {
        self.ensure_px(gpu, key, &RasterSource::Glyph { ch, font, px, color })
    }

    /// Vector icon rendered at exactly `size` device pixels.
    pub fn ensure_svg_px(
        &mut self,
        gpu: &mut dyn TextureDevice,
        key: &str,
        svg: &[u8],
        size: SizePx,
        tint: Option<Color>,
    ) -> TextureHandle {
        self.ensure_px(gpu, key, &RasterSource::Svg { data: svg, size, tint })
    }

    /// Returns the texture cached under `key`, creating it from `source` on a miss.
    ///
    /// Failures yield [`TextureHandle::INVALID`] and are not cached.
    pub fn ensure_px(
        &mut self,
        gpu: &mut dyn TextureDevice,
        key: &str,
        source: &RasterSource<'_>,
    ) -> TextureHandle {
        if let Some(&handle) = self.entries.get(key) {
            return handle;
        }

        if self.in_failure_backoff(key) {
            return TextureHandle::INVALID;
        }

        self.raster_count += 1;
        let bitmap = match self.rasterizer.rasterize(source) {
            Ok(b) => b,
            Err(e) => {
                log::warn!("texture cache: rasterizing {key:?} failed: {e}");
                self.note_failure(key);
                return TextureHandle::INVALID;
            }
        };

        let Some(handle) = gpu.upload_rgba(bitmap.size, &bitmap.pixels) else {
            log::warn!(
                "texture cache: upload of {key:?} ({}x{}) failed",
                bitmap.size.width,
                bitmap.size.height
            );
            self.note_failure(key);
            return TextureHandle::INVALID;
        };
        debug_assert!(handle.is_valid());

        log::debug!(
            "texture cache: created {handle:?} for {key:?} ({}x{})",
            bitmap.size.width,
            bitmap.size.height
        );

        self.failures.remove(key);
        self.entries.insert(key.to_owned(), handle);
        self.sizes.insert(handle, bitmap.size);
        self.keys.insert(handle, key.to_owned());
        handle
    }

    // ── queries ───────────────────────────────────────────────────────────

    /// Pixel size of a cached texture. Unknown handles yield [`SizePx::ZERO`].
    #[inline]
    pub fn texture_size_px(&self, handle: TextureHandle) -> SizePx {
        self.sizes.get(&handle).copied().unwrap_or(SizePx::ZERO)
    }

    #[inline]
    pub fn handle_for_key(&self, key: &str) -> Option<TextureHandle> {
        self.entries.get(key).copied()
    }

    #[inline]
    pub fn key_for_handle(&self, handle: TextureHandle) -> Option<&str> {
        self.keys.get(&handle).map(String::as_str)
    }

    #[inline]
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of rasterizations attempted so far (hits excluded).
    #[inline]
    pub fn raster_count(&self) -> u64 {
        self.raster_count
    }

    // ── release ───────────────────────────────────────────────────────────

    /// Destroys one texture and forgets its key. Returns `false` for unknown handles.
    pub fn release(&mut self, gpu: &mut dyn TextureDevice, handle: TextureHandle) -> bool {
        let Some(key) = self.keys.remove(&handle) else {
            return false;
        };
        self.entries.remove(&key);
        self.sizes.remove(&handle);
        gpu.destroy_texture(handle);
        true
    }

    /// Destroys every tracked texture and clears all bookkeeping.
    ///
    /// Must run while the owning GPU context is current. With `gpu = None`
    /// the destroy calls are skipped but the maps are still cleared, so no
    /// stale handle can be returned afterwards.
    pub fn release_all(&mut self, gpu: Option<&mut dyn TextureDevice>) {
        match gpu {
            Some(gpu) => {
                for &handle in self.sizes.keys() {
                    gpu.destroy_texture(handle);
                }
            }
            None if !self.sizes.is_empty() => {
                log::warn!(
                    "texture cache: releasing {} textures without a GPU context, abandoning them",
                    self.sizes.len()
                );
            }
            None => {}
        }
        self.entries.clear();
        self.sizes.clear();
        self.keys.clear();
        self.failures.clear();
    }

    // ── failure back-off ──────────────────────────────────────────────────

    fn in_failure_backoff(&self, key: &str) -> bool {
        match (self.failure_backoff, self.failures.get(key)) {
            (Some(backoff), Some(at)) => at.elapsed() < backoff,
            _ => false,
        }
    }

    fn note_failure(&mut self, key: &str) {
        if self.failure_backoff.is_some() {
            self.failures.insert(key.to_owned(), Instant::now());
        }
    }
}

impl Drop for TextureCache {
    fn drop(&mut self) {
        if !self.sizes.is_empty() {
            log::debug!(
                "texture cache dropped with {} live textures; call release_all first",
                self.sizes.len()
            );
        }
    }
}
