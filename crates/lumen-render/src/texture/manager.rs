use std::time::{Duration, Instant};

use lru::LruCache;

use crate::config::RenderConfig;
use crate::coords::SizePx;
use crate::paint::Color;
use crate::text::FontId;

use super::{RasterSource, Rasterizer, TextureCache, TextureDevice, TextureHandle};

/// Bookkeeping for one texture tracked by the [`ResourceManager`].
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct CachedTexture {
    pub handle: TextureHandle,
    pub size: SizePx,
    pub last_used: Instant,
    /// `width * height * 4` bytes.
    pub memory_size: usize,
    /// Exempt from budget eviction and age cleanup.
    pub persistent: bool,
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct ResourceStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub failures: u64,
}

impl ResourceStats {
    /// Fraction of requests served without rasterizing. `0.0` before any request.
    pub fn hit_ratio(&self) -> f32 {
        let total = self.hits + self.misses;
        if total == 0 { 0.0 } else { self.hits as f32 / total as f32 }
    }
}

/// LRU-ordered, byte-budgeted lifetime management on top of a [`TextureCache`].
///
/// Every tracked texture is Created (by the cache), then Tracked in LRU
/// order until it is Evicted (budget pressure or idle cleanup) or Released
/// (`release_all`). `memory_used` always equals the sum of tracked
/// `memory_size`s; it is maintained on every insert and removal.
///
/// When every remaining entry is persistent the budget is allowed to stay
/// exceeded; new allocations are never refused.
pub struct ResourceManager {
    cache: TextureCache,
    lru: LruCache<TextureHandle, CachedTexture>,

    memory_used: usize,
    memory_budget: usize,
    cleanup_max_age: Duration,

    stats: ResourceStats,
}

impl ResourceManager {
    pub fn new(cache: TextureCache, memory_budget: usize) -> Self {
        Self {
            cache,
            lru: LruCache::unbounded(),
            memory_used: 0,
            memory_budget,
            cleanup_max_age: RenderConfig::default().cleanup_max_age(),
            stats: ResourceStats::default(),
        }
    }

    pub fn with_config(rasterizer: impl Rasterizer + 'static, config: &RenderConfig) -> Self {
        let cache =
            TextureCache::new(rasterizer).with_failure_backoff(config.raster_failure_backoff());
        let mut manager = Self::new(cache, config.memory_budget_bytes);
        manager.cleanup_max_age = config.cleanup_max_age();
        manager
    }

    // ── lookup / create ───────────────────────────────────────────────────

    pub fn get_or_create_text(
        &mut self,
        gpu: &mut dyn TextureDevice,
        key: &str,
        text: &str,
        font: FontId,
        px: f32,
        color: Color,
    ) -> TextureHandle {
        self.get_or_create_source(gpu, key, &RasterSource::Text { text, font, px, color })
    }

    pub fn get_or_create_glyph(
        &mut self,
        gpu: &mut dyn TextureDevice,
        key: &str,
        ch: char,
        font: FontId,
        px: f32,
        color: Color,
    ) -> TextureHandle {
        self.get_or_create_source(gpu, key, &RasterSource::Glyph { ch, font, px, color })
    }

    pub fn get_or_create_svg(
        &mut self,
        gpu: &mut dyn TextureDevice,
        key: &str,
        svg: &[u8],
        size: SizePx,
        tint: Option<Color>,
    ) -> TextureHandle {
        self.get_or_create_source(gpu, key, &RasterSource::Svg { data: svg, size, tint })
    }

    /// Hit: promotes to most-recently-used. Miss: creates through the cache,
    /// tracks it, then enforces the budget.
    pub fn get_or_create_source(
        &mut self,
        gpu: &mut dyn TextureDevice,
        key: &str,
        source: &RasterSource<'_>,
    ) -> TextureHandle {
        self.get_or_create_at(gpu, key, source, Instant::now())
    }

    fn get_or_create_at(
        &mut self,
        gpu: &mut dyn TextureDevice,
        key: &str,
        source: &RasterSource<'_>,
        now: Instant,
    ) -> TextureHandle {
        if let Some(handle) = self.cache.handle_for_key(key) {
            if let Some(entry) = self.lru.get_mut(&handle) {
                entry.last_used = now;
                self.stats.hits += 1;
                return handle;
            }
        }

        let handle = self.cache.ensure_px(gpu, key, source);
        if !handle.is_valid() {
            self.stats.failures += 1;
            return TextureHandle::INVALID;
        }

        let size = self.cache.texture_size_px(handle);
        let memory_size = size.rgba_bytes();
        if memory_size > self.memory_budget {
            log::warn!(
                "resource manager: {key:?} ({memory_size} bytes) exceeds the budget of {} bytes",
                self.memory_budget
            );
            self.cache.release(gpu, handle);
            self.stats.failures += 1;
            return TextureHandle::INVALID;
        }

        self.lru.push(
            handle,
            CachedTexture { handle, size, last_used: now, memory_size, persistent: false },
        );
        self.memory_used += memory_size;
        self.stats.misses += 1;

        self.enforce_budget(gpu);

        // Persistent entries can leave no room even for a texture that fits
        // the budget on its own; it is then the one evicted.
        if !self.lru.contains(&handle) {
            log::warn!(
                "resource manager: {key:?} ({memory_size} bytes) evicted by persistent textures"
            );
            return TextureHandle::INVALID;
        }
        handle
    }

    // ── budget ────────────────────────────────────────────────────────────

    /// Evicts least-recently-used non-persistent textures until tracked memory
    /// fits the budget. Persistent entries found at the tail are rotated to
    /// the head; once every remaining entry has been rotated, it stops.
    ///
    /// Returns the number of evictions.
    pub fn enforce_budget(&mut self, gpu: &mut dyn TextureDevice) -> usize {
        let mut evicted = 0;
        let mut rotations = 0;

        while self.memory_used > self.memory_budget {
            let Some((handle, persistent)) = self.lru.peek_lru().map(|(h, e)| (*h, e.persistent))
            else {
                break;
            };

            if persistent {
                if rotations >= self.lru.len() {
                    log::debug!(
                        "resource manager: {} persistent textures exceed budget ({} > {})",
                        self.lru.len(),
                        self.memory_used,
                        self.memory_budget
                    );
                    break;
                }
                self.lru.promote(&handle);
                rotations += 1;
                continue;
            }

            rotations = 0;
            if self.evict(gpu, handle) {
                evicted += 1;
            }
        }
        evicted
    }

    /// Changes the budget and immediately re-enforces it.
    pub fn set_memory_budget(&mut self, gpu: &mut dyn TextureDevice, bytes: usize) -> usize {
        self.memory_budget = bytes;
        self.enforce_budget(gpu)
    }

    /// Pins or unpins a tracked texture. Does not change LRU order.
    pub fn set_persistent(&mut self, handle: TextureHandle, persistent: bool) -> bool {
        match self.lru.peek_mut(&handle) {
            Some(entry) => {
                entry.persistent = persistent;
                true
            }
            None => false,
        }
    }

    /// Marks a texture as used this frame without going through the key.
    pub fn touch(&mut self, handle: TextureHandle) -> bool {
        match self.lru.get_mut(&handle) {
            Some(entry) => {
                entry.last_used = Instant::now();
                true
            }
            None => false,
        }
    }

    // ── cleanup ───────────────────────────────────────────────────────────

    /// Evicts every non-persistent texture idle for longer than `max_age`.
    pub fn cleanup_unused(&mut self, gpu: &mut dyn TextureDevice, max_age: Duration) -> usize {
        self.cleanup_unused_at(gpu, max_age, Instant::now())
    }

    /// [`cleanup_unused`](Self::cleanup_unused) with the configured idle age.
    pub fn cleanup_expired(&mut self, gpu: &mut dyn TextureDevice) -> usize {
        self.cleanup_unused(gpu, self.cleanup_max_age)
    }

    fn cleanup_unused_at(
        &mut self,
        gpu: &mut dyn TextureDevice,
        max_age: Duration,
        now: Instant,
    ) -> usize {
        let stale: Vec<TextureHandle> = self
            .lru
            .iter()
            .filter(|(_, e)| !e.persistent && now.saturating_duration_since(e.last_used) > max_age)
            .map(|(h, _)| *h)
            .collect();

        let mut removed = 0;
        for handle in stale {
            if self.evict(gpu, handle) {
                removed += 1;
            }
        }
        if removed > 0 {
            log::debug!("resource manager: cleaned up {removed} idle textures");
        }
        removed
    }

    fn evict(&mut self, gpu: &mut dyn TextureDevice, handle: TextureHandle) -> bool {
        let Some(entry) = self.lru.pop(&handle) else {
            return false;
        };
        self.memory_used -= entry.memory_size;
        self.cache.release(gpu, handle);
        self.stats.evictions += 1;
        log::debug!(
            "resource manager: evicted {handle:?} ({} bytes, {} in use)",
            entry.memory_size,
            self.memory_used
        );
        true
    }

    /// Destroys every texture (see [`TextureCache::release_all`]) and forgets all entries.
    pub fn release_all(&mut self, gpu: Option<&mut dyn TextureDevice>) {
        self.cache.release_all(gpu);
        self.lru.clear();
        self.memory_used = 0;
    }

    // ── accessors ─────────────────────────────────────────────────────────

    #[inline]
    pub fn memory_used(&self) -> usize {
        self.memory_used
    }

    #[inline]
    pub fn memory_budget(&self) -> usize {
        self.memory_budget
    }

    #[inline]
    pub fn stats(&self) -> ResourceStats {
        self.stats
    }

    #[inline]
    pub fn texture_size_px(&self, handle: TextureHandle) -> SizePx {
        self.cache.texture_size_px(handle)
    }

    /// Tracked entry for `handle`, without touching LRU order.
    pub fn get(&self, handle: TextureHandle) -> Option<&CachedTexture> {
        self.lru.peek(&handle)
    }

    #[inline]
    pub fn contains(&self, handle: TextureHandle) -> bool {
        self.lru.contains(&handle)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.lru.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.lru.is_empty()
    }

    /// Underlying cache, e.g. for [`GpuExecutor::draw_frame`](crate::gpu::GpuExecutor::draw_frame).
    #[inline]
    pub fn cache(&self) -> &TextureCache {
        &self.cache
    }

    #[inline]
    pub fn cache_mut(&mut self) -> &mut TextureCache {
        &mut self.cache
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::texture::testing::{FixedRasterizer, RecordingDevice};

    const FONT: FontId = FontId(0);
    const MB: usize = 1024 * 1024;

    /// 362 * 362 * 4 = 524_176 bytes, two fit in 1 MiB, three do not.
    fn half_mb_manager(budget: usize) -> ResourceManager {
        ResourceManager::new(TextureCache::new(FixedRasterizer::new(362, 362)), budget)
    }

    fn request(m: &mut ResourceManager, gpu: &mut RecordingDevice, key: &str) -> TextureHandle {
        m.get_or_create_text(gpu, key, key, FONT, 16.0, Color::WHITE)
    }

    fn tracked_sum(m: &ResourceManager) -> usize {
        m.lru.iter().map(|(_, e)| e.memory_size).sum()
    }

    // ── budget ────────────────────────────────────────────────────────────

    #[test]
    fn third_half_megabyte_texture_evicts_the_first() {
        let mut gpu = RecordingDevice::default();
        let mut m = half_mb_manager(MB);

        let first = request(&mut m, &mut gpu, "a");
        let second = request(&mut m, &mut gpu, "b");
        let third = request(&mut m, &mut gpu, "c");

        assert!(m.memory_used() <= MB);
        assert_eq!(m.stats().evictions, 1);
        assert!(!m.contains(first));
        assert!(m.contains(second));
        assert!(m.contains(third));
        assert_eq!(gpu.destroyed, vec![first]);
        assert_eq!(tracked_sum(&m), m.memory_used());
    }

    #[test]
    fn hit_promotes_to_most_recently_used() {
        let mut gpu = RecordingDevice::default();
        let mut m = half_mb_manager(MB);

        let a = request(&mut m, &mut gpu, "a");
        let b = request(&mut m, &mut gpu, "b");
        assert_eq!(request(&mut m, &mut gpu, "a"), a);
        request(&mut m, &mut gpu, "c");

        assert!(m.contains(a));
        assert!(!m.contains(b));
        assert_eq!(m.stats().hits, 1);
        assert_eq!(m.stats().misses, 3);
    }

    #[test]
    fn persistent_textures_survive_budget_pressure() {
        let mut gpu = RecordingDevice::default();
        let mut m = half_mb_manager(MB);

        let pinned = request(&mut m, &mut gpu, "pinned");
        assert!(m.set_persistent(pinned, true));
        for key in ["a", "b", "c", "d"] {
            request(&mut m, &mut gpu, key);
        }

        assert!(m.contains(pinned));
        assert!(m.memory_used() <= MB);
        assert_eq!(tracked_sum(&m), m.memory_used());
    }

    #[test]
    fn all_persistent_leaves_budget_exceeded() {
        let mut gpu = RecordingDevice::default();
        let mut m = half_mb_manager(MB);

        let a = request(&mut m, &mut gpu, "a");
        let b = request(&mut m, &mut gpu, "b");
        m.set_persistent(a, true);
        m.set_persistent(b, true);

        assert_eq!(m.set_memory_budget(&mut gpu, 1000), 0);
        assert_eq!(m.len(), 2);
        assert!(m.memory_used() > m.memory_budget());
    }

    #[test]
    fn shrinking_budget_evicts_until_it_fits() {
        let mut gpu = RecordingDevice::default();
        let mut m = half_mb_manager(MB);
        request(&mut m, &mut gpu, "a");
        let b = request(&mut m, &mut gpu, "b");

        assert_eq!(m.set_memory_budget(&mut gpu, 600_000), 1);
        assert!(m.contains(b));
        assert_eq!(m.memory_used(), 362 * 362 * 4);
    }

    #[test]
    fn oversized_texture_is_not_handed_out() {
        let mut gpu = RecordingDevice::default();
        let mut m = half_mb_manager(1000);
        let h = request(&mut m, &mut gpu, "huge");
        assert_eq!(h, TextureHandle::INVALID);
        assert_eq!(m.memory_used(), 0);
        assert!(gpu.live.is_empty());
        assert_eq!(m.stats().failures, 1);
    }

    #[test]
    fn oversized_texture_leaves_other_entries_alone() {
        let mut gpu = RecordingDevice::default();
        let mut m = half_mb_manager(1000);
        let small = SizePx::new(10, 10);
        let a = m.get_or_create_svg(&mut gpu, "icon:a", b"<svg/>", small, None);
        let b = m.get_or_create_svg(&mut gpu, "icon:b", b"<svg/>", small, None);
        assert_eq!(m.memory_used(), 800);

        for _ in 0..3 {
            let huge = SizePx::new(100, 100);
            let h = m.get_or_create_svg(&mut gpu, "icon:huge", b"<svg/>", huge, None);
            assert_eq!(h, TextureHandle::INVALID);
        }

        assert!(m.contains(a));
        assert!(m.contains(b));
        assert_eq!(m.len(), 2);
        assert_eq!(m.memory_used(), 800);
        assert_eq!(m.stats().evictions, 0);
        assert_eq!(gpu.live.len(), 2);
        assert!(!m.cache().contains_key("icon:huge"));
    }

    #[test]
    fn new_texture_squeezed_out_by_persistent_entries() {
        let mut gpu = RecordingDevice::default();
        let mut m = half_mb_manager(1000);
        let pinned =
            m.get_or_create_svg(&mut gpu, "icon:pinned", b"<svg/>", SizePx::new(15, 15), None);
        m.set_persistent(pinned, true);

        let h = m.get_or_create_svg(&mut gpu, "icon:new", b"<svg/>", SizePx::new(10, 10), None);
        assert_eq!(h, TextureHandle::INVALID);
        assert!(m.contains(pinned));
        assert_eq!(m.memory_used(), 900);
        assert_eq!(tracked_sum(&m), m.memory_used());
    }

    // ── failures ──────────────────────────────────────────────────────────

    #[test]
    fn failed_creation_is_not_tracked() {
        let mut gpu = RecordingDevice::default();
        let mut m = half_mb_manager(MB);
        let h = m.get_or_create_text(&mut gpu, "empty", "", FONT, 16.0, Color::WHITE);
        assert_eq!(h, TextureHandle::INVALID);
        assert!(m.is_empty());
        assert_eq!(m.memory_used(), 0);
        assert_eq!(m.stats().failures, 1);
    }

    // ── cleanup ───────────────────────────────────────────────────────────

    #[test]
    fn cleanup_removes_only_idle_non_persistent() {
        let mut gpu = RecordingDevice::default();
        let mut m = ResourceManager::new(TextureCache::new(FixedRasterizer::new(4, 4)), MB);
        let t0 = Instant::now();
        let src = RasterSource::Text { text: "x", font: FONT, px: 16.0, color: Color::WHITE };

        let old = m.get_or_create_at(&mut gpu, "old", &src, t0);
        let pinned = m.get_or_create_at(&mut gpu, "pinned", &src, t0);
        let fresh = m.get_or_create_at(&mut gpu, "fresh", &src, t0 + Duration::from_secs(100));
        m.set_persistent(pinned, true);

        let later = t0 + Duration::from_secs(120);
        assert_eq!(m.cleanup_unused_at(&mut gpu, Duration::from_secs(60), later), 1);
        assert!(!m.contains(old));
        assert!(m.contains(pinned));
        assert!(m.contains(fresh));
        assert_eq!(tracked_sum(&m), m.memory_used());
    }

    #[test]
    fn hit_refreshes_idle_time() {
        let mut gpu = RecordingDevice::default();
        let mut m = ResourceManager::new(TextureCache::new(FixedRasterizer::new(4, 4)), MB);
        let t0 = Instant::now();
        let src = RasterSource::Text { text: "x", font: FONT, px: 16.0, color: Color::WHITE };

        let h = m.get_or_create_at(&mut gpu, "k", &src, t0);
        m.get_or_create_at(&mut gpu, "k", &src, t0 + Duration::from_secs(90));

        let later = t0 + Duration::from_secs(120);
        assert_eq!(m.cleanup_unused_at(&mut gpu, Duration::from_secs(60), later), 0);
        assert_eq!(m.get(h).map(|e| e.last_used), Some(t0 + Duration::from_secs(90)));
    }

    // ── release ───────────────────────────────────────────────────────────

    #[test]
    fn release_all_resets_counters_and_destroys() {
        let mut gpu = RecordingDevice::default();
        let mut m = half_mb_manager(MB);
        request(&mut m, &mut gpu, "a");
        request(&mut m, &mut gpu, "b");

        m.release_all(Some(&mut gpu));
        assert!(m.is_empty());
        assert_eq!(m.memory_used(), 0);
        assert!(gpu.live.is_empty());
        assert!(m.cache().is_empty());
    }

    #[test]
    fn with_config_applies_budget() {
        let cfg = RenderConfig { memory_budget_bytes: 4096, ..Default::default() };
        let m = ResourceManager::with_config(FixedRasterizer::new(1, 1), &cfg);
        assert_eq!(m.memory_budget(), 4096);
    }
}
