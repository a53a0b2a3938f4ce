use indexmap::IndexMap;

use crate::config::OptimizerConfig;
use crate::coords::Rect;
use crate::frame::{FrameBuffer, ImageCommand, RoundedRectCommand};
use crate::texture::TextureHandle;

use super::DirtyRegion;

/// Image commands sharing one texture, in submission order.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageBatch {
    pub texture: TextureHandle,
    pub commands: Vec<ImageCommand>,
}

/// Summary of the last [`RenderOptimizer::optimize_frame_data`] call.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct OptimizationStats {
    /// Commands in the frame before optimization.
    pub total_commands: usize,
    pub culled_commands: usize,
    pub image_batches: usize,
    /// Image commands that ended up in a batch.
    pub batched_commands: usize,
}

impl OptimizationStats {
    /// Fraction of commands removed by culling.
    pub fn cull_ratio(&self) -> f32 {
        if self.total_commands == 0 {
            0.0
        } else {
            self.culled_commands as f32 / self.total_commands as f32
        }
    }

    /// Average image commands per texture bind.
    pub fn batch_efficiency(&self) -> f32 {
        if self.image_batches == 0 {
            0.0
        } else {
            self.batched_commands as f32 / self.image_batches as f32
        }
    }
}

/// Viewport culling, optional depth sort and texture batching for whole frames,
/// plus dirty-region bookkeeping for partial redraw.
#[derive(Debug, Clone)]
pub struct RenderOptimizer {
    viewport: Rect,
    config: OptimizerConfig,
    dirty: DirtyRegion,
    stats: OptimizationStats,
}

impl RenderOptimizer {
    pub fn new(viewport: Rect, config: OptimizerConfig) -> Self {
        let dirty = DirtyRegion::new(config.max_dirty_rects);
        Self { viewport, config, dirty, stats: OptimizationStats::default() }
    }

    #[inline]
    pub fn viewport(&self) -> Rect {
        self.viewport
    }

    /// Changing the viewport invalidates all of it.
    pub fn set_viewport(&mut self, viewport: Rect) {
        if self.viewport != viewport {
            self.viewport = viewport;
            self.mark_all_dirty();
        }
    }

    #[inline]
    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    // ── dirty tracking ────────────────────────────────────────────────────

    /// Adds `rect` (clipped to the viewport) to the dirty region.
    pub fn mark_dirty(&mut self, rect: Rect) {
        if let Some(visible) = rect.intersect(self.viewport) {
            self.dirty.add(visible);
        }
    }

    pub fn mark_all_dirty(&mut self) {
        self.dirty.clear();
        self.dirty.add(self.viewport);
    }

    #[inline]
    pub fn dirty_region(&self) -> &DirtyRegion {
        &self.dirty
    }

    pub fn clear_dirty(&mut self) {
        self.dirty.clear();
    }

    /// `true` if content at `rect` has to be redrawn this frame.
    #[inline]
    pub fn needs_redraw(&self, rect: Rect) -> bool {
        self.dirty.intersects(rect)
    }

    // ── passes ────────────────────────────────────────────────────────────

    /// Keeps the commands whose rect intersects the viewport.
    pub fn cull_rounded_rects(&self, cmds: &mut Vec<RoundedRectCommand>) -> usize {
        let before = cmds.len();
        cmds.retain(|c| c.rect.intersects(self.viewport));
        before - cmds.len()
    }

    pub fn cull_images(&self, cmds: &mut Vec<ImageCommand>) -> usize {
        let before = cmds.len();
        cmds.retain(|c| c.rect.intersects(self.viewport));
        before - cmds.len()
    }

    /// Stable sort by ascending top edge.
    pub fn depth_sort(cmds: &mut [RoundedRectCommand]) {
        cmds.sort_by(|a, b| a.rect.origin.y.total_cmp(&b.rect.origin.y));
    }

    /// Groups commands by texture, batches ordered by first appearance.
    pub fn batch_images(cmds: &[ImageCommand]) -> Vec<ImageBatch> {
        let mut groups: IndexMap<TextureHandle, Vec<ImageCommand>> = IndexMap::new();
        for cmd in cmds {
            groups.entry(cmd.texture).or_default().push(cmd.clone());
        }
        groups
            .into_iter()
            .map(|(texture, commands)| ImageBatch { texture, commands })
            .collect()
    }

    /// Runs the enabled passes over `frame` in place and records stats.
    ///
    /// With batching on, images are rewritten batch by batch so equal
    /// textures are adjacent for the executor.
    pub fn optimize_frame_data(&mut self, frame: &mut FrameBuffer) -> OptimizationStats {
        let mut stats = OptimizationStats { total_commands: frame.len(), ..Default::default() };

        if self.config.culling {
            stats.culled_commands += self.cull_rounded_rects(&mut frame.rounded_rects);
            stats.culled_commands += self.cull_images(&mut frame.images);
        }

        if self.config.depth_sort {
            Self::depth_sort(&mut frame.rounded_rects);
        }

        if self.config.batching && !frame.images.is_empty() {
            let batches = Self::batch_images(&frame.images);
            stats.image_batches = batches.len();
            stats.batched_commands = frame.images.len();

            frame.images.clear();
            for batch in batches {
                frame.images.extend(batch.commands);
            }
        }

        log::trace!(
            "optimizer: {} commands, {} culled, {} image batches",
            stats.total_commands,
            stats.culled_commands,
            stats.image_batches
        );
        self.stats = stats;
        stats
    }

    #[inline]
    pub fn stats(&self) -> OptimizationStats {
        self.stats
    }
}
