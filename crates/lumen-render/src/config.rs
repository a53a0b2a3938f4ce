//! Tunables for the cache, resource manager and optimizer.
//!
//! Plain data with `Default`; hosts usually deserialize it from their own
//! settings file and hand it to [`ResourceManager::with_config`] and
//! [`RenderOptimizer::new`].
//!
//! [`ResourceManager::with_config`]: crate::texture::ResourceManager::with_config
//! [`RenderOptimizer::new`]: crate::optimize::RenderOptimizer::new

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default texture memory budget: 64 MiB.
pub const DEFAULT_MEMORY_BUDGET: usize = 64 * 1024 * 1024;

/// Default cap on disjoint dirty rectangles before collapsing to a bounding box.
pub const DEFAULT_MAX_DIRTY_RECTS: usize = 50;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Upper bound for tracked texture bytes (`w * h * 4` per texture).
    pub memory_budget_bytes: usize,

    /// Idle age after which `cleanup_unused` drops non-persistent textures.
    pub cleanup_max_age_secs: u64,

    /// Minimum delay before a key whose rasterization failed is retried.
    ///
    /// `None` retries on every request.
    pub raster_failure_backoff_ms: Option<u64>,

    pub optimizer: OptimizerConfig,
}

impl RenderConfig {
    #[inline]
    pub fn cleanup_max_age(&self) -> Duration {
        Duration::from_secs(self.cleanup_max_age_secs)
    }

    #[inline]
    pub fn raster_failure_backoff(&self) -> Option<Duration> {
        self.raster_failure_backoff_ms.map(Duration::from_millis)
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            memory_budget_bytes: DEFAULT_MEMORY_BUDGET,
            cleanup_max_age_secs: 60,
            raster_failure_backoff_ms: None,
            optimizer: OptimizerConfig::default(),
        }
    }
}

/// Which optimizer passes `optimize_frame_data` runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    /// Drop commands whose rect misses the viewport.
    pub culling: bool,
    /// Sort rounded rects by ascending `y` (painter's order proxy).
    ///
    /// Off by default: it reorders overlapping content.
    pub depth_sort: bool,
    /// Regroup image commands so equal textures are adjacent.
    pub batching: bool,
    pub max_dirty_rects: usize,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            culling: true,
            depth_sort: false,
            batching: true,
            max_dirty_rects: DEFAULT_MAX_DIRTY_RECTS,
        }
    }
}
