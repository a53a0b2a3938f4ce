//! CPU-side frame optimization: dirty-region tracking, viewport culling,
//! depth sorting and texture batching.
//!
//! Everything here is a performance pass. With a viewport that contains all
//! content, the output draws exactly what the input would.

mod dirty;
mod optimizer;

pub use dirty::DirtyRegion;
pub use optimizer::{ImageBatch, OptimizationStats, RenderOptimizer};
