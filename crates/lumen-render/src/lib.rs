//! lumen-render: the rendering core between a retained UI tree and wgpu.
//!
//! Per frame, UI nodes append draw intents into a [`frame::FrameBuffer`],
//! which crosses threads through the latest-wins [`frame::FrameBus`]. On the
//! GPU thread, frames are optionally optimized ([`optimize`]), sorted into
//! stages ([`pipeline`]) and drawn by [`gpu::GpuExecutor`]. Text, glyph and
//! icon textures come from [`texture::ResourceManager`], which rasterizes on
//! demand and evicts under a memory budget.
//!
//! Only `FrameBus` is meant to be shared between threads. Everything else
//! belongs to whichever thread owns the GPU context.

pub mod config;
pub mod coords;
pub mod error;
pub mod frame;
pub mod gpu;
pub mod logging;
pub mod node;
pub mod optimize;
pub mod paint;
pub mod pipeline;
pub mod text;
pub mod texture;

pub use config::{OptimizerConfig, RenderConfig};
