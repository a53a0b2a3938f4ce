//! wgpu backend: GPU context + texture registry, coordinate transforms,
//! draw planning and the executor that encodes plans into render passes.
//!
//! Flow per presented frame:
//!   FrameBuffer / RenderPipeline
//!     → DrawPlan (CPU: device pixels, scissors, instance data)
//!     → GpuExecutor (GPU: one render pass, one instanced draw per call)

mod common;
mod context;
mod executor;
mod plan;
mod transform;

pub use context::GpuContext;
pub use executor::{GpuExecutor, RenderTarget};
pub use plan::{
    plan_frame, plan_pipeline, DrawCall, DrawKind, DrawPlan, ImageInstance, RoundedRectInstance,
};
pub use transform::{
    clip_to_scissor, device_to_logical, device_to_ndc, logical_to_device, ScissorRect,
};
