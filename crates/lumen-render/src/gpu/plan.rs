use std::ops::Range;

use bytemuck::{Pod, Zeroable};

use crate::coords::{Rect, SizePx};
use crate::frame::{FrameBuffer, ImageCommand, RoundedRectCommand};
use crate::pipeline::{RenderPipeline, RenderStage, StageSink};
use crate::texture::{TextureCache, TextureHandle};

use super::transform::{clip_to_scissor, logical_to_device, sanitize_dpr, ScissorRect};

// ── instance layouts ──────────────────────────────────────────────────────

/// Rounded rect instance, device pixels (40 bytes):
///
///  offset  0  origin      [f32; 2]   loc 1
///  offset  8  size        [f32; 2]   loc 2
///  offset 16  radius_pad  [f32; 2]   loc 3  (.x = radius)
///  offset 24  color       [f32; 4]   loc 4  (premultiplied)
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct RoundedRectInstance {
    pub origin: [f32; 2],
    pub size: [f32; 2],
    pub radius_pad: [f32; 2],
    pub color: [f32; 4],
}

impl RoundedRectInstance {
    const ATTRS: [wgpu::VertexAttribute; 4] = wgpu::vertex_attr_array![
        1 => Float32x2, // origin
        2 => Float32x2, // size
        3 => Float32x2, // radius_pad
        4 => Float32x4  // color
    ];

    pub(super) fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<RoundedRectInstance>() as u64,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &Self::ATTRS,
        }
    }

    /// Device-space rect this instance covers.
    pub fn rect(&self) -> Rect {
        Rect::new(self.origin[0], self.origin[1], self.size[0], self.size[1])
    }
}

/// Textured quad instance, device pixels (48 bytes):
///
///  offset  0  origin  [f32; 2]   loc 1
///  offset  8  size    [f32; 2]   loc 2
///  offset 16  uv_min  [f32; 2]   loc 3
///  offset 24  uv_max  [f32; 2]   loc 4
///  offset 32  tint    [f32; 4]   loc 5  (premultiplied)
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct ImageInstance {
    pub origin: [f32; 2],
    pub size: [f32; 2],
    pub uv_min: [f32; 2],
    pub uv_max: [f32; 2],
    pub tint: [f32; 4],
}

impl ImageInstance {
    const ATTRS: [wgpu::VertexAttribute; 5] = wgpu::vertex_attr_array![
        1 => Float32x2, // origin
        2 => Float32x2, // size
        3 => Float32x2, // uv_min
        4 => Float32x2, // uv_max
        5 => Float32x4  // tint
    ];

    pub(super) fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<ImageInstance>() as u64,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &Self::ATTRS,
        }
    }

    pub fn rect(&self) -> Rect {
        Rect::new(self.origin[0], self.origin[1], self.size[0], self.size[1])
    }
}

// ── plan ──────────────────────────────────────────────────────────────────

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum DrawKind {
    RoundedRect,
    Image(TextureHandle),
}

/// One instanced draw under one scissor configuration.
///
/// `instances` indexes the plan's instance list for `kind`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrawCall {
    pub kind: DrawKind,
    pub scissor: ScissorRect,
    pub instances: Range<u32>,
}

impl DrawCall {
    #[inline]
    pub fn instance_count(&self) -> u32 {
        self.instances.end - self.instances.start
    }
}

/// Everything the executor needs to encode one frame, computed on the CPU.
///
/// Consecutive commands of the same kind (and texture) with an identical
/// scissor are merged into one call, so a clip shared by a run of commands
/// is configured once.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DrawPlan {
    pub framebuffer: SizePx,
    pub rounded_rects: Vec<RoundedRectInstance>,
    pub images: Vec<ImageInstance>,
    pub calls: Vec<DrawCall>,
    /// Commands dropped as degenerate, invalid or fully clipped.
    pub skipped: usize,
}

impl DrawPlan {
    pub fn new(framebuffer: SizePx) -> Self {
        Self { framebuffer, ..Default::default() }
    }

    /// Commands that will reach the GPU.
    #[inline]
    pub fn command_count(&self) -> usize {
        self.rounded_rects.len() + self.images.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    pub fn push_rounded_rect(&mut self, cmd: &RoundedRectCommand, dpr: f32) -> bool {
        let dpr = sanitize_dpr(dpr);
        let rect = logical_to_device(cmd.rect.normalized(), dpr);
        if rect.is_empty() || !rect.is_finite() || !cmd.color.is_finite() {
            self.skipped += 1;
            return false;
        }
        let Some(scissor) = clip_to_scissor(cmd.clip, dpr, self.framebuffer) else {
            self.skipped += 1;
            return false;
        };

        let max_radius = rect.size.x.min(rect.size.y) * 0.5;
        let radius = (cmd.radius * dpr).clamp(0.0, max_radius);

        let index = self.rounded_rects.len() as u32;
        self.rounded_rects.push(RoundedRectInstance {
            origin: [rect.origin.x, rect.origin.y],
            size: [rect.size.x, rect.size.y],
            radius_pad: [if radius.is_finite() { radius } else { 0.0 }, 0.0],
            color: cmd.color.to_array(),
        });
        self.push_call(DrawKind::RoundedRect, scissor, index);
        true
    }

    /// `texture_size` is the texture's pixel size; empty means unknown and
    /// the command is skipped.
    pub fn push_image(&mut self, cmd: &ImageCommand, texture_size: SizePx, dpr: f32) -> bool {
        if !cmd.texture.is_valid() || texture_size.is_empty() {
            self.skipped += 1;
            return false;
        }
        let dpr = sanitize_dpr(dpr);
        let rect = logical_to_device(cmd.rect.normalized(), dpr);
        if rect.is_empty() || !rect.is_finite() {
            self.skipped += 1;
            return false;
        }
        let Some(scissor) = clip_to_scissor(cmd.clip, dpr, self.framebuffer) else {
            self.skipped += 1;
            return false;
        };

        let (uv_min, uv_max) = source_uv(cmd.src_px, texture_size);
        let index = self.images.len() as u32;
        self.images.push(ImageInstance {
            origin: [rect.origin.x, rect.origin.y],
            size: [rect.size.x, rect.size.y],
            uv_min,
            uv_max,
            tint: cmd.tint.to_array(),
        });
        self.push_call(DrawKind::Image(cmd.texture), scissor, index);
        true
    }

    fn push_call(&mut self, kind: DrawKind, scissor: ScissorRect, index: u32) {
        if let Some(last) = self.calls.last_mut() {
            if last.kind == kind && last.scissor == scissor && last.instances.end == index {
                last.instances.end += 1;
                return;
            }
        }
        self.calls.push(DrawCall { kind, scissor, instances: index..index + 1 });
    }
}

/// Texture coordinates for a source rect in texture pixels. Empty = whole texture.
fn source_uv(src_px: Rect, texture: SizePx) -> ([f32; 2], [f32; 2]) {
    let src = src_px.normalized();
    if src.is_empty() {
        return ([0.0, 0.0], [1.0, 1.0]);
    }
    let w = texture.width as f32;
    let h = texture.height as f32;
    let min = [(src.origin.x / w).clamp(0.0, 1.0), (src.origin.y / h).clamp(0.0, 1.0)];
    let max = [(src.max().x / w).clamp(0.0, 1.0), (src.max().y / h).clamp(0.0, 1.0)];
    (min, max)
}

// ── planning ──────────────────────────────────────────────────────────────

/// Plans a frame: all rounded rects, then all images, each in source order.
pub fn plan_frame(
    frame: &FrameBuffer,
    cache: &TextureCache,
    dpr: f32,
    framebuffer: SizePx,
) -> DrawPlan {
    let mut plan = DrawPlan::new(framebuffer);
    for cmd in &frame.rounded_rects {
        plan.push_rounded_rect(cmd, dpr);
    }
    for cmd in &frame.images {
        plan.push_image(cmd, cache.texture_size_px(cmd.texture), dpr);
    }
    plan
}

/// Plans a staged pipeline in stage order (see [`RenderPipeline::execute_all`]).
pub fn plan_pipeline(
    pipeline: &RenderPipeline,
    cache: &TextureCache,
    dpr: f32,
    framebuffer: SizePx,
) -> DrawPlan {
    let mut planner = Planner { plan: DrawPlan::new(framebuffer), cache, dpr };
    pipeline.execute_all(&mut planner);
    planner.plan
}

struct Planner<'a> {
    plan: DrawPlan,
    cache: &'a TextureCache,
    dpr: f32,
}

impl StageSink for Planner<'_> {
    fn rounded_rect(&mut self, _stage: RenderStage, cmd: &RoundedRectCommand) {
        self.plan.push_rounded_rect(cmd, self.dpr);
    }

    fn image(&mut self, _stage: RenderStage, cmd: &ImageCommand) {
        let size = self.cache.texture_size_px(cmd.texture);
        self.plan.push_image(cmd, size, self.dpr);
    }
}
