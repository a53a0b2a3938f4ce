use std::collections::HashMap;

use wgpu::util::DeviceExt;

use crate::coords::SizePx;
use crate::frame::FrameBuffer;
use crate::pipeline::RenderPipeline;
use crate::texture::{TextureCache, TextureHandle};

use super::common::{
    premul_alpha_blend, triangle_list, viewport_ubo_binding_size, InstanceBuffer, QuadVertex,
    ViewportUniform, QUAD_INDICES, QUAD_VERTICES,
};
use super::plan::{
    plan_frame, plan_pipeline, DrawKind, DrawPlan, ImageInstance, RoundedRectInstance,
};
use super::GpuContext;

/// Target for drawing (encoder + color view).
///
/// The executor loads existing contents; clearing is the presenter's job.
pub struct RenderTarget<'a> {
    pub encoder: &'a mut wgpu::CommandEncoder,
    pub color_view: &'a wgpu::TextureView,
}

impl<'a> RenderTarget<'a> {
    #[inline]
    pub fn new(encoder: &'a mut wgpu::CommandEncoder, color_view: &'a wgpu::TextureView) -> Self {
        Self { encoder, color_view }
    }
}

/// GPU objects owned by an initialized executor.
struct ExecutorState {
    format: wgpu::TextureFormat,

    rounded_pipeline: wgpu::RenderPipeline,
    image_pipeline: wgpu::RenderPipeline,

    viewport_ubo: wgpu::Buffer,
    viewport_bind_group: wgpu::BindGroup,
    texture_bgl: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,

    quad_vbo: wgpu::Buffer,
    quad_ibo: wgpu::Buffer,

    rounded_instances: InstanceBuffer,
    image_instances: InstanceBuffer,

    /// Per-texture bind groups; entries whose texture is gone are pruned each draw.
    texture_bind_groups: HashMap<TextureHandle, wgpu::BindGroup>,
}

/// Encodes frames and staged pipelines into a single render pass.
///
/// Two pipelines: SDF rounded rects and tint-multiplied textured quads, both
/// drawn as instanced unit quads. Drawing before [`initialize`](Self::initialize)
/// (or after [`release`](Self::release)) is a no-op.
#[derive(Default)]
pub struct GpuExecutor {
    state: Option<ExecutorState>,
    framebuffer: SizePx,
}

impl GpuExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    // ── lifecycle ─────────────────────────────────────────────────────────

    /// Creates shaders, pipelines and static buffers for `ctx`.
    ///
    /// Calling again with the same target format does nothing; a different
    /// format rebuilds everything.
    pub fn initialize(&mut self, ctx: &GpuContext) {
        if self.state.as_ref().is_some_and(|s| s.format == ctx.format()) {
            return;
        }
        self.state = Some(ExecutorState::new(ctx));
        log::debug!("GPU executor initialized for {:?}", ctx.format());
    }

    /// Drops every GPU object. Must run before the owning context is destroyed.
    pub fn release(&mut self) {
        if self.state.take().is_some() {
            log::debug!("GPU executor released");
        }
    }

    #[inline]
    pub fn is_initialized(&self) -> bool {
        self.state.is_some()
    }

    /// Sets the framebuffer size in device pixels.
    pub fn resize(&mut self, width_px: u32, height_px: u32) {
        self.framebuffer = SizePx::new(width_px, height_px);
    }

    #[inline]
    pub fn framebuffer_size(&self) -> SizePx {
        self.framebuffer
    }

    // ── drawing ───────────────────────────────────────────────────────────

    /// Draws rounded rects then images, each in source order.
    ///
    /// Returns the number of commands issued.
    pub fn draw_frame(
        &mut self,
        ctx: &GpuContext,
        target: &mut RenderTarget<'_>,
        frame: &FrameBuffer,
        cache: &TextureCache,
        dpr: f32,
    ) -> usize {
        if self.state.is_none() {
            return 0;
        }
        let plan = plan_frame(frame, cache, dpr, self.framebuffer);
        self.draw_plan(ctx, target, &plan)
    }

    /// Draws every stage of `pipeline` in order.
    pub fn draw_pipeline(
        &mut self,
        ctx: &GpuContext,
        target: &mut RenderTarget<'_>,
        pipeline: &RenderPipeline,
        cache: &TextureCache,
        dpr: f32,
    ) -> usize {
        if self.state.is_none() {
            return 0;
        }
        let plan = plan_pipeline(pipeline, cache, dpr, self.framebuffer);
        self.draw_plan(ctx, target, &plan)
    }

    /// Encodes a prepared plan. Returns the number of instances drawn.
    pub fn draw_plan(
        &mut self,
        ctx: &GpuContext,
        target: &mut RenderTarget<'_>,
        plan: &DrawPlan,
    ) -> usize {
        let Some(state) = self.state.as_mut() else { return 0; };
        if plan.is_empty() || plan.framebuffer.is_empty() {
            return 0;
        }
        state.encode(ctx, target, plan)
    }
}

impl ExecutorState {
    fn new(ctx: &GpuContext) -> Self {
        let device = ctx.device();

        let viewport_bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("lumen viewport bgl"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: viewport_ubo_binding_size(),
                },
                count: None,
            }],
        });

        let texture_bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("lumen image texture bgl"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let rounded_pipeline = create_pipeline(
            ctx,
            "rounded_rect",
            include_str!("shaders/rounded_rect.wgsl"),
            &[&viewport_bgl],
            RoundedRectInstance::layout(),
        );
        let image_pipeline = create_pipeline(
            ctx,
            "image",
            include_str!("shaders/image.wgsl"),
            &[&viewport_bgl, &texture_bgl],
            ImageInstance::layout(),
        );

        let viewport_ubo = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("lumen viewport ubo"),
            size: std::mem::size_of::<ViewportUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let viewport_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("lumen viewport bind group"),
            layout: &viewport_bgl,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: viewport_ubo.as_entire_binding(),
            }],
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("lumen image sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::MipmapFilterMode::Nearest,
            ..Default::default()
        });

        let quad_vbo = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("lumen quad vbo"),
            contents: bytemuck::cast_slice(&QUAD_VERTICES),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let quad_ibo = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("lumen quad ibo"),
            contents: bytemuck::cast_slice(&QUAD_INDICES),
            usage: wgpu::BufferUsages::INDEX,
        });

        Self {
            format: ctx.format(),
            rounded_pipeline,
            image_pipeline,
            viewport_ubo,
            viewport_bind_group,
            texture_bgl,
            sampler,
            quad_vbo,
            quad_ibo,
            rounded_instances: InstanceBuffer::default(),
            image_instances: InstanceBuffer::default(),
            texture_bind_groups: HashMap::new(),
        }
    }

    fn encode(
        &mut self,
        ctx: &GpuContext,
        target: &mut RenderTarget<'_>,
        plan: &DrawPlan,
    ) -> usize {
        let fb = plan.framebuffer;

        // Mutating work first; the render pass below only borrows immutably.
        let uniform = ViewportUniform { size: [fb.width as f32, fb.height as f32], _pad: [0.0; 2] };
        ctx.queue().write_buffer(&self.viewport_ubo, 0, bytemuck::bytes_of(&uniform));
        self.rounded_instances.write(
            ctx.device(),
            ctx.queue(),
            "lumen rounded_rect instances",
            &plan.rounded_rects,
        );
        self.image_instances.write(
            ctx.device(),
            ctx.queue(),
            "lumen image instances",
            &plan.images,
        );
        self.sync_texture_bind_groups(ctx, plan);

        let mut rpass = target.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("lumen draw pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target.color_view,
                resolve_target: None,
                ops: wgpu::Operations { load: wgpu::LoadOp::Load, store: wgpu::StoreOp::Store },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        rpass.set_bind_group(0, &self.viewport_bind_group, &[]);
        rpass.set_vertex_buffer(0, self.quad_vbo.slice(..));
        rpass.set_index_buffer(self.quad_ibo.slice(..), wgpu::IndexFormat::Uint16);

        let mut bound: Option<DrawKind> = None;
        let mut issued = 0usize;

        for call in &plan.calls {
            match call.kind {
                DrawKind::RoundedRect => {
                    let Some(instances) = self.rounded_instances.buffer() else { continue; };
                    if !matches!(bound, Some(DrawKind::RoundedRect)) {
                        rpass.set_pipeline(&self.rounded_pipeline);
                        rpass.set_vertex_buffer(1, instances.slice(..));
                    }
                }
                DrawKind::Image(handle) => {
                    let Some(instances) = self.image_instances.buffer() else { continue; };
                    let Some(bind_group) = self.texture_bind_groups.get(&handle) else { continue; };
                    if !matches!(bound, Some(DrawKind::Image(_))) {
                        rpass.set_pipeline(&self.image_pipeline);
                        rpass.set_vertex_buffer(1, instances.slice(..));
                    }
                    rpass.set_bind_group(1, bind_group, &[]);
                }
            }
            bound = Some(call.kind);

            let s = call.scissor;
            rpass.set_scissor_rect(s.x, s.y, s.width, s.height);
            rpass.draw_indexed(0..6, 0, call.instances.clone());
            issued += call.instance_count() as usize;
        }
        issued
    }

    /// Creates bind groups for textures in `plan` and drops those whose texture is gone.
    fn sync_texture_bind_groups(&mut self, ctx: &GpuContext, plan: &DrawPlan) {
        self.texture_bind_groups.retain(|handle, _| ctx.contains_texture(*handle));

        for call in &plan.calls {
            let DrawKind::Image(handle) = call.kind else { continue; };
            if self.texture_bind_groups.contains_key(&handle) {
                continue;
            }
            let Some(view) = ctx.texture_view(handle) else {
                log::debug!("GPU executor: {handle:?} has no GPU texture; skipping");
                continue;
            };
            let bind_group = ctx.device().create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("lumen image bind group"),
                layout: &self.texture_bgl,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureView(view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::Sampler(&self.sampler),
                    },
                ],
            });
            self.texture_bind_groups.insert(handle, bind_group);
        }
    }
}

fn create_pipeline(
    ctx: &GpuContext,
    name: &str,
    source: &str,
    bind_group_layouts: &[&wgpu::BindGroupLayout],
    instance_layout: wgpu::VertexBufferLayout<'static>,
) -> wgpu::RenderPipeline {
    let device = ctx.device();

    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(&format!("lumen {name} shader")),
        source: wgpu::ShaderSource::Wgsl(source.into()),
    });

    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(&format!("lumen {name} pipeline layout")),
        bind_group_layouts,
        immediate_size: 0,
    });

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(&format!("lumen {name} pipeline")),
        layout: Some(&layout),
        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: Some("vs_main"),
            compilation_options: Default::default(),
            buffers: &[QuadVertex::layout(), instance_layout],
        },
        fragment: Some(wgpu::FragmentState {
            module: &shader,
            entry_point: Some("fs_main"),
            compilation_options: Default::default(),
            targets: &[Some(wgpu::ColorTargetState {
                format: ctx.format(),
                blend: Some(premul_alpha_blend()),
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),
        primitive: triangle_list(),
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        multiview_mask: None,
        cache: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::Rect;
    use crate::paint::Color;
    use crate::texture::testing::FixedRasterizer;

    #[test]
    fn uninitialized_executor_is_a_no_op() {
        let exec = GpuExecutor::new();
        assert!(!exec.is_initialized());
        assert_eq!(exec.framebuffer_size(), SizePx::ZERO);
    }

    #[test]
    fn resize_updates_framebuffer() {
        let mut exec = GpuExecutor::new();
        exec.resize(1280, 720);
        assert_eq!(exec.framebuffer_size(), SizePx::new(1280, 720));
    }

    /// Needs a GPU adapter; skipped silently when none is available.
    #[test]
    fn headless_draw_issues_planned_commands() {
        let Ok(mut ctx) = GpuContext::new_headless(wgpu::TextureFormat::Rgba8Unorm) else {
            return;
        };

        let mut exec = GpuExecutor::new();
        exec.initialize(&ctx);
        exec.initialize(&ctx);
        assert!(exec.is_initialized());
        exec.resize(64, 64);

        let mut cache = TextureCache::new(FixedRasterizer::new(4, 4));
        let tex = cache.ensure_svg_px(&mut ctx, "icon", b"", SizePx::new(8, 8), None);
        assert!(tex.is_valid());

        let mut frame = FrameBuffer::new();
        frame.push_solid_rounded_rect(Rect::new(0.0, 0.0, 32.0, 16.0), 4.0, Color::WHITE);
        frame.push_texture(Rect::new(8.0, 8.0, 8.0, 8.0), tex);
        frame.push_texture(Rect::new(0.0, 0.0, 8.0, 8.0), TextureHandle::INVALID);

        let target_tex = ctx.device().create_texture(&wgpu::TextureDescriptor {
            label: Some("test target"),
            size: wgpu::Extent3d { width: 64, height: 64, depth_or_array_layers: 1 },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8Unorm,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = target_tex.create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = ctx.device().create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("test encoder"),
        });

        let issued = {
            let mut target = RenderTarget::new(&mut encoder, &view);
            exec.draw_frame(&ctx, &mut target, &frame, &cache, 1.0)
        };
        ctx.queue().submit(std::iter::once(encoder.finish()));
        assert_eq!(issued, 2);

        cache.release_all(Some(&mut ctx));
        assert_eq!(ctx.texture_count(), 0);
        exec.release();
        assert!(!exec.is_initialized());
    }
}
