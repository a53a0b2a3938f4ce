use std::collections::HashMap;

use anyhow::{Context, Result};

use crate::coords::SizePx;
use crate::texture::{TextureDevice, TextureHandle};

struct GpuTexture {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
}

/// A wgpu device + queue and every texture created through it.
///
/// This is the explicit context handle handed to the texture layer. Handles
/// are allocated from a counter and never reused, so a stale handle can
/// never alias a newer texture.
pub struct GpuContext {
    device: wgpu::Device,
    queue: wgpu::Queue,
    format: wgpu::TextureFormat,

    textures: HashMap<TextureHandle, GpuTexture>,
    next_handle: u32,
}

impl GpuContext {
    /// Wraps an existing device (e.g. one owned by a windowed surface).
    ///
    /// `format` is the color format of the targets the executor draws into.
    pub fn new(device: wgpu::Device, queue: wgpu::Queue, format: wgpu::TextureFormat) -> Self {
        Self { device, queue, format, textures: HashMap::new(), next_handle: 1 }
    }

    /// Creates a device without a surface, for offscreen rendering and tests.
    pub fn new_headless(format: wgpu::TextureFormat) -> Result<Self> {
        pollster::block_on(Self::request_headless(format))
    }

    async fn request_headless(format: wgpu::TextureFormat) -> Result<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .context("failed to find a suitable GPU adapter")?;

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("lumen-render headless device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                experimental_features: wgpu::ExperimentalFeatures::disabled(),
                memory_hints: wgpu::MemoryHints::Performance,
                trace: wgpu::Trace::Off,
            })
            .await
            .context("failed to create wgpu device/queue")?;

        log::info!("headless GPU context on {:?}", adapter.get_info().name);
        Ok(Self::new(device, queue, format))
    }

    #[inline]
    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    #[inline]
    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    /// Color format of the render targets.
    #[inline]
    pub fn format(&self) -> wgpu::TextureFormat {
        self.format
    }

    pub fn texture_view(&self, handle: TextureHandle) -> Option<&wgpu::TextureView> {
        self.textures.get(&handle).map(|t| &t.view)
    }

    #[inline]
    pub fn contains_texture(&self, handle: TextureHandle) -> bool {
        self.textures.contains_key(&handle)
    }

    #[inline]
    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }

    fn allocate_handle(&mut self) -> Option<TextureHandle> {
        let handle = TextureHandle(self.next_handle);
        self.next_handle = self.next_handle.checked_add(1)?;
        Some(handle)
    }
}

impl TextureDevice for GpuContext {
    fn upload_rgba(&mut self, size: SizePx, rgba: &[u8]) -> Option<TextureHandle> {
        let max = self.device.limits().max_texture_dimension_2d;
        if size.is_empty() || size.width > max || size.height > max {
            log::warn!("refusing {}x{} texture (max edge {max})", size.width, size.height);
            return None;
        }
        if rgba.len() != size.rgba_bytes() {
            log::warn!(
                "texture upload size mismatch: {} bytes for {}x{}",
                rgba.len(),
                size.width,
                size.height
            );
            return None;
        }

        let Some(handle) = self.allocate_handle() else {
            log::error!("texture handle space exhausted");
            return None;
        };

        let extent = wgpu::Extent3d {
            width: size.width,
            height: size.height,
            depth_or_array_layers: 1,
        };
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("lumen-render cached texture"),
            size: extent,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        self.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            rgba,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(size.width * 4),
                rows_per_image: Some(size.height),
            },
            extent,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        self.textures.insert(handle, GpuTexture { texture, view });
        Some(handle)
    }

    fn destroy_texture(&mut self, handle: TextureHandle) {
        if let Some(t) = self.textures.remove(&handle) {
            t.texture.destroy();
        }
    }
}

impl Drop for GpuContext {
    fn drop(&mut self) {
        if !self.textures.is_empty() {
            log::debug!("GPU context dropped with {} live textures", self.textures.len());
        }
    }
}
