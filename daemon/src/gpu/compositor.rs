use crate::gpu::context::SurfaceTarget;
use crate::gpu::{GpuContext, GpuTexture};

use anyhow::Result;
use bytemuck::{Pod, Zeroable};
use common::{Rect, WeaverError};
use image::RgbaImage;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};

pub const VERTICES_PER_QUAD: usize = 6;

/// Vertex of a textured quad, position in clip space
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct QuadVertex {
    pub position: [f32; 2],
    pub uv: [f32; 2],
}

impl QuadVertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 2] =
        wgpu::vertex_attr_array![0 => Float32x2, 1 => Float32x2];

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<QuadVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

/// Two triangles covering `dst` on a `surface_width`x`surface_height`
/// surface whose origin is the top-left corner. Parts outside the surface
/// land outside clip space and are clipped by the rasterizer.
pub fn quad_vertices(dst: Rect, surface_width: u32, surface_height: u32) -> [QuadVertex; 6] {
    let sw = surface_width.max(1) as f32;
    let sh = surface_height.max(1) as f32;

    let left = dst.x as f32 / sw * 2.0 - 1.0;
    let right = dst.right() as f32 / sw * 2.0 - 1.0;
    let top = 1.0 - dst.y as f32 / sh * 2.0;
    let bottom = 1.0 - dst.bottom() as f32 / sh * 2.0;

    let v = |x: f32, y: f32, u: f32, w: f32| QuadVertex {
        position: [x, y],
        uv: [u, w],
    };

    [
        v(left, top, 0.0, 0.0),
        v(left, bottom, 0.0, 1.0),
        v(right, top, 1.0, 0.0),
        v(right, top, 1.0, 0.0),
        v(left, bottom, 0.0, 1.0),
        v(right, bottom, 1.0, 1.0),
    ]
}

/// sRGB byte to the linear value wgpu expects for clear colours.
fn srgb_to_linear(c: u8) -> f64 {
    let c = c as f64 / 255.0;
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

/// Texture at binding 0, filtering sampler at binding 1, both fragment-only.
fn create_texture_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("Quad Texture Layout"),
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
    })
}

/// Alpha-blended textured triangle list drawing into `format`.
fn create_quad_pipeline(
    device: &wgpu::Device,
    texture_layout: &wgpu::BindGroupLayout,
    format: wgpu::TextureFormat,
) -> wgpu::RenderPipeline {
    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("Quad Shader"),
        source: wgpu::ShaderSource::Wgsl(include_str!("shaders/quad.wgsl").into()),
    });

    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("Quad Pipeline Layout"),
        bind_group_layouts: &[texture_layout],
        immediate_size: 0,
    });

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("Quad Pipeline"),
        layout: Some(&layout),
        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: Some("vs_main"),
            buffers: &[QuadVertex::layout()],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: &shader,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        primitive: wgpu::PrimitiveState::default(),
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        multiview_mask: None,
        cache: None,
    })
}

/// Batches one textured quad per drawn view and presents them in one pass.
pub struct Compositor {
    context: GpuContext,
    surface: wgpu::Surface<'static>,
    config: wgpu::SurfaceConfiguration,
    pipeline: wgpu::RenderPipeline,
    texture_bind_group_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    vertex_buffer: wgpu::Buffer,
    /// Quads queued since the last `begin_frame`
    vertices: Vec<QuadVertex>,
    draws: Vec<wgpu::BindGroup>,
    clear_color: wgpu::Color,
    resident_bytes: u64,
}

impl Compositor {
    /// Create a compositor presenting to `target`.
    ///
    /// # Safety
    ///
    /// The display and window behind `target` must outlive the compositor.
    pub unsafe fn new<T>(
        target: &T,
        width: u32,
        height: u32,
        vsync: bool,
        clear_color: [u8; 3],
    ) -> Result<Self>
    where
        T: HasDisplayHandle + HasWindowHandle,
    {
        // SAFETY: forwarded from the caller
        let (context, SurfaceTarget { surface, config }) =
            unsafe { GpuContext::with_surface(target, width, height, vsync)? };
        context.capabilities().log_info();

        let texture_bind_group_layout = create_texture_bind_group_layout(&context.device);

        let sampler = context.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Texture Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::MipmapFilterMode::Nearest,
            ..Default::default()
        });

        let pipeline =
            create_quad_pipeline(&context.device, &texture_bind_group_layout, config.format);

        let vertex_buffer = Self::create_vertex_buffer(&context.device, 16);

        let [r, g, b] = clear_color;
        let clear_color = wgpu::Color {
            r: srgb_to_linear(r),
            g: srgb_to_linear(g),
            b: srgb_to_linear(b),
            a: 1.0,
        };

        Ok(Self {
            context,
            surface,
            config,
            pipeline,
            texture_bind_group_layout,
            sampler,
            vertex_buffer,
            vertices: Vec::new(),
            draws: Vec::new(),
            clear_color,
            resident_bytes: 0,
        })
    }

    fn create_vertex_buffer(device: &wgpu::Device, quads: usize) -> wgpu::Buffer {
        device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Quad Vertex Buffer"),
            size: (quads * VERTICES_PER_QUAD * std::mem::size_of::<QuadVertex>()) as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })
    }

    pub fn size(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }

    /// Copy an RGBA image into a new sampled texture.
    pub fn upload(&mut self, image: &RgbaImage) -> Result<GpuTexture, WeaverError> {
        let texture = GpuTexture::from_rgba(
            &self.context.device,
            &self.context.queue,
            &self.texture_bind_group_layout,
            &self.sampler,
            image.width(),
            image.height(),
            image.as_raw(),
        )?;

        self.resident_bytes += texture.byte_size();
        log::trace!(
            "Uploaded {}x{} texture ({} MiB resident)",
            texture.width,
            texture.height,
            self.resident_bytes / (1024 * 1024)
        );

        Ok(texture)
    }

    pub fn release(&mut self, texture: GpuTexture) {
        self.resident_bytes = self.resident_bytes.saturating_sub(texture.byte_size());
        texture.destroy();
    }

    /// Forget the quads queued for the previous frame.
    pub fn begin_frame(&mut self) {
        self.vertices.clear();
        self.draws.clear();
    }

    /// Queue `texture` stretched over `dst`.
    pub fn queue_quad(&mut self, texture: &GpuTexture, dst: Rect) {
        if dst.is_empty() {
            return;
        }

        self.vertices
            .extend_from_slice(&quad_vertices(dst, self.config.width, self.config.height));
        self.draws.push(texture.bind_group.clone());
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }

        let max = self.context.limits.max_texture_dimension_2d;
        let (width, height) = (width.min(max), height.min(max));
        if (width, height) == self.size() {
            return;
        }

        log::info!("Resizing surface to {}x{}", width, height);
        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.context.device, &self.config);
    }

    /// Clear to the background colour, draw every queued quad in order and
    /// present.
    pub fn present(&mut self) -> Result<()> {
        let frame = match self.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                log::debug!("Surface lost or outdated, reconfiguring");
                self.surface.configure(&self.context.device, &self.config);
                return Ok(());
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                anyhow::bail!("GPU out of memory while acquiring the next frame");
            }
            Err(e) => {
                log::debug!("Skipping frame: {}", e);
                return Ok(());
            }
        };

        self.upload_vertices();

        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder =
            self.context
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("Frame Encoder"),
                });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Compose Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.clear_color),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });

            if !self.draws.is_empty() {
                render_pass.set_pipeline(&self.pipeline);
                render_pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));

                for (index, bind_group) in self.draws.iter().enumerate() {
                    let first = (index * VERTICES_PER_QUAD) as u32;
                    render_pass.set_bind_group(0, bind_group, &[]);
                    render_pass.draw(first..first + VERTICES_PER_QUAD as u32, 0..1);
                }
            }
        }

        self.context.queue.submit(std::iter::once(encoder.finish()));
        frame.present();

        Ok(())
    }

    fn upload_vertices(&mut self) {
        if self.vertices.is_empty() {
            return;
        }

        let bytes: &[u8] = bytemuck::cast_slice(&self.vertices);
        if bytes.len() as u64 > self.vertex_buffer.size() {
            let quads = (self.vertices.len() / VERTICES_PER_QUAD).next_power_of_two();
            self.vertex_buffer = Self::create_vertex_buffer(&self.context.device, quads);
        }

        self.context
            .queue
            .write_buffer(&self.vertex_buffer, 0, bytes);
    }
}
