use common::WeaverError;

/// Represents a GPU texture with its bind group for shader access
///
/// The bind group holds the texture view, so no separate view is kept.
pub struct GpuTexture {
    pub texture: wgpu::Texture,
    pub bind_group: wgpu::BindGroup,
    pub width: u32,
    pub height: u32,
}

impl GpuTexture {
    /// Create a new GPU texture from RGBA8 image data
    ///
    /// Sizes are checked up front against the device limits so a bad image is
    /// reported as an error instead of a device validation failure.
    pub fn from_rgba(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        bind_group_layout: &wgpu::BindGroupLayout,
        sampler: &wgpu::Sampler,
        width: u32,
        height: u32,
        data: &[u8],
    ) -> Result<Self, WeaverError> {
        validate_size(width, height, device.limits().max_texture_dimension_2d)?;

        let expected_size = width as usize * height as usize * 4;
        if data.len() != expected_size {
            return Err(WeaverError::Upload(format!(
                "Invalid texture data size: expected {} bytes ({}x{} RGBA), got {} bytes",
                expected_size,
                width,
                height,
                data.len()
            )));
        }

        let size = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };

        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Weaver Frame Texture"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        queue.write_texture(
            texture.as_image_copy(),
            data,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(width * 4),
                rows_per_image: Some(height),
            },
            size,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Weaver Frame Bind Group"),
            layout: bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
            ],
        });

        Ok(Self {
            texture,
            bind_group,
            width,
            height,
        })
    }

    /// Free the GPU memory now instead of waiting for the last reference.
    pub fn destroy(self) {
        self.texture.destroy();
    }

    /// Approximate GPU memory held by this texture
    pub fn byte_size(&self) -> u64 {
        self.width as u64 * self.height as u64 * 4
    }
}

impl std::fmt::Debug for GpuTexture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GpuTexture")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish()
    }
}

/// Reject sizes wgpu cannot allocate.
pub fn validate_size(width: u32, height: u32, max_dimension: u32) -> Result<(), WeaverError> {
    if width == 0 || height == 0 {
        return Err(WeaverError::Upload(format!(
            "Image has no pixels ({}x{})",
            width, height
        )));
    }

    if width > max_dimension || height > max_dimension {
        return Err(WeaverError::Upload(format!(
            "Image {}x{} exceeds the GPU texture limit of {}",
            width, height, max_dimension
        )));
    }

    Ok(())
}
