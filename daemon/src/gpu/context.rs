/// GPU context management - handles wgpu device/queue initialization
use anyhow::{Context, Result};
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};

/// GPU context containing device, queue, and adapter info
pub struct GpuContext {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub adapter_info: wgpu::AdapterInfo,
    pub limits: wgpu::Limits,
}

/// A configured presentation surface.
pub struct SurfaceTarget {
    pub surface: wgpu::Surface<'static>,
    pub config: wgpu::SurfaceConfiguration,
}

impl GpuContext {
    /// Create a device able to present to `target` and configure a surface
    /// of `width`x`height` for it.
    ///
    /// # Safety
    ///
    /// The display and window behind `target` must outlive the returned
    /// surface.
    pub unsafe fn with_surface<T>(
        target: &T,
        width: u32,
        height: u32,
        vsync: bool,
    ) -> Result<(Self, SurfaceTarget)>
    where
        T: HasDisplayHandle + HasWindowHandle,
    {
        log::info!("Initializing GPU context...");

        let instance = wgpu::Instance::default();

        let raw_display_handle = target
            .display_handle()
            .map_err(|e| anyhow::anyhow!("Failed to acquire display handle: {}", e))?
            .as_raw();
        let raw_window_handle = target
            .window_handle()
            .map_err(|e| anyhow::anyhow!("Failed to acquire window handle: {}", e))?
            .as_raw();

        // SAFETY: guaranteed by the caller
        let surface = unsafe {
            instance.create_surface_unsafe(wgpu::SurfaceTargetUnsafe::RawHandle {
                raw_display_handle,
                raw_window_handle,
            })
        }
        .context("Failed to create rendering surface")?;

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .context("Failed to find suitable GPU adapter")?;

        let adapter_info = adapter.get_info();
        log::info!(
            "Selected GPU adapter: {} ({:?})",
            adapter_info.name,
            adapter_info.backend
        );

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("Weaver GPU Device"),
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default().using_resolution(adapter.limits()),
            ..Default::default()
        }))
        .context("Failed to create GPU device")?;

        let limits = device.limits();

        let caps = surface.get_capabilities(&adapter);
        let format = caps
            .formats
            .iter()
            .copied()
            .find(|format| format.is_srgb())
            .or_else(|| caps.formats.first().copied())
            .context("Surface reports no supported formats")?;
        let alpha_mode = if caps.alpha_modes.contains(&wgpu::CompositeAlphaMode::Opaque) {
            wgpu::CompositeAlphaMode::Opaque
        } else {
            caps.alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto)
        };

        let max = limits.max_texture_dimension_2d;
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: width.clamp(1, max),
            height: height.clamp(1, max),
            present_mode: if vsync {
                wgpu::PresentMode::AutoVsync
            } else {
                wgpu::PresentMode::AutoNoVsync
            },
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        log::info!("GPU context initialized successfully");
        log::info!(
            "  Surface: {}x{} {:?} ({:?})",
            config.width,
            config.height,
            config.format,
            config.present_mode
        );

        Ok((
            Self {
                device,
                queue,
                adapter_info,
                limits,
            },
            SurfaceTarget { surface, config },
        ))
    }

    /// Get GPU capabilities for reporting
    pub fn capabilities(&self) -> crate::gpu::GpuCapabilities {
        crate::gpu::GpuCapabilities {
            adapter_name: self.adapter_info.name.clone(),
            backend: format!("{:?}", self.adapter_info.backend),
            driver: self.adapter_info.driver.clone(),
            max_texture_size: self.limits.max_texture_dimension_2d,
        }
    }
}

impl std::fmt::Debug for GpuContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GpuContext")
            .field("adapter", &self.adapter_info.name)
            .field("backend", &self.adapter_info.backend)
            .finish()
    }
}
