/// GPU compositing using wgpu
///
/// Architecture:
/// - `context`: wgpu device/queue and surface setup
/// - `compositor`: per-frame quad batching and presentation
/// - `texture`: texture upload and management
pub mod compositor;
pub mod context;
pub mod texture;

pub use compositor::Compositor;
pub use context::GpuContext;
pub use texture::GpuTexture;

/// GPU rendering capabilities
#[derive(Debug, Clone)]
pub struct GpuCapabilities {
    pub adapter_name: String,
    pub backend: String,
    pub driver: String,
    pub max_texture_size: u32,
}

impl GpuCapabilities {
    pub fn log_info(&self) {
        log::info!("GPU Capabilities:");
        log::info!("  Adapter: {}", self.adapter_name);
        log::info!("  Backend: {}", self.backend);
        if !self.driver.is_empty() {
            log::info!("  Driver: {}", self.driver);
        }
        log::info!(
            "  Max Texture Size: {}x{}",
            self.max_texture_size,
            self.max_texture_size
        );
    }
}
