use smithay_client_toolkit::{
    output::OutputState,
    registry::RegistryState,
    shell::{WaylandSurface, wlr_layer::LayerSurface, xdg::window::Window},
};
use wayland_client::protocol::wl_surface::WlSurface;

/// The single surface weaver presents to.
pub(crate) enum HostSurface {
    /// Desktop background
    Layer(LayerSurface),
    /// Borderless toplevel
    Window(Window),
}

impl HostSurface {
    pub(crate) fn wl_surface(&self) -> &WlSurface {
        match self {
            HostSurface::Layer(layer) => layer.wl_surface(),
            HostSurface::Window(window) => window.wl_surface(),
        }
    }
}

/// Tracks the size the compositor asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SurfaceSize {
    /// Used when the compositor leaves the choice to us
    fallback: (u32, u32),
    current: (u32, u32),
    configured: bool,
    pending_resize: Option<(u32, u32)>,
}

impl SurfaceSize {
    pub(crate) fn new(fallback: (u32, u32)) -> Self {
        Self {
            fallback,
            current: fallback,
            configured: false,
            pending_resize: None,
        }
    }

    pub(crate) fn is_configured(&self) -> bool {
        self.configured
    }

    pub(crate) fn current(&self) -> (u32, u32) {
        self.current
    }

    /// Record a configure. A zero dimension keeps the fallback for that axis.
    pub(crate) fn configure(&mut self, width: u32, height: u32) {
        let width = if width == 0 { self.fallback.0 } else { width };
        let height = if height == 0 { self.fallback.1 } else { height };

        if self.configured && (width, height) != self.current {
            self.pending_resize = Some((width, height));
        }

        self.current = (width, height);
        self.configured = true;
    }

    /// Size change not yet applied to the GPU surface
    pub(crate) fn take_resize(&mut self) -> Option<(u32, u32)> {
        self.pending_resize.take()
    }
}

/// Protocol state driven by the Wayland event queue.
pub(crate) struct HostState {
    pub(crate) registry_state: RegistryState,
    pub(crate) output_state: OutputState,
    pub(crate) size: SurfaceSize,
    pub(crate) closed: bool,
}

impl HostState {
    pub(crate) fn new(
        registry_state: RegistryState,
        output_state: OutputState,
        fallback_size: (u32, u32),
    ) -> Self {
        Self {
            registry_state,
            output_state,
            size: SurfaceSize::new(fallback_size),
            closed: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_configure_is_not_a_resize() {
        let mut size = SurfaceSize::new((640, 480));
        assert!(!size.is_configured());

        size.configure(1920, 1080);

        assert!(size.is_configured());
        assert_eq!(size.current(), (1920, 1080));
        assert_eq!(size.take_resize(), None);
    }

    #[test]
    fn test_zero_dimensions_use_fallback() {
        let mut size = SurfaceSize::new((640, 480));
        size.configure(0, 0);
        assert_eq!(size.current(), (640, 480));

        size.configure(800, 0);
        assert_eq!(size.current(), (800, 480));
    }

    #[test]
    fn test_later_configure_queues_resize_once() {
        let mut size = SurfaceSize::new((640, 480));
        size.configure(640, 480);
        size.configure(640, 480);
        assert_eq!(size.take_resize(), None);

        size.configure(1280, 720);
        assert_eq!(size.take_resize(), Some((1280, 720)));
        assert_eq!(size.take_resize(), None);
    }
}
