use anyhow::{Context, Result};
use common::{Rect, WeaverError};
use image::RgbaImage;
use smithay_client_toolkit::{
    compositor::CompositorState,
    output::OutputState,
    registry::RegistryState,
    shell::{
        WaylandSurface,
        wlr_layer::{Anchor, KeyboardInteractivity, Layer, LayerShell},
        xdg::{XdgShell, window::WindowDecorations},
    },
};
use wayland_backend::client::WaylandError;
use wayland_client::{Connection, EventQueue, globals::registry_queue_init};

use super::handle::SurfaceHandle;
use super::state::{HostState, HostSurface};
use crate::gpu::{Compositor, GpuTexture};
use crate::host::{DisplayHost, HostEvent};

const APP_NAME: &str = "weaver";

/// How the presentation surface is created.
#[derive(Debug, Clone, Copy)]
pub struct HostOptions {
    /// Background layer surface instead of a toplevel window
    pub desktop: bool,
    pub vsync: bool,
    /// Window size, also used when the compositor does not pick one
    pub window_size: (u32, u32),
    pub clear_color: [u8; 3],
}

/// Wayland surface with a wgpu compositor on top.
pub struct WaylandHost {
    // Declared first so the wgpu surface is dropped before the Wayland
    // objects it points into.
    compositor: Compositor,
    surface: HostSurface,
    // Shell globals outlive the surface created from them
    _layer_shell: Option<LayerShell>,
    _xdg_shell: Option<XdgShell>,
    _compositor_state: CompositorState,
    state: HostState,
    event_queue: EventQueue<HostState>,
    _connection: Connection,
}

impl WaylandHost {
    pub fn new(options: HostOptions) -> Result<Self> {
        log::info!("Connecting to Wayland compositor...");

        let connection =
            Connection::connect_to_env().context("Failed to connect to the Wayland compositor")?;
        let (globals, mut event_queue) = registry_queue_init::<HostState>(&connection)
            .context("Failed to initialize the Wayland registry")?;
        let qh = event_queue.handle();

        let compositor_state =
            CompositorState::bind(&globals, &qh).context("wl_compositor is not available")?;
        let mut state = HostState::new(
            RegistryState::new(&globals),
            OutputState::new(&globals, &qh),
            options.window_size,
        );

        let wl_surface = compositor_state.create_surface(&qh);

        let (layer_shell, xdg_shell, surface) = if options.desktop {
            let layer_shell = LayerShell::bind(&globals, &qh)
                .context("Compositor does not support wlr-layer-shell")?;
            let layer = layer_shell.create_layer_surface(
                &qh,
                wl_surface,
                Layer::Background,
                Some(APP_NAME),
                None,
            );

            layer.set_anchor(Anchor::all());
            layer.set_exclusive_zone(-1);
            layer.set_keyboard_interactivity(KeyboardInteractivity::None);
            layer.commit();

            log::info!("Created background layer surface");
            (Some(layer_shell), None, HostSurface::Layer(layer))
        } else {
            let xdg_shell =
                XdgShell::bind(&globals, &qh).context("Compositor does not support xdg-shell")?;
            let window = xdg_shell.create_window(wl_surface, WindowDecorations::None, &qh);

            window.set_title(APP_NAME);
            window.set_app_id(APP_NAME);
            window.set_min_size(Some(options.window_size));
            window.commit();

            log::info!(
                "Created {}x{} window",
                options.window_size.0,
                options.window_size.1
            );
            (None, Some(xdg_shell), HostSurface::Window(window))
        };

        while !state.size.is_configured() {
            event_queue
                .blocking_dispatch(&mut state)
                .context("Wayland dispatch failed while waiting for the first configure")?;

            if state.closed {
                anyhow::bail!("Surface was closed before it was configured");
            }
        }

        let (width, height) = state.size.current();
        log::info!("Surface configured: {}x{}", width, height);

        let handle = SurfaceHandle::new(&connection, surface.wl_surface());
        // SAFETY: the connection and surface are owned by the returned host
        // and dropped after the compositor
        let compositor = unsafe {
            Compositor::new(&handle, width, height, options.vsync, options.clear_color)
        }?;

        Ok(Self {
            compositor,
            surface,
            _layer_shell: layer_shell,
            _xdg_shell: xdg_shell,
            _compositor_state: compositor_state,
            state,
            event_queue,
            _connection: connection,
        })
    }

    /// Whether the surface lives on the background layer
    pub fn is_desktop(&self) -> bool {
        matches!(self.surface, HostSurface::Layer(_))
    }
}

impl DisplayHost for WaylandHost {
    type Image = RgbaImage;
    type Handle = GpuTexture;

    fn upload(&mut self, image: &RgbaImage) -> Result<GpuTexture, WeaverError> {
        self.compositor.upload(image)
    }

    fn release(&mut self, handle: GpuTexture) {
        self.compositor.release(handle);
    }

    fn poll_events(&mut self) -> Result<HostEvent> {
        self.event_queue
            .flush()
            .map_err(|e| anyhow::anyhow!("Failed to flush Wayland requests: {}", e))?;

        if let Some(guard) = self.event_queue.prepare_read()
            && let Err(e) = guard.read()
        {
            match e {
                WaylandError::Io(ref io) if io.kind() == std::io::ErrorKind::WouldBlock => {}
                e => anyhow::bail!("Failed to read Wayland events: {}", e),
            }
        }

        self.event_queue
            .dispatch_pending(&mut self.state)
            .context("Failed to dispatch Wayland events")?;

        if let Some((width, height)) = self.state.size.take_resize() {
            self.compositor.resize(width, height);
        }

        if self.state.closed {
            Ok(HostEvent::Close)
        } else {
            Ok(HostEvent::Continue)
        }
    }

    fn clear(&mut self) {
        self.compositor.begin_frame();
    }

    fn draw(&mut self, handle: &GpuTexture, dst: Rect) {
        self.compositor.queue_quad(handle, dst);
    }

    fn present(&mut self) -> Result<()> {
        self.compositor.present()
    }
}
