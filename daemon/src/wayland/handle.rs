use raw_window_handle::{
    DisplayHandle, HandleError, HasDisplayHandle, HasWindowHandle, RawDisplayHandle,
    RawWindowHandle, WaylandDisplayHandle, WaylandWindowHandle, WindowHandle,
};
use std::ffi::c_void;
use std::ptr::NonNull;
use wayland_client::{Connection, Proxy, protocol::wl_surface::WlSurface};

/// Raw display and surface pointers handed to wgpu.
pub(crate) struct SurfaceHandle {
    display: *mut c_void,
    surface: *mut c_void,
}

impl SurfaceHandle {
    pub(crate) fn new(conn: &Connection, surface: &WlSurface) -> Self {
        Self {
            display: conn.backend().display_ptr() as *mut c_void,
            surface: surface.id().as_ptr() as *mut c_void,
        }
    }
}

impl HasDisplayHandle for SurfaceHandle {
    fn display_handle(&self) -> Result<DisplayHandle<'_>, HandleError> {
        let display = NonNull::new(self.display).ok_or(HandleError::Unavailable)?;
        let raw = RawDisplayHandle::Wayland(WaylandDisplayHandle::new(display));
        // SAFETY: the pointer comes from a live connection owned by the host
        Ok(unsafe { DisplayHandle::borrow_raw(raw) })
    }
}

impl HasWindowHandle for SurfaceHandle {
    fn window_handle(&self) -> Result<WindowHandle<'_>, HandleError> {
        let surface = NonNull::new(self.surface).ok_or(HandleError::Unavailable)?;
        let raw = RawWindowHandle::Wayland(WaylandWindowHandle::new(surface));
        // SAFETY: the surface is kept alive by the host for as long as wgpu uses it
        Ok(unsafe { WindowHandle::borrow_raw(raw) })
    }
}
