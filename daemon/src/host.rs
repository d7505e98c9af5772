//! Display host abstraction.
//!
//! The pipeline only talks to the presentation surface through
//! [`DisplayHost`], which keeps the decode/upload/present stages independent
//! of Wayland and wgpu and lets them be driven by an in-memory host in tests.

use common::{Rect, WeaverError};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Result of draining the host's event queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostEvent {
    /// Nothing requires the loop to stop
    Continue,
    /// The user or compositor closed the surface
    Close,
}

/// A presentation surface that owns GPU-side images.
///
/// Handles are only valid for the host that created them and must be given
/// back through [`DisplayHost::release`] exactly once.
pub trait DisplayHost {
    /// CPU-side decoded image accepted by [`DisplayHost::upload`]
    type Image;
    /// Host-owned image handle
    type Handle;

    /// Convert a decoded image into a host handle.
    fn upload(&mut self, image: &Self::Image) -> Result<Self::Handle, WeaverError>;

    /// Give a handle back to the host.
    fn release(&mut self, handle: Self::Handle);

    /// Drain pending window system events without blocking.
    fn poll_events(&mut self) -> anyhow::Result<HostEvent>;

    /// Start a new frame.
    fn clear(&mut self);

    /// Queue `handle` to be drawn stretched over `dst`.
    fn draw(&mut self, handle: &Self::Handle, dst: Rect);

    /// Show everything queued since the last [`DisplayHost::clear`].
    fn present(&mut self) -> anyhow::Result<()>;
}

/// Process-wide stop request, set from the signal handler task and polled by
/// the presentation loop.
#[derive(Debug, Clone, Default)]
pub struct ShutdownSignal {
    requested: Arc<AtomicBool>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self) {
        self.requested.store(true, Ordering::Release);
    }

    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::Acquire)
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shutdown_signal_is_shared() {
        let signal = ShutdownSignal::new();
        let handler_copy = signal.clone();
        assert!(!signal.is_requested());

        handler_copy.request();
        assert!(signal.is_requested());
    }
}
