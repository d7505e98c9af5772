//! Wayland display host
//!
//! - handle: raw display/surface handles for wgpu
//! - state: protocol state and configured size tracking
//! - event_handlers: smithay-client-toolkit handler impls
//! - host: surface creation and the `DisplayHost` impl

mod event_handlers;
mod handle;
mod host;
mod state;

pub use host::{HostOptions, WaylandHost};
