//! Upload stage: moves decoded images onto the display host.
//!
//! Runs on the thread that owns the host. Decoded images are consumed here;
//! each one is dropped right after its upload attempt, whether it succeeded
//! or not.

use common::ViewSpec;
use std::time::Instant;

use crate::host::DisplayHost;
use crate::pipeline::decode::DecodeResult;
use crate::pipeline::registry::{View, ViewRegistry};

/// Turn decode results into live views.
///
/// `results` must be index-aligned with `specs`. Empty results, failed
/// still uploads and animations with no surviving frame are dropped; views
/// keep their configuration order otherwise.
pub fn upload_views<H: DisplayHost>(
    host: &mut H,
    specs: &[ViewSpec],
    results: Vec<DecodeResult<H::Image>>,
    started: Instant,
) -> ViewRegistry<H::Handle> {
    debug_assert_eq!(specs.len(), results.len());

    let mut registry = ViewRegistry::new();

    for (index, (spec, result)) in specs.iter().zip(results).enumerate() {
        match result {
            DecodeResult::Empty => {
                log::debug!("View {}: nothing to show, skipped", index);
            }
            DecodeResult::Static(image) => match host.upload(&image) {
                Ok(handle) => {
                    log::info!("View {}: still image at {}", index, spec.rect);
                    registry.push(View::still(spec.rect, handle));
                }
                Err(e) => {
                    log::warn!("View {}: {}, skipped", index, e);
                }
            },
            DecodeResult::Animated(animation) => {
                let source = animation.source();
                let total = animation.frame_count();

                let mut frames = Vec::with_capacity(total);
                for (frame_index, frame) in animation.into_frames().into_iter().enumerate() {
                    match host.upload(&frame.image) {
                        Ok(handle) => frames.push((handle, frame.delay_ms)),
                        Err(e) => {
                            log::warn!("View {}: frame {} dropped: {}", index, frame_index, e);
                        }
                    }
                }

                let uploaded = frames.len();
                match View::animated(spec.rect, frames, source, spec.speed, started) {
                    Some(view) => {
                        log::info!(
                            "View {}: {:?} animation, {}/{} frame(s) at {} (speed x{})",
                            index,
                            source,
                            uploaded,
                            total,
                            spec.rect,
                            spec.speed
                        );
                        registry.push(view);
                    }
                    None => {
                        log::warn!("View {}: no frame could be uploaded, skipped", index);
                    }
                }
            }
        }
    }

    let animated = registry.iter().filter(|v| v.is_animated()).count();
    log::info!(
        "{} view(s) live ({} animated), {} host image(s)",
        registry.len(),
        animated,
        registry.handle_count()
    );

    registry
}
