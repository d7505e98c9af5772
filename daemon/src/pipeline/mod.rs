//! Decode → upload → present pipeline.
//!
//! - `decode`: parallel decode tasks and their results
//! - `upload`: moves decoded images onto the display host
//! - `registry`: live views and the handles they own
//! - `present`: the frame loop

pub mod decode;
pub mod present;
pub mod registry;
pub mod upload;

use anyhow::Result;
use common::ViewSpec;
use std::time::Instant;

use crate::host::{DisplayHost, ShutdownSignal};
use decode::{DecodePool, Decoder};
use present::{Pacing, StopReason};

/// Decode every view, upload the results and present until stopped.
///
/// All host images are released before returning, including when the
/// presentation loop fails.
pub fn run<H, D>(
    host: &mut H,
    decoder: &D,
    pool: &DecodePool,
    specs: &[ViewSpec],
    pacing: Pacing,
    shutdown: &ShutdownSignal,
) -> Result<StopReason>
where
    H: DisplayHost,
    D: Decoder<Image = H::Image>,
{
    log::info!("Decoding {} view(s)...", specs.len());
    let results = pool.decode_all(decoder, specs);

    if shutdown.is_requested() {
        log::info!("Shutdown requested during decode, nothing to present");
        return Ok(StopReason::Signal);
    }

    let mut registry = upload::upload_views(host, specs, results, Instant::now());
    if registry.is_empty() && !specs.is_empty() {
        log::warn!("No view could be loaded, presenting an empty surface");
    }

    let outcome = present::run_loop(host, &mut registry, pacing, shutdown);
    registry.teardown(host);

    outcome
}
