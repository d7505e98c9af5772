//! Synchronous video decoding through GStreamer.
//!
//! The file is pushed through `decodebin` and converted to packed RGBA; an
//! appsink hands the frames over one by one until the stream ends or the
//! frame cap is reached.

use anyhow::{Context, Result};
use gstreamer as gst;
use gstreamer::prelude::*;
use gstreamer_app as gst_app;
use gstreamer_video as gst_video;
use image::RgbaImage;
use std::path::Path;
use std::sync::OnceLock;

use super::{frame_delay_ms, rgba_from_strided};
use crate::pipeline::decode::Frame;

/// How long one pull waits before the bus is checked again.
const PULL_TIMEOUT_MS: u64 = 250;

/// Consecutive empty pulls tolerated before the decode is abandoned.
const MAX_STALLED_PULLS: u32 = 40;

/// Initialize GStreamer once per process.
pub fn initialize_gstreamer() -> Result<()> {
    static GSTREAMER_INIT: OnceLock<Result<(), String>> = OnceLock::new();

    GSTREAMER_INIT
        .get_or_init(|| {
            gst::init().map_err(|e| e.to_string())?;
            log::info!("GStreamer initialized");
            Ok(())
        })
        .clone()
        .map_err(|e| anyhow::anyhow!("Failed to initialize GStreamer: {}", e))
}

/// Build `filesrc ! decodebin ! videoconvert ! RGBA appsink` for `path`.
fn build_pipeline(path: &Path) -> Result<(gst::Pipeline, gst_app::AppSink)> {
    let pipeline_str =
        "filesrc name=src ! decodebin ! videoconvert ! video/x-raw,format=RGBA ! appsink name=sink";

    log::debug!("GStreamer pipeline for {}: {}", path.display(), pipeline_str);

    let pipeline = gst::parse::launch(pipeline_str)
        .context("Failed to create GStreamer pipeline")?
        .dynamic_cast::<gst::Pipeline>()
        .map_err(|_| anyhow::anyhow!("Pipeline is not a gst::Pipeline"))?;

    let source = pipeline
        .by_name("src")
        .context("Failed to get filesrc from pipeline")?;
    source.set_property("location", path.to_string_lossy().as_ref());

    let app_sink = pipeline
        .by_name("sink")
        .context("Failed to get appsink from pipeline")?
        .dynamic_cast::<gst_app::AppSink>()
        .map_err(|_| anyhow::anyhow!("sink is not an AppSink"))?;

    configure_app_sink(&app_sink);

    Ok((pipeline, app_sink))
}

/// Decode as fast as possible and keep every frame.
fn configure_app_sink(app_sink: &gst_app::AppSink) {
    app_sink.set_property("sync", false);
    app_sink.set_property("max-buffers", 4u32);
    app_sink.set_property("drop", false);
}

/// Puts the pipeline back into `Null` however decoding ends.
struct PipelineGuard(gst::Pipeline);

impl Drop for PipelineGuard {
    fn drop(&mut self) {
        if let Err(e) = self.0.set_state(gst::State::Null) {
            log::debug!("Failed to stop GStreamer pipeline: {}", e);
        }
    }
}

fn bus_error(pipeline: &gst::Pipeline) -> Option<String> {
    let bus = pipeline.bus()?;
    let message = bus.pop_filtered(&[gst::MessageType::Error])?;
    match message.view() {
        gst::MessageView::Error(err) => Some(match err.debug() {
            Some(debug) => format!("{} ({})", err.error(), debug),
            None => err.error().to_string(),
        }),
        _ => None,
    }
}

fn sample_to_image(sample: &gst::Sample) -> Result<(RgbaImage, u32)> {
    let caps = sample.caps().context("Video sample has no caps")?;
    let info = gst_video::VideoInfo::from_caps(caps).context("Unsupported video caps")?;
    let buffer = sample.buffer().context("Video sample has no buffer")?;
    let map = buffer
        .map_readable()
        .context("Failed to map video buffer")?;

    let stride = info.stride().first().copied().unwrap_or(0).max(0) as usize;
    let image = rgba_from_strided(map.as_slice(), info.width(), info.height(), stride)?;

    let fps = info.fps();
    Ok((image, frame_delay_ms(fps.numer(), fps.denom())))
}

/// Decode up to `max_frames` frames of the video at `path`.
pub fn decode_video(path: &Path, max_frames: usize) -> Result<Vec<Frame<RgbaImage>>> {
    initialize_gstreamer()?;

    let (pipeline, app_sink) = build_pipeline(path)?;
    let pipeline = PipelineGuard(pipeline);

    pipeline
        .0
        .set_state(gst::State::Playing)
        .with_context(|| format!("Failed to start decoding {}", path.display()))?;

    let mut frames = Vec::new();
    let mut stalled = 0u32;

    while frames.len() < max_frames {
        match app_sink.try_pull_sample(gst::ClockTime::from_mseconds(PULL_TIMEOUT_MS)) {
            Some(sample) => {
                stalled = 0;
                match sample_to_image(&sample) {
                    Ok((image, delay_ms)) => frames.push(Frame::new(image, delay_ms)),
                    Err(e) => {
                        stop_early(path, frames.len(), &format!("{:#}", e))?;
                        break;
                    }
                }
            }
            None if app_sink.is_eos() => break,
            None => {
                if let Some(error) = bus_error(&pipeline.0) {
                    stop_early(path, frames.len(), &format!("GStreamer error: {}", error))?;
                    break;
                }

                stalled += 1;
                if stalled >= MAX_STALLED_PULLS {
                    stop_early(path, frames.len(), "timed out waiting for frames")?;
                    break;
                }
            }
        }
    }

    if frames.is_empty() {
        anyhow::bail!("No frames decoded from {}", path.display());
    }

    if frames.len() == max_frames {
        log::debug!(
            "Video {} capped at {} frame(s)",
            path.display(),
            max_frames
        );
    }

    Ok(frames)
}

/// Decide what a mid-stream failure means: with frames already decoded the
/// video plays truncated, otherwise the whole decode fails.
fn stop_early(path: &Path, decoded: usize, reason: &str) -> Result<()> {
    if decoded == 0 {
        anyhow::bail!("{}: {}", path.display(), reason);
    }

    log::warn!(
        "Video {} stopped after {} frame(s), keeping them: {}",
        path.display(),
        decoded,
        reason
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_before_first_frame_is_an_error() {
        let err = stop_early(Path::new("clip.mp4"), 0, "bad caps").unwrap_err();
        assert!(err.to_string().contains("clip.mp4"));
        assert!(err.to_string().contains("bad caps"));
    }

    #[test]
    fn test_failure_after_frames_keeps_them() {
        assert!(stop_early(Path::new("clip.mp4"), 12, "short buffer").is_ok());
    }
}
