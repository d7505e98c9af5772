//! Media loading: locator resolution and per-format decoders.
//!
//! - `source`: turns a file or directory locator into candidate files
//! - `gif`: animated GIF frames
//! - `video`: GStreamer frame pull (feature `video`)

pub mod gif;
pub mod source;
#[cfg(feature = "video")]
pub mod video;

use anyhow::{Context, Result};
use common::MediaKind;
use image::RgbaImage;
use std::path::Path;

use crate::pipeline::decode::{AnimationSource, DecodeResult, Decoder};

/// Delay used when a video stream does not report a usable frame rate.
pub const DEFAULT_VIDEO_FRAME_DELAY_MS: u32 = 33;

/// Limits applied while decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Maximum frames kept from one video
    pub max_video_frames: usize,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            max_video_frames: 300,
        }
    }
}

/// Decoder for real media files: still images, GIFs and (with the `video`
/// feature) anything GStreamer can play.
#[derive(Debug, Clone, Default)]
pub struct MediaDecoder {
    options: DecodeOptions,
}

impl MediaDecoder {
    pub fn new(options: DecodeOptions) -> Self {
        Self { options }
    }

    fn decode_file(&self, path: &Path) -> Result<DecodeResult<RgbaImage>> {
        // Unknown extensions go to the video decoder, which sniffs content
        let kind = MediaKind::from_path(path).unwrap_or(MediaKind::Video);
        log::debug!("Decoding {} as {}", path.display(), kind);

        match kind {
            MediaKind::Image => Ok(DecodeResult::Static(decode_still(path)?)),
            MediaKind::Gif => Ok(DecodeResult::animated(
                gif::decode_gif(path)?,
                AnimationSource::Gif,
            )),
            MediaKind::Video => self.decode_video(path),
        }
    }

    #[cfg(feature = "video")]
    fn decode_video(&self, path: &Path) -> Result<DecodeResult<RgbaImage>> {
        let frames = video::decode_video(path, self.options.max_video_frames)?;
        Ok(DecodeResult::animated(frames, AnimationSource::Video))
    }

    #[cfg(not(feature = "video"))]
    fn decode_video(&self, path: &Path) -> Result<DecodeResult<RgbaImage>> {
        anyhow::bail!(
            "Video support not compiled in (build with --features video): {}",
            path.display()
        )
    }
}

impl Decoder for MediaDecoder {
    type Image = RgbaImage;

    fn decode(&self, locator: &Path) -> Result<DecodeResult<RgbaImage>> {
        let candidates = source::enumerate(locator)?;

        let Some(first) = candidates.first() else {
            log::warn!("No media found in {}", locator.display());
            return Ok(DecodeResult::Empty);
        };

        if candidates.len() > 1 {
            log::debug!(
                "{} has {} media file(s), using {}",
                locator.display(),
                candidates.len(),
                first.display()
            );
        }

        self.decode_file(first)
    }
}

/// Load a still image as RGBA.
pub fn decode_still(path: &Path) -> Result<RgbaImage> {
    let image = image::open(path)
        .with_context(|| format!("Failed to load image: {}", path.display()))?;
    Ok(image.into_rgba8())
}

/// Milliseconds per frame for a `numer/denom` frame rate.
///
/// Truncates like an integer `1000 / fps`; a missing or non-positive rate
/// falls back to [`DEFAULT_VIDEO_FRAME_DELAY_MS`].
#[cfg_attr(not(feature = "video"), allow(dead_code))]
pub fn frame_delay_ms(numer: i32, denom: i32) -> u32 {
    if numer <= 0 || denom <= 0 {
        return DEFAULT_VIDEO_FRAME_DELAY_MS;
    }
    (1000 * denom as u64 / numer as u64).min(u32::MAX as u64) as u32
}

/// Copy a packed RGBA frame whose rows may be padded to `stride` bytes.
#[cfg_attr(not(feature = "video"), allow(dead_code))]
pub fn rgba_from_strided(data: &[u8], width: u32, height: u32, stride: usize) -> Result<RgbaImage> {
    let row_bytes = width as usize * 4;
    let stride = if stride == 0 { row_bytes } else { stride };

    if stride < row_bytes {
        anyhow::bail!("Row stride {} is shorter than a {}px RGBA row", stride, width);
    }

    let needed = stride * height.saturating_sub(1) as usize + row_bytes;
    if height > 0 && data.len() < needed {
        anyhow::bail!(
            "Frame buffer too small: {} bytes for {}x{} (stride {})",
            data.len(),
            width,
            height,
            stride
        );
    }

    let pixels = if stride == row_bytes {
        data[..row_bytes * height as usize].to_vec()
    } else {
        let mut pixels = Vec::with_capacity(row_bytes * height as usize);
        for row in data.chunks(stride).take(height as usize) {
            pixels.extend_from_slice(&row[..row_bytes]);
        }
        pixels
    };

    RgbaImage::from_raw(width, height, pixels).context("Frame size does not match its buffer")
}
