use anyhow::{Context, Result};
use image::{AnimationDecoder, RgbaImage, codecs::gif::GifDecoder};
use std::path::Path;

use crate::pipeline::decode::{Frame, GIF_FRAME_DELAY_MS};

/// Decode every frame of an animated GIF.
///
/// Frames are fully composited RGBA; the file's own frame delays are ignored
/// and every frame gets [`GIF_FRAME_DELAY_MS`].
pub fn decode_gif(path: &Path) -> Result<Vec<Frame<RgbaImage>>> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open GIF: {}", path.display()))?;
    let reader = std::io::BufReader::new(file);

    let decoder = GifDecoder::new(reader).context("Failed to create GIF decoder")?;

    let mut frames = Vec::new();
    for (idx, frame) in decoder.into_frames().enumerate() {
        match frame {
            Ok(frame) => frames.push(Frame::new(frame.into_buffer(), GIF_FRAME_DELAY_MS)),
            // Keep what decoded so far; a truncated GIF still plays
            Err(e) if !frames.is_empty() => {
                log::warn!(
                    "GIF {} stopped decoding at frame {}: {}",
                    path.display(),
                    idx,
                    e
                );
                break;
            }
            Err(e) => return Err(e).context("Failed to decode GIF frame"),
        }
    }

    if let Some(first) = frames.first() {
        log::debug!(
            "Loaded GIF {} ({} frame(s), {}x{})",
            path.display(),
            frames.len(),
            first.image.width(),
            first.image.height()
        );
    }

    Ok(frames)
}
