//! Common types and utilities for Weaver.
//!
//! This crate defines the data structures shared by every stage of the
//! renderer: view placements ([`ViewSpec`], [`Rect`]), media classification
//! ([`MediaKind`]) and the error taxonomy ([`WeaverError`]).
//!
//! # Command line placements
//!
//! Views are described on the command line as groups of six positional values,
//! `PATH SPEED X Y W H`, repeated once per view.
//!
//! ```
//! use common::parse_view_args;
//!
//! let args = ["~/clips", "2", "0", "0", "1920", "1080"];
//! let views = parse_view_args(&args).unwrap();
//! assert_eq!(views.len(), 1);
//! assert_eq!(views[0].speed, 2);
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Number of positional values describing one view.
pub const VIEW_ARG_COUNT: usize = 6;

/// Extensions treated as streamed video.
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "webm", "mkv", "avi", "mov"];

/// Extensions treated as animated GIF.
pub const GIF_EXTENSIONS: &[&str] = &["gif"];

/// Extensions treated as still images.
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "tiff", "webp", "tga"];

/// Error types shared between the configuration layer and the renderer.
#[derive(Error, Debug)]
pub enum WeaverError {
    #[error("Usage error: {0}")]
    Usage(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Upload error: {0}")]
    Upload(String),

    #[error("Display error: {0}")]
    Display(String),
}

impl From<std::io::Error> for WeaverError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}

/// Destination rectangle on the presentation surface, in surface pixels with
/// the origin at the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// True when the rectangle covers no pixels.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Right edge (exclusive).
    pub fn right(&self) -> i64 {
        self.x as i64 + self.width as i64
    }

    /// Bottom edge (exclusive).
    pub fn bottom(&self) -> i64 {
        self.y as i64 + self.height as i64
    }

    /// Size of the smallest surface anchored at the origin that contains every
    /// rectangle. Returns `None` when nothing has a positive extent.
    pub fn bounding_size<'a>(rects: impl IntoIterator<Item = &'a Rect>) -> Option<(u32, u32)> {
        let (w, h) = rects
            .into_iter()
            .filter(|r| !r.is_empty())
            .fold((0i64, 0i64), |(w, h), r| (w.max(r.right()), h.max(r.bottom())));

        if w <= 0 || h <= 0 {
            return None;
        }

        Some((
            w.min(u32::MAX as i64) as u32,
            h.min(u32::MAX as i64) as u32,
        ))
    }
}

impl std::fmt::Display for Rect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}+{}+{}", self.width, self.height, self.x, self.y)
    }
}

/// Immutable configuration of one view.
///
/// Created once while reading configuration and shared read-only with the
/// decode tasks and the uploader afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewSpec {
    /// Media locator: a single file or a directory to pick media from
    pub path: PathBuf,
    /// Where the view is drawn
    pub rect: Rect,
    /// Playback speed multiplier, always >= 1
    pub speed: u32,
}

impl ViewSpec {
    /// Create a view spec, normalizing a non-positive speed to 1.
    pub fn new(path: impl Into<PathBuf>, rect: Rect, speed: i64) -> Self {
        Self {
            path: path.into(),
            rect,
            speed: normalize_speed(speed),
        }
    }
}

/// Clamp a user supplied speed into the valid range `1..=u32::MAX`.
pub fn normalize_speed(speed: i64) -> u32 {
    if speed <= 0 {
        1
    } else {
        speed.min(u32::MAX as i64) as u32
    }
}

/// Category of a media file, decided by its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MediaKind {
    Image,
    Gif,
    Video,
}

impl MediaKind {
    /// Classify a path by its (case-insensitive) extension.
    pub fn from_path(path: impl AsRef<Path>) -> Option<Self> {
        let ext = path.as_ref().extension()?.to_string_lossy().to_lowercase();
        let ext = ext.as_str();

        if VIDEO_EXTENSIONS.contains(&ext) {
            Some(Self::Video)
        } else if GIF_EXTENSIONS.contains(&ext) {
            Some(Self::Gif)
        } else if IMAGE_EXTENSIONS.contains(&ext) {
            Some(Self::Image)
        } else {
            None
        }
    }

    /// Whether this kind plays back as a sequence of frames.
    pub fn is_animated(self) -> bool {
        matches!(self, Self::Gif | Self::Video)
    }
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Image => write!(f, "image"),
            Self::Gif => write!(f, "gif"),
            Self::Video => write!(f, "video"),
        }
    }
}

/// Parse repeated `PATH SPEED X Y W H` groups into view specs.
///
/// An empty slice yields no views; any count that is not a multiple of six is
/// a usage error. Numbers that fail to parse are reported with the view
/// number and field name.
pub fn parse_view_args<S: AsRef<str>>(args: &[S]) -> Result<Vec<ViewSpec>, WeaverError> {
    if args.len() % VIEW_ARG_COUNT != 0 {
        return Err(WeaverError::Usage(format!(
            "expected groups of {} values (PATH SPEED X Y W H), got {} value(s)",
            VIEW_ARG_COUNT,
            args.len()
        )));
    }

    args.chunks(VIEW_ARG_COUNT)
        .enumerate()
        .map(|(index, group)| {
            let field = |i: usize| group[i].as_ref();
            let view = index + 1;

            let speed: i64 = parse_number(field(1), view, "SPEED")?;
            let x: i32 = parse_number(field(2), view, "X")?;
            let y: i32 = parse_number(field(3), view, "Y")?;
            let width: u32 = parse_number(field(4), view, "W")?;
            let height: u32 = parse_number(field(5), view, "H")?;

            Ok(ViewSpec::new(
                field(0),
                Rect::new(x, y, width, height),
                speed,
            ))
        })
        .collect()
}

fn parse_number<T: std::str::FromStr>(
    value: &str,
    view: usize,
    name: &str,
) -> Result<T, WeaverError> {
    value.trim().parse().map_err(|_| {
        WeaverError::Usage(format!(
            "view {}: invalid {} value '{}'",
            view, name, value
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_speed() {
        assert_eq!(normalize_speed(-3), 1);
        assert_eq!(normalize_speed(0), 1);
        assert_eq!(normalize_speed(1), 1);
        assert_eq!(normalize_speed(7), 7);
        assert_eq!(normalize_speed(i64::MAX), u32::MAX);
    }

    #[test]
    fn test_media_kind_from_path() {
        assert_eq!(MediaKind::from_path("a/b/clip.MP4"), Some(MediaKind::Video));
        assert_eq!(MediaKind::from_path("loop.gif"), Some(MediaKind::Gif));
        assert_eq!(MediaKind::from_path("x.JpEg"), Some(MediaKind::Image));
        assert_eq!(MediaKind::from_path("notes.txt"), None);
        assert_eq!(MediaKind::from_path("no_extension"), None);
        assert!(MediaKind::Gif.is_animated());
        assert!(!MediaKind::Image.is_animated());
    }

    #[test]
    fn test_bounding_size() {
        let rects = [Rect::new(0, 0, 100, 50), Rect::new(80, 20, 40, 60)];
        assert_eq!(Rect::bounding_size(&rects), Some((120, 80)));

        let degenerate = [Rect::new(10, 10, 0, 5)];
        assert_eq!(Rect::bounding_size(&degenerate), None);
    }

    #[test]
    fn test_parse_view_args_rejects_partial_group() {
        let err = parse_view_args(&["a", "1", "0", "0", "10"]).unwrap_err();
        assert!(matches!(err, WeaverError::Usage(_)));
    }

    #[test]
    fn test_parse_view_args_reports_bad_field() {
        let err = parse_view_args(&["a", "1", "0", "zero", "10", "10"]).unwrap_err();
        assert!(err.to_string().contains("view 1: invalid Y"));
    }
}
