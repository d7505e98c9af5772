//! Parallel decode stage.
//!
//! Every view gets one decode task. Tasks run on a dedicated rayon pool and
//! the stage returns only when all of them are done, so the uploader always
//! sees a complete, index-aligned result set.

use common::ViewSpec;
use image::RgbaImage;
use rayon::prelude::*;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::time::Instant;

/// Delay stored for every GIF frame, independent of the file's own timing.
pub const GIF_FRAME_DELAY_MS: u32 = 100;

/// Where an animation came from; decides how playback reads frame delays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimationSource {
    Gif,
    Video,
}

/// One decoded frame and how long it stays on screen at speed 1.
#[derive(Debug)]
pub struct Frame<I> {
    pub image: I,
    pub delay_ms: u32,
}

impl<I> Frame<I> {
    pub fn new(image: I, delay_ms: u32) -> Self {
        Self { image, delay_ms }
    }
}

/// A non-empty sequence of decoded frames.
#[derive(Debug)]
pub struct Animation<I> {
    frames: Vec<Frame<I>>,
    source: AnimationSource,
}

impl<I> Animation<I> {
    /// Returns `None` for an empty frame list.
    pub fn new(frames: Vec<Frame<I>>, source: AnimationSource) -> Option<Self> {
        if frames.is_empty() {
            None
        } else {
            Some(Self { frames, source })
        }
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn source(&self) -> AnimationSource {
        self.source
    }

    pub fn into_frames(self) -> Vec<Frame<I>> {
        self.frames
    }
}

/// Outcome of decoding one view's media.
#[derive(Debug)]
pub enum DecodeResult<I = RgbaImage> {
    /// Nothing usable; the view is dropped
    Empty,
    Static(I),
    Animated(Animation<I>),
}

impl<I> DecodeResult<I> {
    /// Wrap decoded frames, collapsing an empty list to [`DecodeResult::Empty`].
    pub fn animated(frames: Vec<Frame<I>>, source: AnimationSource) -> Self {
        Animation::new(frames, source).map_or(Self::Empty, Self::Animated)
    }

    pub fn frame_count(&self) -> usize {
        match self {
            Self::Empty => 0,
            Self::Static(_) => 1,
            Self::Animated(animation) => animation.frame_count(),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }
}

/// Turns a media locator into decoded frames.
///
/// Implementations must be callable from several decode threads at once.
pub trait Decoder: Sync {
    type Image: Send;

    fn decode(&self, locator: &Path) -> anyhow::Result<DecodeResult<Self::Image>>;
}

/// Runs one decode task per view and joins them all.
#[derive(Debug, Clone, Copy, Default)]
pub struct DecodePool {
    /// Worker count; 0 means one worker per view
    threads: usize,
}

impl DecodePool {
    pub fn new(threads: usize) -> Self {
        Self { threads }
    }

    fn worker_count(&self, tasks: usize) -> usize {
        match self.threads {
            0 => tasks,
            n => n.min(tasks),
        }
        .max(1)
    }

    /// Decode every spec and return results in spec order.
    ///
    /// Failures (errors or panics inside a task) become
    /// [`DecodeResult::Empty`] for that view only.
    pub fn decode_all<D: Decoder>(
        &self,
        decoder: &D,
        specs: &[ViewSpec],
    ) -> Vec<DecodeResult<D::Image>> {
        if specs.is_empty() {
            return Vec::new();
        }

        let workers = self.worker_count(specs.len());
        let start = Instant::now();

        let results: Vec<_> = match rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("weaver-decode-{}", i))
            .build()
        {
            Ok(pool) => pool.install(|| {
                specs
                    .par_iter()
                    .enumerate()
                    .map(|(index, spec)| decode_view(decoder, index, spec))
                    .collect()
            }),
            Err(e) => {
                log::warn!(
                    "Failed to start decode pool ({}), decoding on the current thread",
                    e
                );
                specs
                    .iter()
                    .enumerate()
                    .map(|(index, spec)| decode_view(decoder, index, spec))
                    .collect()
            }
        };

        let usable = results.iter().filter(|r| !r.is_empty()).count();
        log::info!(
            "Decoded {}/{} view(s) on {} worker(s) in {:.2?}",
            usable,
            specs.len(),
            workers,
            start.elapsed()
        );

        results
    }
}

fn decode_view<D: Decoder>(decoder: &D, index: usize, spec: &ViewSpec) -> DecodeResult<D::Image> {
    let start = Instant::now();

    match panic::catch_unwind(AssertUnwindSafe(|| decoder.decode(&spec.path))) {
        Ok(Ok(result)) => {
            log::debug!(
                "View {}: {} frame(s) from {} in {:.2?}",
                index,
                result.frame_count(),
                spec.path.display(),
                start.elapsed()
            );
            result
        }
        Ok(Err(e)) => {
            log::warn!(
                "View {}: failed to decode {}: {:#}",
                index,
                spec.path.display(),
                e
            );
            DecodeResult::Empty
        }
        Err(_) => {
            log::warn!(
                "View {}: decoder panicked on {}, view dropped",
                index,
                spec.path.display()
            );
            DecodeResult::Empty
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::testing::TestImage;
    use common::Rect;
    use std::path::PathBuf;
    use std::sync::Mutex;
    use std::thread::ThreadId;

    /// Decodes by looking at the file name: `still-N`, `anim-N` (N frames),
    /// `empty`, `fail` or `panic`.
    #[derive(Default)]
    struct NameDecoder {
        threads: Mutex<Vec<ThreadId>>,
    }

    impl Decoder for NameDecoder {
        type Image = TestImage;

        fn decode(&self, locator: &Path) -> anyhow::Result<DecodeResult<TestImage>> {
            self.threads
                .lock()
                .unwrap()
                .push(std::thread::current().id());

            let name = locator.file_name().unwrap().to_string_lossy().to_string();
            let (kind, n) = name.split_once('-').unwrap_or((name.as_str(), "0"));
            let n: u32 = n.parse().unwrap_or(0);

            match kind {
                "still" => Ok(DecodeResult::Static(TestImage::new(n))),
                "anim" => Ok(DecodeResult::animated(
                    (0..n).map(|i| Frame::new(TestImage::new(i), 40)).collect(),
                    AnimationSource::Video,
                )),
                "fail" => anyhow::bail!("unsupported media"),
                "panic" => panic!("decoder blew up"),
                _ => Ok(DecodeResult::Empty),
            }
        }
    }

    fn specs(names: &[&str]) -> Vec<ViewSpec> {
        names
            .iter()
            .map(|n| ViewSpec::new(PathBuf::from(n), Rect::new(0, 0, 10, 10), 1))
            .collect()
    }

    #[test]
    fn test_results_follow_spec_order() {
        let decoder = NameDecoder::default();
        let specs = specs(&["anim-3", "still-7", "empty", "anim-1"]);

        let results = DecodePool::new(0).decode_all(&decoder, &specs);

        assert_eq!(results.len(), specs.len());
        assert_eq!(results[0].frame_count(), 3);
        assert!(matches!(&results[1], DecodeResult::Static(img) if img.id == 7));
        assert!(results[2].is_empty());
        assert_eq!(results[3].frame_count(), 1);
    }

    #[test]
    fn test_failures_are_isolated() {
        let decoder = NameDecoder::default();
        let specs = specs(&["fail", "still-1", "panic", "anim-2"]);

        let results = DecodePool::new(2).decode_all(&decoder, &specs);

        assert!(results[0].is_empty());
        assert_eq!(results[1].frame_count(), 1);
        assert!(results[2].is_empty());
        assert_eq!(results[3].frame_count(), 2);
    }

    #[test]
    fn test_every_spec_is_decoded_once() {
        let decoder = NameDecoder::default();
        let specs = specs(&["still-1", "still-2", "still-3", "still-4", "still-5"]);

        DecodePool::new(3).decode_all(&decoder, &specs);

        assert_eq!(decoder.threads.lock().unwrap().len(), specs.len());
    }

    #[test]
    fn test_no_specs_no_work() {
        let decoder = NameDecoder::default();
        let results = DecodePool::default().decode_all(&decoder, &[]);
        assert!(results.is_empty());
        assert!(decoder.threads.lock().unwrap().is_empty());
    }

    #[test]
    fn test_empty_animation_collapses() {
        let result: DecodeResult<TestImage> =
            DecodeResult::animated(Vec::new(), AnimationSource::Gif);
        assert!(result.is_empty());
    }

    #[test]
    fn test_worker_count() {
        assert_eq!(DecodePool::new(0).worker_count(5), 5);
        assert_eq!(DecodePool::new(2).worker_count(5), 2);
        assert_eq!(DecodePool::new(8).worker_count(3), 3);
    }
}
