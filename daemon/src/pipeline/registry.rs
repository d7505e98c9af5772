//! Live views and the host handles they own.

use common::Rect;
use std::time::Instant;

use crate::host::DisplayHost;
use crate::pipeline::decode::AnimationSource;
use crate::scheduler::Playback;

/// What a view shows.
#[derive(Debug)]
pub enum ViewContent<H> {
    Still(H),
    /// Invariant: `frames.len() == playback.frame_count() >= 1`
    Animated { frames: Vec<H>, playback: Playback },
}

/// A view whose images live on the host.
#[derive(Debug)]
pub struct View<H> {
    dst: Rect,
    content: ViewContent<H>,
}

impl<H> View<H> {
    pub fn still(dst: Rect, handle: H) -> Self {
        Self {
            dst,
            content: ViewContent::Still(handle),
        }
    }

    /// Build an animated view from uploaded frames and their delays.
    ///
    /// Returns `None` when there are no frames.
    pub fn animated(
        dst: Rect,
        frames: Vec<(H, u32)>,
        source: AnimationSource,
        speed: u32,
        started: Instant,
    ) -> Option<Self> {
        if frames.is_empty() {
            return None;
        }

        let (handles, delays): (Vec<H>, Vec<u32>) = frames.into_iter().unzip();
        Some(Self {
            dst,
            content: ViewContent::Animated {
                frames: handles,
                playback: Playback::new(delays, source, speed, started),
            },
        })
    }

    pub fn dst(&self) -> Rect {
        self.dst
    }

    pub fn is_animated(&self) -> bool {
        matches!(self.content, ViewContent::Animated { .. })
    }

    pub fn handle_count(&self) -> usize {
        match &self.content {
            ViewContent::Still(_) => 1,
            ViewContent::Animated { frames, .. } => frames.len(),
        }
    }

    /// Handle of the frame that should be on screen now.
    pub fn current_handle(&self) -> &H {
        match &self.content {
            ViewContent::Still(handle) => handle,
            ViewContent::Animated { frames, playback } => &frames[playback.current_index()],
        }
    }

    /// Run the frame scheduler for this view. Stills never change.
    pub fn advance(&mut self, now: Instant) -> bool {
        match &mut self.content {
            ViewContent::Still(_) => false,
            ViewContent::Animated { playback, .. } => playback.advance(now),
        }
    }

    fn into_handles(self) -> Vec<H> {
        match self.content {
            ViewContent::Still(handle) => vec![handle],
            ViewContent::Animated { frames, .. } => frames,
        }
    }
}

/// Every live view, in configuration order (later views draw on top).
#[derive(Debug)]
pub struct ViewRegistry<H> {
    views: Vec<View<H>>,
}

impl<H> Default for ViewRegistry<H> {
    fn default() -> Self {
        Self { views: Vec::new() }
    }
}

impl<H> ViewRegistry<H> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, view: View<H>) {
        self.views.push(view);
    }

    pub fn len(&self) -> usize {
        self.views.len()
    }

    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &View<H>> {
        self.views.iter()
    }

    /// Total number of host handles held by all views.
    pub fn handle_count(&self) -> usize {
        self.views.iter().map(View::handle_count).sum()
    }

    /// Scheduling pass: advance every animated view against one clock
    /// reading. Returns how many views changed frame.
    pub fn advance_all(&mut self, now: Instant) -> usize {
        self.views
            .iter_mut()
            .map(|view| view.advance(now))
            .filter(|&advanced| advanced)
            .count()
    }

    /// Give every handle back to the host. Consumes the registry so no view
    /// can be drawn afterwards.
    pub fn teardown<D>(self, host: &mut D)
    where
        D: DisplayHost<Handle = H>,
    {
        let mut released = 0usize;
        for view in self.views {
            for handle in view.into_handles() {
                host.release(handle);
                released += 1;
            }
        }
        log::debug!("Released {} host image(s)", released);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::testing::{MockHost, TestImage};
    use std::time::Duration;

    fn upload(host: &mut MockHost, id: u32) -> crate::host::testing::TestHandle {
        host.upload(&TestImage::new(id)).unwrap()
    }

    #[test]
    fn test_animated_view_needs_frames() {
        let view: Option<View<u32>> =
            View::animated(Rect::default(), Vec::new(), AnimationSource::Gif, 1, Instant::now());
        assert!(view.is_none());
    }

    #[test]
    fn test_current_handle_follows_playback() {
        let start = Instant::now();
        let mut view = View::animated(
            Rect::new(0, 0, 4, 4),
            vec![("a", 100), ("b", 100), ("c", 100)],
            AnimationSource::Gif,
            1,
            start,
        )
        .unwrap();

        assert_eq!(*view.current_handle(), "a");
        assert!(view.advance(start + Duration::from_millis(100)));
        assert_eq!(*view.current_handle(), "b");
        assert!(!view.advance(start + Duration::from_millis(150)));
        assert_eq!(*view.current_handle(), "b");
    }

    #[test]
    fn test_stills_never_advance() {
        let mut view = View::still(Rect::new(0, 0, 1, 1), 7u32);
        assert!(!view.advance(Instant::now() + Duration::from_secs(60)));
        assert_eq!(*view.current_handle(), 7);
    }

    #[test]
    fn test_teardown_releases_every_handle_once() {
        let mut host = MockHost::default();
        let start = Instant::now();

        let mut registry = ViewRegistry::new();
        let still = upload(&mut host, 1);
        registry.push(View::still(Rect::new(0, 0, 10, 10), still));

        let frames = (0..4).map(|i| (upload(&mut host, 10 + i), 33)).collect();
        registry.push(
            View::animated(Rect::new(5, 5, 10, 10), frames, AnimationSource::Video, 1, start)
                .unwrap(),
        );

        assert_eq!(registry.handle_count(), 5);
        assert_eq!(host.live.len(), 5);

        registry.teardown(&mut host);

        assert!(host.live.is_empty());
        assert_eq!(host.released.len(), 5);
    }

    #[test]
    fn test_advance_all_counts_changes() {
        let start = Instant::now();
        let mut registry = ViewRegistry::new();
        registry.push(View::still(Rect::default(), 0u8));
        registry.push(
            View::animated(Rect::default(), vec![(1u8, 100), (2, 100)], AnimationSource::Gif, 1, start)
                .unwrap(),
        );
        registry.push(
            View::animated(Rect::default(), vec![(3u8, 100), (4, 100)], AnimationSource::Gif, 4, start)
                .unwrap(),
        );

        let later = start + Duration::from_millis(30);
        assert_eq!(registry.advance_all(later), 1);
        // Same clock reading: nothing moves again
        assert_eq!(registry.advance_all(later), 0);
    }
}
