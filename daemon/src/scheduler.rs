use std::time::{Duration, Instant};

use crate::pipeline::decode::{AnimationSource, GIF_FRAME_DELAY_MS};

/// Shortest effective delay; keeps a tick with an unchanged clock from
/// advancing when `delay / speed` rounds down to zero.
const MIN_EFFECTIVE_DELAY_MS: u32 = 1;

/// Frame scheduling state for one animated view.
///
/// Advancing is purely a function of the clock passed in, so a tick that
/// observes the same instant twice never moves the frame index twice.
#[derive(Debug, Clone)]
pub struct Playback {
    /// Per-frame delay at speed 1, in milliseconds
    delays_ms: Vec<u32>,

    /// Index of the frame currently on screen
    current: usize,

    /// When `current` was last changed (or playback started)
    last_advance: Instant,

    /// Speed multiplier, always >= 1
    speed: u32,

    source: AnimationSource,
}

impl Playback {
    pub fn new(delays_ms: Vec<u32>, source: AnimationSource, speed: u32, started: Instant) -> Self {
        Self {
            delays_ms,
            current: 0,
            last_advance: started,
            speed: speed.max(1),
            source,
        }
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    #[cfg(test)]
    pub fn frame_count(&self) -> usize {
        self.delays_ms.len()
    }

    #[cfg(test)]
    pub fn speed(&self) -> u32 {
        self.speed
    }

    /// Delay of the current frame at speed 1.
    ///
    /// GIF playback always uses the fixed GIF delay, video uses the delay
    /// recorded for the frame.
    fn base_delay_ms(&self) -> u32 {
        match self.source {
            AnimationSource::Gif => GIF_FRAME_DELAY_MS,
            AnimationSource::Video => self
                .delays_ms
                .get(self.current)
                .copied()
                .unwrap_or(GIF_FRAME_DELAY_MS),
        }
    }

    /// How long the current frame stays up, after applying the speed
    /// multiplier with integer division.
    pub fn effective_delay(&self) -> Duration {
        let ms = (self.base_delay_ms() / self.speed).max(MIN_EFFECTIVE_DELAY_MS);
        Duration::from_millis(ms as u64)
    }

    /// Step to the next frame if the current one has been shown long enough.
    ///
    /// Wraps to the first frame after the last one. Returns whether the index
    /// changed.
    pub fn advance(&mut self, now: Instant) -> bool {
        let count = self.delays_ms.len();
        if count == 0 {
            return false;
        }

        let elapsed = now.saturating_duration_since(self.last_advance);
        if elapsed < self.effective_delay() {
            return false;
        }

        self.current = (self.current + 1) % count;
        self.last_advance = now;

        log::trace!(
            "Advanced to frame {}/{} after {:?}",
            self.current + 1,
            count,
            elapsed
        );

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_gif_uses_fixed_delay() {
        let start = Instant::now();
        // Recorded delays are ignored for GIF playback
        let mut playback = Playback::new(vec![500, 500, 500], AnimationSource::Gif, 1, start);

        assert!(!playback.advance(start + ms(99)));
        assert!(playback.advance(start + ms(100)));
        assert_eq!(playback.current_index(), 1);
    }

    #[test]
    fn test_video_uses_frame_delay() {
        let start = Instant::now();
        let mut playback = Playback::new(vec![33, 50], AnimationSource::Video, 1, start);

        assert!(!playback.advance(start + ms(32)));
        assert!(playback.advance(start + ms(33)));
        assert_eq!(playback.current_index(), 1);

        // Second frame has its own delay, measured from the last advance
        assert!(!playback.advance(start + ms(33 + 49)));
        assert!(playback.advance(start + ms(33 + 50)));
        assert_eq!(playback.current_index(), 0);
    }

    #[test]
    fn test_speed_divides_delay() {
        let start = Instant::now();
        let playback = Playback::new(vec![100; 4], AnimationSource::Gif, 2, start);
        assert_eq!(playback.effective_delay(), ms(50));

        let playback = Playback::new(vec![33; 4], AnimationSource::Video, 4, start);
        assert_eq!(playback.effective_delay(), ms(8));

        let playback = Playback::new(vec![33; 4], AnimationSource::Video, 0, start);
        assert_eq!(playback.speed(), 1);
        assert_eq!(playback.effective_delay(), ms(33));
    }

    #[test]
    fn test_gif_at_double_speed_loops() {
        let start = Instant::now();
        let mut playback = Playback::new(vec![100; 4], AnimationSource::Gif, 2, start);

        let mut advances = 0;
        for tick in 1..=20 {
            if playback.advance(start + ms(tick * 10)) {
                advances += 1;
            }
        }

        assert_eq!(advances, 4);
        assert_eq!(playback.current_index(), 0);
    }

    fn count_advances(playback: &mut Playback, start: Instant, window_ms: u64, step_ms: u64) -> u64 {
        (1..=window_ms / step_ms)
            .filter(|tick| playback.advance(start + ms(tick * step_ms)))
            .count() as u64
    }

    #[test]
    fn test_double_speed_doubles_transitions() {
        for (source, delays) in [
            (AnimationSource::Gif, vec![100; 5]),
            (AnimationSource::Video, vec![40; 5]),
        ] {
            let start = Instant::now();
            let mut normal = Playback::new(delays.clone(), source, 1, start);
            let mut double = Playback::new(delays, source, 2, start);

            let normal_count = count_advances(&mut normal, start, 1000, 10);
            let double_count = count_advances(&mut double, start, 1000, 10);

            assert!(normal_count > 0);
            assert!(
                double_count.abs_diff(normal_count * 2) <= 1,
                "{:?}: {} transitions at speed 1, {} at speed 2",
                source,
                normal_count,
                double_count
            );
        }
    }

    #[test]
    fn test_frame_count_transitions_return_to_any_start() {
        let frames = 5;
        for k in 0..frames {
            let start = Instant::now();
            let mut playback = Playback::new(vec![100; frames], AnimationSource::Gif, 1, start);

            let mut now = start;
            for _ in 0..k {
                now += ms(100);
                assert!(playback.advance(now));
            }
            assert_eq!(playback.current_index(), k);

            for step in 1..=frames {
                now += ms(100);
                assert!(playback.advance(now));
                if step < frames {
                    assert_ne!(playback.current_index(), k);
                }
            }
            assert_eq!(playback.current_index(), k);
        }
    }

    #[test]
    fn test_same_instant_never_advances_twice() {
        let start = Instant::now();
        // 100 / 500 rounds to zero
        let mut playback = Playback::new(vec![100; 3], AnimationSource::Gif, 500, start);
        let now = start + ms(5);

        assert!(playback.advance(now));
        let index = playback.current_index();
        assert!(!playback.advance(now));
        assert!(!playback.advance(now));
        assert_eq!(playback.current_index(), index);
    }

    #[test]
    fn test_index_stays_in_range() {
        let start = Instant::now();
        let mut playback = Playback::new(vec![1; 3], AnimationSource::Video, 1, start);

        for tick in 1..=100 {
            playback.advance(start + ms(tick * 7));
            assert!(playback.current_index() < playback.frame_count());
        }
    }

    #[test]
    fn test_empty_playback_is_inert() {
        let start = Instant::now();
        let mut playback = Playback::new(Vec::new(), AnimationSource::Video, 1, start);
        assert!(!playback.advance(start + ms(1000)));
        assert_eq!(playback.current_index(), 0);
    }
}
