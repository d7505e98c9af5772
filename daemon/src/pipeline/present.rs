//! Presentation loop.

use std::time::{Duration, Instant};

use crate::host::{DisplayHost, HostEvent, ShutdownSignal};
use crate::pipeline::registry::ViewRegistry;

/// Loop pacing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    /// Sleep after each presented frame
    pub idle_interval: Duration,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            idle_interval: Duration::from_millis(10),
        }
    }
}

/// Why the presentation loop returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The host reported that its surface was closed
    HostClosed,
    /// SIGINT/SIGTERM
    Signal,
}

/// Compose one frame: clear, advance every animated view against a single
/// clock reading, draw every view in order, present.
pub fn render_frame<H: DisplayHost>(
    host: &mut H,
    registry: &mut ViewRegistry<H::Handle>,
    now: Instant,
) -> anyhow::Result<()> {
    host.clear();

    registry.advance_all(now);

    for view in registry.iter() {
        host.draw(view.current_handle(), view.dst());
    }

    host.present()
}

/// Run until the host closes or a shutdown is requested.
///
/// Presentation errors end the loop; the caller still owns the registry and
/// is responsible for tearing it down.
pub fn run_loop<H: DisplayHost>(
    host: &mut H,
    registry: &mut ViewRegistry<H::Handle>,
    pacing: Pacing,
    shutdown: &ShutdownSignal,
) -> anyhow::Result<StopReason> {
    let started = Instant::now();
    let mut frames = 0u64;

    let reason = loop {
        if shutdown.is_requested() {
            break StopReason::Signal;
        }

        if host.poll_events()? == HostEvent::Close {
            break StopReason::HostClosed;
        }

        render_frame(host, registry, Instant::now())?;
        frames += 1;

        if !pacing.idle_interval.is_zero() {
            std::thread::sleep(pacing.idle_interval);
        }
    };

    let elapsed = started.elapsed();
    log::info!(
        "Presentation stopped ({:?}) after {} frame(s) in {:.1?} ({:.1} fps)",
        reason,
        frames,
        elapsed,
        frames as f64 / elapsed.as_secs_f64().max(f64::EPSILON)
    );

    Ok(reason)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::testing::{MockHost, TestImage};
    use crate::pipeline::decode::AnimationSource;
    use crate::pipeline::registry::View;
    use common::Rect;

    fn registry_with(host: &mut MockHost, start: Instant) -> ViewRegistry<crate::host::testing::TestHandle> {
        let mut registry = ViewRegistry::new();

        let still = host.upload(&TestImage::new(1)).unwrap();
        registry.push(View::still(Rect::new(0, 0, 50, 50), still));

        let frames = (10..14)
            .map(|id| (host.upload(&TestImage::new(id)).unwrap(), 100))
            .collect();
        registry.push(
            View::animated(Rect::new(25, 25, 50, 50), frames, AnimationSource::Gif, 2, start)
                .unwrap(),
        );

        registry
    }

    #[test]
    fn test_frame_draws_views_in_order() {
        let mut host = MockHost::default();
        let start = Instant::now();
        let mut registry = registry_with(&mut host, start);

        render_frame(&mut host, &mut registry, start).unwrap();

        assert_eq!(
            host.draws,
            vec![(1, Rect::new(0, 0, 50, 50)), (10, Rect::new(25, 25, 50, 50))]
        );
        assert_eq!(host.frames_presented, 1);

        registry.teardown(&mut host);
    }

    #[test]
    fn test_animation_advances_between_frames() {
        let mut host = MockHost::default();
        let start = Instant::now();
        let mut registry = registry_with(&mut host, start);

        // speed 2: one GIF frame every 50ms
        let mut shown = Vec::new();
        for tick in 0..=20u64 {
            render_frame(&mut host, &mut registry, start + Duration::from_millis(tick * 10)).unwrap();
            shown.push(host.draws[1].0);
        }

        assert_eq!(shown[0], 10);
        assert_eq!(shown[5], 11);
        assert_eq!(shown[10], 12);
        assert_eq!(shown[15], 13);
        assert_eq!(shown[20], 10);

        registry.teardown(&mut host);
    }

    #[test]
    fn test_loop_stops_when_host_closes() {
        let mut host = MockHost::closing_after(3);
        let mut registry = registry_with(&mut host, Instant::now());
        let pacing = Pacing {
            idle_interval: Duration::ZERO,
        };

        let reason = run_loop(&mut host, &mut registry, pacing, &ShutdownSignal::new()).unwrap();

        assert_eq!(reason, StopReason::HostClosed);
        assert_eq!(host.frames_presented, 3);

        registry.teardown(&mut host);
        assert!(host.live.is_empty());
    }

    #[test]
    fn test_loop_stops_on_signal() {
        let mut host = MockHost::default();
        let mut registry = registry_with(&mut host, Instant::now());
        let shutdown = ShutdownSignal::new();
        shutdown.request();

        let reason = run_loop(&mut host, &mut registry, Pacing::default(), &shutdown).unwrap();

        assert_eq!(reason, StopReason::Signal);
        assert_eq!(host.frames_presented, 0);

        registry.teardown(&mut host);
    }

    #[test]
    fn test_empty_registry_still_presents() {
        let mut host = MockHost::closing_after(2);
        let mut registry = ViewRegistry::new();
        let pacing = Pacing {
            idle_interval: Duration::from_millis(1),
        };

        run_loop(&mut host, &mut registry, pacing, &ShutdownSignal::new()).unwrap();

        assert_eq!(host.clears, 2);
        assert_eq!(host.frames_presented, 2);
        assert!(host.draws.is_empty());
    }

    #[test]
    fn test_present_error_ends_loop() {
        let mut host = MockHost {
            fail_present: true,
            ..MockHost::default()
        };
        let mut registry = ViewRegistry::new();

        let result = run_loop(&mut host, &mut registry, Pacing::default(), &ShutdownSignal::new());
        assert!(result.is_err());
    }
}
