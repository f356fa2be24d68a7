//! Frame-rate accounting for the main loop.

use std::time::{Duration, Instant};

/// Counts presented frames and reports an average rate once per interval.
#[derive(Debug)]
pub struct FrameCounter {
    window_start: Instant,
    interval: Duration,
    frames: u32,
    total_frames: u64,
}

impl FrameCounter {
    /// Create a counter that reports every `interval`.
    pub fn new(interval: Duration) -> Self {
        Self {
            window_start: Instant::now(),
            interval,
            frames: 0,
            total_frames: 0,
        }
    }

    /// Record one frame.
    ///
    /// Returns the average frames per second over the elapsed window once the
    /// interval has passed, and starts a new window.
    pub fn frame(&mut self) -> Option<f32> {
        self.record_at(Instant::now())
    }

    fn record_at(&mut self, now: Instant) -> Option<f32> {
        self.frames += 1;
        self.total_frames += 1;

        let elapsed = now.saturating_duration_since(self.window_start);
        if elapsed < self.interval {
            return None;
        }

        let fps = self.frames as f32 / elapsed.as_secs_f32();
        self.frames = 0;
        self.window_start = now;
        Some(fps)
    }

    /// Frames recorded since creation.
    pub fn total_frames(&self) -> u64 {
        self.total_frames
    }
}

impl Default for FrameCounter {
    fn default() -> Self {
        Self::new(Duration::from_secs(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_report_inside_interval() {
        let mut counter = FrameCounter::new(Duration::from_secs(10));
        let start = counter.window_start;
        assert_eq!(counter.record_at(start + Duration::from_millis(5)), None);
        assert_eq!(counter.total_frames(), 1);
    }

    #[test]
    fn test_report_after_interval() {
        let mut counter = FrameCounter::new(Duration::from_secs(1));
        let start = counter.window_start;
        for i in 1..60 {
            assert!(counter.record_at(start + Duration::from_millis(i * 10)).is_none());
        }
        let fps = counter
            .record_at(start + Duration::from_secs(2))
            .expect("interval elapsed");
        assert!((fps - 30.0).abs() < 0.01, "expected 30 fps, got {fps}");
        assert_eq!(counter.total_frames(), 60);
        assert_eq!(counter.frames, 0);
    }
}
