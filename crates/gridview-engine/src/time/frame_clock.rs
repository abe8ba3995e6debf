use std::time::{Duration, Instant};

/// Frame timing snapshot.
#[derive(Debug, Copy, Clone)]
pub struct FrameTime {
    /// Clamped time since the previous tick, in seconds.
    pub dt: f32,

    /// Smoothed frames per second.
    pub fps: f32,

    /// Monotonic timestamp taken at the tick.
    pub now: Instant,

    /// Number of ticks before this one.
    pub frame_index: u64,
}

/// Per-window frame clock.
///
/// Delta time is clamped so a debugger pause or a minimized window does not
/// produce absurd values; the fps estimate is an exponential moving average
/// over the clamped deltas.
#[derive(Debug, Clone)]
pub struct FrameClock {
    last: Instant,
    frame_index: u64,
    dt_min: Duration,
    dt_max: Duration,
    avg_dt: Option<f32>,
}

/// Weight of the newest sample in the fps average.
const SMOOTHING: f32 = 0.1;

impl FrameClock {
    pub fn new() -> Self {
        Self::with_clamps(Duration::from_micros(100), Duration::from_millis(250))
    }

    pub fn with_clamps(dt_min: Duration, dt_max: Duration) -> Self {
        debug_assert!(dt_min <= dt_max);
        Self {
            last: Instant::now(),
            frame_index: 0,
            dt_min,
            dt_max,
            avg_dt: None,
        }
    }

    /// Restarts timing from now; the frame counter is kept.
    pub fn reset(&mut self) {
        self.last = Instant::now();
        self.avg_dt = None;
    }

    pub fn tick(&mut self) -> FrameTime {
        self.tick_at(Instant::now())
    }

    /// Advances the clock to `now`.
    pub fn tick_at(&mut self, now: Instant) -> FrameTime {
        let dt = now
            .saturating_duration_since(self.last)
            .clamp(self.dt_min, self.dt_max)
            .as_secs_f32();
        self.last = now;

        let avg = match self.avg_dt {
            Some(avg) => avg + SMOOTHING * (dt - avg),
            None => dt,
        };
        self.avg_dt = Some(avg);

        let ft = FrameTime {
            dt,
            fps: 1.0 / avg,
            now,
            frame_index: self.frame_index,
        };
        self.frame_index = self.frame_index.wrapping_add(1);
        ft
    }

    pub fn frames(&self) -> u64 {
        self.frame_index
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_index_counts_ticks() {
        let mut clock = FrameClock::new();
        let start = Instant::now();
        for i in 0..3u32 {
            let ft = clock.tick_at(start + Duration::from_millis(16) * (i + 1));
            assert_eq!(ft.frame_index, u64::from(i));
        }
        assert_eq!(clock.frames(), 3);
    }

    #[test]
    fn dt_is_clamped() {
        let mut clock =
            FrameClock::with_clamps(Duration::from_millis(1), Duration::from_millis(100));
        let start = clock.last;

        let ft = clock.tick_at(start + Duration::from_secs(5));
        assert!((ft.dt - 0.1).abs() < 1e-6);

        let ft = clock.tick_at(start + Duration::from_secs(5));
        assert!((ft.dt - 0.001).abs() < 1e-6);
    }

    #[test]
    fn steady_frames_give_steady_fps() {
        let mut clock = FrameClock::new();
        let start = clock.last;
        let mut ft = clock.tick_at(start + Duration::from_millis(20));
        for i in 2..50u32 {
            ft = clock.tick_at(start + Duration::from_millis(20) * i);
        }
        assert!((ft.fps - 50.0).abs() < 0.5, "{}", ft.fps);
    }
}
