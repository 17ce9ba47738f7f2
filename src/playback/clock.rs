use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Self-correcting frame pacer. Each delay is computed against the absolute
/// schedule from the start instant, so lateness in one frame is recovered in
/// the next instead of accumulating.
pub struct FrameClock {
    start: Instant,
    fps: f64,
    ticks: u64,
}

impl FrameClock {
    pub fn new(fps: u32) -> Self {
        FrameClock {
            start: Instant::now(),
            fps: fps.max(1) as f64,
            ticks: 0,
        }
    }

    /// Block until the next tick is due. Returns immediately when behind.
    pub fn wait(&mut self) {
        let delay = self.next_delay(Instant::now());
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }
    }

    /// Time until the next scheduled tick, zero when already late.
    fn next_delay(&mut self, now: Instant) -> Duration {
        self.ticks += 1;
        let expected = Duration::from_secs_f64(self.ticks as f64 / self.fps);
        let actual = now.duration_since(self.start);
        expected.saturating_sub(actual)
    }
}

/// Cooperative cancellation flag shared between a driving loop and whoever
/// wants to stop it.
#[derive(Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delays_come_from_the_absolute_schedule() {
        let start = Instant::now();
        let mut clock = FrameClock {
            start,
            fps: 10.0,
            ticks: 0,
        };

        // First tick due at 100ms; asking at 40ms leaves 60ms.
        let d1 = clock.next_delay(start + Duration::from_millis(40));
        assert!((d1.as_millis() as i64 - 60).abs() <= 1);

        // Second tick due at 200ms; running late at 170ms leaves only 30ms,
        // not a fresh full interval.
        let d2 = clock.next_delay(start + Duration::from_millis(170));
        assert!((d2.as_millis() as i64 - 30).abs() <= 1);
    }

    #[test]
    fn late_frames_never_go_negative() {
        let start = Instant::now();
        let mut clock = FrameClock {
            start,
            fps: 30.0,
            ticks: 0,
        };
        let d = clock.next_delay(start + Duration::from_secs(5));
        assert!(d.is_zero());
    }

    #[test]
    fn a_full_second_of_ticks_lands_on_schedule() {
        let start = Instant::now();
        let mut clock = FrameClock {
            start,
            fps: 24.0,
            ticks: 0,
        };
        // Walk 24 on-time ticks; the last one is due at exactly 1s.
        let mut due = Duration::ZERO;
        for _ in 0..24 {
            due = clock.next_delay(start);
        }
        assert!((due.as_secs_f64() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn cancel_token_clones_share_the_flag() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }
}
