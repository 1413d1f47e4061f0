use std::time::{Duration, Instant};

/// Keeps the simulation loop near a fixed tick rate by sleeping after each
/// tick. Every `tick_hz / 10` ticks the sleep is rescaled by how long that
/// batch actually took, never growing past the nominal period.
#[derive(Debug, Clone)]
pub struct TickPacer {
    period: Duration,
    sleep: Duration,
    batch: u32,
    count: u32,
    batch_start: Instant,
    ticks: u64,
}

impl TickPacer {
    pub fn new(tick_hz: u32) -> Self {
        let tick_hz = tick_hz.max(1);
        let period = Duration::from_secs_f64(1.0 / tick_hz as f64);
        Self {
            period,
            sleep: period,
            batch: (tick_hz / 10).max(1),
            count: 0,
            batch_start: Instant::now(),
            ticks: 0,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Current per-tick sleep.
    pub fn sleep_time(&self) -> Duration {
        self.sleep
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Sleeps for one tick and folds the elapsed time into the correction.
    pub fn wait(&mut self) {
        std::thread::sleep(self.sleep);
        self.record(Instant::now());
    }

    /// Counts one tick finishing at `now`. Exposed separately from
    /// [`wait`](Self::wait) so callers can drive it with their own clock.
    pub fn record(&mut self, now: Instant) {
        self.ticks += 1;
        self.count += 1;
        if self.count < self.batch {
            return;
        }

        let elapsed = now.saturating_duration_since(self.batch_start);
        self.sleep = self.corrected(elapsed);
        self.batch_start = now;
        self.count = 0;
    }

    /// Sleep for the next batch given the wall time the last batch took.
    pub fn corrected(&self, elapsed: Duration) -> Duration {
        if elapsed.is_zero() {
            return self.period;
        }
        let target = self.period.as_secs_f64() * self.batch as f64;
        let scaled = self.sleep.as_secs_f64() * target / elapsed.as_secs_f64();
        Duration::from_secs_f64(scaled).min(self.period)
    }
}

impl Default for TickPacer {
    fn default() -> Self {
        Self::new(60)
    }
}
