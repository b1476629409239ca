//! Rolling one-second window of unique-frame timestamps

/// Timestamp slots; enough for two seconds at 60 FPS or one at 120
pub const ROLLING_CAPACITY: usize = 120;

/// Window length in nanoseconds
pub const WINDOW_NS: u64 = 1_000_000_000;

/// Circular buffer of timestamps whose live count is the instantaneous FPS
#[derive(Debug, Clone)]
pub struct RollingFpsWindow {
    times: [u64; ROLLING_CAPACITY],
    start: usize,
    count: usize,
}

impl Default for RollingFpsWindow {
    fn default() -> Self {
        Self::new()
    }
}

impl RollingFpsWindow {
    pub fn new() -> Self {
        Self {
            times: [0; ROLLING_CAPACITY],
            start: 0,
            count: 0,
        }
    }

    /// Record a unique frame at `now` (ns) and return the window count.
    pub fn record(&mut self, now: u64) -> usize {
        if self.count == ROLLING_CAPACITY {
            self.start = (self.start + 1) % ROLLING_CAPACITY;
            self.count -= 1;
        }
        let idx = (self.start + self.count) % ROLLING_CAPACITY;
        self.times[idx] = now;
        self.count += 1;
        self.evict_before(now);
        self.count
    }

    /// Count as of the last recorded timestamp
    pub fn count(&self) -> usize {
        self.count
    }

    /// Evict entries more than one second older than `now`, then count.
    pub fn count_at(&mut self, now: u64) -> usize {
        self.evict_before(now);
        self.count
    }

    fn evict_before(&mut self, now: u64) {
        while self.count > 0 && now.saturating_sub(self.times[self.start]) > WINDOW_NS {
            self.start = (self.start + 1) % ROLLING_CAPACITY;
            self.count -= 1;
        }
    }
}
