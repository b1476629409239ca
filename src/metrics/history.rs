//! Decaying frametime average

/// Number of intervals averaged
pub const HISTORY_CAPACITY: usize = 60;

/// Fixed ring of recent unique-frame intervals in milliseconds.
///
/// Once full, new samples overwrite the oldest, so the mean follows the
/// last `HISTORY_CAPACITY` intervals regardless of how much time they span.
#[derive(Debug, Clone)]
pub struct FrametimeHistory {
    samples: [f64; HISTORY_CAPACITY],
    cursor: usize,
    count: usize,
}

impl Default for FrametimeHistory {
    fn default() -> Self {
        Self::new()
    }
}

impl FrametimeHistory {
    pub fn new() -> Self {
        Self {
            samples: [0.0; HISTORY_CAPACITY],
            cursor: 0,
            count: 0,
        }
    }

    pub fn record(&mut self, interval_ms: f64) {
        self.samples[self.cursor] = interval_ms;
        self.cursor = (self.cursor + 1) % HISTORY_CAPACITY;
        self.count = (self.count + 1).min(HISTORY_CAPACITY);
    }

    /// Mean of the stored intervals, 0 when empty
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        self.samples[..self.count].iter().sum::<f64>() / self.count as f64
    }

    /// Most recently recorded interval
    pub fn last(&self) -> Option<f64> {
        if self.count == 0 {
            return None;
        }
        let idx = (self.cursor + HISTORY_CAPACITY - 1) % HISTORY_CAPACITY;
        Some(self.samples[idx])
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}
