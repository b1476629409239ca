//! Periodic metrics snapshot

use serde::Serialize;

/// Values emitted on each engine tick
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    /// Unix time of the snapshot in seconds
    pub timestamp: u64,

    /// Smoothed FPS derived from the average frametime
    pub fps: f64,

    /// Unique frames seen within the trailing second
    pub instant_fps: usize,

    /// Average interval between unique frames
    pub frametime_ms: f64,

    /// Interval between the two most recent unique frames
    pub last_frametime_ms: f64,

    /// Tearing warning, `None` when tearing detection is off
    pub tearing: Option<bool>,

    /// Unique frames since start
    pub unique_frames: u64,

    /// Analyzed frames since start
    pub total_frames: u64,
}

impl MetricsSnapshot {
    /// FPS implied by an average frametime, 0 when no interval is known
    pub fn fps_from_frametime(frametime_ms: f64) -> f64 {
        if frametime_ms > 0.0 {
            1000.0 / frametime_ms
        } else {
            0.0
        }
    }

    /// FPS rounded for display
    pub fn display_fps(&self) -> u32 {
        self.fps.round() as u32
    }

    pub fn tearing_warning(&self) -> bool {
        self.tearing.unwrap_or(false)
    }
}
