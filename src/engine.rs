//! Frame-rate analysis engine
//!
//! `Engine` owns all per-stream state and is driven by two callbacks: one
//! per frame and one periodic tick. `Analyzer` wraps it in a lock so the two
//! callbacks may come from different threads, and forwards flushed snapshots
//! to a sink outside that lock.

use crate::analysis::{RegionSampler, TearingDetector, UniquenessDetector};
use crate::capture::FrameBuffer;
use crate::clock::{unix_timestamp, Clock};
use crate::config::AnalyzerConfig;
use crate::error::Result;
use crate::metrics::{FrametimeHistory, MetricsSnapshot, RollingFpsWindow};
use crate::sink::MetricsSink;
use log::{debug, info, trace, warn};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

const NS_PER_MS: f64 = 1_000_000.0;
const NS_PER_SEC: f64 = 1_000_000_000.0;

/// Engine lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// No frame analyzed yet
    Uninitialized,
    /// Baseline ROI and rows stored from the first frame
    Seeded,
    /// Comparing every frame against the stored baseline
    SteadyState,
}

/// Result of analyzing one frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// Layout has no addressable luma; frame passed through untouched
    Skipped,
    Analyzed {
        /// Frame is a new unique frame
        unique: bool,
        /// Tearing warning after this frame
        tearing: bool,
    },
}

/// Single-threaded analysis core
pub struct Engine {
    config: AnalyzerConfig,
    clock: Arc<dyn Clock>,
    sampler: RegionSampler,
    uniqueness: UniquenessDetector,
    tearing: TearingDetector,
    window: RollingFpsWindow,
    history: FrametimeHistory,
    state: EngineState,
    last_unique_ns: Option<u64>,
    last_flush_ns: u64,
    tearing_flag: bool,
    unique_frames: u64,
    total_frames: u64,
}

impl Engine {
    pub fn new(config: AnalyzerConfig, clock: Arc<dyn Clock>) -> Self {
        let last_flush_ns = clock.now_ns();
        Self {
            sampler: RegionSampler::new(config.sample_mode),
            uniqueness: UniquenessDetector::new(config.method, config.sensitivity_percent),
            tearing: TearingDetector::new(config.tearing_enabled, config.tearing_sensitivity_percent),
            window: RollingFpsWindow::new(),
            history: FrametimeHistory::new(),
            state: EngineState::Uninitialized,
            last_unique_ns: None,
            last_flush_ns,
            tearing_flag: false,
            unique_frames: 0,
            total_frames: 0,
            config,
            clock,
        }
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Analyze one frame.
    ///
    /// Frames in layouts without addressable luma are skipped without
    /// touching any state. Errors leave the cached baselines usable for the
    /// next frame.
    pub fn observe(&mut self, frame: &FrameBuffer<'_>) -> Result<FrameOutcome> {
        if frame.layout.luma_step().is_none() {
            trace!("Skipping {}x{} {} frame", frame.width, frame.height, frame.layout);
            return Ok(FrameOutcome::Skipped);
        }

        let roi = self.sampler.sample(frame)?;
        let tearing = self.tearing.observe(frame)?;
        let unique = self.uniqueness.observe(roi)?;

        self.total_frames += 1;
        self.tearing_flag = tearing;
        if unique {
            self.record_unique(self.clock.now_ns());
        }

        self.state = match self.state {
            EngineState::Uninitialized => {
                debug!("Seeded from {}x{} {} frame", frame.width, frame.height, frame.layout);
                EngineState::Seeded
            }
            _ => EngineState::SteadyState,
        };

        Ok(FrameOutcome::Analyzed { unique, tearing })
    }

    fn record_unique(&mut self, now: u64) {
        self.window.record(now);
        if let Some(prev) = self.last_unique_ns {
            self.history.record(now.saturating_sub(prev) as f64 / NS_PER_MS);
        }
        self.last_unique_ns = Some(now);
        self.unique_frames += 1;
    }

    /// Periodic callback. Returns a snapshot once at least the configured
    /// update interval has passed since the previous flush.
    ///
    /// `seconds` is the host's elapsed-time hint; gating uses the engine clock
    /// because callback cadence need not match the configured interval.
    pub fn tick(&mut self, seconds: f32) -> Option<MetricsSnapshot> {
        let now = self.clock.now_ns();
        let interval_ns = (self.config.effective_update_interval() * NS_PER_SEC) as u64;
        if now.saturating_sub(self.last_flush_ns) < interval_ns {
            trace!("Tick after {:.3}s, flush not due", seconds);
            return None;
        }
        self.last_flush_ns = now;
        Some(self.snapshot_at(now))
    }

    /// Ungated snapshot of the current state
    pub fn snapshot(&mut self) -> MetricsSnapshot {
        let now = self.clock.now_ns();
        self.snapshot_at(now)
    }

    fn snapshot_at(&mut self, now: u64) -> MetricsSnapshot {
        let frametime_ms = self.history.mean();
        MetricsSnapshot {
            timestamp: unix_timestamp(),
            fps: MetricsSnapshot::fps_from_frametime(frametime_ms),
            instant_fps: self.window.count_at(now),
            frametime_ms,
            last_frametime_ms: self.history.last().unwrap_or(0.0),
            tearing: self.tearing.is_enabled().then_some(self.tearing_flag),
            unique_frames: self.unique_frames,
            total_frames: self.total_frames,
        }
    }

    /// Apply new settings without discarding rolling state.
    ///
    /// Changing the comparison method reseeds the uniqueness detector;
    /// disabling tearing detection releases its buffers.
    pub fn update_config(&mut self, config: AnalyzerConfig) {
        if config.method != self.config.method {
            info!(
                "Uniqueness method {} -> {}",
                self.config.method.as_str(),
                config.method.as_str()
            );
        }
        if config.sample_mode != self.config.sample_mode {
            info!(
                "Sample mode {} -> {}",
                self.config.sample_mode.as_str(),
                config.sample_mode.as_str()
            );
        }

        self.sampler.set_mode(config.sample_mode);
        self.uniqueness.set_method(config.method);
        self.uniqueness.set_sensitivity(config.sensitivity_percent);
        self.tearing.set_enabled(config.tearing_enabled);
        self.tearing.set_sensitivity(config.tearing_sensitivity_percent);
        if !config.tearing_enabled {
            self.tearing_flag = false;
        }
        self.config = config;
    }
}

/// Thread-safe front end: engine state behind one lock, sink behind another
pub struct Analyzer {
    engine: Mutex<Engine>,
    sink: Mutex<Box<dyn MetricsSink>>,
    sink_failures: AtomicU64,
}

impl Analyzer {
    pub fn new(engine: Engine, sink: Box<dyn MetricsSink>) -> Self {
        Self {
            engine: Mutex::new(engine),
            sink: Mutex::new(sink),
            sink_failures: AtomicU64::new(0),
        }
    }

    /// Per-frame callback
    pub fn process_frame(&self, frame: &FrameBuffer<'_>) -> Result<FrameOutcome> {
        self.engine.lock().observe(frame)
    }

    /// Periodic callback; publishes and returns a snapshot when a flush is due
    pub fn tick(&self, seconds: f32) -> Option<MetricsSnapshot> {
        let snapshot = self.engine.lock().tick(seconds)?;
        self.publish(&snapshot);
        Some(snapshot)
    }

    /// Publish the current state regardless of the update interval
    pub fn flush(&self) -> MetricsSnapshot {
        let snapshot = self.engine.lock().snapshot();
        self.publish(&snapshot);
        snapshot
    }

    pub fn update_config(&self, config: AnalyzerConfig) {
        self.engine.lock().update_config(config);
    }

    pub fn state(&self) -> EngineState {
        self.engine.lock().state()
    }

    /// Number of snapshots the sink failed to store
    pub fn sink_failures(&self) -> u64 {
        self.sink_failures.load(Ordering::Relaxed)
    }

    fn publish(&self, snapshot: &MetricsSnapshot) {
        if let Err(e) = self.sink.lock().publish(snapshot) {
            let failures = self.sink_failures.fetch_add(1, Ordering::Relaxed);
            if failures == 0 {
                warn!("Failed to write metrics snapshot: {}", e);
            } else {
                debug!("Failed to write metrics snapshot ({} failures): {}", failures + 1, e);
            }
        }
    }
}
