//! Prometheus gauges for the latest snapshot

use crate::error::Result;
use crate::metrics::MetricsSnapshot;
use crate::sink::MetricsSink;
use prometheus::{Encoder, Gauge, IntCounter, IntGauge, Opts, Registry, TextEncoder};
use std::fs;
use std::path::PathBuf;

/// Sink exposing snapshots as Prometheus gauges, optionally mirrored to a
/// node-exporter textfile.
pub struct PrometheusSink {
    registry: Registry,
    fps: Gauge,
    instant_fps: IntGauge,
    frametime_ms: Gauge,
    tearing: IntGauge,
    publishes: IntCounter,
    textfile: Option<PathBuf>,
}

impl PrometheusSink {
    pub fn new(textfile: Option<PathBuf>) -> Result<Self> {
        let registry = Registry::new();

        let fps = Gauge::with_opts(Opts::new("fps_analyzer_fps", "Smoothed unique frames per second"))?;
        let instant_fps = IntGauge::with_opts(Opts::new(
            "fps_analyzer_instant_fps",
            "Unique frames within the trailing second",
        ))?;
        let frametime_ms = Gauge::with_opts(Opts::new(
            "fps_analyzer_frametime_ms",
            "Average interval between unique frames in milliseconds",
        ))?;
        let tearing = IntGauge::with_opts(Opts::new(
            "fps_analyzer_tearing",
            "1 while the tearing warning is raised",
        ))?;
        let publishes = IntCounter::with_opts(Opts::new(
            "fps_analyzer_snapshots_total",
            "Snapshots published",
        ))?;

        registry.register(Box::new(fps.clone()))?;
        registry.register(Box::new(instant_fps.clone()))?;
        registry.register(Box::new(frametime_ms.clone()))?;
        registry.register(Box::new(tearing.clone()))?;
        registry.register(Box::new(publishes.clone()))?;

        Ok(Self {
            registry,
            fps,
            instant_fps,
            frametime_ms,
            tearing,
            publishes,
            textfile,
        })
    }

    /// Text exposition of the current gauges
    pub fn render(&self) -> Result<String> {
        let mut buf = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buf)?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }
}

impl MetricsSink for PrometheusSink {
    fn publish(&mut self, snapshot: &MetricsSnapshot) -> Result<()> {
        self.fps.set(snapshot.fps);
        self.instant_fps.set(snapshot.instant_fps as i64);
        self.frametime_ms.set(snapshot.frametime_ms);
        self.tearing.set(snapshot.tearing_warning() as i64);
        self.publishes.inc();

        if let Some(path) = &self.textfile {
            // rename so collectors never read a half-written file
            let tmp = path.with_extension("prom.tmp");
            fs::write(&tmp, self.render()?)?;
            fs::rename(&tmp, path)?;
        }
        Ok(())
    }
}
