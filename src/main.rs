//! fps-analyzer - Main entry point
//!
//! Replays a raw frame file through the analysis engine and writes the
//! periodic FPS/frametime snapshots to the configured sinks.

mod args;

use args::Args;
use clap::Parser;
use fps_analyzer::capture::{FrameSource, FrameStats, RawFrameReader};
use fps_analyzer::clock::{Clock, ManualClock, MonotonicClock};
use fps_analyzer::config::{Config, ConfigWatcher};
use fps_analyzer::metrics::{MetricsSnapshot, PrometheusSink};
use fps_analyzer::sink::{FanoutSink, FileSink, MetricsSink, OutputPaths};
use fps_analyzer::{Analyzer, Engine, FrameOutcome};
use log::{debug, error, info, warn};
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::signal;
use tokio::task;

const TICK_PERIOD: Duration = Duration::from_millis(100);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse command line arguments
    let args = Args::parse();

    // Load configuration before logging so its level can apply
    let loaded = args.load_config();
    let file_level = loaded
        .as_ref()
        .map(|cfg| cfg.logging.level.clone())
        .unwrap_or_else(|_| "info".to_string());
    let log_level = if args.verbose { "debug".to_string() } else { file_level };
    env_logger::Builder::new()
        .parse_filters(&std::env::var("FPS_ANALYZER_LOG").unwrap_or(log_level))
        .filter_module("notify", log::LevelFilter::Warn)
        .init();

    info!("fps-analyzer v{}", env!("CARGO_PKG_VERSION"));

    let mut config = match loaded {
        Ok(cfg) => {
            info!("Loaded configuration from {:?}", args.config);
            cfg
        }
        Err(e) => {
            warn!("Failed to load config: {}, using defaults", e);
            Config::default()
        }
    };
    args.apply_overrides(&mut config);

    // Validate configuration
    if let Err(e) = config.validate() {
        error!("Invalid configuration: {}", e);
        return Err(e.into());
    }
    if !(args.rate.is_finite() && args.rate > 0.0) {
        error!("Frame rate must be positive, got {}", args.rate);
        return Err("invalid frame rate".into());
    }

    info!(
        "Analyzing {}x{} {:?} at {} fps: method={} sample_mode={} sensitivity={}% tearing={}",
        args.width,
        args.height,
        args.format,
        args.rate,
        config.analyzer.method.as_str(),
        config.analyzer.sample_mode.as_str(),
        config.analyzer.sensitivity_percent,
        config.analyzer.tearing_enabled
    );

    let sink = build_sink(&config)?;

    // Replays run on a simulated clock advanced one frame period per frame
    let replay_clock = (!args.realtime).then(|| Arc::new(ManualClock::new(0)));
    let clock: Arc<dyn Clock> = match &replay_clock {
        Some(clock) => clock.clone(),
        None => Arc::new(MonotonicClock::new()),
    };

    let analyzer = Arc::new(Analyzer::new(
        Engine::new(config.analyzer.clone(), clock),
        sink,
    ));

    let _watcher = if args.watch_config {
        let target = analyzer.clone();
        let overrides = args.clone();
        match ConfigWatcher::spawn(&args.config, move |cfg| {
            target.update_config(overrides.reloaded_analyzer_config(cfg))
        }) {
            Ok(watcher) => {
                info!("Watching {:?} for changes", watcher.path());
                Some(watcher)
            }
            Err(e) => {
                warn!("Configuration reload disabled: {}", e);
                None
            }
        }
    } else {
        None
    };

    let reader: Box<dyn Read + Send> = if args.input.as_os_str() == "-" {
        Box::new(io::stdin())
    } else {
        Box::new(BufReader::new(File::open(&args.input)?))
    };
    let source = RawFrameReader::new(reader, args.format, args.width, args.height);
    debug!("Frame size: {} bytes", source.frame_size());

    let running = Arc::new(AtomicBool::new(true));
    let frame_period = Duration::from_secs_f64(1.0 / args.rate);
    let json = args.json;

    // Start frame loop
    let mut frame_handle = {
        let analyzer = analyzer.clone();
        let running = running.clone();
        task::spawn_blocking(move || {
            run_frame_loop(source, &analyzer, replay_clock.as_deref(), frame_period, &running, json)
        })
    };

    // Wall-clock ticks drive flushing in realtime mode
    let mut tick_handle = if args.realtime {
        let analyzer = analyzer.clone();
        Some(task::spawn(async move {
            let mut interval = tokio::time::interval(TICK_PERIOD);
            let mut last = Instant::now();
            loop {
                interval.tick().await;
                let elapsed = last.elapsed().as_secs_f32();
                last = Instant::now();
                if let Some(snapshot) = analyzer.tick(elapsed) {
                    emit(&snapshot, json);
                }
            }
        }))
    } else {
        None
    };

    // Wait for end of input or shutdown signal
    let finished = tokio::select! {
        _ = signal::ctrl_c() => {
            info!("Shutdown signal received");
            running.store(false, Ordering::Relaxed);
            None
        }
        result = &mut frame_handle => Some(result),
    };
    let result = match finished {
        Some(result) => result,
        None => frame_handle.await,
    };
    log_frame_loop_result(result);

    if let Some(handle) = tick_handle.as_mut() {
        handle.abort();
        let _ = handle.await;
    }

    let snapshot = analyzer.flush();
    emit(&snapshot, json);
    info!(
        "Final: {} fps, {:.2} ms frametime, {} unique of {} frames{}",
        snapshot.display_fps(),
        snapshot.frametime_ms,
        snapshot.unique_frames,
        snapshot.total_frames,
        if snapshot.tearing_warning() { ", tearing detected" } else { "" }
    );
    if analyzer.sink_failures() > 0 {
        warn!("{} snapshots could not be written", analyzer.sink_failures());
    }

    Ok(())
}

fn build_sink(config: &Config) -> Result<Box<dyn MetricsSink>, Box<dyn std::error::Error>> {
    let paths = OutputPaths::from_base(config.output.path.as_deref());
    info!("Writing status to {:?}, history to {:?}", paths.status, paths.history);
    let file_sink = FileSink::new(
        paths,
        config.output.history_limit,
        config.output.clear_history_on_start,
    );

    let Some(textfile) = config.output.prometheus_textfile.clone() else {
        return Ok(Box::new(file_sink));
    };

    info!("Exporting Prometheus metrics to {:?}", textfile);
    let mut fanout = FanoutSink::new();
    fanout.push(Box::new(file_sink));
    fanout.push(Box::new(PrometheusSink::new(Some(textfile))?));
    Ok(Box::new(fanout))
}

fn run_frame_loop<S: FrameSource>(
    mut source: S,
    analyzer: &Analyzer,
    replay_clock: Option<&ManualClock>,
    frame_period: Duration,
    running: &AtomicBool,
    json: bool,
) -> fps_analyzer::Result<FrameStats> {
    let started = Instant::now();
    let period_ns = frame_period.as_nanos() as u64;
    let mut skipped = 0u64;

    while running.load(Ordering::Relaxed) {
        let Some(frame) = source.next_frame()? else {
            break;
        };

        match analyzer.process_frame(&frame.as_buffer()) {
            Ok(FrameOutcome::Skipped) => {
                if skipped == 0 {
                    warn!("{} frames carry no addressable luma, passing through unanalyzed", frame.layout);
                }
                skipped += 1;
            }
            Ok(_) => {}
            Err(e) => debug!("{} not analyzed: {}", frame, e),
        }

        match replay_clock {
            Some(clock) => {
                clock.advance(period_ns);
                if let Some(snapshot) = analyzer.tick(frame_period.as_secs_f32()) {
                    emit(&snapshot, json);
                }
            }
            None => {
                let due = started + pacing_offset(period_ns, frame.sequence);
                let now = Instant::now();
                if due > now {
                    std::thread::sleep(due - now);
                }
            }
        }
    }

    Ok(source.stats())
}

/// Wall-clock offset from the start at which frame `sequence` is due
fn pacing_offset(period_ns: u64, sequence: u64) -> Duration {
    Duration::from_nanos(period_ns.saturating_mul(sequence.saturating_add(1)))
}

fn emit(snapshot: &MetricsSnapshot, json: bool) {
    if json {
        match serde_json::to_string(snapshot) {
            Ok(line) => println!("{}", line),
            Err(e) => warn!("Failed to serialize snapshot: {}", e),
        }
    } else {
        debug!(
            "FPS {} (instant {}), frametime {:.2} ms",
            snapshot.display_fps(),
            snapshot.instant_fps,
            snapshot.frametime_ms
        );
    }
}

fn log_frame_loop_result(
    result: Result<fps_analyzer::Result<FrameStats>, tokio::task::JoinError>,
) {
    match result {
        Ok(Ok(stats)) => info!(
            "Input finished: {} frames, {} bytes",
            stats.total_frames, stats.total_bytes
        ),
        Ok(Err(err)) => error!("Frame loop failed: {}", err),
        Err(err) => error!("Frame loop join error: {}", err),
    }
}
