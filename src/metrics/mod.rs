//! Rolling frame-rate metrics
//!
//! Turns unique-frame events into an instantaneous FPS count, a decaying
//! frametime average and the snapshot handed to sinks.

pub mod exporter;
pub mod history;
pub mod snapshot;
pub mod window;

pub use exporter::PrometheusSink;
pub use history::{FrametimeHistory, HISTORY_CAPACITY};
pub use snapshot::MetricsSnapshot;
pub use window::{RollingFpsWindow, ROLLING_CAPACITY, WINDOW_NS};
